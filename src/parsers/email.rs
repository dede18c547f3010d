use lazy_regex::regex;

use super::SearchTermParser;
use crate::conversation::transfer::{SearchTermTransfer, SearchTermType};

/// Recognizes email addresses. An email is unambiguous, so the guess pass
/// fully resolves.
pub struct EmailSearchTermParser;

fn supports_email(text: &str) -> bool {
    regex!(r"^[A-Za-z0-9][A-Za-z0-9._%+\-]*@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").is_match(text)
}

impl SearchTermParser for EmailSearchTermParser {
    fn supports(&self, term: &SearchTermTransfer) -> bool {
        match term.term_type {
            None => supports_email(&term.text),
            Some(SearchTermType::Email) => true,
            Some(_) => false,
        }
    }

    fn parse_with_guess_type(&self, term: &mut SearchTermTransfer) {
        if supports_email(&term.text) {
            term.term_type = Some(SearchTermType::Email);
            term.normalized_text = Some(term.text.to_lowercase());
        }
    }

    fn parse_with_known_type(&self, term: &mut SearchTermTransfer) {
        if term.term_type != Some(SearchTermType::Email) {
            return;
        }
        let normalized = term.text.to_lowercase();
        term.normalized_text = (normalized != term.text).then_some(normalized);
    }
}
