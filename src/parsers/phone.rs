use lazy_regex::regex;

use super::SearchTermParser;
use crate::conversation::transfer::{SearchTermTransfer, SearchTermType};

/// Recognizes phone numbers in international or bare-digit form.
pub struct PhoneNumberSearchTermParser;

fn normalize(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn supports_phone(text: &str) -> bool {
    regex!(r"^\+?[\d][\d \-.]{5,18}\d$").is_match(text) && {
        let digits = normalize(text);
        (7..=15).contains(&digits.len())
    }
}

impl SearchTermParser for PhoneNumberSearchTermParser {
    fn supports(&self, term: &SearchTermTransfer) -> bool {
        match term.term_type {
            None => supports_phone(&term.text),
            Some(SearchTermType::PhoneNumber) => true,
            Some(_) => false,
        }
    }

    fn parse_with_guess_type(&self, term: &mut SearchTermTransfer) {
        if !supports_phone(&term.text) {
            return;
        }
        if term.text.starts_with('+') {
            // International form is unambiguous
            term.term_type = Some(SearchTermType::PhoneNumber);
            term.normalized_text = Some(normalize(&term.text));
        } else {
            term.add_type(SearchTermType::PhoneNumber);
        }
    }

    fn parse_with_known_type(&self, term: &mut SearchTermTransfer) {
        if term.term_type != Some(SearchTermType::PhoneNumber) {
            return;
        }
        let normalized = normalize(&term.text);
        term.normalized_text = (normalized != term.text).then_some(normalized);
    }
}
