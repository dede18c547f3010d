use super::SearchTermParser;
use crate::conversation::transfer::{SearchTermTransfer, SearchTermType};

/// Recognizes free-form names: words of letters separated by spaces,
/// apostrophes or hyphens. A name is inherently ambiguous between a person
/// and an organization, so the guess pass always offers both.
pub struct NameSearchTermParser;

fn supports_name(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() < 2 {
        return false;
    }
    trimmed
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '\'' || c == '-' || c == '.')
        && trimmed.chars().any(char::is_alphabetic)
}

impl SearchTermParser for NameSearchTermParser {
    fn supports(&self, term: &SearchTermTransfer) -> bool {
        match term.term_type {
            None => supports_name(&term.text),
            Some(SearchTermType::PersonName | SearchTermType::OrganizationName) => true,
            Some(_) => false,
        }
    }

    fn parse_with_guess_type(&self, term: &mut SearchTermTransfer) {
        if supports_name(&term.text) {
            term.add_type(SearchTermType::PersonName);
            term.add_type(SearchTermType::OrganizationName);
        }
    }

    fn parse_with_known_type(&self, term: &mut SearchTermTransfer) {
        if !matches!(
            term.term_type,
            Some(SearchTermType::PersonName | SearchTermType::OrganizationName)
        ) {
            return;
        }
        let normalized = term.text.trim().to_string();
        term.normalized_text = (normalized != term.text).then_some(normalized);
    }
}
