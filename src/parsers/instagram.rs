use lazy_regex::{regex, regex_captures};

use super::SearchTermParser;
use crate::conversation::transfer::{Messenger, SearchTermTransfer, SearchTermType};

/// Recognizes Instagram usernames and instagram.com profile links.
pub struct InstagramSearchTermParser;

fn supports_username(text: &str) -> bool {
    if text.chars().all(|c| c.is_ascii_digit()) || text.contains("..") {
        return false;
    }
    regex!(r"^@?[A-Za-z0-9_][A-Za-z0-9_.]{0,28}[A-Za-z0-9_]$").is_match(text)
}

fn parse_url(text: &str) -> Option<&str> {
    let (_, username) = regex_captures!(
        r"^(?:https?://)?(?:www\.)?instagram\.com/([A-Za-z0-9_.]{2,30})[/?]?",
        text
    )?;
    supports_username(username).then_some(username)
}

fn normalize_username(username: &str) -> String {
    username.trim_start_matches('@').to_lowercase()
}

fn profile_url(username: &str) -> String {
    format!("https://instagram.com/{username}")
}

impl SearchTermParser for InstagramSearchTermParser {
    fn supports(&self, term: &SearchTermTransfer) -> bool {
        match term.term_type {
            None => supports_username(&term.text) || parse_url(&term.text).is_some(),
            Some(SearchTermType::InstagramUsername) => true,
            Some(_) => false,
        }
    }

    fn parse_with_guess_type(&self, term: &mut SearchTermTransfer) {
        if let Some(username) = parse_url(&term.text) {
            let normalized = normalize_username(username);
            term.term_type = Some(SearchTermType::InstagramUsername);
            term.messenger = Some(Messenger::Instagram);
            term.messenger_username = Some(normalized.clone());
            term.messenger_profile_url = Some(profile_url(&normalized));
            term.normalized_text = Some(normalized);
        } else if supports_username(&term.text) {
            term.add_type(SearchTermType::InstagramUsername);
        }
    }

    fn parse_with_known_type(&self, term: &mut SearchTermTransfer) {
        if term.term_type != Some(SearchTermType::InstagramUsername) {
            return;
        }
        let normalized = normalize_username(&term.text);
        term.messenger = Some(Messenger::Instagram);
        term.messenger_username = Some(normalized.clone());
        term.messenger_profile_url = Some(profile_url(&normalized));
        term.normalized_text = (normalized != term.text).then_some(normalized);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_url_resolves() {
        let mut term = SearchTermTransfer::new("https://www.instagram.com/john.doe/");
        InstagramSearchTermParser.parse_with_guess_type(&mut term);
        assert_eq!(term.term_type, Some(SearchTermType::InstagramUsername));
        assert_eq!(term.messenger_username.as_deref(), Some("john.doe"));
    }

    #[test]
    fn double_dot_is_rejected() {
        assert!(!supports_username("john..doe"));
        assert!(supports_username("john.doe"));
    }
}
