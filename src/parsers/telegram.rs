use lazy_regex::{regex, regex_captures};

use super::SearchTermParser;
use crate::conversation::transfer::{Messenger, SearchTermTransfer, SearchTermType};

/// Recognizes Telegram usernames and t.me profile links.
pub struct TelegramSearchTermParser;

fn supports_username(text: &str) -> bool {
    if text.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    regex!(r"^@?[A-Za-z0-9_]{3,32}$").is_match(text)
}

fn parse_url(text: &str) -> Option<&str> {
    let (_, username) = regex_captures!(
        r"^(?:https?://)?(?:www\.)?t(?:elegram)?\.me/@?([A-Za-z0-9_]{3,32})[/?]?",
        text
    )?;
    supports_username(username).then_some(username)
}

fn normalize_username(username: &str) -> String {
    username.trim_start_matches('@').to_lowercase()
}

fn profile_url(username: &str) -> String {
    format!("https://t.me/{username}")
}

impl SearchTermParser for TelegramSearchTermParser {
    fn supports(&self, term: &SearchTermTransfer) -> bool {
        match term.term_type {
            None => supports_username(&term.text) || parse_url(&term.text).is_some(),
            Some(SearchTermType::TelegramUsername) => true,
            Some(_) => false,
        }
    }

    fn parse_with_guess_type(&self, term: &mut SearchTermTransfer) {
        if let Some(username) = parse_url(&term.text) {
            let normalized = normalize_username(username);
            term.term_type = Some(SearchTermType::TelegramUsername);
            term.messenger = Some(Messenger::Telegram);
            term.messenger_username = Some(normalized.clone());
            term.messenger_profile_url = Some(profile_url(&normalized));
            term.normalized_text = Some(normalized);
        } else if supports_username(&term.text) {
            term.add_type(SearchTermType::TelegramUsername);
        }
    }

    fn parse_with_known_type(&self, term: &mut SearchTermTransfer) {
        if term.term_type != Some(SearchTermType::TelegramUsername) {
            return;
        }
        let normalized = normalize_username(&term.text);
        term.messenger = Some(Messenger::Telegram);
        term.messenger_username = Some(normalized.clone());
        term.messenger_profile_url = Some(profile_url(&normalized));
        term.normalized_text = (normalized != term.text).then_some(normalized);
    }
}
