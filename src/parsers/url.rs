use url::Url;

use super::SearchTermParser;
use crate::conversation::transfer::{SearchTermTransfer, SearchTermType};

/// Catch-all for links no service-specific parser claimed. Runs after the
/// service parsers, so reaching its guess pass means the link is generic.
pub struct UrlSearchTermParser;

fn parse_generic(text: &str) -> Option<Url> {
    if !(text.starts_with("http://") || text.starts_with("https://") || text.starts_with("www.")) {
        return None;
    }
    let candidate = if text.starts_with("www.") {
        format!("https://{text}")
    } else {
        text.to_string()
    };
    Url::parse(&candidate).ok().filter(|url| url.host_str().is_some())
}

impl SearchTermParser for UrlSearchTermParser {
    fn supports(&self, term: &SearchTermTransfer) -> bool {
        match term.term_type {
            None => parse_generic(&term.text).is_some(),
            Some(SearchTermType::Url) => true,
            Some(_) => false,
        }
    }

    fn parse_with_guess_type(&self, term: &mut SearchTermTransfer) {
        if let Some(url) = parse_generic(&term.text) {
            term.term_type = Some(SearchTermType::Url);
            let normalized = url.to_string();
            term.normalized_text = (normalized != term.text).then_some(normalized);
        }
    }

    fn parse_with_known_type(&self, term: &mut SearchTermTransfer) {
        if term.term_type != Some(SearchTermType::Url) {
            return;
        }
        if let Some(url) = parse_generic(&term.text) {
            let normalized = url.to_string();
            term.normalized_text = (normalized != term.text).then_some(normalized);
        }
    }
}
