//! Pluggable format-recognizer parsers.
//!
//! One parser per external identity-format family. Each independently
//! decides whether it recognizes a term, can contribute candidate types,
//! or can fully resolve type + normalized form without user input.

mod email;
mod instagram;
mod name;
mod onlyfans;
mod phone;
mod telegram;
mod url;

pub use email::EmailSearchTermParser;
pub use instagram::InstagramSearchTermParser;
pub use name::NameSearchTermParser;
pub use onlyfans::OnlyfansSearchTermParser;
pub use phone::PhoneNumberSearchTermParser;
pub use telegram::TelegramSearchTermParser;
pub use url::UrlSearchTermParser;

use crate::conversation::transfer::{SearchTermTransfer, SearchTermType};

/// Detects whether free text matches a known external identity format and
/// can normalize it.
pub trait SearchTermParser: Send + Sync {
    /// Whether this parser has anything to say about the term (by text when
    /// the type is still unknown, by type once it is resolved).
    fn supports(&self, term: &SearchTermTransfer) -> bool;

    /// Guess pass: either fully resolve the term (set `term_type` plus
    /// normalized/messenger fields) for unambiguous formats, or append
    /// candidate types.
    fn parse_with_guess_type(&self, term: &mut SearchTermTransfer);

    /// Known-type pass: the type is already decided; fill in the normalized
    /// form and messenger fields for this family.
    fn parse_with_known_type(&self, term: &mut SearchTermTransfer);
}

/// Ordered set of all parsers.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn SearchTermParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    /// Specific formats first; the generic URL parser runs after every
    /// service-specific URL format had its chance.
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Box::new(TelegramSearchTermParser),
                Box::new(InstagramSearchTermParser),
                Box::new(OnlyfansSearchTermParser),
                Box::new(PhoneNumberSearchTermParser),
                Box::new(EmailSearchTermParser),
                Box::new(UrlSearchTermParser),
                Box::new(NameSearchTermParser),
            ],
        }
    }

    /// Resolves a freshly entered term as far as possible without user
    /// input: a full resolve or a single remaining candidate sets the type
    /// (skipping disambiguation); zero candidates fall back to `unknown`;
    /// multiple candidates stay for the type-selection step.
    pub fn resolve(&self, term: &mut SearchTermTransfer) {
        for parser in &self.parsers {
            if term.term_type.is_some() {
                break;
            }
            parser.parse_with_guess_type(term);
        }

        if term.term_type.is_some() {
            term.types = None;
            return;
        }

        match term.candidate_types() {
            [] => {
                term.term_type = Some(SearchTermType::Unknown);
                term.types = None;
            }
            [single] => {
                term.term_type = Some(*single);
                term.types = None;
                self.parse_known(term);
            }
            _ => {}
        }
    }

    /// Normalizes a term whose type was just decided (by the guess pass or
    /// by an explicit user selection).
    pub fn parse_known(&self, term: &mut SearchTermTransfer) {
        for parser in &self.parsers {
            if parser.supports(term) {
                parser.parse_with_known_type(term);
            }
        }
    }
}
