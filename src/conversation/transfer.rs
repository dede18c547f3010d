//! Search term value objects carried through conversation state

use serde::{Deserialize, Serialize};

/// External identity format a search term can resolve to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SearchTermType {
    Unknown,
    TelegramUsername,
    InstagramUsername,
    OnlyfansUsername,
    PhoneNumber,
    Email,
    Url,
    PersonName,
    OrganizationName,
}

impl SearchTermType {
    /// Translation key for the type's human-readable label
    pub fn trans_key(&self) -> String {
        format!("search_term_type.{self}")
    }
}

/// Messenger / service a fully resolved term belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Messenger {
    Telegram,
    Instagram,
    Onlyfans,
}

/// A search term in progress.
///
/// `text` is the raw user input and is immutable once set. `term_type` is
/// set only after disambiguation; `types` holds the ordered candidate set
/// only while the term is ambiguous — once `term_type` is set, `types` is
/// irrelevant for flow control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTermTransfer {
    pub text: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub term_type: Option<SearchTermType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<SearchTermType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messenger: Option<Messenger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messenger_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messenger_profile_url: Option<String>,
}

impl SearchTermTransfer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            term_type: None,
            types: None,
            normalized_text: None,
            messenger: None,
            messenger_username: None,
            messenger_profile_url: None,
        }
    }

    pub fn with_type(text: impl Into<String>, term_type: SearchTermType) -> Self {
        let mut term = Self::new(text);
        term.term_type = Some(term_type);
        term
    }

    /// The text to search with: normalized form when available, raw otherwise.
    pub fn normalized(&self) -> &str {
        self.normalized_text.as_deref().unwrap_or(&self.text)
    }

    /// Appends a candidate type, keeping the candidate set ordered and unique.
    pub fn add_type(&mut self, term_type: SearchTermType) {
        let types = self.types.get_or_insert_with(Vec::new);
        if !types.contains(&term_type) {
            types.push(term_type);
        }
    }

    /// Candidate types collected while the term is ambiguous.
    pub fn candidate_types(&self) -> &[SearchTermType] {
        self.types.as_deref().unwrap_or(&[])
    }
}
