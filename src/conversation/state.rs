//! Conversation state: a tagged union over conversation kinds, serialized
//! through a schema-versioned envelope.
//!
//! State must always be reconstructible from its serialized form without
//! external lookups; everything a step needs to resume lives here.

use serde::{Deserialize, Serialize};

use crate::core::error::{AppError, AppResult};
use crate::conversation::transfer::SearchTermTransfer;

/// Bumped whenever a state struct changes shape incompatibly. Decoding an
/// envelope with a different version yields `AppError::State`; the
/// dispatcher deactivates such conversations instead of guessing.
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Conversation kind tag, also persisted as the record's `kind` column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConversationKind {
    Search,
    Create,
}

/// Per-kind conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationState {
    Search(SearchState),
    Create(CreateState),
}

impl ConversationState {
    pub fn kind(&self) -> ConversationKind {
        match self {
            ConversationState::Search(_) => ConversationKind::Search,
            ConversationState::Create(_) => ConversationKind::Create,
        }
    }

    pub fn step(&self) -> Option<u32> {
        match self {
            ConversationState::Search(state) => state.step,
            ConversationState::Create(state) => state.step,
        }
    }
}

/// State of the search-feedback conversation.
///
/// `step = None` is both the pre-start and the freshly-reset marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<SearchTermTransfer>,
}

/// State of the create-feedback conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<SearchTermTransfer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// True when the term was handed over from a search; the rating step is
    /// then the first step and gets no back button.
    #[serde(default)]
    pub seeded: bool,
}

/// Feedback rating scale.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Rating {
    VeryBad,
    Bad,
    Neutral,
    Good,
    VeryGood,
}

impl Rating {
    /// Numeric value persisted with the feedback row.
    pub fn value(&self) -> i32 {
        match self {
            Rating::VeryBad => -2,
            Rating::Bad => -1,
            Rating::Neutral => 0,
            Rating::Good => 1,
            Rating::VeryGood => 2,
        }
    }

    pub fn trans_key(&self) -> String {
        format!("rating.{self}")
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u32,
    #[serde(flatten)]
    state: ConversationState,
}

/// Serializes a state into its persisted envelope form.
pub fn encode_state(state: &ConversationState) -> AppResult<String> {
    let envelope = Envelope {
        v: STATE_SCHEMA_VERSION,
        state: state.clone(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Deserializes a persisted envelope, rejecting foreign schema versions.
pub fn decode_state(raw: &str) -> AppResult<ConversationState> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    if envelope.v != STATE_SCHEMA_VERSION {
        return Err(AppError::State(format!(
            "unsupported state schema version {} (current {})",
            envelope.v, STATE_SCHEMA_VERSION
        )));
    }
    Ok(envelope.state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::transfer::SearchTermType;
    use pretty_assertions::assert_eq;

    #[test]
    fn state_round_trips_through_envelope() {
        let state = ConversationState::Search(SearchState {
            step: Some(30),
            search_term: Some(SearchTermTransfer::with_type(
                "john_doe",
                SearchTermType::TelegramUsername,
            )),
        });

        let raw = encode_state(&state).unwrap();
        assert!(raw.contains(r#""v":1"#));
        assert!(raw.contains(r#""kind":"search""#));

        let back = decode_state(&raw).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn foreign_schema_version_is_rejected() {
        let raw = r#"{"v":999,"kind":"search","step":10}"#;
        let err = decode_state(raw).unwrap_err();
        assert!(matches!(err, AppError::State(_)));
    }

    #[test]
    fn garbage_is_a_state_error_not_a_panic() {
        assert!(matches!(decode_state("not json"), Err(AppError::State(_))));
    }

    #[test]
    fn kind_matches_variant() {
        let search = ConversationState::Search(SearchState::default());
        let create = ConversationState::Create(CreateState::default());
        assert_eq!(search.kind(), ConversationKind::Search);
        assert_eq!(create.kind(), ConversationKind::Create);
        assert_eq!(search.step(), None);
    }

    #[test]
    fn rating_values_are_ordered() {
        assert!(Rating::VeryBad.value() < Rating::Bad.value());
        assert!(Rating::Good.value() < Rating::VeryGood.value());
        assert_eq!(Rating::Neutral.value(), 0);
    }
}
