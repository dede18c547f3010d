//! Step machine contract.
//!
//! One machine per conversation kind. A machine is a pure-ish turn
//! function: given the decoded state and one user input, it returns the
//! replies to send and what happens to the conversation next. Persistence
//! is the dispatcher's job; machines never touch the conversations table.

use std::sync::Arc;

use async_trait::async_trait;

use crate::conversation::reply::{Reply, ReplyBuilder};
use crate::conversation::state::{ConversationKind, ConversationState};
use crate::core::error::AppResult;
use crate::parsers::ParserRegistry;
use crate::search::SearchRegistry;
use crate::storage::conversation::ConversationTuple;
use crate::storage::db::DbPool;

/// What the dispatcher should do with the conversation after a turn.
#[derive(Debug)]
pub enum Next {
    /// Persist the updated state; the conversation stays active.
    Continue(ConversationState),
    /// Deactivate the conversation; optionally chain straight into a new
    /// one (e.g. search handing its term over to create).
    Terminate {
        start_new: Option<ConversationState>,
    },
}

/// Result of one processed input.
#[derive(Debug)]
pub struct Turn {
    pub replies: Vec<Reply>,
    pub next: Next,
}

impl Turn {
    pub fn stay(replies: Vec<Reply>, state: ConversationState) -> Self {
        Self {
            replies,
            next: Next::Continue(state),
        }
    }

    pub fn terminate(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            next: Next::Terminate { start_new: None },
        }
    }

    pub fn chain(replies: Vec<Reply>, start_new: ConversationState) -> Self {
        Self {
            replies,
            next: Next::Terminate {
                start_new: Some(start_new),
            },
        }
    }
}

/// Everything a machine may need during one turn.
pub struct MachineContext {
    pub replies: ReplyBuilder,
    pub parsers: Arc<ParserRegistry>,
    pub search: Arc<SearchRegistry>,
    pub pool: Arc<DbPool>,
    pub tuple: ConversationTuple,
    pub country_code: Option<String>,
}

/// A conversation kind's turn handler.
#[async_trait]
pub trait ConversationStepMachine: Send + Sync {
    fn kind(&self) -> ConversationKind;

    /// Fresh pre-start state (`step = None`).
    fn new_state(&self) -> ConversationState;

    /// Processes one input. `input = None` means "render the first prompt"
    /// right after the conversation started.
    async fn handle(
        &self,
        ctx: &MachineContext,
        state: ConversationState,
        input: Option<&str>,
    ) -> AppResult<Turn>;
}

/// Inputs every step handles identically, checked before step dispatch.
pub(crate) enum CommonInput {
    Help,
    Cancel,
}

pub(crate) fn match_common(replies: &ReplyBuilder, input: &str) -> Option<CommonInput> {
    if input == replies.help_button() {
        Some(CommonInput::Help)
    } else if input == replies.cancel_button() {
        Some(CommonInput::Cancel)
    } else {
        None
    }
}

/// The shared cancel outcome: acknowledge and fall back to the action menu.
pub(crate) fn canceled(replies: &ReplyBuilder) -> Turn {
    Turn::terminate(vec![
        Reply::text(replies.t("reply.canceled")),
        replies.action_menu(),
    ])
}
