//! The create-feedback conversation.
//!
//! Step graph: term -> rating -> description (skippable) -> confirm ->
//! stored feedback. When the state arrives seeded with a term from a
//! search, the term step is skipped and rating becomes the first step.

use async_trait::async_trait;
use strum::IntoEnumIterator;

use crate::conversation::machine::{
    canceled, match_common, CommonInput, ConversationStepMachine, MachineContext, Turn,
};
use crate::conversation::reply::Reply;
use crate::conversation::state::{ConversationKind, ConversationState, CreateState, Rating};
use crate::conversation::transfer::{SearchTermTransfer, SearchTermType};
use crate::conversation::validator::{validate_description, validate_search_term};
use crate::core::error::{AppError, AppResult};
use crate::storage::db::get_connection;
use crate::storage::feedback::{insert_feedback, NewFeedback};

pub const STEP_SEARCH_TERM_QUERIED: u32 = 10;
pub const STEP_RATING_QUERIED: u32 = 20;
pub const STEP_DESCRIPTION_QUERIED: u32 = 30;
pub const STEP_CONFIRM_QUERIED: u32 = 40;

pub struct CreateConversation;

impl CreateConversation {
    fn query_search_term(
        &self,
        ctx: &MachineContext,
        mut state: CreateState,
        mut replies: Vec<Reply>,
    ) -> Turn {
        state.step = Some(STEP_SEARCH_TERM_QUERIED);
        let r = &ctx.replies;
        replies.push(r.query(
            "query.search_term",
            vec![vec![r.help_button(), r.cancel_button()]],
        ));
        Turn::stay(replies, ConversationState::Create(state))
    }

    fn query_rating(
        &self,
        ctx: &MachineContext,
        mut state: CreateState,
        mut replies: Vec<Reply>,
    ) -> Turn {
        state.step = Some(STEP_RATING_QUERIED);
        let r = &ctx.replies;

        let mut keyboard: Vec<Vec<String>> =
            Rating::iter().map(|rating| vec![r.rating_button(rating)]).collect();
        if !state.seeded {
            keyboard.push(vec![r.prev_button()]);
        }
        keyboard.push(vec![r.help_button(), r.cancel_button()]);

        replies.push(r.query("query.rating", keyboard));
        Turn::stay(replies, ConversationState::Create(state))
    }

    fn query_description(
        &self,
        ctx: &MachineContext,
        mut state: CreateState,
        mut replies: Vec<Reply>,
    ) -> Turn {
        state.step = Some(STEP_DESCRIPTION_QUERIED);
        let r = &ctx.replies;
        let keyboard = vec![
            vec![r.next_button()],
            vec![r.prev_button()],
            vec![r.help_button(), r.cancel_button()],
        ];
        replies.push(r.query("query.description", keyboard));
        Turn::stay(replies, ConversationState::Create(state))
    }

    fn query_confirm(
        &self,
        ctx: &MachineContext,
        mut state: CreateState,
        mut replies: Vec<Reply>,
    ) -> Turn {
        state.step = Some(STEP_CONFIRM_QUERIED);
        let r = &ctx.replies;

        let mut lines = vec![r.t("query.save_confirm")];
        if let Some(term) = &state.search_term {
            lines.push(String::new());
            lines.push(term.text.clone());
        }
        if let Some(rating) = state.rating {
            lines.push(r.rating_button(rating));
        }
        if let Some(description) = &state.description {
            lines.push(description.clone());
        }

        let keyboard = vec![
            vec![r.yes_button()],
            vec![r.prev_button()],
            vec![r.help_button(), r.cancel_button()],
        ];
        replies.push(Reply::with_keyboard(lines.join("\n"), keyboard));
        Turn::stay(replies, ConversationState::Create(state))
    }

    fn handle_search_term(
        &self,
        ctx: &MachineContext,
        mut state: CreateState,
        text: &str,
    ) -> Turn {
        let r = &ctx.replies;
        if let Err(key) = validate_search_term(text) {
            return self.query_search_term(ctx, state, vec![Reply::text(r.t(key))]);
        }

        let mut term = SearchTermTransfer::new(text);
        ctx.parsers.resolve(&mut term);
        // No disambiguation step here; an ambiguous term is stored untyped
        if term.term_type.is_none() {
            term.term_type = Some(SearchTermType::Unknown);
            term.types = None;
        }
        state.search_term = Some(term);
        self.query_rating(ctx, state, Vec::new())
    }

    fn handle_rating(&self, ctx: &MachineContext, mut state: CreateState, text: &str) -> Turn {
        let r = &ctx.replies;

        if !state.seeded && text == r.prev_button() {
            return self.query_search_term(ctx, state, Vec::new());
        }

        match Rating::iter().find(|rating| text == r.rating_button(*rating)) {
            Some(rating) => {
                state.rating = Some(rating);
                self.query_description(ctx, state, Vec::new())
            }
            None => self.query_rating(ctx, state, vec![r.wrong()]),
        }
    }

    fn handle_description(
        &self,
        ctx: &MachineContext,
        mut state: CreateState,
        text: &str,
    ) -> Turn {
        let r = &ctx.replies;

        if text == r.prev_button() {
            return self.query_rating(ctx, state, Vec::new());
        }
        if text == r.next_button() {
            state.description = None;
            return self.query_confirm(ctx, state, Vec::new());
        }

        if let Err(key) = validate_description(text) {
            return self.query_description(ctx, state, vec![Reply::text(r.t(key))]);
        }
        state.description = Some(text.to_string());
        self.query_confirm(ctx, state, Vec::new())
    }

    fn handle_confirm(&self, ctx: &MachineContext, state: CreateState, text: &str) -> AppResult<Turn> {
        let r = &ctx.replies;

        if text == r.prev_button() {
            return Ok(self.query_description(ctx, state, Vec::new()));
        }
        if text != r.yes_button() {
            return Ok(self.query_confirm(ctx, state, vec![r.wrong()]));
        }

        let (Some(term), Some(rating)) = (state.search_term.clone(), state.rating) else {
            // A confirm step without a term or rating means corrupted state
            return Err(AppError::State(
                "create confirm reached without a term or rating".to_string(),
            ));
        };

        let conn = get_connection(&ctx.pool)?;
        insert_feedback(
            &conn,
            &NewFeedback {
                messenger_user_id: ctx.tuple.messenger_user_id,
                chat_id: ctx.tuple.chat_id,
                bot_id: ctx.tuple.bot_id,
                search_term_text: term.text.clone(),
                search_term_normalized: term.normalized().to_string(),
                search_term_type: term.term_type.unwrap_or(SearchTermType::Unknown),
                rating: rating.value(),
                description: state.description.clone(),
            },
        )?;

        Ok(Turn::terminate(vec![
            Reply::text(r.t("reply.created")),
            r.action_menu(),
        ]))
    }

    fn help_reply(&self, ctx: &MachineContext, step: u32) -> Reply {
        let (key, keyboard_step) = match step {
            STEP_SEARCH_TERM_QUERIED => ("search_term", false),
            STEP_RATING_QUERIED => ("rating", true),
            STEP_DESCRIPTION_QUERIED => ("description", false),
            _ => ("save_confirm", true),
        };
        ctx.replies.help(key, keyboard_step)
    }

    fn rerender(&self, ctx: &MachineContext, state: CreateState, replies: Vec<Reply>) -> Turn {
        match state.step {
            Some(STEP_RATING_QUERIED) => self.query_rating(ctx, state, replies),
            Some(STEP_DESCRIPTION_QUERIED) => self.query_description(ctx, state, replies),
            Some(STEP_CONFIRM_QUERIED) => self.query_confirm(ctx, state, replies),
            _ => self.query_search_term(ctx, state, replies),
        }
    }
}

#[async_trait]
impl ConversationStepMachine for CreateConversation {
    fn kind(&self) -> ConversationKind {
        ConversationKind::Create
    }

    fn new_state(&self) -> ConversationState {
        ConversationState::Create(CreateState::default())
    }

    async fn handle(
        &self,
        ctx: &MachineContext,
        state: ConversationState,
        input: Option<&str>,
    ) -> AppResult<Turn> {
        let state = match state {
            ConversationState::Create(state) => state,
            other => {
                return Err(AppError::State(format!(
                    "create machine got a {} state",
                    other.kind()
                )))
            }
        };

        let Some(step) = state.step else {
            // Seeded states skip the term step entirely
            return Ok(if state.search_term.is_some() {
                self.query_rating(ctx, state, Vec::new())
            } else {
                self.query_search_term(ctx, state, Vec::new())
            });
        };

        let text = input.unwrap_or("");
        match match_common(&ctx.replies, text) {
            Some(CommonInput::Help) => {
                let help = self.help_reply(ctx, step);
                return Ok(self.rerender(ctx, state, vec![help]));
            }
            Some(CommonInput::Cancel) => return Ok(canceled(&ctx.replies)),
            None => {}
        }

        Ok(match step {
            STEP_SEARCH_TERM_QUERIED => self.handle_search_term(ctx, state, text),
            STEP_RATING_QUERIED => self.handle_rating(ctx, state, text),
            STEP_DESCRIPTION_QUERIED => self.handle_description(ctx, state, text),
            STEP_CONFIRM_QUERIED => self.handle_confirm(ctx, state, text)?,
            unknown => {
                log::warn!("create conversation at unknown step {unknown}, resetting");
                self.query_search_term(ctx, state, vec![ctx.replies.wrong()])
            }
        })
    }
}
