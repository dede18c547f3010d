//! The search-feedback conversation.
//!
//! Step graph: term -> (type disambiguation) -> confirm -> results, with a
//! create-confirm branch when the search comes back empty. Term entry can
//! skip disambiguation entirely when the parsers fully resolve the input
//! or leave a single candidate.

use async_trait::async_trait;

use crate::conversation::machine::{
    canceled, match_common, CommonInput, ConversationStepMachine, MachineContext, Turn,
};
use crate::conversation::reply::Reply;
use crate::conversation::state::{ConversationKind, ConversationState, CreateState, SearchState};
use crate::conversation::transfer::{SearchTermTransfer, SearchTermType};
use crate::conversation::validator::validate_search_term;
use crate::core::error::{AppError, AppResult};
use crate::search::provider::SearchContext;
use crate::search::viewer;

pub const STEP_SEARCH_TERM_QUERIED: u32 = 10;
pub const STEP_SEARCH_TERM_TYPE_QUERIED: u32 = 20;
pub const STEP_CONFIRM_QUERIED: u32 = 30;
pub const STEP_CREATE_CONFIRM_QUERIED: u32 = 40;

pub struct SearchConversation;

impl SearchConversation {
    fn query_search_term(
        &self,
        ctx: &MachineContext,
        mut state: SearchState,
        mut replies: Vec<Reply>,
    ) -> Turn {
        state.step = Some(STEP_SEARCH_TERM_QUERIED);
        let r = &ctx.replies;

        let mut keyboard = Vec::new();
        if let Some(term) = &state.search_term {
            keyboard.push(vec![r.remove_button(&term.text)]);
            keyboard.push(vec![r.next_button()]);
        }
        keyboard.push(vec![r.help_button(), r.cancel_button()]);

        replies.push(r.query("query.search_term", keyboard));
        Turn::stay(replies, ConversationState::Search(state))
    }

    fn query_type(
        &self,
        ctx: &MachineContext,
        mut state: SearchState,
        mut replies: Vec<Reply>,
    ) -> Turn {
        state.step = Some(STEP_SEARCH_TERM_TYPE_QUERIED);
        let r = &ctx.replies;

        let mut keyboard: Vec<Vec<String>> = state
            .search_term
            .as_ref()
            .map(|term| {
                term.candidate_types()
                    .iter()
                    .map(|t| vec![r.type_button(*t)])
                    .collect()
            })
            .unwrap_or_default();
        keyboard.push(vec![r.type_button(SearchTermType::Unknown)]);
        if let Some(term) = &state.search_term {
            keyboard.push(vec![r.remove_button(&term.text)]);
        }
        keyboard.push(vec![r.help_button(), r.cancel_button()]);

        replies.push(r.query("query.search_term_type", keyboard));
        Turn::stay(replies, ConversationState::Search(state))
    }

    fn query_confirm(
        &self,
        ctx: &MachineContext,
        mut state: SearchState,
        mut replies: Vec<Reply>,
    ) -> Turn {
        state.step = Some(STEP_CONFIRM_QUERIED);
        let r = &ctx.replies;

        let text = match &state.search_term {
            Some(term) => {
                let type_label = term
                    .term_type
                    .map(|t| r.type_button(t))
                    .unwrap_or_default();
                format!("{}\n\n{} ({})", r.t("query.confirm"), term.text, type_label)
            }
            None => r.t("query.confirm"),
        };
        let keyboard = vec![
            vec![r.yes_button()],
            vec![r.prev_button()],
            vec![r.help_button(), r.cancel_button()],
        ];

        replies.push(Reply::with_keyboard(text, keyboard));
        Turn::stay(replies, ConversationState::Search(state))
    }

    fn query_create_confirm(
        &self,
        ctx: &MachineContext,
        mut state: SearchState,
        mut replies: Vec<Reply>,
    ) -> Turn {
        state.step = Some(STEP_CREATE_CONFIRM_QUERIED);
        let r = &ctx.replies;
        let keyboard = vec![
            vec![r.yes_button()],
            vec![r.no_button()],
            vec![r.help_button(), r.cancel_button()],
        ];
        replies.push(r.query("query.create_confirm", keyboard));
        Turn::stay(replies, ConversationState::Search(state))
    }

    /// Confirm directly when the type is resolved, disambiguate otherwise.
    fn route_after_term(
        &self,
        ctx: &MachineContext,
        state: SearchState,
        replies: Vec<Reply>,
    ) -> Turn {
        let resolved = state
            .search_term
            .as_ref()
            .is_some_and(|term| term.term_type.is_some());
        if resolved {
            self.query_confirm(ctx, state, replies)
        } else {
            self.query_type(ctx, state, replies)
        }
    }

    fn handle_search_term(
        &self,
        ctx: &MachineContext,
        mut state: SearchState,
        text: &str,
    ) -> Turn {
        let r = &ctx.replies;

        let remove_label = state
            .search_term
            .as_ref()
            .map(|term| r.remove_button(&term.text));
        if remove_label.as_deref() == Some(text) {
            state.search_term = None;
            return self.query_search_term(ctx, state, Vec::new());
        }
        if state.search_term.is_some() && text == r.next_button() {
            return self.route_after_term(ctx, state, Vec::new());
        }

        if let Err(key) = validate_search_term(text) {
            return self.query_search_term(ctx, state, vec![Reply::text(r.t(key))]);
        }

        let mut term = SearchTermTransfer::new(text);
        ctx.parsers.resolve(&mut term);
        state.search_term = Some(term);
        self.route_after_term(ctx, state, Vec::new())
    }

    fn handle_type(&self, ctx: &MachineContext, mut state: SearchState, text: &str) -> Turn {
        let r = &ctx.replies;
        let Some(term) = state.search_term.clone() else {
            return self.query_search_term(ctx, state, vec![r.wrong()]);
        };

        if text == r.remove_button(&term.text) {
            state.search_term = None;
            return self.query_search_term(ctx, state, Vec::new());
        }

        let mut offered: Vec<SearchTermType> = term.candidate_types().to_vec();
        offered.push(SearchTermType::Unknown);

        match offered.into_iter().find(|t| text == r.type_button(*t)) {
            Some(selected) => {
                let mut term = term;
                term.term_type = Some(selected);
                term.types = None;
                ctx.parsers.parse_known(&mut term);
                state.search_term = Some(term);
                self.query_confirm(ctx, state, Vec::new())
            }
            // Anything outside the offered set, including a recognizable
            // type that was not a candidate, is wrong input.
            None => self.query_type(ctx, state, vec![r.wrong()]),
        }
    }

    async fn handle_confirm(
        &self,
        ctx: &MachineContext,
        state: SearchState,
        text: &str,
    ) -> Turn {
        let r = &ctx.replies;
        let Some(term) = state.search_term.clone() else {
            return self.query_search_term(ctx, state, vec![r.wrong()]);
        };

        if text == r.prev_button() {
            return self.query_search_term(ctx, state, Vec::new());
        }
        if text != r.yes_button() {
            return self.query_confirm(ctx, state, vec![r.wrong()]);
        }

        let search_context = SearchContext {
            country_code: ctx.country_code.clone(),
        };
        let records = ctx.search.search_all(&term, &search_context).await;

        if records.is_empty() {
            return self.query_create_confirm(
                ctx,
                state,
                vec![Reply::text(r.t("reply.empty_list"))],
            );
        }

        let mut replies = vec![Reply::text(r.t("reply.title"))];
        for record in &records {
            replies.push(Reply::text(viewer::render(record, r.lang())));
        }
        replies.push(r.action_menu());
        Turn::terminate(replies)
    }

    fn handle_create_confirm(
        &self,
        ctx: &MachineContext,
        state: SearchState,
        text: &str,
    ) -> Turn {
        let r = &ctx.replies;
        let Some(term) = state.search_term.clone() else {
            return self.query_search_term(ctx, state, vec![r.wrong()]);
        };

        if text == r.yes_button() {
            return Turn::chain(
                Vec::new(),
                ConversationState::Create(CreateState {
                    step: None,
                    search_term: Some(term),
                    rating: None,
                    description: None,
                    seeded: true,
                }),
            );
        }
        if text == r.no_button() {
            return Turn::terminate(vec![r.action_menu()]);
        }
        self.query_create_confirm(ctx, state, vec![r.wrong()])
    }

    fn help_reply(&self, ctx: &MachineContext, step: u32) -> Reply {
        let (key, keyboard_step) = match step {
            STEP_SEARCH_TERM_QUERIED => ("search_term", false),
            STEP_SEARCH_TERM_TYPE_QUERIED => ("search_term_type", true),
            STEP_CONFIRM_QUERIED => ("confirm", true),
            _ => ("create_confirm", true),
        };
        ctx.replies.help(key, keyboard_step)
    }

    /// Re-renders the current step's prompt without advancing.
    fn rerender(&self, ctx: &MachineContext, state: SearchState, replies: Vec<Reply>) -> Turn {
        match state.step {
            Some(STEP_SEARCH_TERM_TYPE_QUERIED) => self.query_type(ctx, state, replies),
            Some(STEP_CONFIRM_QUERIED) => self.query_confirm(ctx, state, replies),
            Some(STEP_CREATE_CONFIRM_QUERIED) => self.query_create_confirm(ctx, state, replies),
            _ => self.query_search_term(ctx, state, replies),
        }
    }
}

#[async_trait]
impl ConversationStepMachine for SearchConversation {
    fn kind(&self) -> ConversationKind {
        ConversationKind::Search
    }

    fn new_state(&self) -> ConversationState {
        ConversationState::Search(SearchState::default())
    }

    async fn handle(
        &self,
        ctx: &MachineContext,
        state: ConversationState,
        input: Option<&str>,
    ) -> AppResult<Turn> {
        let state = match state {
            ConversationState::Search(state) => state,
            other => {
                return Err(AppError::State(format!(
                    "search machine got a {} state",
                    other.kind()
                )))
            }
        };

        let Some(step) = state.step else {
            return Ok(self.query_search_term(ctx, state, Vec::new()));
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
            STEP_SEARCH_TERM_TYPE_QUERIED => self.handle_type(ctx, state, text),
            STEP_CONFIRM_QUERIED => self.handle_confirm(ctx, state, text).await,
            STEP_CREATE_CONFIRM_QUERIED => self.handle_create_confirm(ctx, state, text),
            unknown => {
                log::warn!("search conversation at unknown step {unknown}, resetting");
                self.query_search_term(ctx, state, vec![ctx.replies.wrong()])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::machine::test_support::test_context;
    use crate::conversation::machine::Next;
    use pretty_assertions::assert_eq;

    fn started() -> ConversationState {
        ConversationState::Search(SearchState {
            step: Some(STEP_SEARCH_TERM_QUERIED),
            search_term: None,
        })
    }

    fn state_of(turn: &Turn) -> &SearchState {
        match &turn.next {
            Next::Continue(ConversationState::Search(state)) => state,
            other => panic!("expected a continuing search state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_prompts_for_the_search_term() {
        let (ctx, _guard) = test_context();
        let turn = SearchConversation
            .handle(&ctx, SearchConversation.new_state(), None)
            .await
            .unwrap();

        assert_eq!(state_of(&turn).step, Some(STEP_SEARCH_TERM_QUERIED));
        assert_eq!(turn.replies.len(), 1);
        assert_eq!(turn.replies[0].text, ctx.replies.t("query.search_term"));
        // No term yet: only help/cancel on the keyboard
        assert_eq!(turn.replies[0].keyboard.as_ref().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_term_re_renders_the_same_step() {
        let (ctx, _guard) = test_context();

        let turn = SearchConversation
            .handle(&ctx, started(), Some(""))
            .await
            .unwrap();
        assert_eq!(state_of(&turn).step, Some(STEP_SEARCH_TERM_QUERIED));
        assert_eq!(turn.replies[0].text, ctx.replies.t("text.not_blank"));

        let turn = SearchConversation
            .handle(&ctx, started(), Some("two\nlines"))
            .await
            .unwrap();
        assert_eq!(turn.replies[0].text, ctx.replies.t("text.single_line"));
        assert_eq!(state_of(&turn).step, Some(STEP_SEARCH_TERM_QUERIED));
    }

    #[tokio::test]
    async fn fully_resolved_term_skips_disambiguation() {
        let (ctx, _guard) = test_context();
        let turn = SearchConversation
            .handle(&ctx, started(), Some("https://t.me/john_doe"))
            .await
            .unwrap();

        let state = state_of(&turn);
        assert_eq!(state.step, Some(STEP_CONFIRM_QUERIED));
        let term = state.search_term.as_ref().unwrap();
        assert_eq!(term.term_type, Some(SearchTermType::TelegramUsername));
        assert!(turn.replies[0].text.contains(&ctx.replies.t("query.confirm")));
    }

    #[tokio::test]
    async fn ambiguous_term_goes_to_type_selection() {
        let (ctx, _guard) = test_context();
        let turn = SearchConversation
            .handle(&ctx, started(), Some("john_doe"))
            .await
            .unwrap();

        let state = state_of(&turn).clone();
        assert_eq!(state.step, Some(STEP_SEARCH_TERM_TYPE_QUERIED));
        assert!(state.search_term.as_ref().unwrap().candidate_types().len() > 1);

        // A selection outside the offered candidates is wrong input
        let turn = SearchConversation
            .handle(
                &ctx,
                ConversationState::Search(state),
                Some("definitely not a button"),
            )
            .await
            .unwrap();
        assert_eq!(turn.replies[0].text, ctx.replies.t("reply.wrong"));
        assert_eq!(state_of(&turn).step, Some(STEP_SEARCH_TERM_TYPE_QUERIED));
    }

    #[tokio::test]
    async fn type_selection_normalizes_and_confirms() {
        let (ctx, _guard) = test_context();
        let turn = SearchConversation
            .handle(&ctx, started(), Some("@John_Doe"))
            .await
            .unwrap();
        let state = state_of(&turn).clone();
        assert_eq!(state.step, Some(STEP_SEARCH_TERM_TYPE_QUERIED));

        let turn = SearchConversation
            .handle(
                &ctx,
                ConversationState::Search(state),
                Some(&ctx.replies.type_button(SearchTermType::TelegramUsername)),
            )
            .await
            .unwrap();

        let state = state_of(&turn);
        assert_eq!(state.step, Some(STEP_CONFIRM_QUERIED));
        let term = state.search_term.as_ref().unwrap();
        assert_eq!(term.normalized_text.as_deref(), Some("john_doe"));
    }

    #[tokio::test]
    async fn cancel_terminates_from_any_step() {
        let (ctx, _guard) = test_context();
        for step in [
            STEP_SEARCH_TERM_QUERIED,
            STEP_SEARCH_TERM_TYPE_QUERIED,
            STEP_CONFIRM_QUERIED,
            STEP_CREATE_CONFIRM_QUERIED,
        ] {
            let state = ConversationState::Search(SearchState {
                step: Some(step),
                search_term: Some(SearchTermTransfer::with_type(
                    "john",
                    SearchTermType::Unknown,
                )),
            });
            let turn = SearchConversation
                .handle(&ctx, state, Some(&ctx.replies.cancel_button()))
                .await
                .unwrap();

            assert!(matches!(turn.next, Next::Terminate { start_new: None }));
            assert_eq!(turn.replies[0].text, ctx.replies.t("reply.canceled"));
            assert_eq!(*turn.replies.last().unwrap(), ctx.replies.action_menu());
        }
    }

    #[tokio::test]
    async fn help_answers_and_keeps_the_step() {
        let (ctx, _guard) = test_context();
        let turn = SearchConversation
            .handle(&ctx, started(), Some(&ctx.replies.help_button()))
            .await
            .unwrap();

        assert_eq!(state_of(&turn).step, Some(STEP_SEARCH_TERM_QUERIED));
        assert!(turn.replies[0].text.contains(&ctx.replies.t("help.title")));
        assert_eq!(turn.replies[1].text, ctx.replies.t("query.search_term"));
    }

    #[tokio::test]
    async fn empty_search_offers_to_create_feedback() {
        let (ctx, _guard) = test_context();
        let state = ConversationState::Search(SearchState {
            step: Some(STEP_CONFIRM_QUERIED),
            search_term: Some(SearchTermTransfer::with_type(
                "nobody_here",
                SearchTermType::TelegramUsername,
            )),
        });

        let turn = SearchConversation
            .handle(&ctx, state, Some(&ctx.replies.yes_button()))
            .await
            .unwrap();

        assert_eq!(state_of(&turn).step, Some(STEP_CREATE_CONFIRM_QUERIED));
        assert_eq!(turn.replies[0].text, ctx.replies.t("reply.empty_list"));
        assert_eq!(turn.replies[1].text, ctx.replies.t("query.create_confirm"));
    }

    #[tokio::test]
    async fn create_confirm_yes_chains_into_a_seeded_create() {
        let (ctx, _guard) = test_context();
        let state = ConversationState::Search(SearchState {
            step: Some(STEP_CREATE_CONFIRM_QUERIED),
            search_term: Some(SearchTermTransfer::with_type(
                "john_doe",
                SearchTermType::TelegramUsername,
            )),
        });

        let turn = SearchConversation
            .handle(&ctx, state, Some(&ctx.replies.yes_button()))
            .await
            .unwrap();

        match turn.next {
            Next::Terminate {
                start_new: Some(ConversationState::Create(create)),
            } => {
                assert!(create.seeded);
                assert_eq!(create.search_term.unwrap().text, "john_doe");
            }
            other => panic!("expected a chained create conversation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_confirm_no_falls_back_to_the_action_menu() {
        let (ctx, _guard) = test_context();
        let state = ConversationState::Search(SearchState {
            step: Some(STEP_CREATE_CONFIRM_QUERIED),
            search_term: Some(SearchTermTransfer::with_type(
                "john_doe",
                SearchTermType::Unknown,
            )),
        });

        let turn = SearchConversation
            .handle(&ctx, state, Some(&ctx.replies.no_button()))
            .await
            .unwrap();

        assert!(matches!(turn.next, Next::Terminate { start_new: None }));
        assert_eq!(turn.replies[0], ctx.replies.action_menu());
    }

    #[tokio::test]
    async fn prev_from_confirm_returns_to_the_term_step_with_shortcuts() {
        let (ctx, _guard) = test_context();
        let state = ConversationState::Search(SearchState {
            step: Some(STEP_CONFIRM_QUERIED),
            search_term: Some(SearchTermTransfer::with_type(
                "john_doe",
                SearchTermType::TelegramUsername,
            )),
        });

        let turn = SearchConversation
            .handle(&ctx, state, Some(&ctx.replies.prev_button()))
            .await
            .unwrap();

        let state = state_of(&turn);
        assert_eq!(state.step, Some(STEP_SEARCH_TERM_QUERIED));
        // Existing term adds remove + next rows ahead of help/cancel
        let keyboard = turn.replies[0].keyboard.as_ref().unwrap();
        assert_eq!(keyboard.len(), 3);
        assert_eq!(keyboard[0][0], ctx.replies.remove_button("john_doe"));
        assert_eq!(keyboard[1][0], ctx.replies.next_button());
    }
}
