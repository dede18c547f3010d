//! Per-chat routing of inbound updates.
//!
//! Precedence per update: pre-conversation commands, then the active
//! conversation, then the remaining commands, then the fallback notice.
//! Updates for the same (user, chat, bot) tuple are serialized through an
//! in-process async lock; a stale-version write loses with a conflict and
//! the whole turn is retried once against the fresh state.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::conversation::create::CreateConversation;
use crate::conversation::machine::{ConversationStepMachine, MachineContext, Next, Turn};
use crate::conversation::reply::{Reply, ReplyBuilder};
use crate::conversation::search::SearchConversation;
use crate::conversation::state::{decode_state, encode_state, ConversationKind};
use crate::core::error::{AppError, AppResult};
use crate::i18n;
use crate::parsers::ParserRegistry;
use crate::search::SearchRegistry;
use crate::storage::conversation::{ConversationRecord, ConversationStore, ConversationTuple};
use crate::storage::db::DbPool;

/// One platform-agnostic inbound message.
#[derive(Debug, Clone)]
pub struct InboundUpdate {
    pub messenger_user_id: i64,
    pub chat_id: i64,
    pub bot_id: i64,
    pub text: Option<String>,
    pub language_code: Option<String>,
}

impl InboundUpdate {
    pub fn tuple(&self) -> ConversationTuple {
        ConversationTuple {
            messenger_user_id: self.messenger_user_id,
            chat_id: self.chat_id,
            bot_id: self.bot_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    Start,
    Create,
    Search,
    Restart,
}

/// A slash command, optionally aliased by an action-menu button.
#[derive(Debug, Clone)]
pub struct Command {
    pub trigger: &'static str,
    /// `keyboard.<key>` label that also triggers this command.
    pub menu_key: Option<&'static str>,
    /// Matched ahead of any active conversation (escape hatch).
    pub before_conversations: bool,
    pub action: CommandAction,
}

pub const START_COMMAND: &str = "/start";
pub const CREATE_COMMAND: &str = "/add";
pub const SEARCH_COMMAND: &str = "/find";
pub const RESTART_COMMAND: &str = "/restart";

pub fn commands() -> Vec<Command> {
    vec![
        Command {
            trigger: START_COMMAND,
            menu_key: None,
            before_conversations: false,
            action: CommandAction::Start,
        },
        Command {
            trigger: CREATE_COMMAND,
            menu_key: Some("create"),
            before_conversations: false,
            action: CommandAction::Create,
        },
        Command {
            trigger: SEARCH_COMMAND,
            menu_key: Some("search"),
            before_conversations: false,
            action: CommandAction::Search,
        },
        Command {
            trigger: RESTART_COMMAND,
            menu_key: Some("restart"),
            before_conversations: true,
            action: CommandAction::Restart,
        },
    ]
}

/// Routes updates into commands and conversations.
pub struct ChannelDispatcher {
    store: ConversationStore,
    machines: Vec<Arc<dyn ConversationStepMachine>>,
    commands: Vec<Command>,
    parsers: Arc<ParserRegistry>,
    search: Arc<SearchRegistry>,
    pool: Arc<DbPool>,
    country_code: Option<String>,
    locks: DashMap<ConversationTuple, Arc<Mutex<()>>>,
}

impl ChannelDispatcher {
    pub fn new(
        pool: Arc<DbPool>,
        parsers: Arc<ParserRegistry>,
        search: Arc<SearchRegistry>,
        country_code: Option<String>,
    ) -> Self {
        Self::with_machines(
            pool,
            parsers,
            search,
            country_code,
            vec![Arc::new(SearchConversation), Arc::new(CreateConversation)],
        )
    }

    fn with_machines(
        pool: Arc<DbPool>,
        parsers: Arc<ParserRegistry>,
        search: Arc<SearchRegistry>,
        country_code: Option<String>,
        machines: Vec<Arc<dyn ConversationStepMachine>>,
    ) -> Self {
        Self {
            store: ConversationStore::new(pool.clone()),
            machines,
            commands: commands(),
            parsers,
            search,
            pool,
            country_code,
            locks: DashMap::new(),
        }
    }

    /// Processes one update and returns the replies to send, serialized per
    /// conversation tuple.
    pub async fn dispatch(&self, update: &InboundUpdate) -> AppResult<Vec<Reply>> {
        let lock = self
            .locks
            .entry(update.tuple())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        match self.dispatch_locked(update).await {
            Err(AppError::Conflict(id)) => {
                log::warn!("conversation {id} hit a version conflict, retrying the turn");
                self.dispatch_locked(update).await
            }
            other => other,
        }
    }

    async fn dispatch_locked(&self, update: &InboundUpdate) -> AppResult<Vec<Reply>> {
        let ctx = self.context(update);
        let text = update.text.as_deref().unwrap_or("").trim();

        if let Some(command) = self.match_command(&ctx.replies, text, true) {
            return self.execute(command.action, &ctx).await;
        }

        if let Some(record) = self.store.find_active(&ctx.tuple)? {
            match decode_state(&record.state) {
                Ok(state) => {
                    let machine = self.machine(record.kind)?;
                    let turn = machine.handle(&ctx, state, Some(text)).await?;
                    return self.apply(&ctx, Some(&record), turn).await;
                }
                Err(e) => {
                    // Undecodable state (schema bump, corrupt row): drop the
                    // conversation and treat the update as conversation-free.
                    log::warn!(
                        "conversation {} has undecodable state ({e}), deactivating",
                        record.id
                    );
                    self.store.stop(record.id)?;
                }
            }
        }

        if let Some(command) = self.match_command(&ctx.replies, text, false) {
            return self.execute(command.action, &ctx).await;
        }

        Ok(vec![ctx.replies.wrong(), ctx.replies.action_menu()])
    }

    fn context(&self, update: &InboundUpdate) -> MachineContext {
        MachineContext {
            replies: ReplyBuilder::new(i18n::lang_from_update(update.language_code.as_deref())),
            parsers: self.parsers.clone(),
            search: self.search.clone(),
            pool: self.pool.clone(),
            tuple: update.tuple(),
            country_code: self.country_code.clone(),
        }
    }

    fn machine(&self, kind: ConversationKind) -> AppResult<Arc<dyn ConversationStepMachine>> {
        self.machines
            .iter()
            .find(|machine| machine.kind() == kind)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("no machine for {kind} conversations")))
    }

    fn match_command(
        &self,
        replies: &ReplyBuilder,
        text: &str,
        before_conversations: bool,
    ) -> Option<&Command> {
        self.commands
            .iter()
            .filter(|command| command.before_conversations == before_conversations)
            .find(|command| {
                text == command.trigger
                    || command
                        .menu_key
                        .is_some_and(|key| text == replies.command_button(key))
            })
    }

    async fn execute(&self, action: CommandAction, ctx: &MachineContext) -> AppResult<Vec<Reply>> {
        match action {
            CommandAction::Start => Ok(vec![ctx.replies.action_menu()]),
            CommandAction::Create => self.start_conversation(ConversationKind::Create, ctx).await,
            CommandAction::Search => self.start_conversation(ConversationKind::Search, ctx).await,
            CommandAction::Restart => {
                let stopped = self.store.stop_all(&ctx.tuple)?;
                log::debug!(
                    "restart stopped {stopped} conversation(s) for chat {}",
                    ctx.tuple.chat_id
                );
                Ok(vec![
                    Reply::text(ctx.replies.t("reply.restart_ok")),
                    ctx.replies.action_menu(),
                ])
            }
        }
    }

    async fn start_conversation(
        &self,
        kind: ConversationKind,
        ctx: &MachineContext,
    ) -> AppResult<Vec<Reply>> {
        let machine = self.machine(kind)?;
        let turn = machine.handle(ctx, machine.new_state(), None).await?;
        self.apply(ctx, None, turn).await
    }

    /// Persists a turn's outcome and collects its replies. A chained
    /// conversation gets its first prompt rendered in the same pass.
    async fn apply(
        &self,
        ctx: &MachineContext,
        existing: Option<&ConversationRecord>,
        turn: Turn,
    ) -> AppResult<Vec<Reply>> {
        let mut replies = turn.replies;

        match turn.next {
            Next::Continue(state) => {
                let raw = encode_state(&state)?;
                match existing {
                    Some(record) => {
                        self.store.save(record.id, &raw, record.version)?;
                    }
                    None => {
                        self.store.start(state.kind(), &raw, &ctx.tuple)?;
                    }
                }
            }
            Next::Terminate { start_new } => {
                if let Some(record) = existing {
                    self.store.stop(record.id)?;
                }
                if let Some(new_state) = start_new {
                    let machine = self.machine(new_state.kind())?;
                    let first = machine.handle(ctx, new_state, None).await?;
                    // A first prompt always continues
                    if let Next::Continue(state) = first.next {
                        let raw = encode_state(&state)?;
                        self.store.start(state.kind(), &raw, &ctx.tuple)?;
                    }
                    replies.extend(first.replies);
                }
            }
        }

        Ok(replies)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::conversation::search;
    use crate::conversation::state::{ConversationState, SearchState};
    use crate::conversation::transfer::{SearchTermTransfer, SearchTermType};
    use crate::i18n::lang_from_code;
    use crate::storage::db::test_support::temp_pool;
    use pretty_assertions::assert_eq;

    fn dispatcher() -> (ChannelDispatcher, Arc<DbPool>, tempfile::NamedTempFile) {
        let (pool, guard) = temp_pool();
        let dispatcher = ChannelDispatcher::new(
            pool.clone(),
            Arc::new(ParserRegistry::new()),
            Arc::new(SearchRegistry::empty()),
            None,
        );
        (dispatcher, pool, guard)
    }

    fn update(text: &str) -> InboundUpdate {
        InboundUpdate {
            messenger_user_id: 1,
            chat_id: 100,
            bot_id: 7,
            text: Some(text.to_string()),
            language_code: Some("en".to_string()),
        }
    }

    fn replies() -> ReplyBuilder {
        ReplyBuilder::new(lang_from_code("en"))
    }

    #[tokio::test]
    async fn search_command_starts_a_conversation() {
        let (dispatcher, pool, _guard) = dispatcher();
        let out = dispatcher.dispatch(&update(SEARCH_COMMAND)).await.unwrap();

        assert_eq!(out[0].text, replies().t("query.search_term"));

        let store = ConversationStore::new(pool);
        let active = store.find_active(&update("").tuple()).unwrap().unwrap();
        assert_eq!(active.kind, ConversationKind::Search);
    }

    #[tokio::test]
    async fn menu_button_label_triggers_the_command() {
        let (dispatcher, pool, _guard) = dispatcher();
        let label = replies().command_button("create");
        let out = dispatcher.dispatch(&update(&label)).await.unwrap();

        assert_eq!(out[0].text, replies().t("query.search_term"));
        let store = ConversationStore::new(pool);
        let active = store.find_active(&update("").tuple()).unwrap().unwrap();
        assert_eq!(active.kind, ConversationKind::Create);
    }

    #[tokio::test]
    async fn text_is_routed_into_the_active_conversation() {
        let (dispatcher, pool, _guard) = dispatcher();
        dispatcher.dispatch(&update(SEARCH_COMMAND)).await.unwrap();

        let out = dispatcher
            .dispatch(&update("https://t.me/john_doe"))
            .await
            .unwrap();
        assert!(out[0].text.contains(&replies().t("query.confirm")));

        let store = ConversationStore::new(pool);
        let active = store.find_active(&update("").tuple()).unwrap().unwrap();
        let state = decode_state(&active.state).unwrap();
        assert_eq!(state.step(), Some(search::STEP_CONFIRM_QUERIED));
        // One turn was persisted on top of the start
        assert_eq!(active.version, 1);
    }

    #[tokio::test]
    async fn restart_cuts_through_an_active_conversation() {
        let (dispatcher, pool, _guard) = dispatcher();
        dispatcher.dispatch(&update(SEARCH_COMMAND)).await.unwrap();

        let out = dispatcher.dispatch(&update(RESTART_COMMAND)).await.unwrap();
        assert_eq!(out[0].text, replies().t("reply.restart_ok"));

        let store = ConversationStore::new(pool);
        assert_eq!(store.active_count(&update("").tuple()).unwrap(), 0);
    }

    #[tokio::test]
    async fn unmatched_text_gets_the_fallback_menu() {
        let (dispatcher, _pool, _guard) = dispatcher();
        let out = dispatcher.dispatch(&update("hello there")).await.unwrap();

        assert_eq!(out[0].text, replies().t("reply.wrong"));
        assert_eq!(out[1], replies().action_menu());
    }

    #[tokio::test]
    async fn start_command_shows_the_action_menu() {
        let (dispatcher, _pool, _guard) = dispatcher();
        let out = dispatcher.dispatch(&update(START_COMMAND)).await.unwrap();
        assert_eq!(out, vec![replies().action_menu()]);
    }

    #[tokio::test]
    async fn undecodable_state_is_dropped_and_the_update_falls_through() {
        let (dispatcher, pool, _guard) = dispatcher();
        let store = ConversationStore::new(pool);
        store
            .start(
                ConversationKind::Search,
                r#"{"v":999,"kind":"search"}"#,
                &update("").tuple(),
            )
            .unwrap();

        let out = dispatcher.dispatch(&update("hello")).await.unwrap();
        assert_eq!(out[0].text, replies().t("reply.wrong"));
        assert_eq!(store.active_count(&update("").tuple()).unwrap(), 0);
    }

    #[tokio::test]
    async fn starting_a_second_conversation_supersedes_the_first() {
        let (dispatcher, pool, _guard) = dispatcher();
        dispatcher.dispatch(&update(SEARCH_COMMAND)).await.unwrap();

        // An active conversation swallows plain text, but the restart escape
        // hatch plus a fresh command replaces it; here we assert the store
        // invariant instead via a direct second start.
        let store = ConversationStore::new(pool);
        store
            .start(ConversationKind::Create, "{}", &update("").tuple())
            .unwrap();
        assert_eq!(store.active_count(&update("").tuple()).unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_search_chains_into_a_seeded_create() {
        let (dispatcher, pool, _guard) = dispatcher();
        let store = ConversationStore::new(pool);

        let state = ConversationState::Search(SearchState {
            step: Some(search::STEP_CREATE_CONFIRM_QUERIED),
            search_term: Some(SearchTermTransfer::with_type(
                "john_doe",
                SearchTermType::TelegramUsername,
            )),
        });
        store
            .start(
                ConversationKind::Search,
                &encode_state(&state).unwrap(),
                &update("").tuple(),
            )
            .unwrap();

        let yes = replies().yes_button();
        let out = dispatcher.dispatch(&update(&yes)).await.unwrap();

        // The chained create conversation opens on the rating step
        assert_eq!(out[0].text, replies().t("query.rating"));
        let active = store.find_active(&update("").tuple()).unwrap().unwrap();
        assert_eq!(active.kind, ConversationKind::Create);
        let chained = decode_state(&active.state).unwrap();
        assert_eq!(
            chained.step(),
            Some(crate::conversation::create::STEP_RATING_QUERIED)
        );
    }

    /// Plays another writer: bumps the stored version mid-turn so the
    /// dispatcher's own save loses the optimistic check.
    struct RacingMachine {
        bumps_left: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ConversationStepMachine for RacingMachine {
        fn kind(&self) -> ConversationKind {
            ConversationKind::Search
        }

        fn new_state(&self) -> ConversationState {
            ConversationState::Search(SearchState {
                step: None,
                search_term: None,
            })
        }

        async fn handle(
            &self,
            ctx: &MachineContext,
            state: ConversationState,
            _input: Option<&str>,
        ) -> AppResult<Turn> {
            if self.bumps_left.load(Ordering::SeqCst) > 0 {
                self.bumps_left.fetch_sub(1, Ordering::SeqCst);
                let store = ConversationStore::new(ctx.pool.clone());
                if let Some(record) = store.find_active(&ctx.tuple)? {
                    store.save(record.id, &record.state, record.version)?;
                }
            }
            Ok(Turn::stay(vec![Reply::text("ok".to_string())], state))
        }
    }

    fn racing_dispatcher(
        bumps: usize,
    ) -> (ChannelDispatcher, Arc<DbPool>, tempfile::NamedTempFile) {
        let (pool, guard) = temp_pool();
        let dispatcher = ChannelDispatcher::with_machines(
            pool.clone(),
            Arc::new(ParserRegistry::new()),
            Arc::new(SearchRegistry::empty()),
            None,
            vec![Arc::new(RacingMachine {
                bumps_left: AtomicUsize::new(bumps),
            })],
        );
        (dispatcher, pool, guard)
    }

    fn start_racing_conversation(pool: Arc<DbPool>) -> ConversationStore {
        let store = ConversationStore::new(pool);
        let state = ConversationState::Search(SearchState {
            step: Some(search::STEP_SEARCH_TERM_QUERIED),
            search_term: None,
        });
        store
            .start(
                ConversationKind::Search,
                &encode_state(&state).unwrap(),
                &update("").tuple(),
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn conflicting_save_retries_the_turn_against_fresh_state() {
        let (dispatcher, pool, _guard) = racing_dispatcher(1);
        let store = start_racing_conversation(pool);

        let out = dispatcher.dispatch(&update("hello")).await.unwrap();
        assert_eq!(out[0].text, "ok");

        // The racing write took the version to 1; the retried turn reloaded
        // and saved on top of it
        let active = store.find_active(&update("").tuple()).unwrap().unwrap();
        assert_eq!(active.version, 2);
    }

    #[tokio::test]
    async fn a_second_conflict_fails_the_turn_cleanly() {
        let (dispatcher, pool, _guard) = racing_dispatcher(2);
        let store = start_racing_conversation(pool);

        let err = dispatcher.dispatch(&update("hello")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The conversation survives for the next update
        assert_eq!(store.active_count(&update("").tuple()).unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_updates_leave_one_active_conversation() {
        let (dispatcher, pool, _guard) = dispatcher();
        let dispatcher = Arc::new(dispatcher);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let dispatcher = dispatcher.clone();
            tasks.push(tokio::spawn(async move {
                dispatcher.dispatch(&update(SEARCH_COMMAND)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let store = ConversationStore::new(pool);
        assert_eq!(store.active_count(&update("").tuple()).unwrap(), 1);
    }
}
