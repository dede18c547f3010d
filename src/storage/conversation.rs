//! Conversation store: lookup/persist/invalidate of the single active
//! conversation per (messenger user, chat, bot) tuple.
//!
//! `start` deactivates any prior active record and inserts the new one in
//! one transaction, so an update can never observe two simultaneously
//! active conversations for the same tuple. `save` carries an optimistic
//! version check; a losing writer gets `AppError::Conflict`.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::conversation::state::ConversationKind;
use crate::core::error::{AppError, AppResult};
use crate::storage::db::{get_connection, DbPool};

/// The unit of mutual exclusion for conversation processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationTuple {
    pub messenger_user_id: i64,
    pub chat_id: i64,
    pub bot_id: i64,
}

/// Persisted conversation row. Only active rows are ever loaded, so the
/// `active` column stays in the table (history) but not in the struct.
#[derive(Debug, Clone)]
pub struct ConversationRecord {
    pub id: i64,
    pub tuple: ConversationTuple,
    pub kind: ConversationKind,
    pub state: String,
    pub version: i64,
}

impl ConversationRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<(Self, String)> {
        let kind_raw: String = row.get(4)?;
        Ok((
            Self {
                id: row.get(0)?,
                tuple: ConversationTuple {
                    messenger_user_id: row.get(1)?,
                    chat_id: row.get(2)?,
                    bot_id: row.get(3)?,
                },
                // placeholder, fixed up by the caller after kind parsing
                kind: ConversationKind::Search,
                state: row.get(5)?,
                version: row.get(6)?,
            },
            kind_raw,
        ))
    }
}

const SELECT_COLUMNS: &str = "id, messenger_user_id, chat_id, bot_id, kind, state, version";

/// CRUD over conversation records, keyed by the conversation tuple.
#[derive(Clone)]
pub struct ConversationStore {
    pool: Arc<DbPool>,
}

impl ConversationStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// The single active conversation for the tuple, if any.
    pub fn find_active(&self, tuple: &ConversationTuple) -> AppResult<Option<ConversationRecord>> {
        let conn = get_connection(&self.pool)?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM conversations
                     WHERE messenger_user_id = ?1 AND chat_id = ?2 AND bot_id = ?3 AND active = 1"
                ),
                params![tuple.messenger_user_id, tuple.chat_id, tuple.bot_id],
                ConversationRecord::from_row,
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((mut record, kind_raw)) => {
                record.kind = ConversationKind::from_str(&kind_raw)
                    .map_err(|_| AppError::State(format!("unknown conversation kind `{kind_raw}`")))?;
                Ok(Some(record))
            }
        }
    }

    /// Starts a new conversation, superseding any active one for the tuple.
    pub fn start(
        &self,
        kind: ConversationKind,
        state: &str,
        tuple: &ConversationTuple,
    ) -> AppResult<ConversationRecord> {
        let mut conn = get_connection(&self.pool)?;
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE conversations SET active = 0, updated_at = ?4
             WHERE messenger_user_id = ?1 AND chat_id = ?2 AND bot_id = ?3 AND active = 1",
            params![tuple.messenger_user_id, tuple.chat_id, tuple.bot_id, now],
        )?;
        tx.execute(
            "INSERT INTO conversations
                 (messenger_user_id, chat_id, bot_id, kind, state, active, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, 0, ?6, ?6)",
            params![
                tuple.messenger_user_id,
                tuple.chat_id,
                tuple.bot_id,
                kind.to_string(),
                state,
                now
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        log::debug!("started {} conversation {} for chat {}", kind, id, tuple.chat_id);

        Ok(ConversationRecord {
            id,
            tuple: *tuple,
            kind,
            state: state.to_string(),
            version: 0,
        })
    }

    /// Re-serializes state into an existing record, guarded by the record's
    /// version. Returns the new version on success.
    pub fn save(&self, id: i64, state: &str, expected_version: i64) -> AppResult<i64> {
        let conn = get_connection(&self.pool)?;
        let updated = conn.execute(
            "UPDATE conversations
             SET state = ?2, version = version + 1, updated_at = ?3
             WHERE id = ?1 AND version = ?4 AND active = 1",
            params![id, state, Utc::now().to_rfc3339(), expected_version],
        )?;

        if updated == 0 {
            return Err(AppError::Conflict(id));
        }
        Ok(expected_version + 1)
    }

    /// Deactivates a conversation without deleting it (audit/history).
    pub fn stop(&self, id: i64) -> AppResult<()> {
        let conn = get_connection(&self.pool)?;
        conn.execute(
            "UPDATE conversations SET active = 0, updated_at = ?2 WHERE id = ?1",
            params![id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Deactivates every active conversation for the tuple (restart command).
    pub fn stop_all(&self, tuple: &ConversationTuple) -> AppResult<usize> {
        let conn = get_connection(&self.pool)?;
        let stopped = conn.execute(
            "UPDATE conversations SET active = 0, updated_at = ?4
             WHERE messenger_user_id = ?1 AND chat_id = ?2 AND bot_id = ?3 AND active = 1",
            params![
                tuple.messenger_user_id,
                tuple.chat_id,
                tuple.bot_id,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(stopped)
    }

    /// Number of active conversations for the tuple. Invariant: 0 or 1.
    pub fn active_count(&self, tuple: &ConversationTuple) -> AppResult<i64> {
        let conn = get_connection(&self.pool)?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM conversations
             WHERE messenger_user_id = ?1 AND chat_id = ?2 AND bot_id = ?3 AND active = 1",
            params![tuple.messenger_user_id, tuple.chat_id, tuple.bot_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
