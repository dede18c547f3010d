//! Connection pool and schema management

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Result;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a pool with up to 10 connections and ensures the schema is
/// up to date on the first connection.
pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder().max_size(10).build(manager)?;

    let conn = pool.get()?;
    if let Err(e) = migrate_schema(&conn) {
        log::error!("Failed to migrate schema: {}", e);
    }

    Ok(pool)
}

/// Get a connection from the pool
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Idempotent schema migration. Safe to run on every startup.
pub fn migrate_schema(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversations (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            messenger_user_id  INTEGER NOT NULL,
            chat_id            INTEGER NOT NULL,
            bot_id             INTEGER NOT NULL,
            kind               TEXT    NOT NULL,
            state              TEXT    NOT NULL,
            active             INTEGER NOT NULL DEFAULT 1,
            version            INTEGER NOT NULL DEFAULT 0,
            created_at         TEXT    NOT NULL,
            updated_at         TEXT    NOT NULL
        );

        -- At most one active conversation per (user, chat, bot) tuple.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_conversations_active_tuple
            ON conversations (messenger_user_id, chat_id, bot_id)
            WHERE active = 1;

        CREATE INDEX IF NOT EXISTS idx_conversations_tuple
            ON conversations (messenger_user_id, chat_id, bot_id);

        CREATE TABLE IF NOT EXISTS feedbacks (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            messenger_user_id       INTEGER NOT NULL,
            chat_id                 INTEGER NOT NULL,
            bot_id                  INTEGER NOT NULL,
            search_term_text        TEXT    NOT NULL,
            search_term_normalized  TEXT    NOT NULL,
            search_term_type        TEXT    NOT NULL,
            rating                  INTEGER NOT NULL,
            description             TEXT,
            created_at              TEXT    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_feedbacks_normalized
            ON feedbacks (search_term_normalized);",
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Arc;

    /// Pool over a throwaway database file; the tempfile guard must outlive
    /// the pool.
    pub fn temp_pool() -> (Arc<DbPool>, tempfile::NamedTempFile) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let pool = create_pool(file.path().to_str().unwrap()).unwrap();
        (Arc::new(pool), file)
    }
}
