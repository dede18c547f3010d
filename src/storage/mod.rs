//! Persistence: connection pool, conversation store, feedback rows

pub mod conversation;
pub mod db;
pub mod feedback;

pub use conversation::{ConversationRecord, ConversationStore, ConversationTuple};
pub use db::{create_pool, get_connection, DbConnection, DbPool};
