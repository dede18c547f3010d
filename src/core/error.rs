use thiserror::Error;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent
/// error handling. Uses `thiserror` for automatic conversion and display
/// formatting.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Conversation state (de)serialization errors, including schema
    /// version mismatches for in-flight conversations
    #[error("Conversation state error: {0}")]
    State(String),

    /// Referenced entity is absent (bot, conversation, feedback)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency conflict on a conversation record.
    /// The losing update must reload and retry or fail the turn cleanly.
    #[error("Concurrent update conflict for conversation {0}")]
    Conflict(i64),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::State(err.to_string())
    }
}
