//! Feedback rows: the terminal side effect of the create conversation and
//! the data source of the internal search provider.

use std::str::FromStr;

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::conversation::transfer::SearchTermType;
use crate::core::error::{AppError, AppResult};

/// A stored feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub search_term_text: String,
    pub search_term_normalized: String,
    pub search_term_type: SearchTermType,
    pub rating: i32,
    pub description: Option<String>,
    pub created_at: String,
}

/// Fields required to insert a feedback.
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub messenger_user_id: i64,
    pub chat_id: i64,
    pub bot_id: i64,
    pub search_term_text: String,
    pub search_term_normalized: String,
    pub search_term_type: SearchTermType,
    pub rating: i32,
    pub description: Option<String>,
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<(FeedbackRecord, String)> {
    let type_raw: String = row.get(3)?;
    Ok((
        FeedbackRecord {
            id: row.get(0)?,
            search_term_text: row.get(1)?,
            search_term_normalized: row.get(2)?,
            search_term_type: SearchTermType::Unknown,
            rating: row.get(4)?,
            description: row.get(5)?,
            created_at: row.get(6)?,
        },
        type_raw,
    ))
}

pub fn insert_feedback(conn: &Connection, feedback: &NewFeedback) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO feedbacks
             (messenger_user_id, chat_id, bot_id, search_term_text, search_term_normalized,
              search_term_type, rating, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            feedback.messenger_user_id,
            feedback.chat_id,
            feedback.bot_id,
            feedback.search_term_text,
            feedback.search_term_normalized,
            feedback.search_term_type.to_string(),
            feedback.rating,
            feedback.description,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Feedbacks whose stored term matches the normalized search text.
pub fn search_feedbacks(conn: &Connection, normalized: &str) -> AppResult<Vec<FeedbackRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, search_term_text, search_term_normalized, search_term_type,
                rating, description, created_at
         FROM feedbacks
         WHERE search_term_normalized = ?1 COLLATE NOCASE
            OR search_term_text = ?1 COLLATE NOCASE
         ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map(params![normalized], record_from_row)?;

    let mut records = Vec::new();
    for row in rows {
        let (mut record, type_raw) = row?;
        record.search_term_type = SearchTermType::from_str(&type_raw)
            .map_err(|_| AppError::State(format!("unknown search term type `{type_raw}`")))?;
        records.push(record);
    }
    Ok(records)
}
