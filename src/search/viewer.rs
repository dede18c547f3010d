//! Rendering of search results.
//!
//! Record kinds form a closed tagged variant; `render` matches exhaustively,
//! so adding a kind without a renderer is a compile error, not a runtime
//! miss.

use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::i18n;
use crate::storage::feedback::FeedbackRecord;

/// A single feedback entry scraped from the blackbox provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackboxFeedback {
    pub name: String,
    pub phone: Option<String>,
    pub comment: Option<String>,
    pub date: Option<String>,
}

/// Multiple blackbox entries for the same term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackboxFeedbacks {
    pub items: Vec<BlackboxFeedback>,
}

/// Every record kind a search can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchResultRecord {
    Feedback(FeedbackRecord),
    BlackboxFeedback(BlackboxFeedback),
    BlackboxFeedbackList(BlackboxFeedbacks),
}

fn rating_stars(rating: i32) -> String {
    // -2..=2 to 1..=5 stars
    let stars = (rating + 3).clamp(1, 5) as usize;
    "⭐".repeat(stars)
}

fn render_blackbox(feedback: &BlackboxFeedback, lang: &LanguageIdentifier) -> String {
    let mut lines = vec![format!("{}: {}", i18n::t(lang, "view.blackbox_name"), feedback.name)];
    if let Some(phone) = &feedback.phone {
        lines.push(format!("{}: {}", i18n::t(lang, "view.blackbox_phone"), phone));
    }
    if let Some(comment) = &feedback.comment {
        lines.push(comment.clone());
    }
    if let Some(date) = &feedback.date {
        lines.push(date.clone());
    }
    lines.join("\n")
}

/// Renders a record into reply text.
pub fn render(record: &SearchResultRecord, lang: &LanguageIdentifier) -> String {
    match record {
        SearchResultRecord::Feedback(feedback) => {
            let mut lines = vec![
                feedback.search_term_text.clone(),
                format!(
                    "{}: {}",
                    i18n::t(lang, "view.feedback_rating"),
                    rating_stars(feedback.rating)
                ),
            ];
            if let Some(description) = &feedback.description {
                lines.push(format!(
                    "{}: {}",
                    i18n::t(lang, "view.feedback_description"),
                    description
                ));
            }
            lines.join("\n")
        }
        SearchResultRecord::BlackboxFeedback(feedback) => render_blackbox(feedback, lang),
        SearchResultRecord::BlackboxFeedbackList(feedbacks) => feedbacks
            .items
            .iter()
            .map(|item| render_blackbox(item, lang))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}
