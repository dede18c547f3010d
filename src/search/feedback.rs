//! Internal provider backed by the feedbacks table.

use std::sync::Arc;

use async_trait::async_trait;

use crate::conversation::transfer::SearchTermTransfer;
use crate::search::provider::{SearchContext, SearchProvider, SearchProviderName};
use crate::search::viewer::SearchResultRecord;
use crate::storage::db::DbPool;
use crate::storage::feedback::search_feedbacks;

pub struct FeedbackSearchProvider {
    pool: Arc<DbPool>,
}

impl FeedbackSearchProvider {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SearchProvider for FeedbackSearchProvider {
    fn name(&self) -> SearchProviderName {
        SearchProviderName::Feedbacks
    }

    fn supports(&self, _term: &SearchTermTransfer, _context: &SearchContext) -> bool {
        true
    }

    async fn search(
        &self,
        term: &SearchTermTransfer,
        _context: &SearchContext,
    ) -> anyhow::Result<Vec<SearchResultRecord>> {
        let conn = self.pool.get()?;
        let found = search_feedbacks(&conn, term.normalized())?;
        Ok(found.into_iter().map(SearchResultRecord::Feedback).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::transfer::SearchTermType;
    use crate::storage::db::test_support::temp_pool;
    use crate::storage::feedback::{insert_feedback, NewFeedback};

    #[tokio::test]
    async fn finds_stored_feedback_by_normalized_term() {
        let (pool, _guard) = temp_pool();
        {
            let conn = pool.get().unwrap();
            insert_feedback(
                &conn,
                &NewFeedback {
                    messenger_user_id: 1,
                    chat_id: 100,
                    bot_id: 7,
                    search_term_text: "@John_Doe".to_string(),
                    search_term_normalized: "john_doe".to_string(),
                    search_term_type: SearchTermType::TelegramUsername,
                    rating: -2,
                    description: None,
                },
            )
            .unwrap();
        }

        let provider = FeedbackSearchProvider::new(pool);
        let term = SearchTermTransfer::with_type("john_doe", SearchTermType::TelegramUsername);
        let records = provider
            .search(&term, &SearchContext::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }
}
