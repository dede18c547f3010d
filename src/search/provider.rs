//! Search provider contract and aggregation.

use async_trait::async_trait;

use crate::conversation::transfer::SearchTermTransfer;
use crate::search::viewer::SearchResultRecord;

/// Registered provider names, used for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SearchProviderName {
    Feedbacks,
    Blackbox,
}

/// Context shared by all providers for one search.
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    pub country_code: Option<String>,
}

/// One external or internal search source.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> SearchProviderName;

    /// Whether this provider can serve the given term in the given context.
    fn supports(&self, term: &SearchTermTransfer, context: &SearchContext) -> bool;

    /// May block on network I/O; called synchronously within the turn.
    async fn search(
        &self,
        term: &SearchTermTransfer,
        context: &SearchContext,
    ) -> anyhow::Result<Vec<SearchResultRecord>>;
}

/// Aggregates all providers. A failing provider is logged and contributes
/// no results; it never aborts the whole search.
pub struct SearchRegistry {
    providers: Vec<Box<dyn SearchProvider>>,
}

impl SearchRegistry {
    pub fn new(providers: Vec<Box<dyn SearchProvider>>) -> Self {
        Self { providers }
    }

    pub fn empty() -> Self {
        Self { providers: Vec::new() }
    }

    pub async fn search_all(
        &self,
        term: &SearchTermTransfer,
        context: &SearchContext,
    ) -> Vec<SearchResultRecord> {
        let mut records = Vec::new();
        for provider in &self.providers {
            if !provider.supports(term, context) {
                continue;
            }
            match provider.search(term, context).await {
                Ok(found) => {
                    log::debug!(
                        "search provider {} returned {} record(s)",
                        provider.name(),
                        found.len()
                    );
                    records.extend(found);
                }
                Err(e) => {
                    log::error!("search provider {} failed: {e:#}", provider.name());
                }
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::viewer::{BlackboxFeedback, SearchResultRecord};

    struct Failing;
    struct Working;

    #[async_trait]
    impl SearchProvider for Failing {
        fn name(&self) -> SearchProviderName {
            SearchProviderName::Blackbox
        }
        fn supports(&self, _term: &SearchTermTransfer, _context: &SearchContext) -> bool {
            true
        }
        async fn search(
            &self,
            _term: &SearchTermTransfer,
            _context: &SearchContext,
        ) -> anyhow::Result<Vec<SearchResultRecord>> {
            anyhow::bail!("connection reset")
        }
    }

    #[async_trait]
    impl SearchProvider for Working {
        fn name(&self) -> SearchProviderName {
            SearchProviderName::Feedbacks
        }
        fn supports(&self, _term: &SearchTermTransfer, _context: &SearchContext) -> bool {
            true
        }
        async fn search(
            &self,
            _term: &SearchTermTransfer,
            _context: &SearchContext,
        ) -> anyhow::Result<Vec<SearchResultRecord>> {
            Ok(vec![SearchResultRecord::BlackboxFeedback(BlackboxFeedback {
                name: "found".to_string(),
                phone: None,
                comment: None,
                date: None,
            })])
        }
    }

    #[tokio::test]
    async fn failing_provider_is_treated_as_no_results() {
        let registry = SearchRegistry::new(vec![Box::new(Failing), Box::new(Working)]);
        let term = SearchTermTransfer::new("john");
        let records = registry.search_all(&term, &SearchContext::default()).await;
        assert_eq!(records.len(), 1);
    }
}
