//! Blackbox scam-list provider.
//!
//! Scrapes the public search page. The site hands out a session token on
//! the landing page; we cache it so repeated searches skip the extra
//! round-trip.

use async_trait::async_trait;
use moka::future::Cache;
use select::document::Document;
use select::predicate::{Attr, Class, Name, Predicate};

use crate::conversation::transfer::{SearchTermTransfer, SearchTermType};
use crate::core::config;
use crate::search::provider::{SearchContext, SearchProvider, SearchProviderName};
use crate::search::viewer::{BlackboxFeedback, BlackboxFeedbacks, SearchResultRecord};

const BASE_URL: &str = "https://blackbox.net.ua";
const COUNTRY: &str = "ua";

pub struct BlackboxSearchProvider {
    http: reqwest::Client,
    token_cache: Cache<(), String>,
}

impl BlackboxSearchProvider {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config::search::provider_timeout())
            .cookie_store(true)
            .build()?;
        let token_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(config::search::token_ttl())
            .build();
        Ok(Self { http, token_cache })
    }

    async fn token(&self) -> anyhow::Result<String> {
        self.token_cache
            .try_get_with((), self.fetch_token())
            .await
            .map_err(|e| anyhow::anyhow!("blackbox token fetch failed: {e}"))
    }

    async fn fetch_token(&self) -> anyhow::Result<String> {
        let html = self
            .http
            .get(BASE_URL)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let document = Document::from(html.as_str());
        document
            .find(Attr("name", "csrfmiddlewaretoken"))
            .next()
            .and_then(|node| node.attr("value"))
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("no csrf token on landing page"))
    }

    fn parse_results(html: &str) -> Vec<BlackboxFeedback> {
        let document = Document::from(html);
        document
            .find(Class("feedback-item"))
            .filter_map(|item| {
                let name = item
                    .find(Class("feedback-name"))
                    .next()
                    .map(|node| node.text().trim().to_string())?;
                let phone = item
                    .find(Class("feedback-phone"))
                    .next()
                    .map(|node| node.text().trim().to_string())
                    .filter(|text| !text.is_empty());
                let comment = item
                    .find(Class("feedback-comment").descendant(Name("p")))
                    .next()
                    .map(|node| node.text().trim().to_string())
                    .filter(|text| !text.is_empty());
                let date = item
                    .find(Class("feedback-date"))
                    .next()
                    .map(|node| node.text().trim().to_string())
                    .filter(|text| !text.is_empty());
                Some(BlackboxFeedback { name, phone, comment, date })
            })
            .collect()
    }
}

#[async_trait]
impl SearchProvider for BlackboxSearchProvider {
    fn name(&self) -> SearchProviderName {
        SearchProviderName::Blackbox
    }

    fn supports(&self, term: &SearchTermTransfer, context: &SearchContext) -> bool {
        if context.country_code.as_deref() != Some(COUNTRY) {
            return false;
        }
        match term.term_type {
            Some(SearchTermType::PhoneNumber) => term.normalized().starts_with("380"),
            Some(SearchTermType::PersonName) => true,
            _ => false,
        }
    }

    async fn search(
        &self,
        term: &SearchTermTransfer,
        _context: &SearchContext,
    ) -> anyhow::Result<Vec<SearchResultRecord>> {
        let token = self.token().await?;
        let html = self
            .http
            .post(format!("{BASE_URL}/search/"))
            .form(&[
                ("csrfmiddlewaretoken", token.as_str()),
                ("query", term.normalized()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut items = Self::parse_results(&html);
        Ok(match items.len() {
            0 => Vec::new(),
            1 => {
                let item = items.remove(0);
                vec![SearchResultRecord::BlackboxFeedback(item)]
            }
            _ => vec![SearchResultRecord::BlackboxFeedbackList(BlackboxFeedbacks {
                items,
            })],
        })
    }
}
