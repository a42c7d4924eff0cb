//! Evidence Retrieval
//!
//! Talks to an external web-search provider and normalizes its results
//! for the evidence store. The `SearchProvider` trait abstracts the
//! wire call so tests can substitute fakes; `Retriever` wraps a
//! provider with the fail-open policy: a provider failure degrades the
//! turn to "no evidence" instead of aborting it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maximum results requested from the provider per query
pub const MAX_RESULTS: usize = 3;

/// A normalized web-search result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// Errors that can occur during a provider call
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider returned {0}")]
    ProviderStatus(u16),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Search provider trait
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "tavily")
    fn name(&self) -> &str;

    /// Run a search, returning at most `max_results` normalized results
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;
}

/// Client for the Tavily search API.
pub struct TavilyClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl TavilyClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let url = format!("{}/search", self.base_url);

        let payload = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": max_results,
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| SearchError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::ProviderStatus(response.status().as_u16()));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(e.to_string()))?;

        let results = data
            .get("results")
            .and_then(|r| r.as_array())
            .ok_or_else(|| SearchError::ParseError("No results array in response".to_string()))?;

        let mut normalized = Vec::new();
        for result in results.iter().take(max_results) {
            let url = result.get("url").and_then(|v| v.as_str()).unwrap_or("");
            if url.is_empty() {
                continue;
            }

            // The payload carries the body text as "content"; older
            // responses use "snippet".
            let snippet = result
                .get("content")
                .or_else(|| result.get("snippet"))
                .and_then(|v| v.as_str())
                .unwrap_or("");

            normalized.push(SearchResult {
                url: url.to_string(),
                title: result
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                snippet: snippet.to_string(),
            });
        }

        Ok(normalized)
    }
}

/// Evidence retriever enforcing the result cap and fail-open policy.
pub struct Retriever {
    provider: Arc<dyn SearchProvider>,
}

impl Retriever {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// Retrieve evidence for a query.
    ///
    /// Any provider failure (network, non-2xx, malformed payload)
    /// yields an empty sequence. Absence of evidence degrades answer
    /// quality but never aborts the turn.
    pub async fn retrieve(&self, query: &str) -> Vec<SearchResult> {
        match self.provider.search(query, MAX_RESULTS).await {
            Ok(results) => {
                debug!(
                    "Retrieved {} results from {} for: {}",
                    results.len(),
                    self.provider.name(),
                    query
                );
                results
            }
            Err(e) => {
                warn!(
                    "Search provider {} failed, continuing without evidence: {}",
                    self.provider.name(),
                    e
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProvider;

    #[async_trait]
    impl SearchProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn search(&self, _: &str, _: usize) -> Result<Vec<SearchResult>, SearchError> {
            Err(SearchError::NetworkError("connection refused".to_string()))
        }
    }

    struct StaticProvider(Vec<SearchResult>);

    #[async_trait]
    impl SearchProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        async fn search(
            &self,
            _: &str,
            max_results: usize,
        ) -> Result<Vec<SearchResult>, SearchError> {
            Ok(self.0.iter().take(max_results).cloned().collect())
        }
    }

    #[tokio::test]
    async fn test_retriever_fails_open() {
        let retriever = Retriever::new(Arc::new(FailingProvider));
        let results = retriever.retrieve("stock market news").await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_retriever_caps_results() {
        let many: Vec<SearchResult> = (0..10)
            .map(|i| SearchResult {
                url: format!("https://example.com/{}", i),
                title: format!("Result {}", i),
                snippet: String::new(),
            })
            .collect();

        let retriever = Retriever::new(Arc::new(StaticProvider(many)));
        let results = retriever.retrieve("anything").await;
        assert_eq!(results.len(), MAX_RESULTS);
    }
}
