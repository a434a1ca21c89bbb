//! Web searcher trait for candidate discovery.
//!
//! The pipeline only needs an ordered list of result URLs for a query.
//! Any error from the provider is taken as a sign that we have been
//! blocked, so implementations should not retry internally.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::RwLock;

use crate::error::{SearchError, SearchResult};

/// A URL returned by the search provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// The result URL, as returned by the provider (not yet normalized).
    pub url: String,

    /// Title of the result (if available).
    pub title: Option<String>,
}

impl SearchHit {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Web search provider.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Search the web; results come back in relevance order.
    async fn search(&self, query: &str) -> SearchResult<Vec<SearchHit>>;

    /// Search with a specific result limit.
    async fn search_with_limit(&self, query: &str, limit: usize) -> SearchResult<Vec<SearchHit>> {
        let mut results = self.search(query).await?;
        results.truncate(limit);
        Ok(results)
    }
}

/// Mock web searcher for testing.
///
/// Returns the same hits for every query (queries are randomized, so
/// keying on them is useless) and records what it was asked.
#[derive(Default)]
pub struct MockWebSearcher {
    hits: Vec<SearchHit>,
    fail_with_status: Option<u16>,
    queries: RwLock<Vec<String>>,
}

impl MockWebSearcher {
    /// Create a new mock searcher with no results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add URL strings as results.
    pub fn with_urls(mut self, urls: &[&str]) -> Self {
        self.hits.extend(urls.iter().map(|u| SearchHit::new(*u)));
        self
    }

    /// Make every search fail with the given HTTP status.
    pub fn failing(mut self, status: u16) -> Self {
        self.fail_with_status = Some(status);
        self
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.read().unwrap().clone()
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn search(&self, query: &str) -> SearchResult<Vec<SearchHit>> {
        self.queries.write().unwrap().push(query.to_string());
        match self.fail_with_status {
            Some(403) | Some(429) => Err(SearchError::QuotaExceeded),
            Some(status) => Err(SearchError::Status { status }),
            None => Ok(self.hits.clone()),
        }
    }
}

/// Google Custom Search JSON API.
///
/// The API key only leaves its `SecretString` when a request is built;
/// `Debug` output shows the engine id and endpoint but never the key.
pub struct GoogleCseSearcher {
    api_key: SecretString,
    engine_id: String,
    client: reqwest::Client,
    endpoint: String,
    /// Results per query (the API caps this at 10).
    pub default_limit: usize,
}

impl GoogleCseSearcher {
    /// Create a searcher for a custom search engine.
    pub fn new(api_key: SecretString, engine_id: impl Into<String>) -> Self {
        Self {
            api_key,
            engine_id: engine_id.into(),
            client: reqwest::Client::new(),
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            default_limit: 10,
        }
    }

    /// Point at a different endpoint (e.g. a local stub).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the default result limit.
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.clamp(1, 10);
        self
    }

    fn request(&self, query: &str, limit: usize) -> reqwest::RequestBuilder {
        let num = limit.clamp(1, 10).to_string();
        self.client.get(&self.endpoint).query(&[
            ("key", self.api_key.expose_secret()),
            ("cx", self.engine_id.as_str()),
            ("q", query),
            ("num", num.as_str()),
        ])
    }
}

impl fmt::Debug for GoogleCseSearcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleCseSearcher")
            .field("api_key", &"[REDACTED]")
            .field("engine_id", &self.engine_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Debug, serde::Deserialize)]
struct CseResponse {
    #[serde(rename = "searchInformation")]
    search_information: Option<CseSearchInformation>,
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, serde::Deserialize)]
struct CseSearchInformation {
    #[serde(rename = "totalResults")]
    total_results: String,
}

#[derive(Debug, serde::Deserialize)]
struct CseItem {
    link: String,
    title: Option<String>,
}

/// Turn a decoded response into hits; zero total results means no items.
fn hits_from_response(response: CseResponse) -> Vec<SearchHit> {
    let empty = response
        .search_information
        .as_ref()
        .map(|info| info.total_results == "0")
        .unwrap_or(false);
    if empty {
        return Vec::new();
    }
    response
        .items
        .into_iter()
        .map(|item| {
            let hit = SearchHit::new(item.link);
            match item.title {
                Some(title) => hit.with_title(title),
                None => hit,
            }
        })
        .collect()
}

#[async_trait]
impl WebSearcher for GoogleCseSearcher {
    async fn search(&self, query: &str) -> SearchResult<Vec<SearchHit>> {
        self.search_with_limit(query, self.default_limit).await
    }

    async fn search_with_limit(&self, query: &str, limit: usize) -> SearchResult<Vec<SearchHit>> {
        let response = self
            .request(query, limit)
            .send()
            .await
            .map_err(|e| SearchError::Http(Box::new(e)))?;

        let status = response.status();
        if status.as_u16() == 403 || status.as_u16() == 429 {
            return Err(SearchError::QuotaExceeded);
        }
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
            });
        }

        let body: CseResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(hits_from_response(body))
    }
}
