//! Typed errors for the sources finder.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Only run-fatal conditions
//! become a [`DiscoveryError`]; per-URL problems are recorded as a
//! [`SourceDisposition`](crate::types::source::SourceDisposition) instead.

use thiserror::Error;

/// Errors that abort a discovery run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The search provider refused the query; the circuit breaker has been tripped.
    #[error("search provider blocked us: {source}")]
    ProviderBlocked {
        #[source]
        source: SearchError,
    },

    /// Catalogue storage failed
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The circuit-breaker record could not be read or written
    #[error("circuit breaker error: {0}")]
    Breaker(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A duplicate kept changing underneath us
    #[error("concurrent update on catalogue entry {entry_id}")]
    Conflict { entry_id: i64 },

    /// Configuration error
    #[error("config error: {reason}")]
    Config { reason: String },
}

/// Errors raised by a search provider.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success status from the provider
    #[error("search provider returned status {status}")]
    Status { status: u16 },

    /// Daily quota used up or bot detection kicked in
    #[error("search quota exceeded")]
    QuotaExceeded,

    /// Response body could not be decoded
    #[error("could not decode search response: {0}")]
    Decode(String),
}

/// Errors that can occur while fetching a candidate page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Connection timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },
}

/// Errors raised by the bibliographic source.
#[derive(Debug, Error)]
pub enum BibliographyError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success status
    #[error("bibliographic source returned status {status}")]
    Status { status: u16 },
}

/// Errors raised by catalogue backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend operation failed
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A stored row could not be decoded
    #[error("corrupt row: {reason}")]
    Corrupt { reason: String },
}

/// Result type alias for discovery runs.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Result type alias for search operations.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Result type alias for page fetches.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for bibliographic lookups.
pub type BibliographyResult<T> = std::result::Result<T, BibliographyError>;

/// Result type alias for catalogue operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
