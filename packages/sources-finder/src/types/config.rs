//! Configuration for discovery runs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::source::ACCEPT_THRESHOLD;

/// How long to stay away from the search provider after it blocked us.
pub const DEFAULT_BREAKER_COOLDOWN_SECS: u64 = 9 * 60 * 60;

/// Tunables for the discovery pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinderConfig {
    /// Minimum score (inclusive) for a page to be accepted.
    ///
    /// Default: 75.
    pub accept_threshold: u8,

    /// Circuit-breaker cool-down in seconds.
    ///
    /// Default: 9 hours.
    pub breaker_cooldown_secs: u64,

    /// Upper bound of the uniform random pause before each search, in seconds.
    ///
    /// Default: 100.
    pub max_search_jitter_secs: u64,

    /// Page fetches per second.
    pub fetch_requests_per_second: u32,

    /// Disambiguating topic term added to topical queries.
    pub field_term: String,

    /// URLs longer than this are rejected.
    pub max_url_len: usize,

    /// How many least-recently-searched subjects one run processes.
    pub subjects_per_run: usize,

    /// Maximum number of search results considered per query.
    pub search_result_limit: usize,

    /// Accept name variants (initials) when looking up known publications.
    pub lenient_publications: bool,

    /// Extra URL blacklist fragments on top of the built-in list.
    #[serde(default)]
    pub extra_blacklist: Vec<String>,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            accept_threshold: ACCEPT_THRESHOLD,
            breaker_cooldown_secs: DEFAULT_BREAKER_COOLDOWN_SECS,
            max_search_jitter_secs: 100,
            fetch_requests_per_second: 1,
            field_term: "philosophy".to_string(),
            max_url_len: 255,
            subjects_per_run: 1,
            search_result_limit: 10,
            lenient_publications: true,
            extra_blacklist: vec![],
        }
    }
}

impl FinderConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the acceptance threshold.
    pub fn with_accept_threshold(mut self, threshold: u8) -> Self {
        self.accept_threshold = threshold.min(100);
        self
    }

    /// Set the maximum pre-search pause.
    pub fn with_max_search_jitter_secs(mut self, secs: u64) -> Self {
        self.max_search_jitter_secs = secs;
        self
    }

    /// Set the circuit-breaker cool-down.
    pub fn with_breaker_cooldown_secs(mut self, secs: u64) -> Self {
        self.breaker_cooldown_secs = secs;
        self
    }

    /// Set the page fetch rate.
    pub fn with_fetch_requests_per_second(mut self, rps: u32) -> Self {
        self.fetch_requests_per_second = rps;
        self
    }

    /// Set the topic term.
    pub fn with_field_term(mut self, term: impl Into<String>) -> Self {
        self.field_term = term.into();
        self
    }

    /// Set subjects per run.
    pub fn with_subjects_per_run(mut self, n: usize) -> Self {
        self.subjects_per_run = n;
        self
    }

    /// Add blacklist fragments.
    pub fn with_extra_blacklist(mut self, parts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_blacklist
            .extend(parts.into_iter().map(|p| p.into()));
        self
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.breaker_cooldown_secs)
    }

    pub fn max_search_jitter(&self) -> Duration {
        Duration::from_secs(self.max_search_jitter_secs)
    }
}
