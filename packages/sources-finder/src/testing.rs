//! Testing utilities including mock implementations.
//!
//! These are useful for testing code that drives the discovery pipeline
//! without making real search, fetch or bibliographic calls.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};

use crate::pipeline::DiscoveryPipeline;
use crate::query::QueryStrategy;
use crate::rate::{Clock, RateController};
use crate::scorer::PageScorer;
use crate::stores::{MemoryMarkerStore, MemoryStore};
use crate::types::config::FinderConfig;

pub use crate::traits::bibliography::MockBibliography;
pub use crate::traits::fetcher::MockFetcher;
pub use crate::traits::searcher::MockWebSearcher;

/// A clock that only moves when told to.
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.write().unwrap() += by;
    }

    /// Jump to an arbitrary instant, backwards included.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap()
    }
}

/// A scorer with canned answers.
///
/// Returns the score of the first registered marker contained in the page
/// body, or the default score.
pub struct FixedScorer {
    default: u8,
    by_marker: Vec<(String, u8)>,
    calls: RwLock<usize>,
}

impl FixedScorer {
    pub fn new(default: u8) -> Self {
        Self {
            default,
            by_marker: Vec::new(),
            calls: RwLock::new(0),
        }
    }

    /// Score pages whose body contains `marker` with `score`.
    pub fn with_score(mut self, marker: impl Into<String>, score: u8) -> Self {
        self.by_marker.push((marker.into(), score));
        self
    }

    /// Number of pages scored so far.
    pub fn calls(&self) -> usize {
        *self.calls.read().unwrap()
    }
}

impl PageScorer for FixedScorer {
    fn score(&self, html: &str, _subject_name: &str, _known_titles: &[String]) -> u8 {
        *self.calls.write().unwrap() += 1;
        self.by_marker
            .iter()
            .find(|(marker, _)| html.contains(marker.as_str()))
            .map(|(_, score)| *score)
            .unwrap_or(self.default)
    }
}

/// Configuration without pauses, for tests.
pub fn test_config() -> FinderConfig {
    FinderConfig::default()
        .with_max_search_jitter_secs(0)
        .with_fetch_requests_per_second(1000)
}

/// Body served for a page registered with [`TestScenario::with_scored_page`].
pub fn page_body(url: &str) -> String {
    format!(
        "<html><head><title>{0}</title></head><body><a href=\"{0}\">{0}</a></body></html>",
        url
    )
}

/// Pipeline wired to mocks.
pub type MockPipeline = DiscoveryPipeline<MockWebSearcher, MockFetcher, MemoryStore, MockBibliography>;

/// Shared state behind a pipeline built by [`TestScenario`].
#[derive(Clone)]
pub struct ScenarioHandles {
    pub store: Arc<MemoryStore>,
    pub markers: Arc<MemoryMarkerStore>,
    pub clock: Arc<ManualClock>,
}

/// Builder for a pipeline wired to mock collaborators.
pub struct TestScenario {
    searcher: MockWebSearcher,
    fetcher: MockFetcher,
    bibliography: MockBibliography,
    scorer: FixedScorer,
    config: FinderConfig,
    seed: u64,
    strategy: Option<QueryStrategy>,
    handles: ScenarioHandles,
}

impl TestScenario {
    /// Create a new test scenario.
    pub fn new() -> Self {
        Self {
            searcher: MockWebSearcher::new(),
            fetcher: MockFetcher::new(),
            bibliography: MockBibliography::new(),
            scorer: FixedScorer::new(0),
            config: test_config(),
            seed: 7,
            strategy: None,
            handles: ScenarioHandles {
                store: Arc::new(MemoryStore::new()),
                markers: Arc::new(MemoryMarkerStore::new()),
                clock: Arc::new(ManualClock::new(Utc::now())),
            },
        }
    }

    /// Add a search result without a page behind it.
    pub fn with_hit(mut self, url: &str) -> Self {
        self.searcher = self.searcher.with_urls(&[url]);
        self
    }

    /// Add a search result served with `status`.
    pub fn with_status_page(mut self, url: &str, status: u16) -> Self {
        self.fetcher = self.fetcher.with_status(url, status, "");
        self.with_hit(url)
    }

    /// Add a search result served with 200 and scored `score`.
    pub fn with_scored_page(mut self, url: &str, score: u8) -> Self {
        self.fetcher = self.fetcher.with_page(url, page_body(url));
        self.scorer = self.scorer.with_score(format!("<title>{}</title>", url), score);
        self.with_hit(url)
    }

    /// Replace the search mock.
    pub fn with_searcher(mut self, searcher: MockWebSearcher) -> Self {
        self.searcher = searcher;
        self
    }

    /// Serve a bibliographic result document for `name`.
    pub fn with_bibliography(mut self, name: &str, document: &str) -> Self {
        self.bibliography = self.bibliography.with_document(name, document);
        self
    }

    pub fn with_config(mut self, config: FinderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_strategy(mut self, strategy: QueryStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> (MockPipeline, ScenarioHandles) {
        let rate = RateController::from_config(
            self.handles.markers.clone(),
            self.handles.clock.clone(),
            &self.config,
        );

        let mut pipeline = DiscoveryPipeline::new(
            self.searcher,
            self.fetcher,
            self.handles.store.clone(),
            self.bibliography,
            rate,
            self.config,
        )
        .with_scorer(self.scorer)
        .with_seed(self.seed);

        if let Some(strategy) = self.strategy {
            pipeline = pipeline.with_strategy(strategy);
        }

        (pipeline, self.handles)
    }
}

impl Default for TestScenario {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), start + Duration::hours(2));

        clock.set(start - Duration::days(1));
        assert_eq!(clock.now(), start - Duration::days(1));
    }

    #[test]
    fn test_fixed_scorer() {
        let scorer = FixedScorer::new(10).with_score("papers", 80);
        assert_eq!(scorer.score("<h1>papers</h1>", "Jane Doe", &[]), 80);
        assert_eq!(scorer.score("<h1>blog</h1>", "Jane Doe", &[]), 10);
        assert_eq!(scorer.calls(), 2);
    }

    #[test]
    fn test_scenario_registers_pages() {
        let (pipeline, _) = TestScenario::new()
            .with_scored_page("https://uni.edu/~doe/papers", 82)
            .build();
        assert_eq!(pipeline.config().max_search_jitter_secs, 0);
        assert!(pipeline.fetcher().calls().is_empty());
    }
}
