//! Papers Page Discovery Library
//!
//! Finds the web pages on which academics list their papers. For each
//! subject (a person name) it builds a varied search query, searches the
//! web, filters and fetches the results, scores each page as a likely
//! papers listing, and records accepted pages in a catalogue, updating
//! known entries when a site has moved.
//!
//! # Design Philosophy
//!
//! - Stay under the radar: jittered searches, a circuit breaker that backs
//!   off for hours once the provider pushes back
//! - Filter before fetching: blacklisted and structurally bad URLs never
//!   cost a request
//! - Known publications are evidence, both for the query and the score
//! - Collaborators are traits so every step runs against mocks in tests
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sources_finder::{DiscoveryPipeline, FinderConfig, MemoryStore, RateController};
//! use sources_finder::testing::{ManualClock, MockBibliography, MockFetcher, MockWebSearcher};
//!
//! let config = FinderConfig::default();
//! let rate = RateController::from_config(markers, clock, &config);
//! let mut pipeline = DiscoveryPipeline::new(
//!     searcher, fetcher, Arc::new(MemoryStore::new()), bibliography, rate, config,
//! );
//!
//! let outcome = pipeline.run(Some(vec!["Jane Doe".into()]), false).await?;
//! for url in outcome.accepted_urls() {
//!     println!("{url}");
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (WebSearcher, PageFetcher, BibliographySource, stores)
//! - [`types`] - Subjects, sources, run reports and configuration
//! - [`pipeline`] - The discovery pipeline
//! - [`rate`] - Pacing and the circuit breaker
//! - [`stores`] - Storage implementations (MemoryStore, SqliteStore, marker stores)
//! - [`testing`] - Mock implementations for testing

pub mod dedupe;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod rate;
pub mod scorer;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;
pub mod url_filter;

// Re-export core types at crate root
pub use error::{
    BibliographyError, DiscoveryError, FetchError, Result, SearchError, StoreError,
};
pub use traits::{
    bibliography::{philpapers_doc_id, BibliographySource, DocMetadata, PhilPapersSource},
    fetcher::{FetchedPage, HttpFetcher, PageFetcher},
    searcher::{GoogleCseSearcher, SearchHit, WebSearcher},
    store::{CatalogueStore, MarkerStore, SourceStore, SubjectStore},
};
pub use types::{
    config::FinderConfig,
    source::{
        CandidateOutcome, CatalogueEntry, DiscoveryReport, NewSource, ScoredSource,
        SourceDisposition, ACCEPT_THRESHOLD,
    },
    subject::{Publication, Subject},
};

// Re-export pipeline components
pub use dedupe::{DuplicateResolver, Resolution};
pub use extract::{BibRecord, PhilPapersExtractor, RecordExtractor};
pub use matcher::{names_match, normalize_title, NameMatch, PublicationMatcher};
pub use normalize::{normalize_url, same_site, site_key};
pub use pipeline::{Discovery, DiscoveryPipeline, RunOutcome};
pub use query::{QueryBuilder, QueryStrategy};
pub use rate::{BreakerMarker, CircuitBreaker, Clock, Gate, RateController, SystemClock};
pub use scorer::{HeuristicScorer, PageScorer, PageSignals};
pub use url_filter::UrlFilter;

// Re-export stores
pub use stores::{FileMarkerStore, MemoryMarkerStore, MemoryStore};

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;

// Re-export testing utilities
pub use testing::{FixedScorer, ManualClock, TestScenario};
