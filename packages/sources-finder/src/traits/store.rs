//! Storage traits for the source catalogue and the circuit-breaker marker.
//!
//! - `SubjectStore`: who to search for next
//! - `SourceStore`: known source pages
//! - `CatalogueStore`: composite of both, used by the pipeline
//! - `MarkerStore`: the single persisted circuit-breaker record

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::normalize::same_site;
use crate::rate::breaker::BreakerMarker;
use crate::types::{
    source::{CatalogueEntry, NewSource},
    subject::Subject,
};

/// Subjects and their re-discovery schedule.
#[async_trait]
pub trait SubjectStore: Send + Sync {
    /// Real person names, least recently searched first (never-searched first of all).
    async fn stale_subjects(&self, limit: usize) -> StoreResult<Vec<Subject>>;

    /// Set `last_searched` of `name` to now. Unknown names are left alone.
    async fn touch_subject(&self, name: &str) -> StoreResult<()>;
}

/// Known source pages.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Whether exactly this (normalized) URL is already catalogued.
    async fn url_known(&self, url: &str) -> StoreResult<bool>;

    /// All entries for a subject in catalogue order (ascending id).
    async fn entries_for_subject(&self, subject_name: &str) -> StoreResult<Vec<CatalogueEntry>>;

    /// Insert a new entry and return its id.
    async fn insert_source(&self, source: &NewSource) -> StoreResult<i64>;

    /// Insert `source` unless its subject already has an entry on the same
    /// site. Check and insert are atomic with respect to other writers.
    ///
    /// Returns the new id, or `None` when a duplicate is already present.
    async fn insert_if_new_site(&self, source: &NewSource) -> StoreResult<Option<i64>>;

    /// Compare-and-swap the URL of an entry.
    ///
    /// Writes `new_url` only if the entry still has `expected_url`; returns
    /// whether the write happened.
    async fn replace_url(&self, id: i64, expected_url: &str, new_url: &str) -> StoreResult<bool>;

    /// Entries for `subject_name` that are the same site as `url`, in catalogue order.
    async fn find_duplicates(&self, subject_name: &str, url: &str) -> StoreResult<Vec<CatalogueEntry>> {
        Ok(self
            .entries_for_subject(subject_name)
            .await?
            .into_iter()
            .filter(|entry| same_site(&entry.url, url))
            .collect())
    }
}

/// Composite catalogue trait used by the pipeline.
pub trait CatalogueStore: SubjectStore + SourceStore {}

// Blanket implementation: anything implementing both traits is a CatalogueStore
impl<T: SubjectStore + SourceStore> CatalogueStore for T {}

/// Persistence for the circuit-breaker marker.
#[async_trait]
pub trait MarkerStore: Send + Sync {
    async fn load(&self) -> StoreResult<Option<BreakerMarker>>;

    async fn save(&self, marker: &BreakerMarker) -> StoreResult<()>;

    /// Remove the marker; a missing marker is not an error.
    async fn clear(&self) -> StoreResult<()>;
}
