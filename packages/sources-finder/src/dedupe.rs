//! Duplicate resolution for accepted candidates.
//!
//! Sites move (http to https, `www.` added or dropped, `index.html`
//! appended), so a newly accepted page may really be a known source under
//! a new address. The newest URL wins: the first duplicate found gets its
//! URL overwritten and nothing new is inserted. Other duplicates are left
//! alone.

use tracing::{debug, info, warn};

use crate::error::{DiscoveryError, Result};
use crate::traits::store::SourceStore;
use crate::types::source::{CatalogueEntry, ScoredSource, SourceDisposition};

/// How many times a write is re-planned after losing a race.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// What to do with an accepted candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No duplicate: insert as a new entry
    Insert,

    /// Overwrite the URL of this existing entry
    Overwrite(CatalogueEntry),
}

/// Decides between inserting a candidate and overwriting a duplicate.
#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    max_attempts: usize,
}

impl Default for DuplicateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DuplicateResolver {
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Plan the write for `candidate` without performing it.
    pub async fn resolve<S: SourceStore + ?Sized>(
        &self,
        store: &S,
        candidate: &ScoredSource,
    ) -> Result<Resolution> {
        let duplicates = store
            .find_duplicates(&candidate.subject_name, &candidate.url)
            .await?;

        if duplicates.len() > 1 {
            debug!(
                url = %candidate.url,
                count = duplicates.len(),
                "several duplicates, only the first is updated"
            );
        }

        Ok(match duplicates.into_iter().next() {
            Some(entry) => Resolution::Overwrite(entry),
            None => Resolution::Insert,
        })
    }

    /// Resolve and write.
    ///
    /// An insert only happens if no same-site entry exists at write time,
    /// and an overwrite is a compare-and-swap on the entry's current URL.
    /// If another writer got there first the plan is redone, up to
    /// `max_attempts` times.
    pub async fn apply<S: SourceStore + ?Sized>(
        &self,
        store: &S,
        candidate: &ScoredSource,
    ) -> Result<SourceDisposition> {
        let mut contested = None;

        for attempt in 1..=self.max_attempts {
            match self.resolve(store, candidate).await? {
                Resolution::Insert => {
                    if let Some(id) = store.insert_if_new_site(&candidate.to_new_source()).await? {
                        info!(url = %candidate.url, id, score = candidate.score, "new source");
                        return Ok(SourceDisposition::Inserted {
                            id,
                            score: candidate.score,
                        });
                    }
                    warn!(url = %candidate.url, attempt, "same-site entry appeared during insert");
                }
                Resolution::Overwrite(entry) => {
                    if store
                        .replace_url(entry.id, &entry.url, &candidate.url)
                        .await?
                    {
                        info!(
                            url = %candidate.url,
                            previous_url = %entry.url,
                            entry_id = entry.id,
                            "updated URL of known source"
                        );
                        return Ok(SourceDisposition::Overwrote {
                            entry_id: entry.id,
                            previous_url: entry.url,
                            score: candidate.score,
                        });
                    }
                    warn!(entry_id = entry.id, attempt, "catalogue entry changed during overwrite");
                    contested = Some(entry.id);
                }
            }
        }

        Err(DiscoveryError::Conflict {
            entry_id: contested.unwrap_or_default(),
        })
    }
}
