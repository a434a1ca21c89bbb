//! Source pages: scored candidates, catalogue rows and per-URL outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum score (inclusive) for a fetched page to count as a papers page.
pub const ACCEPT_THRESHOLD: u8 = 75;

/// A fetched and scored candidate page.
///
/// Ephemeral: only persisted (as a [`NewSource`] or as the new URL of an
/// existing entry) when the score reaches the acceptance threshold.
#[derive(Debug, Clone)]
pub struct ScoredSource {
    /// Normalized URL
    pub url: String,

    /// The subject this page was found for
    pub subject_name: String,

    /// Human-readable name of the source, e.g. "Jane Doe's site"
    pub display_name: String,

    /// Raw body of the fetched page
    pub fetched_html: String,

    /// Likelihood (0-100) that this is a papers page
    pub score: u8,
}

impl ScoredSource {
    pub fn new(
        url: impl Into<String>,
        subject_name: impl Into<String>,
        fetched_html: impl Into<String>,
        score: u8,
    ) -> Self {
        let subject_name = subject_name.into();
        Self {
            url: url.into(),
            display_name: format!("{}'s site", subject_name),
            subject_name,
            fetched_html: fetched_html.into(),
            score: score.min(100),
        }
    }

    /// Whether the score reaches `threshold` (inclusive).
    pub fn is_accepted(&self, threshold: u8) -> bool {
        self.score >= threshold
    }

    /// The row to insert if this candidate turns out to be new.
    pub fn to_new_source(&self) -> NewSource {
        NewSource {
            url: self.url.clone(),
            subject_name: self.subject_name.clone(),
            name: self.display_name.clone(),
        }
    }
}

/// A row to be inserted into the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSource {
    pub url: String,
    pub subject_name: String,
    pub name: String,
}

/// A persisted source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    pub id: i64,
    pub url: String,

    /// Default author of the source
    pub subject_name: String,

    /// Display name
    pub name: String,

    pub created_at: DateTime<Utc>,
}

/// What happened to one candidate URL during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDisposition {
    /// Rejected by the URL filter before fetching
    BadUrl,

    /// URL already in the catalogue
    AlreadyKnown,

    /// Non-200 status or transport error
    FetchFailed { reason: String },

    /// Fetched, but didn't look like a papers page
    LowScore { score: u8 },

    /// Stored as a new catalogue entry
    Inserted { id: i64, score: u8 },

    /// Replaced the URL of an existing duplicate entry
    Overwrote {
        entry_id: i64,
        previous_url: String,
        score: u8,
    },

    /// Dry run: would have been inserted
    WouldInsert { score: u8 },

    /// Dry run: would have replaced the URL of an existing entry
    WouldOverwrite {
        entry_id: i64,
        previous_url: String,
        score: u8,
    },
}

impl SourceDisposition {
    /// Whether this outcome represents an accepted papers page.
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            Self::Inserted { .. }
                | Self::Overwrote { .. }
                | Self::WouldInsert { .. }
                | Self::WouldOverwrite { .. }
        )
    }
}

/// One candidate URL and its disposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateOutcome {
    pub url: String,
    pub disposition: SourceDisposition,
}

/// Summary of a completed discovery attempt for one subject.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryReport {
    pub subject: String,
    pub query: String,
    pub outcomes: Vec<CandidateOutcome>,
}

impl DiscoveryReport {
    pub fn new(subject: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            query: query.into(),
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, url: impl Into<String>, disposition: SourceDisposition) {
        self.outcomes.push(CandidateOutcome {
            url: url.into(),
            disposition,
        });
    }

    /// URLs accepted as papers pages during this attempt.
    pub fn accepted_urls(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.disposition.is_accepted())
            .map(|o| o.url.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        let at = ScoredSource::new("https://a.org/papers", "Jane Doe", "", 75);
        let below = ScoredSource::new("https://a.org/papers", "Jane Doe", "", 74);
        assert!(at.is_accepted(ACCEPT_THRESHOLD));
        assert!(!below.is_accepted(ACCEPT_THRESHOLD));
    }

    #[test]
    fn test_display_name() {
        let source = ScoredSource::new("https://a.org", "Jane Doe", "", 90);
        assert_eq!(source.display_name, "Jane Doe's site");
        assert_eq!(source.to_new_source().name, "Jane Doe's site");
    }

    #[test]
    fn test_accepted_urls() {
        let mut report = DiscoveryReport::new("Jane Doe", "\"Jane Doe\"");
        report.record("https://a.org", SourceDisposition::BadUrl);
        report.record("https://b.org", SourceDisposition::Inserted { id: 1, score: 80 });
        report.record("https://c.org", SourceDisposition::LowScore { score: 20 });
        assert_eq!(report.accepted_urls(), vec!["https://b.org"]);
    }
}
