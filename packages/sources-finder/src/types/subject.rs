//! Subjects (people whose papers pages we look for) and their publications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person whose papers page is being sought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Full name as used in search queries
    pub name: String,

    /// Whether this row is a real person name (rows flagged otherwise are never searched)
    pub is_name: bool,

    /// When a discovery attempt last completed for this subject
    pub last_searched: Option<DateTime<Utc>>,
}

impl Subject {
    /// Create a never-searched subject.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_name: true,
            last_searched: None,
        }
    }

    /// Set the last-searched timestamp.
    pub fn with_last_searched(mut self, at: DateTime<Utc>) -> Self {
        self.last_searched = Some(at);
        self
    }

    /// Mark this row as not being a person name.
    pub fn not_a_name(mut self) -> Self {
        self.is_name = false;
        self
    }
}

/// A publication known from the bibliographic source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    /// Normalized title
    pub title: String,

    /// Publication year, only kept when purely numeric
    pub year: Option<String>,
}

impl Publication {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year: None,
        }
    }

    /// Attach a year; anything that isn't all ASCII digits is dropped.
    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        let year = year.into();
        self.year = if !year.is_empty() && year.chars().all(|c| c.is_ascii_digit()) {
            Some(year)
        } else {
            None
        };
        self
    }
}

/// Collect the titles of a publication list, in order.
pub fn titles(publications: &[Publication]) -> Vec<String> {
    publications.iter().map(|p| p.title.clone()).collect()
}
