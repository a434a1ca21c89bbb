//! Record extraction from bibliographic result documents.
//!
//! A [`RecordExtractor`] turns the raw document handed back by a
//! [`BibliographySource`](crate::traits::bibliography::BibliographySource)
//! into plain records. Matching and title cleanup happen elsewhere, so
//! swapping the parser never touches that logic.

use scraper::{ElementRef, Html, Selector};

/// One bibliographic record as it appears in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibRecord {
    /// Raw title text (not yet normalized)
    pub title: String,

    /// Author names in document order
    pub authors: Vec<String>,

    /// Raw year text, if present
    pub year: Option<String>,
}

/// Parses a result document into records.
pub trait RecordExtractor: Send + Sync {
    /// Extract all records. A document without any entry marker yields none.
    fn extract_entries(&self, document: &str) -> Vec<BibRecord>;
}

/// Extractor for PhilPapers search result pages.
///
/// Each record is an element with class `entry`; inside it the title sits
/// in `.articleTitle`, authors in `.name` and the year in `.pubYear`.
/// Entries without a title are skipped.
#[derive(Debug, Clone, Default)]
pub struct PhilPapersExtractor;

impl PhilPapersExtractor {
    pub fn new() -> Self {
        Self
    }

    fn record(entry: ElementRef<'_>, selectors: &EntrySelectors) -> Option<BibRecord> {
        let title = entry
            .select(&selectors.title)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())?;

        let authors = entry
            .select(&selectors.name)
            .map(element_text)
            .filter(|n| !n.is_empty())
            .collect();

        let year = entry
            .select(&selectors.year)
            .next()
            .map(element_text)
            .filter(|y| !y.is_empty());

        Some(BibRecord {
            title,
            authors,
            year,
        })
    }
}

struct EntrySelectors {
    entry: Selector,
    title: Selector,
    name: Selector,
    year: Selector,
}

impl EntrySelectors {
    fn new() -> Option<Self> {
        Some(Self {
            entry: Selector::parse(".entry").ok()?,
            title: Selector::parse(".articleTitle").ok()?,
            name: Selector::parse(".name").ok()?,
            year: Selector::parse(".pubYear").ok()?,
        })
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl RecordExtractor for PhilPapersExtractor {
    fn extract_entries(&self, document: &str) -> Vec<BibRecord> {
        let Some(selectors) = EntrySelectors::new() else {
            return Vec::new();
        };

        let html = Html::parse_document(document);
        html.select(&selectors.entry)
            .filter_map(|entry| Self::record(entry, &selectors))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS: &str = r#"<html><body><ol>
        <li class='entry'>
            <span class='citation'>
                <span class='name'>Jane Doe</span> &amp; <span class='name'>Richard Roe</span>
                <span class='articleTitle recTitle'>On Modal Realism.</span>
                <span class="pubYear">2015</span>
            </span>
        </li>
        <li class='entry'>
            <span class='name'>J. Doe</span>
            <span class='articleTitle recTitle'>Counterparts   and
                Worlds</span>
            <span class="pubYear">forthcoming</span>
        </li>
        <li class='entry'>
            <span class='name'>No Title</span>
        </li>
    </ol></body></html>"#;

    #[test]
    fn test_extracts_records() {
        let records = PhilPapersExtractor::new().extract_entries(RESULTS);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].title, "On Modal Realism.");
        assert_eq!(records[0].authors, vec!["Jane Doe", "Richard Roe"]);
        assert_eq!(records[0].year.as_deref(), Some("2015"));

        assert_eq!(records[1].title, "Counterparts and Worlds");
        assert_eq!(records[1].authors, vec!["J. Doe"]);
        assert_eq!(records[1].year.as_deref(), Some("forthcoming"));
    }

    #[test]
    fn test_no_entry_marker_means_no_records() {
        let doc = "<html><body><p>No results found.</p><span class='articleTitle'>Stray</span></body></html>";
        assert!(PhilPapersExtractor::new().extract_entries(doc).is_empty());
        assert!(PhilPapersExtractor::new().extract_entries("").is_empty());
    }
}
