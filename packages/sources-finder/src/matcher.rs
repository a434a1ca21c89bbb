//! Known publications of a subject, looked up in a bibliographic source.
//!
//! Author lists in bibliographic records rarely spell a name exactly the
//! way we store it ("J. Doe" vs "Jane Doe"), so matching comes in a strict
//! and a lenient flavour.

use tracing::{debug, warn};

use crate::error::BibliographyResult;
use crate::extract::{PhilPapersExtractor, RecordExtractor};
use crate::traits::bibliography::BibliographySource;
use crate::types::subject::Publication;

/// Longest title we keep, in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// Name matching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    /// Byte-identical names only.
    Strict,

    /// Same last name; first names equal or one is an initial of the other.
    Lenient,
}

impl NameMatch {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::Lenient
        }
    }
}

/// Whether `found` (an author name from a record) matches `queried`.
pub fn names_match(mode: NameMatch, queried: &str, found: &str) -> bool {
    match mode {
        NameMatch::Strict => queried == found,
        NameMatch::Lenient => lenient_match(queried, found),
    }
}

fn lenient_match(a: &str, b: &str) -> bool {
    let a_parts: Vec<&str> = a.split_whitespace().collect();
    let b_parts: Vec<&str> = b.split_whitespace().collect();

    let (Some(a_first), Some(a_last)) = (a_parts.first(), a_parts.last()) else {
        return false;
    };
    let (Some(b_first), Some(b_last)) = (b_parts.first(), b_parts.last()) else {
        return false;
    };

    if a_last != b_last {
        return false;
    }
    if a_first == b_first {
        return true;
    }

    // An initial ("J" or "J.") matches any first name with the same first letter.
    let is_initial = |s: &str| s.chars().count() <= 2;
    (is_initial(a_first) || is_initial(b_first)) && a_first.chars().next() == b_first.chars().next()
}

/// Clean up a title from a bibliographic record.
///
/// Over-long titles are cut and marked with `...`; a single trailing `.`
/// (PhilPapers ends unpunctuated titles with one) is removed. Applying
/// this twice gives the same result as applying it once.
pub fn normalize_title(title: &str) -> String {
    let mut title = if title.chars().count() > MAX_TITLE_LEN {
        let mut cut: String = title.chars().take(MAX_TITLE_LEN - 3).collect();
        cut.push_str("...");
        cut
    } else {
        title.to_string()
    };

    if title.ends_with('.') && !title.ends_with("..") {
        title.pop();
    }
    title
}

/// Looks up a subject's publications and keeps those the subject authored.
pub struct PublicationMatcher<B: BibliographySource> {
    source: B,
    extractor: Box<dyn RecordExtractor>,
}

impl<B: BibliographySource> PublicationMatcher<B> {
    /// Create a matcher that parses PhilPapers result pages.
    pub fn new(source: B) -> Self {
        Self {
            source,
            extractor: Box::new(PhilPapersExtractor::new()),
        }
    }

    /// Use a different record extractor.
    pub fn with_extractor(mut self, extractor: impl RecordExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Publications of `name` as `(title, year)` pairs.
    ///
    /// A failing lookup is logged and treated as "nothing known".
    pub async fn get_publications(&self, name: &str, strict: bool) -> Vec<Publication> {
        match self.try_get_publications(name, strict).await {
            Ok(publications) => publications,
            Err(e) => {
                warn!(subject = %name, error = %e, "bibliographic lookup failed");
                Vec::new()
            }
        }
    }

    /// Like [`get_publications`](Self::get_publications) but surfaces lookup errors.
    pub async fn try_get_publications(
        &self,
        name: &str,
        strict: bool,
    ) -> BibliographyResult<Vec<Publication>> {
        let document = self.source.search(name).await?;
        let mode = NameMatch::from_strict(strict);

        let publications: Vec<Publication> = self
            .extractor
            .extract_entries(&document)
            .into_iter()
            .filter(|record| {
                let matched = record.authors.iter().any(|a| names_match(mode, name, a));
                if !matched {
                    debug!(title = %record.title, authors = ?record.authors, "no author match");
                }
                matched
            })
            .map(|record| {
                let publication = Publication::new(normalize_title(&record.title));
                match record.year {
                    Some(year) => publication.with_year(year),
                    None => publication,
                }
            })
            .collect();

        debug!(subject = %name, count = publications.len(), "known publications");
        Ok(publications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::bibliography::MockBibliography;
    use proptest::prelude::*;

    #[test]
    fn test_strict_match() {
        assert!(names_match(NameMatch::Strict, "John Smith", "John Smith"));
        assert!(!names_match(NameMatch::Strict, "J Smith", "John Smith"));
        assert!(!names_match(NameMatch::Strict, "john smith", "John Smith"));
    }

    #[test]
    fn test_lenient_match() {
        assert!(names_match(NameMatch::Lenient, "J. Smith", "John Smith"));
        assert!(names_match(NameMatch::Lenient, "John Smith", "J. Smith"));
        assert!(names_match(NameMatch::Lenient, "John Smith", "John Q. Smith"));
        assert!(names_match(NameMatch::Lenient, "J Smith", "John Smith"));
        assert!(!names_match(NameMatch::Lenient, "K. Smith", "John Smith"));
        assert!(!names_match(NameMatch::Lenient, "John Smith", "John Smyth"));
        assert!(names_match(NameMatch::Lenient, "Jo Smith", "Jane Smith"));
        assert!(!names_match(NameMatch::Lenient, "Joe Smith", "Jane Smith"));
    }

    #[test]
    fn test_lenient_empty_names_never_match() {
        assert!(!names_match(NameMatch::Lenient, "", ""));
        assert!(!names_match(NameMatch::Lenient, "   ", "John Smith"));
        assert!(!names_match(NameMatch::Lenient, "John Smith", ""));
    }

    #[test]
    fn test_normalize_title_strips_single_dot() {
        assert_eq!(normalize_title("On Modal Realism."), "On Modal Realism");
        assert_eq!(normalize_title("Why Not?"), "Why Not?");
        assert_eq!(normalize_title("To be continued..."), "To be continued...");
        assert_eq!(normalize_title("Plain"), "Plain");
    }

    #[test]
    fn test_normalize_title_truncates() {
        let long = "x".repeat(300);
        let title = normalize_title(&long);
        assert_eq!(title.chars().count(), MAX_TITLE_LEN);
        assert!(title.ends_with("..."));
    }

    #[tokio::test]
    async fn test_get_publications_filters_by_author() {
        let doc = r#"<ol>
            <li class='entry'><span class='name'>J. Doe</span>
                <span class='articleTitle'>On Modal Realism.</span><span class="pubYear">2015</span></li>
            <li class='entry'><span class='name'>Richard Roe</span>
                <span class='articleTitle'>Someone Else's Paper.</span><span class="pubYear">2001</span></li>
            <li class='entry'><span class='name'>Jane Doe</span>
                <span class='articleTitle'>Worlds Apart</span><span class="pubYear">forthcoming</span></li>
        </ol>"#;
        let matcher = PublicationMatcher::new(MockBibliography::new().with_document("Jane Doe", doc));

        let lenient = matcher.get_publications("Jane Doe", false).await;
        assert_eq!(
            lenient,
            vec![
                Publication::new("On Modal Realism").with_year("2015"),
                Publication::new("Worlds Apart"),
            ]
        );

        let strict = matcher.get_publications("Jane Doe", true).await;
        assert_eq!(strict, vec![Publication::new("Worlds Apart")]);
    }

    #[test]
    fn test_failed_lookup_is_empty() {
        let matcher = PublicationMatcher::new(MockBibliography::new().failing());
        assert!(tokio_test::block_on(matcher.get_publications("Jane Doe", false)).is_empty());
        assert!(tokio_test::block_on(matcher.try_get_publications("Jane Doe", false)).is_err());
    }

    fn name() -> impl Strategy<Value = String> {
        ("[A-Z][a-z]{0,6}\\.?", "[A-Z][a-z]{1,8}").prop_map(|(first, last)| format!("{} {}", first, last))
    }

    proptest! {
        #[test]
        fn prop_lenient_is_symmetric(a in name(), b in name()) {
            prop_assert_eq!(
                names_match(NameMatch::Lenient, &a, &b),
                names_match(NameMatch::Lenient, &b, &a)
            );
        }

        #[test]
        fn prop_normalize_title_idempotent(title in ".{0,300}") {
            let once = normalize_title(&title);
            prop_assert_eq!(normalize_title(&once), once.clone());
            prop_assert!(once.chars().count() <= MAX_TITLE_LEN);
        }
    }
}
