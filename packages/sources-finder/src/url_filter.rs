//! Pre-fetch URL admission.
//!
//! Rejects search results that can't be somebody's papers page: overlong
//! URLs, PDFs, and anything on the blacklist of publishers, citation
//! indices, encyclopedias, social networks, shops and event listings.
//! Runs before any network fetch.

use std::path::Path;

use crate::error::{DiscoveryError, Result};

/// Built-in blacklist of lower-case URL fragments.
pub const DEFAULT_BAD_URL_PARTS: &[&str] = &[
    "academia.edu",
    "jstor.org",
    "springer.com",
    "wiley.com",
    "journals.org",
    "tandfonline.com",
    "ssrn.com",
    "oup.com",
    "mitpress.mit.edu",
    "plato.stanford.edu",
    "scribd.com",
    "archive.org",
    "philsci-archive.pitt",
    "umich.edu/e/ergo",
    "cambridge.org",
    "hugendubel.",
    "dblp.uni-trier",
    "dblp.org",
    "citec.repec.org",
    "publicationslist.org",
    "philarchive.org",
    "aristoteliansociety.org.uk/the-proceedings",
    "semanticscholar.org",
    "oalib.com",
    "academia-net",
    "/portal/en/", // PURE
    "wikipedia.",
    "wikivisually.",
    "wikivividly.",
    "researchgate.net",
    "scholar.google",
    "books.google",
    "philpapers.",
    "philx.org",
    "philpeople.",
    "ratemyprofessors.",
    "amazon.",
    "twitter.",
    "goodreads.",
    "pinterest.com",
    "ebay.",
    "dailynous.com",
    "ipfs.io/",
    "philostv.com",
    "opp.weatherson",
    "typepad.com/blog/20",
    "m-phi.blogspot.de",
    "blogspot.com/20",
    "whatisitliketobeaphilosopher.com",
    "workshop",
    "colloquium",
    "courses",
    "/teaching",
    "conference",
    "/news/",
    "/events/",
    "/event/",
    "/call",
    "/search",
    "/lookup",
];

/// Blacklist plus structural checks for candidate URLs.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    bad_parts: Vec<String>,
    max_len: usize,
}

impl Default for UrlFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlFilter {
    /// Filter with the built-in blacklist and a 255 character limit.
    pub fn new() -> Self {
        Self {
            bad_parts: DEFAULT_BAD_URL_PARTS.iter().map(|s| s.to_string()).collect(),
            max_len: 255,
        }
    }

    /// Filter with no blacklist entries, only the structural checks.
    pub fn empty() -> Self {
        Self {
            bad_parts: Vec::new(),
            max_len: 255,
        }
    }

    /// Set the maximum URL length.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Add blacklist fragments.
    pub fn with_parts(mut self, parts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for part in parts {
            let part = part.into().trim().to_lowercase();
            if !part.is_empty() && !self.bad_parts.contains(&part) {
                self.bad_parts.push(part);
            }
        }
        self
    }

    /// Add fragments from blacklist text: one per line, `#` starts a comment.
    pub fn with_blacklist_text(self, text: &str) -> Self {
        let parts: Vec<&str> = text
            .lines()
            .map(|line| line.split('#').next().unwrap_or("").trim())
            .filter(|line| !line.is_empty())
            .collect();
        self.with_parts(parts)
    }

    /// Add fragments from a blacklist file.
    pub fn with_blacklist_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DiscoveryError::Config {
            reason: format!("cannot read blacklist {}: {}", path.display(), e),
        })?;
        Ok(self.with_blacklist_text(&text))
    }

    /// Current blacklist fragments.
    pub fn parts(&self) -> &[String] {
        &self.bad_parts
    }

    /// True if the URL is too long, points at a PDF, or hits the blacklist.
    pub fn is_bad(&self, url: &str) -> bool {
        if url.chars().count() > self.max_len {
            return true;
        }
        let lower = url.to_lowercase();
        if Self::is_pdf(&lower) {
            return true;
        }
        self.bad_parts.iter().any(|part| lower.contains(part.as_str()))
    }

    fn is_pdf(lower: &str) -> bool {
        let path = match url::Url::parse(lower) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => lower.to_string(),
        };
        path.ends_with(".pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_good_urls_pass() {
        let filter = UrlFilter::new();
        assert!(!filter.is_bad("https://sites.google.com/site/janedoe/papers"));
        assert!(!filter.is_bad("http://www.umsu.de/papers/"));
        assert!(!filter.is_bad("http://brian.weatherson.org/papers.html"));
    }

    #[test]
    fn test_blacklisted_hosts_and_paths() {
        let filter = UrlFilter::new();
        assert!(filter.is_bad("https://philpapers.org/s/Jane%20Doe"));
        assert!(filter.is_bad("https://en.WIKIPEDIA.org/wiki/Jane_Doe"));
        assert!(filter.is_bad("https://uni.edu/~doe/teaching/phil101"));
        assert!(filter.is_bad("https://uni.edu/events/2019/workshop"));
        assert!(filter.is_bad("https://www.amazon.com/dp/0199"));
    }

    #[test]
    fn test_pdf_rejected() {
        let filter = UrlFilter::empty();
        assert!(filter.is_bad("https://uni.edu/~doe/cv.pdf"));
        assert!(filter.is_bad("https://uni.edu/~doe/paper.PDF"));
        assert!(filter.is_bad("https://uni.edu/~doe/paper.pdf?download=1"));
        assert!(!filter.is_bad("https://uni.edu/~doe/pdfs/"));
    }

    #[test]
    fn test_length_limit() {
        let filter = UrlFilter::empty();
        let base = "https://uni.edu/";
        let ok = format!("{}{}", base, "a".repeat(255 - base.len()));
        let too_long = format!("{}a", ok);
        assert!(!filter.is_bad(&ok));
        assert!(filter.is_bad(&too_long));
    }

    #[test]
    fn test_blacklist_text_extends_list() {
        let filter = UrlFilter::empty().with_blacklist_text(
            "# extra entries\nexample-shop.com\n\n  /Seminars/  # trailing comment\n",
        );
        assert_eq!(filter.parts(), &["example-shop.com", "/seminars/"]);
        assert!(filter.is_bad("https://example-shop.com/doe"));
        assert!(filter.is_bad("https://uni.edu/seminars/doe"));
        assert!(!filter.is_bad("https://uni.edu/doe"));
    }

    #[test]
    fn test_missing_blacklist_file_is_config_error() {
        let err = UrlFilter::new()
            .with_blacklist_file("/nonexistent/blacklist.txt")
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Config { .. }));
    }

    proptest! {
        #[test]
        fn prop_blacklisted_part_always_rejected(
            idx in 0..DEFAULT_BAD_URL_PARTS.len(),
            prefix in "[a-z]{0,10}",
            suffix in "[a-z/]{0,10}",
            upper in any::<bool>(),
        ) {
            let part = DEFAULT_BAD_URL_PARTS[idx];
            let part = if upper { part.to_uppercase() } else { part.to_string() };
            let url = format!("https://{}{}{}", prefix, part, suffix);
            prop_assert!(UrlFilter::new().is_bad(&url));
        }

        #[test]
        fn prop_overlong_always_rejected(extra in 1usize..200) {
            let url = format!("https://uni.edu/{}", "x".repeat(255 + extra));
            prop_assert!(UrlFilter::empty().is_bad(&url));
        }

        #[test]
        fn prop_pdf_always_rejected(name in "[a-z0-9_-]{1,20}") {
            let url = format!("https://uni.edu/{}.pdf", name);
            prop_assert!(UrlFilter::empty().is_bad(&url));
        }
    }
}
