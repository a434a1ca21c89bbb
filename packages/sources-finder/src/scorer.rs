//! Scoring of fetched pages: how likely is this a papers page for the subject?
//!
//! The weights below are a heuristic. The pipeline only relies on the
//! result being in `0..=100` and compares it against the acceptance
//! threshold.

use scraper::{Html, Selector};

/// Computes a 0-100 likelihood that a page lists the subject's papers.
pub trait PageScorer: Send + Sync {
    fn score(&self, html: &str, subject_name: &str, known_titles: &[String]) -> u8;
}

/// Words that papers pages tend to put in their title or headings.
pub const LISTING_KEYWORDS: &[&str] = &[
    "papers",
    "publications",
    "research",
    "writings",
    "forthcoming",
    "work in progress",
    "works in progress",
    "drafts",
];

/// Markers of pages that mention papers but are something else.
pub const OFF_TOPIC_MARKERS: &[&str] = &[
    "curriculum vitae",
    "syllabus",
    "course schedule",
    "call for papers",
    "conference program",
];

const DOC_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx", ".ps", ".rtf", ".odt"];

/// Raw observations about a page, before weighting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSignals {
    /// Full subject name in the page title or a heading
    pub name_in_heading: bool,
    /// Full name or last name anywhere in the text
    pub name_in_text: bool,
    /// Listing keyword in the page title or a heading
    pub keyword_in_heading: bool,
    /// Listing keyword anywhere in the text
    pub keyword_in_text: bool,
    /// Total number of links
    pub links: usize,
    /// Links to document files
    pub doc_links: usize,
    /// Links whose anchor text looks like a title
    pub title_like_anchors: usize,
    /// Known publication titles found verbatim in the text
    pub known_title_hits: usize,
    /// Off-topic marker in the page title or a heading
    pub off_topic: bool,
    /// Number of words in the body text
    pub words: usize,
}

impl PageSignals {
    /// Collect signals from a page.
    pub fn collect(html: &str, subject_name: &str, known_titles: &[String]) -> Self {
        let document = Html::parse_document(html);
        let mut signals = Self::default();

        let name = subject_name.to_lowercase();
        let last_name = name.split_whitespace().last().unwrap_or_default().to_string();

        let headings = selected_text(&document, "title, h1, h2, h3").to_lowercase();
        let text = selected_text(&document, "body").to_lowercase();

        signals.words = text.split_whitespace().count();
        signals.name_in_heading = !name.is_empty() && headings.contains(&name);
        signals.name_in_text = !last_name.is_empty() && (text.contains(&name) || text.contains(&last_name));
        signals.keyword_in_heading = LISTING_KEYWORDS.iter().any(|k| headings.contains(k));
        signals.keyword_in_text = LISTING_KEYWORDS.iter().any(|k| text.contains(k));
        signals.off_topic = OFF_TOPIC_MARKERS.iter().any(|m| headings.contains(m));

        signals.known_title_hits = known_titles
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| t.chars().count() >= 8 && text.contains(t.as_str()))
            .count();

        if let Ok(link_selector) = Selector::parse("a[href]") {
            for link in document.select(&link_selector) {
                signals.links += 1;

                let href = link.value().attr("href").unwrap_or_default().to_lowercase();
                let path = href.split(['?', '#']).next().unwrap_or_default();
                if DOC_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
                    signals.doc_links += 1;
                }

                let anchor: String = link.text().collect();
                if anchor.split_whitespace().count() >= 4 {
                    signals.title_like_anchors += 1;
                }
            }
        }

        signals
    }

    /// Weighted score, clamped to `0..=100`.
    pub fn score(&self) -> u8 {
        let mut score: i32 = 0;

        if self.name_in_heading {
            score += 15;
        } else if self.name_in_text {
            score += 8;
        }

        if self.keyword_in_heading {
            score += 15;
        } else if self.keyword_in_text {
            score += 8;
        }

        score += (self.doc_links.min(8) * 4) as i32;
        score += (self.known_title_hits.min(3) * 12) as i32;
        score += (self.title_like_anchors.min(10) * 2) as i32;

        if self.links == 0 {
            score -= 40;
        }
        if self.off_topic {
            score -= 20;
        }
        // One long essay with hardly any links
        if self.words > 3000 && self.links < 5 {
            score -= 20;
        }

        score.clamp(0, 100) as u8
    }
}

fn selected_text(document: &Html, selector: &str) -> String {
    let Ok(selector) = Selector::parse(selector) else {
        return String::new();
    };
    document
        .select(&selector)
        .flat_map(|el| el.text())
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Default scorer built on [`PageSignals`].
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn new() -> Self {
        Self
    }
}

impl PageScorer for HeuristicScorer {
    fn score(&self, html: &str, subject_name: &str, known_titles: &[String]) -> u8 {
        PageSignals::collect(html, subject_name, known_titles).score()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAPERS_PAGE: &str = r#"<html>
        <head><title>Jane Doe - Papers</title></head>
        <body>
            <h1>Jane Doe</h1>
            <h2>Publications</h2>
            <ul>
                <li><a href="modal.pdf">On Modal Realism and Its Critics</a> (2015)</li>
                <li><a href="worlds.pdf">Worlds Apart: A Reply to Roe</a> (2018)</li>
                <li><a href="counterparts.pdf">Counterparts and Trans-World Identity</a></li>
                <li><a href="draft.docx?v=2">Draft: Possibility Without Worlds Revisited</a></li>
            </ul>
            <h2>Work in progress</h2>
            <ul><li><a href="wip.pdf">A Paper About Something Else Entirely</a></li></ul>
        </body></html>"#;

    fn titles() -> Vec<String> {
        vec!["On Modal Realism".to_string(), "Worlds Apart".to_string()]
    }

    #[test]
    fn test_papers_page_scores_high() {
        let score = HeuristicScorer::new().score(PAPERS_PAGE, "Jane Doe", &titles());
        assert!(score >= 75, "score was {}", score);
    }

    #[test]
    fn test_signals() {
        let signals = PageSignals::collect(PAPERS_PAGE, "Jane Doe", &titles());
        assert!(signals.name_in_heading);
        assert!(signals.keyword_in_heading);
        assert_eq!(signals.links, 5);
        assert_eq!(signals.doc_links, 5);
        assert_eq!(signals.title_like_anchors, 5);
        assert_eq!(signals.known_title_hits, 2);
        assert!(!signals.off_topic);
    }

    #[test]
    fn test_page_without_links_scores_low() {
        let html = "<html><head><title>Jane Doe</title></head><body><p>Jane Doe works on modality.</p></body></html>";
        let score = HeuristicScorer::new().score(html, "Jane Doe", &titles());
        assert!(score < 75, "score was {}", score);
    }

    #[test]
    fn test_long_prose_scores_low() {
        let prose = "modal realism is the view that ".repeat(700);
        let html = format!(
            "<html><head><title>Research blog</title></head><body><p>{}</p><a href='/'>home</a></body></html>",
            prose
        );
        let score = HeuristicScorer::new().score(&html, "Jane Doe", &[]);
        assert!(score < 75, "score was {}", score);
    }

    #[test]
    fn test_off_topic_marker_penalized() {
        let syllabus = PAPERS_PAGE.replace("Jane Doe - Papers", "Jane Doe - Syllabus");
        let papers = HeuristicScorer::new().score(PAPERS_PAGE, "Jane Doe", &titles());
        let course = HeuristicScorer::new().score(&syllabus, "Jane Doe", &titles());
        assert!(course < papers);
    }

    #[test]
    fn test_score_is_clamped() {
        let signals = PageSignals {
            links: 0,
            off_topic: true,
            words: 10_000,
            ..Default::default()
        };
        assert_eq!(signals.score(), 0);

        let signals = PageSignals {
            name_in_heading: true,
            keyword_in_heading: true,
            links: 50,
            doc_links: 50,
            title_like_anchors: 50,
            known_title_hits: 10,
            ..Default::default()
        };
        assert_eq!(signals.score(), 100);
    }
}
