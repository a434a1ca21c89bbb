//! Bibliographic source: where known publications of a subject come from.
//!
//! The source only hands back the raw search-result document; turning it
//! into records is the job of a [`RecordExtractor`](crate::extract::RecordExtractor).

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

use crate::error::{BibliographyError, BibliographyResult};

/// Looks up an author name and returns the result document.
#[async_trait]
pub trait BibliographySource: Send + Sync {
    async fn search(&self, name: &str) -> BibliographyResult<String>;
}

/// PhilPapers search.
pub struct PhilPapersSource {
    client: reqwest::Client,
    base_url: String,
}

impl Default for PhilPapersSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PhilPapersSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://philpapers.org".to_string(),
        }
    }

    /// Use a different base URL (mirror or local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> BibliographyResult<Url> {
        Url::parse(&self.base_url).map_err(|e| BibliographyError::Http(Box::new(e)))
    }

    /// `<base>/s/<name>`, with the name as a single encoded path segment.
    pub fn search_url(&self, name: &str) -> BibliographyResult<Url> {
        let mut url = self.endpoint()?;
        url.path_segments_mut()
            .map_err(|_| BibliographyError::Http(format!("cannot-be-a-base URL {}", self.base_url).into()))?
            .pop_if_empty()
            .extend(["s", name]);
        Ok(url)
    }

    /// OAI-PMH `GetRecord` request for a record id.
    pub fn metadata_url(&self, doc_id: &str) -> BibliographyResult<Url> {
        let mut url = self.endpoint()?;
        url.path_segments_mut()
            .map_err(|_| BibliographyError::Http(format!("cannot-be-a-base URL {}", self.base_url).into()))?
            .pop_if_empty()
            .push("oai.pl");
        url.query_pairs_mut()
            .append_pair("verb", "GetRecord")
            .append_pair("identifier", doc_id);
        Ok(url)
    }

    async fn get(&self, url: Url) -> BibliographyResult<String> {
        debug!(url = %url, "bibliographic lookup");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BibliographyError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BibliographyError::Status {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| BibliographyError::Http(Box::new(e)))
    }

    /// Fetch title and authors of a PhilPapers record via OAI-PMH.
    pub async fn metadata(&self, doc_id: &str) -> BibliographyResult<Option<DocMetadata>> {
        let xml = self.get(self.metadata_url(doc_id)?).await?;
        Ok(parse_oai_record(&xml))
    }
}

#[async_trait]
impl BibliographySource for PhilPapersSource {
    async fn search(&self, name: &str) -> BibliographyResult<String> {
        self.get(self.search_url(name)?).await
    }
}

/// Title and authors ("First Last") of a bibliographic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocMetadata {
    pub title: String,
    pub authors: Vec<String>,
}

/// Parse an OAI-PMH Dublin Core record.
///
/// Creators are listed as "Last, First" and come back as "First Last".
/// Returns `None` when the record has no title or isn't well-formed XML.
pub fn parse_oai_record(xml: &str) -> Option<DocMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut title = None;
    let mut authors = Vec::new();
    let mut current: Option<Vec<u8>> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                if matches!(name.as_ref(), b"dc:title" | b"dc:creator") {
                    current = Some(name.as_ref().to_vec());
                    text.clear();
                }
            }
            Ok(Event::Text(e)) if current.is_some() => match e.unescape() {
                Ok(unescaped) => text.push_str(&unescaped),
                Err(err) => {
                    debug!(error = %err, "bad entity in OAI record");
                    return None;
                }
            },
            Ok(Event::CData(e)) if current.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(e)) => {
                if current.as_deref() == Some(e.name().as_ref()) {
                    let value = text.trim().to_string();
                    match e.name().as_ref() {
                        b"dc:title" if title.is_none() => title = Some(value),
                        b"dc:creator" => authors.push(creator_name(&value)),
                        _ => {}
                    }
                    current = None;
                    text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                debug!(position = reader.buffer_position(), error = %err, "malformed OAI record");
                return None;
            }
            _ => {}
        }
    }

    Some(DocMetadata {
        title: title?,
        authors,
    })
}

fn creator_name(creator: &str) -> String {
    match creator.split_once(", ") {
        Some((last, first)) => format!("{} {}", first.trim(), last.trim()),
        None => creator.to_string(),
    }
}

/// Extract the PhilPapers record id from a URL.
///
/// Checks an `id` query parameter first, then a `/<ID>.pdf` path ending.
pub fn philpapers_doc_id(url: &str) -> Option<String> {
    if let Ok(parsed) = url::Url::parse(url) {
        let params: HashMap<_, _> = parsed.query_pairs().collect();
        if let Some(id) = params.get("id") {
            return Some(id.to_string());
        }
        let last = parsed.path_segments()?.next_back()?;
        return last.strip_suffix(".pdf").map(str::to_string);
    }
    let last = url.rsplit('/').next()?;
    last.strip_suffix(".pdf").map(str::to_string)
}

/// Mock bibliographic source serving canned documents by name.
#[derive(Default)]
pub struct MockBibliography {
    documents: HashMap<String, String>,
    fail: bool,
}

impl MockBibliography {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, name: impl Into<String>, document: impl Into<String>) -> Self {
        self.documents.insert(name.into(), document.into());
        self
    }

    /// Make every lookup fail with a 503.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl BibliographySource for MockBibliography {
    async fn search(&self, name: &str) -> BibliographyResult<String> {
        if self.fail {
            return Err(BibliographyError::Status { status: 503 });
        }
        Ok(self.documents.get(name).cloned().unwrap_or_default())
    }
}
