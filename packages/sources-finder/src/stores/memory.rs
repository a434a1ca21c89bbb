//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::RwLock;

use crate::error::StoreResult;
use crate::normalize::same_site;
use crate::rate::breaker::BreakerMarker;
use crate::traits::store::{MarkerStore, SourceStore, SubjectStore};
use crate::types::{
    source::{CatalogueEntry, NewSource},
    subject::Subject,
};

/// In-memory catalogue of subjects and source pages.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
pub struct MemoryStore {
    subjects: RwLock<Vec<Subject>>,
    sources: RwLock<Vec<CatalogueEntry>>,
    next_id: RwLock<i64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            subjects: RwLock::new(Vec::new()),
            sources: RwLock::new(Vec::new()),
            next_id: RwLock::new(1),
        }
    }

    /// Add (or replace) a subject.
    pub fn add_subject(&self, subject: Subject) {
        let mut subjects = self.subjects.write().unwrap();
        subjects.retain(|s| s.name != subject.name);
        subjects.push(subject);
    }

    /// Builder-style [`add_subject`](Self::add_subject).
    pub fn with_subject(self, subject: Subject) -> Self {
        self.add_subject(subject);
        self
    }

    /// Seed a catalogue entry directly; returns its id.
    pub fn add_entry(&self, source: &NewSource) -> i64 {
        let mut sources = self.sources.write().unwrap();
        self.push_entry(&mut sources, source)
    }

    // Callers hold the `sources` write lock.
    fn push_entry(&self, sources: &mut Vec<CatalogueEntry>, source: &NewSource) -> i64 {
        let mut next_id = self.next_id.write().unwrap();
        let id = *next_id;
        *next_id += 1;

        sources.push(CatalogueEntry {
            id,
            url: source.url.clone(),
            subject_name: source.subject_name.clone(),
            name: source.name.clone(),
            created_at: Utc::now(),
        });
        id
    }

    /// Look up a subject by name.
    pub fn subject(&self, name: &str) -> Option<Subject> {
        self.subjects
            .read()
            .unwrap()
            .iter()
            .find(|s| s.name == name)
            .cloned()
    }

    /// All catalogue entries in id order.
    pub fn entries(&self) -> Vec<CatalogueEntry> {
        self.sources.read().unwrap().clone()
    }

    /// Get the number of catalogue entries.
    pub fn entry_count(&self) -> usize {
        self.sources.read().unwrap().len()
    }
}

#[async_trait]
impl SubjectStore for MemoryStore {
    async fn stale_subjects(&self, limit: usize) -> StoreResult<Vec<Subject>> {
        let mut subjects: Vec<Subject> = self
            .subjects
            .read()
            .unwrap()
            .iter()
            .filter(|s| s.is_name)
            .cloned()
            .collect();

        // Stable sort keeps insertion order among ties; None sorts first.
        subjects.sort_by_key(|s| s.last_searched);
        subjects.truncate(limit);
        Ok(subjects)
    }

    async fn touch_subject(&self, name: &str) -> StoreResult<()> {
        let now = Utc::now();
        if let Some(subject) = self
            .subjects
            .write()
            .unwrap()
            .iter_mut()
            .find(|s| s.name == name)
        {
            subject.last_searched = Some(now);
        }
        Ok(())
    }
}

#[async_trait]
impl SourceStore for MemoryStore {
    async fn url_known(&self, url: &str) -> StoreResult<bool> {
        Ok(self.sources.read().unwrap().iter().any(|e| e.url == url))
    }

    async fn entries_for_subject(&self, subject_name: &str) -> StoreResult<Vec<CatalogueEntry>> {
        Ok(self
            .sources
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.subject_name == subject_name)
            .cloned()
            .collect())
    }

    async fn insert_source(&self, source: &NewSource) -> StoreResult<i64> {
        Ok(self.add_entry(source))
    }

    async fn insert_if_new_site(&self, source: &NewSource) -> StoreResult<Option<i64>> {
        let mut sources = self.sources.write().unwrap();
        let duplicate = sources
            .iter()
            .any(|e| e.subject_name == source.subject_name && same_site(&e.url, &source.url));
        if duplicate {
            return Ok(None);
        }
        Ok(Some(self.push_entry(&mut sources, source)))
    }

    async fn replace_url(&self, id: i64, expected_url: &str, new_url: &str) -> StoreResult<bool> {
        let mut sources = self.sources.write().unwrap();
        match sources.iter_mut().find(|e| e.id == id) {
            Some(entry) if entry.url == expected_url => {
                entry.url = new_url.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// In-memory circuit-breaker marker.
#[derive(Default)]
pub struct MemoryMarkerStore {
    marker: RwLock<Option<BreakerMarker>>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a marker in place directly.
    pub fn set(&self, marker: BreakerMarker) {
        *self.marker.write().unwrap() = Some(marker);
    }

    /// The current marker, if any.
    pub fn marker(&self) -> Option<BreakerMarker> {
        self.marker.read().unwrap().clone()
    }
}

#[async_trait]
impl MarkerStore for MemoryMarkerStore {
    async fn load(&self) -> StoreResult<Option<BreakerMarker>> {
        Ok(self.marker())
    }

    async fn save(&self, marker: &BreakerMarker) -> StoreResult<()> {
        self.set(marker.clone());
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        *self.marker.write().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn source(url: &str, subject: &str) -> NewSource {
        NewSource {
            url: url.to_string(),
            subject_name: subject.to_string(),
            name: format!("{}'s site", subject),
        }
    }

    #[tokio::test]
    async fn test_stale_subjects_order() {
        let now = Utc::now();
        let store = MemoryStore::new()
            .with_subject(Subject::new("Old").with_last_searched(now - Duration::days(30)))
            .with_subject(Subject::new("Recent").with_last_searched(now - Duration::days(1)))
            .with_subject(Subject::new("Never"))
            .with_subject(Subject::new("Philosophy Department").not_a_name());

        let names: Vec<_> = store
            .stale_subjects(10)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Never", "Old", "Recent"]);

        assert_eq!(store.stale_subjects(1).await.unwrap()[0].name, "Never");
    }

    #[tokio::test]
    async fn test_touch_subject() {
        let store = MemoryStore::new().with_subject(Subject::new("Jane Doe"));
        store.touch_subject("Jane Doe").await.unwrap();
        assert!(store.subject("Jane Doe").unwrap().last_searched.is_some());
    }

    #[tokio::test]
    async fn test_touch_unknown_subject_adds_nothing() {
        let store = MemoryStore::new();
        store.touch_subject("Typo Nmae").await.unwrap();
        assert!(store.subject("Typo Nmae").is_none());
        assert!(store.stale_subjects(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_source_storage() {
        let store = MemoryStore::new();
        let id = store
            .insert_source(&source("https://uni.edu/~doe/papers", "Jane Doe"))
            .await
            .unwrap();
        store
            .insert_source(&source("https://other.org/", "Richard Roe"))
            .await
            .unwrap();

        assert!(store.url_known("https://uni.edu/~doe/papers").await.unwrap());
        assert!(!store.url_known("https://uni.edu/~doe/").await.unwrap());

        let entries = store.entries_for_subject("Jane Doe").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].name, "Jane Doe's site");
    }

    #[tokio::test]
    async fn test_replace_url_is_compare_and_swap() {
        let store = MemoryStore::new();
        let id = store.add_entry(&source("http://uni.edu/~doe/papers", "Jane Doe"));

        assert!(!store
            .replace_url(id, "http://wrong.example/", "https://uni.edu/~doe/papers")
            .await
            .unwrap());
        assert!(store
            .replace_url(id, "http://uni.edu/~doe/papers", "https://uni.edu/~doe/papers")
            .await
            .unwrap());
        assert_eq!(store.entries()[0].url, "https://uni.edu/~doe/papers");
    }

    #[tokio::test]
    async fn test_find_duplicates() {
        let store = MemoryStore::new();
        store.add_entry(&source("http://www.uni.edu/~doe/papers/", "Jane Doe"));
        store.add_entry(&source("https://uni.edu/~doe/cv", "Jane Doe"));
        store.add_entry(&source("https://uni.edu/~doe/papers", "Richard Roe"));

        let dupes = store
            .find_duplicates("Jane Doe", "https://uni.edu/~doe/papers")
            .await
            .unwrap();
        assert_eq!(dupes.len(), 1);
        assert_eq!(dupes[0].url, "http://www.uni.edu/~doe/papers/");
    }

    #[tokio::test]
    async fn test_insert_if_new_site() {
        let store = MemoryStore::new();
        store.add_entry(&source("https://uni.edu/~doe/papers", "Richard Roe"));

        let id = store
            .insert_if_new_site(&source("http://www.uni.edu/~doe/papers/", "Jane Doe"))
            .await
            .unwrap();
        assert!(id.is_some());

        assert_eq!(
            store
                .insert_if_new_site(&source("https://uni.edu/~doe/papers", "Jane Doe"))
                .await
                .unwrap(),
            None
        );
        assert_eq!(store.entry_count(), 2);
    }

    #[tokio::test]
    async fn test_marker_store() {
        let store = MemoryMarkerStore::new();
        assert!(store.load().await.unwrap().is_none());

        store.save(&BreakerMarker::new(Utc::now())).await.unwrap();
        assert!(store.marker().is_some());

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
