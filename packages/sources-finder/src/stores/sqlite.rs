//! SQLite storage implementation.
//!
//! A file-based catalogue backend using SQLite. Good for:
//! - Running the finder from cron on a single machine
//! - Local development
//! - Testing with persistent data

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use crate::error::{StoreError, StoreResult};
use crate::normalize::same_site;
use crate::traits::store::{SourceStore, SubjectStore};
use crate::types::{
    source::{CatalogueEntry, NewSource},
    subject::Subject,
};

/// SQLite-based catalogue store.
pub struct SqliteStore {
    pool: SqlitePool,
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(Box::new(e))
}

/// Timestamps are stored as fixed-width RFC 3339 text so they sort correctly.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(text: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            reason: format!("invalid date {:?}: {}", text, e),
        })
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://./sources.db` - File-based database
    /// - `sqlite://./sources.db?mode=rwc` - Create if not exists
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        Self::connect(database_url, 5).await
    }

    /// Create an in-memory SQLite store (for testing).
    ///
    /// Uses a single connection; every new connection would see its own
    /// empty database.
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(backend)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subjects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                is_name INTEGER NOT NULL DEFAULT 1,
                last_searched TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_subjects_last_searched ON subjects(last_searched);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                subject_name TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sources_url ON sources(url);
            CREATE INDEX IF NOT EXISTS idx_sources_subject_name ON sources(subject_name);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Add a subject, or update the flags of an existing one.
    pub async fn add_subject(&self, subject: &Subject) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO subjects (name, is_name, last_searched)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                is_name = excluded.is_name,
                last_searched = excluded.last_searched
            "#,
        )
        .bind(&subject.name)
        .bind(subject.is_name)
        .bind(subject.last_searched.map(timestamp))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    /// Look up a subject by name.
    pub async fn subject(&self, name: &str) -> StoreResult<Option<Subject>> {
        let row: Option<SubjectRow> =
            sqlx::query_as("SELECT name, is_name, last_searched FROM subjects WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        row.map(SubjectRow::into_subject).transpose()
    }
}

// Row types for sqlx queries
#[derive(Debug, FromRow)]
struct SubjectRow {
    name: String,
    is_name: bool,
    last_searched: Option<String>,
}

impl SubjectRow {
    fn into_subject(self) -> StoreResult<Subject> {
        let last_searched = self.last_searched.as_deref().map(parse_timestamp).transpose()?;
        Ok(Subject {
            name: self.name,
            is_name: self.is_name,
            last_searched,
        })
    }
}

#[derive(Debug, FromRow)]
struct SourceRow {
    id: i64,
    url: String,
    subject_name: String,
    name: String,
    created_at: String,
}

impl SourceRow {
    fn into_entry(self) -> StoreResult<CatalogueEntry> {
        Ok(CatalogueEntry {
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            url: self.url,
            subject_name: self.subject_name,
            name: self.name,
        })
    }
}

#[async_trait]
impl SubjectStore for SqliteStore {
    async fn stale_subjects(&self, limit: usize) -> StoreResult<Vec<Subject>> {
        let rows: Vec<SubjectRow> = sqlx::query_as(
            r#"
            SELECT name, is_name, last_searched FROM subjects
            WHERE is_name = 1
            ORDER BY last_searched IS NOT NULL, last_searched ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(SubjectRow::into_subject).collect()
    }

    async fn touch_subject(&self, name: &str) -> StoreResult<()> {
        sqlx::query("UPDATE subjects SET last_searched = ? WHERE name = ?")
            .bind(timestamp(Utc::now()))
            .bind(name)
            .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl SourceStore for SqliteStore {
    async fn url_known(&self, url: &str) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sources WHERE url = ?")
            .bind(url)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        Ok(count > 0)
    }

    async fn entries_for_subject(&self, subject_name: &str) -> StoreResult<Vec<CatalogueEntry>> {
        let rows: Vec<SourceRow> = sqlx::query_as(
            r#"
            SELECT id, url, subject_name, name, created_at FROM sources
            WHERE subject_name = ?
            ORDER BY id ASC
            "#,
        )
        .bind(subject_name)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(SourceRow::into_entry).collect()
    }

    async fn insert_source(&self, source: &NewSource) -> StoreResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO sources (url, subject_name, name, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&source.url)
        .bind(&source.subject_name)
        .bind(&source.name)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.last_insert_rowid())
    }

    async fn insert_if_new_site(&self, source: &NewSource) -> StoreResult<Option<i64>> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Insert first so the write lock is held during the duplicate check.
        let id = sqlx::query(
            r#"
            INSERT INTO sources (url, subject_name, name, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&source.url)
        .bind(&source.subject_name)
        .bind(&source.name)
        .bind(timestamp(Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(backend)?
        .last_insert_rowid();

        let existing: Vec<String> =
            sqlx::query_scalar("SELECT url FROM sources WHERE subject_name = ? AND id <> ?")
                .bind(&source.subject_name)
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .map_err(backend)?;

        if existing.iter().any(|url| same_site(url, &source.url)) {
            tx.rollback().await.map_err(backend)?;
            return Ok(None);
        }

        tx.commit().await.map_err(backend)?;
        Ok(Some(id))
    }

    async fn replace_url(&self, id: i64, expected_url: &str, new_url: &str) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let current: Option<String> = sqlx::query_scalar("SELECT url FROM sources WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;

        if current.as_deref() != Some(expected_url) {
            tx.rollback().await.map_err(backend)?;
            return Ok(false);
        }

        sqlx::query("UPDATE sources SET url = ? WHERE id = ?")
            .bind(new_url)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(true)
    }
}
