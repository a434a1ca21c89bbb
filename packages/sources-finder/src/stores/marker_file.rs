//! Circuit-breaker marker kept as a small JSON file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::rate::breaker::BreakerMarker;
use crate::traits::store::MarkerStore;

/// Default location of the marker file.
pub const DEFAULT_MARKER_PATH: &str = "/tmp/sourcesfinder_wait.json";

/// Marker store backed by a JSON file.
///
/// A missing file means no marker. A file that exists but can't be parsed
/// (an empty `touch`ed file, say) counts as a marker tripped at the file's
/// modification time, so it expires like any other.
pub struct FileMarkerStore {
    path: PathBuf,
}

impl FileMarkerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn marker_from_mtime(&self) -> StoreResult<BreakerMarker> {
        let modified = tokio::fs::metadata(&self.path)
            .await
            .and_then(|meta| meta.modified())
            .map_err(|e| StoreError::Corrupt {
                reason: format!("{}: {}", self.path.display(), e),
            })?;
        Ok(BreakerMarker::new(DateTime::<Utc>::from(modified)).with_reason("unreadable marker file"))
    }
}

impl Default for FileMarkerStore {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_PATH)
    }
}

#[async_trait]
impl MarkerStore for FileMarkerStore {
    async fn load(&self) -> StoreResult<Option<BreakerMarker>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Backend(Box::new(e))),
        };

        match serde_json::from_str(&contents) {
            Ok(marker) => Ok(Some(marker)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable marker file, using its mtime");
                self.marker_from_mtime().await.map(Some)
            }
        }
    }

    async fn save(&self, marker: &BreakerMarker) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(marker).map_err(|e| StoreError::Backend(Box::new(e)))?;

        // Write beside the marker and rename over it; readers never see a partial file.
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StoreError::Backend(Box::new(e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Backend(Box::new(e)))
    }

    async fn clear(&self) -> StoreResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Backend(Box::new(e))),
        }
    }
}
