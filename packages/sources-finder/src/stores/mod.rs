//! Storage implementations for the sources finder.
//!
//! Available backends:
//! - `MemoryStore` - In-memory catalogue (always available)
//! - `SqliteStore` - SQLite catalogue (requires `sqlite` feature)
//! - `MemoryMarkerStore` / `FileMarkerStore` - circuit-breaker marker

pub mod marker_file;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use marker_file::FileMarkerStore;
pub use memory::{MemoryMarkerStore, MemoryStore};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
