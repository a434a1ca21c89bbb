//! Trait abstractions over the external collaborators.
//!
//! These traits define the interfaces that applications implement
//! to provide search, page fetching, bibliographic lookup and storage.

pub mod bibliography;
pub mod fetcher;
pub mod searcher;
pub mod store;
