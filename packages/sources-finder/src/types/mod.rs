//! Domain types shared across the discovery pipeline.

pub mod config;
pub mod source;
pub mod subject;
