//! Caching layer for EDGAR responses.

pub mod sqlite;

pub use sqlite::{CacheStats, ResponseCache};
