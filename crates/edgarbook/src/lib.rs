#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/edgarbook/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod pipeline;
pub mod scan_cache;

// Re-export main types from sub-crates
pub use edgarbook_data as data;
pub use edgarbook_extract as extract;
pub use edgarbook_output as output;

pub use error::{PipelineError, Result};
pub use pipeline::{
    DEFAULT_CONCURRENCY, FilingScan, GenerateRequest, Pipeline, ScanReport, TableSummary,
    parse_table_id, select_tables, table_id,
};
pub use scan_cache::{DEFAULT_SCAN_TTL_SECS, ScanCache, ScanEntry, ScanId};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
