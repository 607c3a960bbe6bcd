//! Filesystem support for the CLI: cache locations and saved scans.

pub(crate) mod cache_manager;
pub(crate) mod scan_store;
