//! On-disk locations for the response cache and saved scans.
//!
//! Everything lives under a platform-specific cache directory:
//! - Linux: `~/.cache/edgarbook/`
//! - macOS: `~/Library/Caches/edgarbook/`
//! - Windows: `%LOCALAPPDATA%\edgarbook\`

use edgarbook::data::DataError;
use edgarbook::data::cache::ResponseCache;
use edgarbook::data::config::EdgarConfig;
use std::path::PathBuf;

/// Get the default cache directory path.
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("edgarbook")
}

/// Directory holding saved scans.
pub(crate) fn scans_dir() -> PathBuf {
    default_cache_dir().join("scans")
}

/// Configuration from the environment, with the response cache placed in
/// the default cache directory unless `EDGARBOOK_CACHE_PATH` says otherwise.
/// `no_cache` turns the response cache off entirely.
pub(crate) fn load_config(no_cache: bool) -> Result<EdgarConfig, DataError> {
    let mut config = EdgarConfig::from_env()?;

    if no_cache {
        config.cache_path = None;
        return Ok(config);
    }

    let cache_path = config
        .cache_path
        .take()
        .unwrap_or_else(|| EdgarConfig::default_cache_path(dirs::cache_dir()));

    // Ensure parent directory exists
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    config.cache_path = Some(cache_path);
    Ok(config)
}

/// Print where cached responses are kept.
pub(crate) fn print_cache_info(config: &EdgarConfig) {
    match &config.cache_path {
        Some(path) => println!("  Cache location: {}", path.display()),
        None => println!("  Cache: Disabled"),
    }
}

/// Open the response cache named by the environment, creating it if needed.
pub(crate) fn open_cache() -> Result<(ResponseCache, PathBuf), DataError> {
    let cache_path = load_config(false)?
        .cache_path
        .unwrap_or_else(|| EdgarConfig::default_cache_path(dirs::cache_dir()));
    let cache = ResponseCache::new(&cache_path)?;
    Ok((cache, cache_path))
}

/// Human-readable byte count.
pub(crate) fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 { format!("{bytes} B") } else { format!("{size:.1} {}", UNITS[unit]) }
}
