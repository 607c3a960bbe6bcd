//! Runtime configuration for EDGAR access.

use crate::error::{DataError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default user agent. The SEC rejects requests without contact details.
pub const DEFAULT_USER_AGENT: &str = "edgarbook/0.1 (edgarbook@factordynamics.io)";

/// Configuration for [`EdgarClient`](crate::edgar::EdgarClient) and the caches
/// around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgarConfig {
    /// User agent sent with every request
    pub user_agent: String,
    /// Minimum spacing between requests (SEC allows 10 per second)
    pub min_request_interval: Duration,
    /// Per-request timeout
    pub timeout: Duration,
    /// SQLite response cache location; `None` disables the cache
    pub cache_path: Option<PathBuf>,
    /// Oldest cached response still served
    pub cache_max_age: Duration,
    /// How long the company ticker directory stays fresh
    pub directory_ttl: Duration,
}

impl Default for EdgarConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_request_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(30),
            cache_path: None,
            cache_max_age: Duration::from_secs(24 * 60 * 60),
            directory_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl EdgarConfig {
    /// Load configuration from `EDGARBOOK_*` environment variables, falling
    /// back to [`Default`] for anything unset.
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `EDGARBOOK_USER_AGENT` | user agent |
    /// | `EDGARBOOK_REQUEST_INTERVAL_MS` | minimum request spacing |
    /// | `EDGARBOOK_HTTP_TIMEOUT_SECS` | request timeout |
    /// | `EDGARBOOK_CACHE_PATH` | response cache file |
    /// | `EDGARBOOK_CACHE_MAX_AGE_SECS` | response cache max age |
    /// | `EDGARBOOK_DIRECTORY_TTL_SECS` | ticker directory lifetime |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &str, fallback: Duration| -> Result<Duration> {
            Ok(parse_var::<u64>(&lookup, key)?.map_or(fallback, Duration::from_millis))
        };
        let secs = |key: &str, fallback: Duration| -> Result<Duration> {
            Ok(parse_var::<u64>(&lookup, key)?.map_or(fallback, Duration::from_secs))
        };

        Ok(Self {
            user_agent: lookup("EDGARBOOK_USER_AGENT")
                .filter(|ua| !ua.trim().is_empty())
                .unwrap_or(defaults.user_agent),
            min_request_interval: millis(
                "EDGARBOOK_REQUEST_INTERVAL_MS",
                defaults.min_request_interval,
            )?,
            timeout: secs("EDGARBOOK_HTTP_TIMEOUT_SECS", defaults.timeout)?,
            cache_path: lookup("EDGARBOOK_CACHE_PATH").map(PathBuf::from),
            cache_max_age: secs("EDGARBOOK_CACHE_MAX_AGE_SECS", defaults.cache_max_age)?,
            directory_ttl: secs("EDGARBOOK_DIRECTORY_TTL_SECS", defaults.directory_ttl)?,
        })
    }

    /// Default on-disk response cache location.
    pub fn default_cache_path(cache_root: Option<PathBuf>) -> PathBuf {
        cache_root
            .unwrap_or_else(|| PathBuf::from("."))
            .join("edgarbook")
            .join("responses.db")
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| DataError::Config {
            key: key.to_string(),
            reason: format!("'{raw}': {e}"),
        }),
        None => Ok(None),
    }
}
