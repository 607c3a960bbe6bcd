//! SQLite cache for raw EDGAR responses.

use crate::clock::{Clock, SystemClock};
use crate::error::{DataError, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// URL-keyed store of response bodies.
///
/// Entries are stamped and aged with `C`.
#[derive(Debug)]
pub struct ResponseCache<C: Clock = SystemClock> {
    conn: Connection,
    clock: C,
}

impl ResponseCache {
    /// Open (or create) a cache at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_clock(path, SystemClock)
    }

    /// Create an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self> {
        Self::in_memory_with_clock(SystemClock)
    }
}

impl<C: Clock> ResponseCache<C> {
    /// Open (or create) a cache at `path` that reads time from `clock`.
    pub fn with_clock<P: AsRef<Path>>(path: P, clock: C) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let cache = Self { conn, clock };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// In-memory cache that reads time from `clock`.
    pub fn in_memory_with_clock(clock: C) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn, clock };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Current time according to the cache's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS responses (
                url TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                cached_at TEXT NOT NULL
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_responses_cached_at ON responses(cached_at)",
            [],
        )?;
        Ok(())
    }

    /// Cached body for `url` if it is no older than `max_age`.
    pub fn get(&self, url: &str, max_age: Duration) -> Result<Option<String>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT body, cached_at FROM responses WHERE url = ?1",
                params![url],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((body, cached_at)) = row else {
            return Ok(None);
        };
        let cached_at = DateTime::parse_from_rfc3339(&cached_at)
            .map_err(|e| DataError::Parse(format!("Invalid cached_at for {url}: {e}")))?
            .with_timezone(&Utc);

        Ok((self.clock.now() - cached_at <= max_age).then_some(body))
    }

    /// Store `body` for `url`, replacing any previous entry.
    pub fn put(&self, url: &str, body: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO responses (url, body, cached_at) VALUES (?1, ?2, ?3)",
            params![url, body, self.clock.now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Delete entries cached more than `age` ago; returns how many were removed.
    pub fn purge_older_than(&self, age: Duration) -> Result<usize> {
        self.purge_before(self.clock.now() - age)
    }

    /// Delete entries cached before `cutoff`; returns how many were removed.
    pub fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM responses WHERE cached_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(removed)
    }

    /// Remove every entry.
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM responses", [])?;
        Ok(())
    }

    /// Get cache statistics.
    pub fn get_stats(&self) -> Result<CacheStats> {
        let (responses, total_bytes): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(CAST(body AS BLOB))), 0) FROM responses",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(CacheStats {
            responses: responses as usize,
            total_bytes: total_bytes as usize,
        })
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached responses
    pub responses: usize,
    /// Total body size in bytes
    pub total_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn cache() -> (ManualClock, ResponseCache<ManualClock>) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let cache = ResponseCache::in_memory_with_clock(clock.clone()).unwrap();
        (clock, cache)
    }

    #[test]
    fn test_cache_initialization() {
        let cache = ResponseCache::in_memory();
        assert!(cache.is_ok());
    }

    #[test]
    fn test_put_and_get() {
        let (_, cache) = cache();
        cache.put("https://x/a", "{\"a\":1}").unwrap();

        let hit = cache.get("https://x/a", Duration::hours(1)).unwrap();
        assert_eq!(hit.as_deref(), Some("{\"a\":1}"));
        assert_eq!(cache.get("https://x/b", Duration::hours(1)).unwrap(), None);
    }

    #[test]
    fn test_entry_expires_as_clock_advances() {
        let (clock, cache) = cache();
        cache.put("u", "body").unwrap();

        clock.advance(Duration::hours(1));
        assert!(cache.get("u", Duration::hours(1)).unwrap().is_some());
        clock.advance(Duration::seconds(1));
        assert!(cache.get("u", Duration::hours(1)).unwrap().is_none());
    }

    #[test]
    fn test_replace_refreshes_timestamp() {
        let (clock, cache) = cache();
        cache.put("u", "old").unwrap();
        clock.advance(Duration::days(2));
        cache.put("u", "new").unwrap();

        let body = cache.get("u", Duration::hours(1)).unwrap();
        assert_eq!(body.as_deref(), Some("new"));
        assert_eq!(cache.get_stats().unwrap().responses, 1);
    }

    #[test]
    fn test_purge_and_stats() {
        let (clock, cache) = cache();
        cache.put("a", "12345").unwrap();
        clock.advance(Duration::days(3));
        cache.put("b", "678").unwrap();

        assert_eq!(
            cache.get_stats().unwrap(),
            CacheStats { responses: 2, total_bytes: 8 }
        );
        assert_eq!(cache.purge_older_than(Duration::days(2)).unwrap(), 1);
        assert_eq!(cache.get_stats().unwrap().responses, 1);
        assert_eq!(cache.purge_before(cache.now() + Duration::seconds(1)).unwrap(), 1);

        cache.put("c", "9").unwrap();
        cache.clear_all().unwrap();
        assert_eq!(cache.get_stats().unwrap(), CacheStats { responses: 0, total_bytes: 0 });
    }
}
