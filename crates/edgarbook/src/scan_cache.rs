//! Short-lived cache of extracted tables between a scan and a generate.
//!
//! Entries expire after a TTL and are swept before every new scan is
//! recorded. A miss is never an error: callers re-extract from the filing
//! documents instead.

use chrono::{DateTime, Duration, Utc};
use edgarbook_data::clock::{Clock, SystemClock};
use edgarbook_data::edgar::filings::FilingDescriptor;
use edgarbook_extract::ExtractedTable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

/// Default lifetime of a scan: ten minutes.
pub const DEFAULT_SCAN_TTL_SECS: i64 = 600;

/// Identifier handed out for a recorded scan.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(transparent)]
pub struct ScanId(Uuid);

impl ScanId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ScanId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Tables extracted by one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEntry {
    /// When the scan was recorded
    pub created_at: DateTime<Utc>,
    /// Company the filings belong to (CIK)
    pub company_id: String,
    /// Filings scanned, in request order
    pub filings: Vec<FilingDescriptor>,
    /// Accession → tables in extraction order
    pub tables_by_filing: HashMap<String, Vec<ExtractedTable>>,
}

/// TTL-bound map from [`ScanId`] to [`ScanEntry`].
#[derive(Debug)]
pub struct ScanCache<C: Clock = SystemClock> {
    ttl: Duration,
    clock: C,
    entries: HashMap<ScanId, ScanEntry>,
}

impl ScanCache<SystemClock> {
    /// Cache on the wall clock with the default TTL.
    pub fn new() -> Self {
        Self::with_clock(Duration::seconds(DEFAULT_SCAN_TTL_SECS), SystemClock)
    }
}

impl Default for ScanCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> ScanCache<C> {
    /// Cache with an explicit TTL and clock.
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self { ttl, clock, entries: HashMap::new() }
    }

    /// Entry lifetime.
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current time on the cache clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn is_expired(&self, entry: &ScanEntry, now: DateTime<Utc>) -> bool {
        now - entry.created_at > self.ttl
    }

    /// Sweep expired entries, then record a new scan under a fresh id.
    pub fn record(
        &mut self,
        company_id: impl Into<String>,
        filings: Vec<FilingDescriptor>,
        tables_by_filing: HashMap<String, Vec<ExtractedTable>>,
    ) -> ScanId {
        self.sweep();
        let id = ScanId::new();
        let entry =
            ScanEntry { created_at: self.now(), company_id: company_id.into(), filings, tables_by_filing };
        self.entries.insert(id, entry);
        debug!(scan_id = %id, cached = self.entries.len(), "recorded scan");
        id
    }

    /// Put back an entry recorded elsewhere; it keeps its own timestamp.
    /// A later write to the same id replaces an earlier one.
    pub fn restore(&mut self, id: ScanId, entry: ScanEntry) {
        self.entries.insert(id, entry);
    }

    /// Entry for `id` if present and not expired.
    pub fn get(&self, id: &ScanId) -> Option<&ScanEntry> {
        let entry = self.entries.get(id)?;
        if self.is_expired(entry, self.now()) {
            debug!(scan_id = %id, "scan expired");
            return None;
        }
        Some(entry)
    }

    /// Drop expired entries and return how many went.
    pub fn sweep(&mut self) -> usize {
        let now = self.now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.created_at <= ttl);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "swept expired scans");
        }
        removed
    }

    /// Entries held, expired ones included until the next sweep.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use edgarbook_data::clock::ManualClock;

    fn tables() -> HashMap<String, Vec<ExtractedTable>> {
        HashMap::from([("acc-1".to_string(), vec![ExtractedTable::default()])])
    }

    fn cache() -> (ManualClock, ScanCache<ManualClock>) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        let cache = ScanCache::with_clock(Duration::minutes(10), clock.clone());
        (clock, cache)
    }

    #[test]
    fn test_entry_lives_for_ttl() {
        let (clock, mut cache) = cache();
        let id = cache.record("320193", vec![], tables());

        clock.advance(Duration::minutes(10));
        let entry = cache.get(&id).unwrap();
        assert_eq!(entry.company_id, "320193");
        assert_eq!(entry.tables_by_filing["acc-1"].len(), 1);

        clock.advance(Duration::seconds(1));
        assert!(cache.get(&id).is_none());
        // expired but not yet swept
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_record_sweeps_expired() {
        let (clock, mut cache) = cache();
        let old = cache.record("1", vec![], tables());
        clock.advance(Duration::minutes(11));
        let fresh = cache.record("2", vec![], HashMap::new());

        assert_ne!(old, fresh);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&old).is_none());
        assert!(cache.get(&fresh).is_some());
    }

    #[test]
    fn test_restore_keeps_timestamp() {
        let (clock, mut cache) = cache();
        let id = ScanId::new();
        let entry = ScanEntry {
            created_at: clock.now() - Duration::minutes(30),
            company_id: "1".to_string(),
            filings: vec![],
            tables_by_filing: HashMap::new(),
        };
        cache.restore(id, entry);
        assert!(cache.get(&id).is_none());
        assert_eq!(cache.sweep(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_scan_id_round_trip() {
        let id = ScanId::new();
        assert_eq!(id.to_string().parse::<ScanId>().unwrap(), id);
        assert!("not-a-uuid".parse::<ScanId>().is_err());

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
