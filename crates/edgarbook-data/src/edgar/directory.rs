//! Company ticker directory with search.

use crate::clock::{Clock, SystemClock};
use crate::edgar::client::EdgarClient;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Maximum results returned by [`CompanyDirectory::search`].
pub const MAX_SEARCH_RESULTS: usize = 15;

/// One listed company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyEntry {
    /// CIK, unpadded
    pub cik: String,
    /// Ticker symbol
    pub ticker: String,
    /// Company name
    pub name: String,
}

/// Rank `entries` against `query`.
///
/// Exact ticker matches come first, then tickers or names starting with the
/// query, then tickers or names containing it. Matching is case-insensitive,
/// directory order is kept within each tier, and a blank query matches
/// nothing.
pub fn rank_companies<'a>(
    entries: &'a [CompanyEntry],
    query: &str,
    limit: usize,
) -> Vec<&'a CompanyEntry> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut exact = Vec::new();
    let mut prefix = Vec::new();
    let mut contains = Vec::new();

    for entry in entries {
        let ticker = entry.ticker.to_lowercase();
        let name = entry.name.to_lowercase();
        if ticker == needle {
            exact.push(entry);
        } else if ticker.starts_with(&needle) || name.starts_with(&needle) {
            prefix.push(entry);
        } else if ticker.contains(&needle) || name.contains(&needle) {
            contains.push(entry);
        }
    }

    exact
        .into_iter()
        .chain(prefix)
        .chain(contains)
        .take(limit)
        .collect()
}

/// Ticker directory that refreshes itself after a TTL.
#[derive(Debug)]
pub struct CompanyDirectory<C: Clock = SystemClock> {
    ttl: Duration,
    clock: C,
    loaded: Option<(DateTime<Utc>, Arc<Vec<CompanyEntry>>)>,
}

impl CompanyDirectory<SystemClock> {
    /// Directory on the wall clock.
    pub const fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<C: Clock> CompanyDirectory<C> {
    /// Directory on an explicit clock.
    pub const fn with_clock(ttl: Duration, clock: C) -> Self {
        Self { ttl, clock, loaded: None }
    }

    /// Replace the directory contents, stamped with the current time.
    pub fn load(&mut self, entries: Vec<CompanyEntry>) {
        debug!(companies = entries.len(), "company directory loaded");
        self.loaded = Some((self.clock.now(), Arc::new(entries)));
    }

    /// Entries if loaded and still within the TTL.
    pub fn fresh_entries(&self) -> Option<Arc<Vec<CompanyEntry>>> {
        let (loaded_at, entries) = self.loaded.as_ref()?;
        (self.clock.now() - *loaded_at < self.ttl).then(|| Arc::clone(entries))
    }

    /// Entries, refreshing from EDGAR when missing or stale.
    pub async fn entries(&mut self, client: &EdgarClient) -> Result<Arc<Vec<CompanyEntry>>> {
        if let Some(entries) = self.fresh_entries() {
            return Ok(entries);
        }
        let entries = client.company_tickers().await?;
        self.load(entries);
        Ok(self.fresh_entries().unwrap_or_default())
    }

    /// Search the directory, refreshing it first if needed.
    pub async fn search(&mut self, client: &EdgarClient, query: &str) -> Result<Vec<CompanyEntry>> {
        let entries = self.entries(client).await?;
        Ok(rank_companies(&entries, query, MAX_SEARCH_RESULTS)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Exact ticker lookup against loaded entries, ignoring freshness.
    pub fn find_ticker(&self, ticker: &str) -> Option<&CompanyEntry> {
        let (_, entries) = self.loaded.as_ref()?;
        entries
            .iter()
            .find(|entry| entry.ticker.eq_ignore_ascii_case(ticker.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn entry(ticker: &str, name: &str) -> CompanyEntry {
        CompanyEntry { cik: "1".to_string(), ticker: ticker.to_string(), name: name.to_string() }
    }

    fn directory() -> Vec<CompanyEntry> {
        vec![
            entry("METAX", "Metax Holdings"),
            entry("AMETA", "Ameta Inc"),
            entry("META", "Meta Platforms, Inc."),
            entry("MSFT", "Microsoft Corp"),
            entry("XYZ", "Metaverse Partners"),
        ]
    }

    #[test]
    fn test_ranking_tiers() {
        let entries = directory();
        let ranked: Vec<&str> = rank_companies(&entries, "meta", MAX_SEARCH_RESULTS)
            .iter()
            .map(|e| e.ticker.as_str())
            .collect();
        assert_eq!(ranked, vec!["META", "METAX", "XYZ", "AMETA"]);
    }

    #[test]
    fn test_ranking_case_and_blank() {
        let entries = directory();
        assert_eq!(rank_companies(&entries, "  MsFt ", 15)[0].ticker, "MSFT");
        assert!(rank_companies(&entries, "   ", 15).is_empty());
        assert!(rank_companies(&entries, "zzz", 15).is_empty());
    }

    #[test]
    fn test_ranking_limit() {
        let entries: Vec<CompanyEntry> = (0..40).map(|i| entry(&format!("CO{i}"), "Company")).collect();
        assert_eq!(rank_companies(&entries, "co", MAX_SEARCH_RESULTS).len(), 15);
    }

    #[test]
    fn test_directory_ttl() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let mut dir = CompanyDirectory::with_clock(Duration::hours(1), clock.clone());
        assert!(dir.fresh_entries().is_none());

        dir.load(directory());
        clock.advance(Duration::minutes(59));
        assert_eq!(dir.fresh_entries().map(|e| e.len()), Some(5));

        clock.advance(Duration::minutes(1));
        assert!(dir.fresh_entries().is_none());
        assert_eq!(dir.find_ticker("meta").map(|e| e.name.as_str()), Some("Meta Platforms, Inc."));
    }
}
