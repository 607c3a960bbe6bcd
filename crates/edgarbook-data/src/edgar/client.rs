//! SEC EDGAR API client with rate limiting.

use crate::cache::ResponseCache;
use crate::config::EdgarConfig;
use crate::edgar::directory::CompanyEntry;
use crate::edgar::facts::CompanyFacts;
use crate::edgar::filings::{
    FilingBatch, FilingDescriptor, FilingQuery, Submissions, filter_filings, pad_cik,
};
use crate::error::{DataError, Result};
use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// SEC EDGAR API base URL
const EDGAR_BASE_URL: &str = "https://data.sec.gov";

/// Ticker directory (hosted at www.sec.gov, not data.sec.gov)
const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Company information from the tickers endpoint.
/// The SEC returns: {"0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}, ...}
#[derive(Debug, Deserialize)]
struct TickerRecord {
    cik_str: u64,
    ticker: String,
    title: String,
}

/// Rate limiter to ensure we don't exceed SEC's rate limits
#[derive(Debug)]
struct RateLimiter {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    const fn new(min_interval: Duration) -> Self {
        Self { last_request: None, min_interval }
    }

    async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

/// SEC EDGAR API client with rate limiting and an optional response cache
pub struct EdgarClient {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    cache: Option<Arc<Mutex<ResponseCache>>>,
    cache_max_age: chrono::Duration,
    base_url: String,
}

impl EdgarClient {
    /// Create a new EDGAR client with default settings (10 req/sec, no cache)
    pub fn new() -> Result<Self> {
        Self::with_config(&EdgarConfig::default())
    }

    /// Create a new EDGAR client with custom rate limit
    ///
    /// # Example
    /// ```no_run
    /// use edgarbook_data::edgar::EdgarClient;
    /// use std::time::Duration;
    ///
    /// # fn example() -> edgarbook_data::Result<()> {
    /// // 5 requests per second
    /// let client = EdgarClient::with_rate_limit(Duration::from_millis(200))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_rate_limit(min_interval: Duration) -> Result<Self> {
        Self::with_config(&EdgarConfig { min_request_interval: min_interval, ..EdgarConfig::default() })
    }

    /// Create a client from configuration, opening the response cache if one
    /// is configured.
    pub fn with_config(config: &EdgarConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(DataError::Network)?;

        let cache = match &config.cache_path {
            Some(path) => {
                debug!(path = %path.display(), "opening response cache");
                Some(Arc::new(Mutex::new(ResponseCache::new(path)?)))
            }
            None => None,
        };
        let cache_max_age = chrono::Duration::from_std(config.cache_max_age)
            .map_err(|e| DataError::Config {
                key: "cache_max_age".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(config.min_request_interval))),
            cache,
            cache_max_age,
            base_url: EDGAR_BASE_URL.to_string(),
        })
    }

    /// Fetch a URL as text, serving from the response cache when fresh.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        if let Some(cache) = &self.cache {
            let cached = cache.lock().await.get(url, self.cache_max_age)?;
            if let Some(body) = cached {
                debug!(url, "response cache hit");
                return Ok(body);
            }
        }

        self.rate_limiter.lock().await.wait().await;
        debug!(url, "GET");

        let response = self.client.get(url).send().await.map_err(DataError::Network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Http { status: status.as_u16(), url: url.to_string() });
        }
        let body = response.text().await.map_err(DataError::Network)?;

        if let Some(cache) = &self.cache
            && let Err(err) = cache.lock().await.put(url, &body)
        {
            warn!(url, error = %err, "failed to cache response");
        }
        Ok(body)
    }

    /// Fetch a URL and parse it as JSON.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.fetch_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Every company in the SEC ticker directory, in directory order.
    pub async fn company_tickers(&self) -> Result<Vec<CompanyEntry>> {
        let raw: HashMap<String, TickerRecord> = self.fetch_json(COMPANY_TICKERS_URL).await?;
        Ok(ticker_entries(raw))
    }

    /// Look up a company's CIK (zero-padded to 10 digits) from its ticker.
    ///
    /// # Errors
    /// Returns `DataError::CikNotFound` if the ticker is not listed
    pub async fn get_company_cik(&self, ticker: &str) -> Result<String> {
        if ticker.trim().is_empty() {
            return Err(DataError::InvalidSymbol("Empty ticker".to_string()));
        }
        self.company_tickers()
            .await?
            .into_iter()
            .find(|entry| entry.ticker.eq_ignore_ascii_case(ticker.trim()))
            .map(|entry| pad_cik(&entry.cik))
            .ok_or_else(|| DataError::CikNotFound(ticker.to_string()))
    }

    /// Submissions metadata for a company.
    pub async fn submissions(&self, cik: &str) -> Result<Submissions> {
        if cik.trim().is_empty() {
            return Err(DataError::InvalidSymbol("Empty CIK".to_string()));
        }
        let url = format!("{}/submissions/CIK{}.json", self.base_url, pad_cik(cik));
        self.fetch_json(&url).await
    }

    /// One of the older submissions batch files named in [`Submissions`].
    pub async fn submissions_batch(&self, name: &str) -> Result<FilingBatch> {
        let url = format!("{}/submissions/{}", self.base_url, name);
        self.fetch_json(&url).await
    }

    /// List filings matching `query`, newest first.
    ///
    /// Older batch files that fail to download are skipped with a warning;
    /// the recent batch is always required.
    pub async fn list_filings(&self, cik: &str, query: &FilingQuery) -> Result<Vec<FilingDescriptor>> {
        let submissions = self.submissions(cik).await?;
        let mut batches = vec![submissions.filings.recent];

        for file in &submissions.filings.files {
            match self.submissions_batch(&file.name).await {
                Ok(batch) => batches.push(batch),
                Err(err) => warn!(file = %file.name, error = %err, "skipping submissions batch"),
            }
        }

        let filings = filter_filings(cik, &batches, query, Utc::now());
        debug!(cik, count = filings.len(), "listed filings");
        Ok(filings)
    }

    /// All XBRL facts reported by a company.
    pub async fn company_facts(&self, cik: &str) -> Result<CompanyFacts> {
        if cik.trim().is_empty() {
            return Err(DataError::InvalidSymbol("Empty CIK".to_string()));
        }
        let url = format!("{}/api/xbrl/companyfacts/CIK{}.json", self.base_url, pad_cik(cik));
        let body = self.fetch_text(&url).await?;
        CompanyFacts::from_json(&body)
    }

    /// Raw primary document of a filing.
    pub async fn filing_document(&self, filing: &FilingDescriptor) -> Result<String> {
        if filing.doc_url.is_empty() {
            return Err(DataError::FilingNotFound(format!(
                "{} has no primary document",
                filing.accession
            )));
        }
        self.fetch_text(&filing.doc_url).await
    }
}

impl std::fmt::Debug for EdgarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgarClient")
            .field("base_url", &self.base_url)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

/// Order ticker records by their numeric directory index.
fn ticker_entries(raw: HashMap<String, TickerRecord>) -> Vec<CompanyEntry> {
    let mut indexed: Vec<(u64, TickerRecord)> = raw
        .into_iter()
        .map(|(idx, record)| (idx.parse().unwrap_or(u64::MAX), record))
        .collect();
    indexed.sort_by_key(|(idx, _)| *idx);
    indexed
        .into_iter()
        .map(|(_, record)| CompanyEntry {
            cik: record.cik_str.to_string(),
            ticker: record.ticker,
            name: record.title,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_entries_keep_directory_order() {
        let raw: HashMap<String, TickerRecord> = serde_json::from_str(
            r#"{
                "2": {"cik_str": 789019, "ticker": "MSFT", "title": "MICROSOFT CORP"},
                "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
                "1": {"cik_str": 1045810, "ticker": "NVDA", "title": "NVIDIA CORP"}
            }"#,
        )
        .unwrap();
        let entries = ticker_entries(raw);
        let tickers: Vec<&str> = entries.iter().map(|e| e.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "NVDA", "MSFT"]);
        assert_eq!(entries[0].cik, "320193");
        assert_eq!(entries[0].name, "Apple Inc.");
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let mut limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_cached_response_served_without_network() {
        let dir = std::env::temp_dir().join(format!("edgarbook-client-{}", std::process::id()));
        let path = dir.join("responses.db");
        ResponseCache::new(&path)
            .unwrap()
            .put("https://invalid.example/doc.htm", "<html>cached</html>")
            .unwrap();

        let client = EdgarClient::with_config(&EdgarConfig {
            cache_path: Some(path),
            ..EdgarConfig::default()
        })
        .unwrap();
        let body = client.fetch_text("https://invalid.example/doc.htm").await.unwrap();
        assert_eq!(body, "<html>cached</html>");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_empty_identifiers_rejected() {
        let client = EdgarClient::new().unwrap();
        assert!(matches!(client.get_company_cik(" ").await, Err(DataError::InvalidSymbol(_))));
        assert!(matches!(client.submissions("").await, Err(DataError::InvalidSymbol(_))));
        assert!(matches!(client.company_facts("").await, Err(DataError::InvalidSymbol(_))));

        let filing = FilingDescriptor::new("10-K", "2024-01-01", "a-1");
        assert!(matches!(
            client.filing_document(&filing).await,
            Err(DataError::FilingNotFound(_))
        ));
    }
}
