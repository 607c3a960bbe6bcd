//! Scan and generate.
//!
//! A scan fetches the primary document of each selected filing, extracts its
//! tables and caches them under a fresh [`ScanId`]. A generate fetches the
//! company facts, assembles the statements, picks the requested tables from
//! the cached scan (re-extracting them when the scan is gone) and builds a
//! workbook.

use crate::error::{PipelineError, Result};
use crate::scan_cache::{DEFAULT_SCAN_TTL_SECS, ScanCache, ScanId};
use chrono::Duration;
use edgarbook_data::clock::{Clock, SystemClock};
use edgarbook_data::config::EdgarConfig;
use edgarbook_data::edgar::facts::CompanyFacts;
use edgarbook_data::edgar::filings::unpadded_cik;
use edgarbook_data::edgar::{
    CompanyDirectory, CompanyEntry, EdgarClient, FilingDescriptor, FilingQuery,
};
use edgarbook_data::statements::StatementAssembler;
use edgarbook_data::DataError;
use edgarbook_extract::{ExtractedTable, TableExtractor};
use edgarbook_output::{Layout, SelectedTable, Workbook, WorkbookBuilder};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Filing documents fetched at once. Requests are still spaced by the
/// client's rate limiter.
pub const DEFAULT_CONCURRENCY: usize = 4;

const MISSING_SCAN_INPUT: &str = "CIK and at least one filing are required";

/// External id of a table: `"{accession}:{index}"`.
pub fn table_id(accession: &str, index: usize) -> String {
    format!("{accession}:{index}")
}

/// Split a table id into accession and index.
pub fn parse_table_id(id: &str) -> Result<(&str, usize)> {
    let invalid = || PipelineError::InvalidTableId(id.to_string());
    let (accession, index) = id.rsplit_once(':').ok_or_else(invalid)?;
    if accession.is_empty() {
        return Err(invalid());
    }
    let index = index.parse().map_err(|_| invalid())?;
    Ok((accession, index))
}

/// One table found by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    /// `"{accession}:{index}"`
    pub id: String,
    /// Inferred title, or `Table {n}` counting from 1
    pub title: String,
    /// Form type of the filing
    pub filing_type: String,
    /// Filing date
    pub filing_date: String,
    /// Accession number
    pub accession: String,
    /// Position in the filing's extracted tables
    pub table_index: usize,
    /// Data rows
    pub rows: usize,
    /// Cells in the first data row
    pub cols: usize,
}

impl TableSummary {
    /// Summarize the `index`th table of `filing`.
    pub fn new(filing: &FilingDescriptor, index: usize, table: &ExtractedTable) -> Self {
        Self {
            id: table_id(&filing.accession, index),
            title: table.title.clone().unwrap_or_else(|| format!("Table {}", index + 1)),
            filing_type: filing.form_type.clone(),
            filing_date: filing.date.clone(),
            accession: filing.accession.clone(),
            table_index: index,
            rows: table.rows.len(),
            cols: table.rows.first().map_or(0, Vec::len),
        }
    }
}

/// Extraction result for one filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingScan {
    /// Filing scanned
    pub filing: FilingDescriptor,
    /// Tables extracted; empty when the fetch failed
    pub tables: Vec<ExtractedTable>,
    /// Fetch failure, if any
    pub error: Option<String>,
}

impl FilingScan {
    /// Extract tables from a fetched document. A failed fetch yields no tables.
    pub fn from_document(
        extractor: &TableExtractor,
        filing: FilingDescriptor,
        document: edgarbook_data::Result<String>,
    ) -> Self {
        match document {
            Ok(markup) => {
                let tables = extractor.extract(&markup);
                debug!(accession = %filing.accession, tables = tables.len(), "scanned filing");
                Self { filing, tables, error: None }
            }
            Err(e) => {
                warn!(accession = %filing.accession, error = %e, "filing fetch failed");
                Self { filing, tables: Vec::new(), error: Some(e.to_string()) }
            }
        }
    }

    /// Whether the document was fetched.
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Summaries of the extracted tables, in extraction order.
    pub fn summaries(&self) -> Vec<TableSummary> {
        self.tables
            .iter()
            .enumerate()
            .map(|(i, table)| TableSummary::new(&self.filing, i, table))
            .collect()
    }
}

/// Outcome of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Id to pass to a later generate
    pub scan_id: ScanId,
    /// Company scanned
    pub cik: String,
    /// Tables found, by filing then index
    pub tables: Vec<TableSummary>,
    /// Filings whose document was fetched
    pub succeeded: usize,
    /// Filings whose fetch failed
    pub failed: usize,
    /// Filings without a primary document
    pub skipped: usize,
}

impl ScanReport {
    /// Filings a fetch was attempted for.
    pub const fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Whether some fetches failed.
    pub const fn is_partial(&self) -> bool {
        self.failed > 0
    }
}

/// Tables whose id is in `wanted`, ordered by filing and then by index.
/// Unknown ids are ignored.
pub fn select_tables(
    filings: &[FilingDescriptor],
    tables_by_filing: &HashMap<String, Vec<ExtractedTable>>,
    wanted: &BTreeSet<String>,
) -> Vec<SelectedTable> {
    filings
        .iter()
        .flat_map(|filing| {
            tables_by_filing
                .get(&filing.accession)
                .into_iter()
                .flatten()
                .enumerate()
                .filter(|(i, _)| wanted.contains(&table_id(&filing.accession, *i)))
                .map(move |(_, table)| SelectedTable::new(table.clone(), filing))
        })
        .collect()
}

/// What to put in a workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Company CIK
    pub cik: String,
    /// Display name; the facts' entity name is used when empty
    pub company_name: String,
    /// Ticker symbol
    pub ticker: String,
    /// Filings whose periods become statement columns
    pub filings: Vec<FilingDescriptor>,
    /// Scan holding the extracted tables
    pub scan_id: Option<ScanId>,
    /// Table ids to include
    pub table_ids: BTreeSet<String>,
    /// Sheet arrangement
    pub layout: Layout,
}

/// EDGAR client plus the caches and components of a scan/generate session.
#[derive(Debug)]
pub struct Pipeline<C: Clock = SystemClock> {
    client: EdgarClient,
    directory: CompanyDirectory<C>,
    extractor: TableExtractor,
    assembler: StatementAssembler,
    scans: ScanCache<C>,
    concurrency: usize,
}

impl Pipeline<SystemClock> {
    /// Pipeline on the wall clock with default TTLs.
    pub fn new(client: EdgarClient) -> Self {
        Self::with_clock(
            client,
            Duration::hours(1),
            Duration::seconds(DEFAULT_SCAN_TTL_SECS),
            SystemClock,
        )
    }

    /// Pipeline whose client and directory follow `config`.
    pub fn from_config(config: &EdgarConfig) -> Result<Self> {
        let client = EdgarClient::with_config(config)?;
        let directory_ttl =
            Duration::from_std(config.directory_ttl).map_err(|e| DataError::Config {
                key: "directory_ttl".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::with_clock(
            client,
            directory_ttl,
            Duration::seconds(DEFAULT_SCAN_TTL_SECS),
            SystemClock,
        ))
    }
}

impl<C: Clock + Clone> Pipeline<C> {
    /// Pipeline whose directory and scan cache share `clock`.
    pub fn with_clock(client: EdgarClient, directory_ttl: Duration, scan_ttl: Duration, clock: C) -> Self {
        Self {
            client,
            directory: CompanyDirectory::with_clock(directory_ttl, clock.clone()),
            extractor: TableExtractor::default(),
            assembler: StatementAssembler::new(),
            scans: ScanCache::with_clock(scan_ttl, clock),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl<C: Clock> Pipeline<C> {
    /// Replace the table extractor.
    pub fn with_extractor(mut self, extractor: TableExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Set how many documents are fetched at once (at least one).
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = if concurrency == 0 { 1 } else { concurrency };
        self
    }

    /// Underlying EDGAR client.
    pub const fn client(&self) -> &EdgarClient {
        &self.client
    }

    /// Recorded scans.
    pub const fn scans(&self) -> &ScanCache<C> {
        &self.scans
    }

    /// Recorded scans, for restoring persisted entries.
    pub const fn scans_mut(&mut self) -> &mut ScanCache<C> {
        &mut self.scans
    }

    /// Companies matching `query`, best first.
    pub async fn search(&mut self, query: &str) -> Result<Vec<CompanyEntry>> {
        Ok(self.directory.search(&self.client, query).await?)
    }

    /// Company for a ticker, name or CIK.
    ///
    /// An all-digit query is taken as a CIK; it need not be listed in the
    /// ticker directory. Anything else takes the best search hit.
    pub async fn resolve_company(&mut self, query: &str) -> Result<CompanyEntry> {
        let query = query.trim();
        if !query.is_empty() && query.bytes().all(|b| b.is_ascii_digit()) {
            let cik = unpadded_cik(query);
            let entries = self.directory.entries(&self.client).await?;
            let entry = entries.iter().find(|entry| entry.cik == cik).cloned();
            return Ok(entry.unwrap_or(CompanyEntry {
                cik,
                ticker: String::new(),
                name: String::new(),
            }));
        }

        let hits = self.directory.search(&self.client, query).await?;
        hits.into_iter()
            .next()
            .ok_or_else(|| DataError::CikNotFound(query.to_string()).into())
    }

    /// Filings of `cik` matching `query`, newest first.
    pub async fn filings(&self, cik: &str, query: &FilingQuery) -> Result<Vec<FilingDescriptor>> {
        Ok(self.client.list_filings(cik, query).await?)
    }

    /// Fetch and extract every filing that has a primary document, in input
    /// order. `on_filing` sees each result as it completes.
    pub async fn fetch_scans<F>(&self, filings: &[FilingDescriptor], mut on_filing: F) -> Vec<FilingScan>
    where
        F: FnMut(&FilingScan),
    {
        let client = &self.client;
        let mut fetched = stream::iter(filings.iter().filter(|f| !f.doc_url.is_empty()).cloned())
            .map(move |filing| async move {
                let document = client.filing_document(&filing).await;
                (filing, document)
            })
            .buffered(self.concurrency);

        let mut scans = Vec::new();
        while let Some((filing, document)) = fetched.next().await {
            let scan = FilingScan::from_document(&self.extractor, filing, document);
            on_filing(&scan);
            scans.push(scan);
        }
        scans
    }

    /// Scan `filings` and record the result.
    pub async fn scan(&mut self, cik: &str, filings: Vec<FilingDescriptor>) -> Result<ScanReport> {
        self.scan_with_progress(cik, filings, |_| {}).await
    }

    /// [`scan`](Self::scan), reporting each filing as it completes.
    pub async fn scan_with_progress<F>(
        &mut self,
        cik: &str,
        filings: Vec<FilingDescriptor>,
        on_filing: F,
    ) -> Result<ScanReport>
    where
        F: FnMut(&FilingScan),
    {
        if cik.trim().is_empty() || filings.is_empty() {
            return Err(PipelineError::MissingInput(MISSING_SCAN_INPUT));
        }
        let scans = self.fetch_scans(&filings, on_filing).await;
        Ok(self.record_scan(cik, filings, scans))
    }

    /// Cache the tables of finished filing scans and summarize them.
    pub fn record_scan(
        &mut self,
        cik: &str,
        filings: Vec<FilingDescriptor>,
        scans: Vec<FilingScan>,
    ) -> ScanReport {
        let skipped = filings.iter().filter(|f| f.doc_url.is_empty()).count();
        let succeeded = scans.iter().filter(|scan| scan.succeeded()).count();
        let failed = scans.len() - succeeded;
        let summaries: Vec<TableSummary> = scans.iter().flat_map(FilingScan::summaries).collect();

        let tables_by_filing: HashMap<String, Vec<ExtractedTable>> =
            scans.into_iter().map(|scan| (scan.filing.accession, scan.tables)).collect();
        let scan_id = self.scans.record(cik, filings, tables_by_filing);

        info!(%scan_id, cik, tables = summaries.len(), succeeded, failed, skipped, "scan complete");
        ScanReport { scan_id, cik: cik.to_string(), tables: summaries, succeeded, failed, skipped }
    }

    /// Requested tables from the request's scan, if it is still cached.
    pub fn cached_tables(&self, request: &GenerateRequest) -> Option<Vec<SelectedTable>> {
        let entry = self.scans.get(request.scan_id.as_ref()?)?;
        debug!(cik = %request.cik, "using cached scan");
        Some(select_tables(&request.filings, &entry.tables_by_filing, &request.table_ids))
    }

    /// Requested tables, re-extracted from the filings they name. Filings
    /// that fail to fetch contribute nothing.
    pub async fn refetch_tables(&self, request: &GenerateRequest) -> Vec<SelectedTable> {
        let referenced: Vec<FilingDescriptor> = request
            .filings
            .iter()
            .filter(|filing| {
                request.table_ids.iter().any(|id| {
                    parse_table_id(id).is_ok_and(|(accession, _)| accession == filing.accession)
                })
            })
            .cloned()
            .collect();
        if referenced.is_empty() {
            return Vec::new();
        }

        debug!(filings = referenced.len(), "scan not cached, re-extracting tables");
        let tables_by_filing: HashMap<String, Vec<ExtractedTable>> = self
            .fetch_scans(&referenced, |_| {})
            .await
            .into_iter()
            .map(|scan| (scan.filing.accession, scan.tables))
            .collect();
        select_tables(&request.filings, &tables_by_filing, &request.table_ids)
    }

    /// Build the workbook from already fetched facts and tables.
    pub fn assemble_workbook(
        &self,
        request: &GenerateRequest,
        facts: &CompanyFacts,
        tables: Vec<SelectedTable>,
    ) -> Result<Workbook> {
        let statements = self.assembler.build(facts, &request.filings);
        let company_name = if request.company_name.trim().is_empty() {
            facts.entity_name.clone().unwrap_or_else(|| "Unknown".to_string())
        } else {
            request.company_name.clone()
        };

        let workbook = WorkbookBuilder::new(company_name, request.ticker.as_str())
            .layout(request.layout)
            .generated_at(self.scans.now())
            .statements(statements)
            .filings(request.filings.clone())
            .tables(tables)
            .build()?;
        Ok(workbook)
    }

    /// Fetch facts, gather the requested tables and build the workbook.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<Workbook> {
        if request.cik.trim().is_empty() || request.filings.is_empty() {
            return Err(PipelineError::MissingInput(MISSING_SCAN_INPUT));
        }

        let facts = self.client.company_facts(&request.cik).await?;
        let tables = match self.cached_tables(request) {
            Some(tables) => tables,
            None => self.refetch_tables(request).await,
        };

        let workbook = self.assemble_workbook(request, &facts, tables)?;
        info!(cik = %request.cik, sheets = workbook.sheets.len(), "generated workbook");
        Ok(workbook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn filing(accession: &str) -> FilingDescriptor {
        FilingDescriptor::new("10-K", "2024-02-01", accession)
    }

    fn table(title: Option<&str>, rows: usize) -> ExtractedTable {
        ExtractedTable {
            title: title.map(str::to_string),
            headers: vec![],
            rows: (0..rows).map(|i| vec![format!("row {i}"), "1".to_string(), "2".to_string()]).collect(),
        }
    }

    #[rstest]
    #[case("0000320193-24-000006:3", "0000320193-24-000006", 3)]
    #[case("a:b:0", "a:b", 0)]
    fn test_parse_table_id(#[case] id: &str, #[case] accession: &str, #[case] index: usize) {
        assert_eq!(parse_table_id(id).unwrap(), (accession, index));
    }

    #[rstest]
    #[case("no-colon")]
    #[case(":1")]
    #[case("acc:")]
    #[case("acc:-1")]
    fn test_parse_table_id_rejects(#[case] id: &str) {
        assert!(matches!(parse_table_id(id), Err(PipelineError::InvalidTableId(_))));
    }

    #[test]
    fn test_summaries() {
        let scan = FilingScan {
            filing: filing("acc-1"),
            tables: vec![table(Some("Segment Revenue"), 4), table(None, 0)],
            error: None,
        };
        let summaries = scan.summaries();
        assert_eq!(summaries[0].id, "acc-1:0");
        assert_eq!(summaries[0].title, "Segment Revenue");
        assert_eq!((summaries[0].rows, summaries[0].cols), (4, 3));
        assert_eq!(summaries[1].title, "Table 2");
        assert_eq!((summaries[1].rows, summaries[1].cols), (0, 0));
        assert_eq!(summaries[1].filing_type, "10-K");
    }

    #[test]
    fn test_failed_fetch_has_no_tables() {
        let scan = FilingScan::from_document(
            &TableExtractor::default(),
            filing("acc-1"),
            Err(DataError::FilingNotFound("acc-1".to_string())),
        );
        assert!(!scan.succeeded());
        assert!(scan.tables.is_empty());
        assert!(scan.error.unwrap().contains("acc-1"));
    }

    #[test]
    fn test_select_tables_follows_filing_order() {
        let filings = vec![filing("b"), filing("a")];
        let tables_by_filing = HashMap::from([
            ("a".to_string(), vec![table(Some("A0"), 1), table(Some("A1"), 1)]),
            ("b".to_string(), vec![table(Some("B0"), 1)]),
        ]);
        let wanted: BTreeSet<String> =
            ["a:1", "a:0", "b:0", "b:7", "zzz:0"].into_iter().map(str::to_string).collect();

        let titles: Vec<Option<String>> = select_tables(&filings, &tables_by_filing, &wanted)
            .into_iter()
            .map(|selected| selected.table.title)
            .collect();
        assert_eq!(
            titles,
            vec![Some("B0".to_string()), Some("A0".to_string()), Some("A1".to_string())]
        );
    }

    #[test]
    fn test_report_counts() {
        let report = ScanReport {
            scan_id: ScanId::new(),
            cik: "1".to_string(),
            tables: vec![],
            succeeded: 3,
            failed: 2,
            skipped: 1,
        };
        assert_eq!(report.attempted(), 5);
        assert!(report.is_partial());
    }
}
