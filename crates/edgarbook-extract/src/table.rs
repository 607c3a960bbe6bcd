//! Financial table extraction from filing markup.

use crate::numeric::{
    DEFAULT_DENSITY_THRESHOLD, DEFAULT_MIN_NUMERIC_CELLS, clean_text,
    has_sufficient_numeric_density, is_numeric_cell,
};
use crate::title::{DEFAULT_SIBLING_LOOKBACK, infer_title};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

static SCRIPT_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>")
        .expect("valid script/style pattern")
});
static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid table selector"));
static TR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid tr selector"));
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").expect("valid cell selector"));

/// Upper bound on a single cell's `colspan`.
pub const MAX_COLSPAN: usize = 1000;

/// Number of leading rows compared when detecting duplicate tables.
const DEDUP_ROW_PREFIX: usize = 3;

/// A table lifted out of a filing document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTable {
    /// Inferred title, if any tier produced one.
    pub title: Option<String>,
    /// Header rows, colspan-expanded.
    pub headers: Vec<Vec<String>>,
    /// Data rows, colspan-expanded.
    pub rows: Vec<Vec<String>>,
}

impl ExtractedTable {
    /// Widest row across headers and data rows.
    pub fn column_count(&self) -> usize {
        self.headers
            .iter()
            .chain(self.rows.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0)
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether `other` should be treated as a copy of this table.
    ///
    /// Filings often repeat a table (once in the body, once in an exhibit).
    /// Two tables match when they share a non-empty title and row count, or
    /// when their first three data rows are identical.
    pub fn is_similar_to(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (&self.title, &other.title)
            && !a.is_empty()
            && a == b
            && self.rows.len() == other.rows.len()
        {
            return true;
        }
        let lhs = &self.rows[..self.rows.len().min(DEDUP_ROW_PREFIX)];
        let rhs = &other.rows[..other.rows.len().min(DEDUP_ROW_PREFIX)];
        !lhs.is_empty() && lhs == rhs
    }
}

/// Tuning knobs for [`TableExtractor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractorConfig {
    /// Fraction of non-empty cells that must be numeric.
    pub density_threshold: f64,
    /// Absolute number of numeric cells required.
    pub min_numeric_cells: usize,
    /// Minimum data rows remaining after header detection.
    pub min_data_rows: usize,
    /// Preceding sibling nodes inspected for a title.
    pub sibling_lookback: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            density_threshold: DEFAULT_DENSITY_THRESHOLD,
            min_numeric_cells: DEFAULT_MIN_NUMERIC_CELLS,
            min_data_rows: 2,
            sibling_lookback: DEFAULT_SIBLING_LOOKBACK,
        }
    }
}

/// Walks every `<table>` in a document and keeps the financial ones.
#[derive(Debug, Clone, Default)]
pub struct TableExtractor {
    config: ExtractorConfig,
}

impl TableExtractor {
    /// Create an extractor with the given configuration.
    pub const fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub const fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract qualifying tables from `markup` in document order.
    ///
    /// Nested tables are visited as tables of their own. Extraction never
    /// fails: unparseable markup simply produces fewer (or zero) tables.
    pub fn extract(&self, markup: &str) -> Vec<ExtractedTable> {
        let stripped = SCRIPT_STYLE.replace_all(markup, "");
        let document = Html::parse_document(&stripped);

        let mut accepted: Vec<ExtractedTable> = Vec::new();
        let mut visited = 0usize;

        for element in document.select(&TABLE_SELECTOR) {
            visited += 1;
            let (headers, rows) = parse_table(element);

            if rows.len() < self.config.min_data_rows {
                continue;
            }
            if !has_sufficient_numeric_density(
                &rows,
                self.config.density_threshold,
                self.config.min_numeric_cells,
            ) {
                continue;
            }

            let title = infer_title(element, &headers, &rows, self.config.sibling_lookback);
            let candidate = ExtractedTable { title, headers, rows };

            // first accepted copy wins
            if accepted.iter().any(|existing| existing.is_similar_to(&candidate)) {
                continue;
            }
            accepted.push(candidate);
        }

        debug!(visited, kept = accepted.len(), "extracted filing tables");
        accepted
    }
}

/// Extract tables with the default configuration.
///
/// See [`TableExtractor::extract`].
pub fn extract_tables(markup: &str) -> Vec<ExtractedTable> {
    TableExtractor::default().extract(markup)
}

fn colspan_of(cell: ElementRef<'_>) -> usize {
    cell.value()
        .attr("colspan")
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|span| *span >= 1)
        .map_or(1, |span| span.min(MAX_COLSPAN))
}

/// Split a table into header rows and data rows.
///
/// Rowspans are not expanded, so a cell spanning rows shows up only in its
/// first row.
fn parse_table(table: ElementRef<'_>) -> (Vec<Vec<String>>, Vec<Vec<String>>) {
    let mut header_rows = Vec::new();
    let mut rows = Vec::new();

    for tr in table.select(&TR_SELECTOR) {
        let mut row = Vec::new();
        let mut all_th = true;
        let mut has_cells = false;

        for cell in tr.select(&CELL_SELECTOR) {
            has_cells = true;
            all_th &= cell.value().name() == "th";
            row.push(clean_text(&cell.text().collect::<String>()));
            let padding = colspan_of(cell) - 1;
            row.extend(std::iter::repeat_n(String::new(), padding));
        }

        if row.iter().all(String::is_empty) {
            continue;
        }
        if has_cells && all_th {
            header_rows.push(row);
        } else {
            rows.push(row);
        }
    }

    if header_rows.is_empty()
        && let Some(first) = rows.first()
    {
        let labels = first
            .iter()
            .filter(|cell| !cell.is_empty() && !is_numeric_cell(cell))
            .count();
        if labels * 2 >= first.len() {
            header_rows.push(rows.remove(0));
        }
    }

    (header_rows, rows)
}
