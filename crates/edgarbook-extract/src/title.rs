//! Table title inference.
//!
//! Filing tables rarely carry a `<caption>`. The title usually sits in a bold
//! paragraph a few nodes above the table, sometimes in a single spanning cell
//! on the first row, and sometimes nowhere at all. Resolution runs in three
//! tiers and the first tier that yields a title wins:
//!
//! 1. preceding siblings of the `<table>` element,
//! 2. a lone spanning cell on the first row,
//! 3. keyword scoring over header text and row labels.

use crate::numeric::{clean_text, is_numeric_cell};
use scraper::node::Node;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

static TR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid tr selector"));
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").expect("valid cell selector"));

/// Default number of preceding sibling nodes inspected for a title.
pub const DEFAULT_SIBLING_LOOKBACK: usize = 5;

/// Rows considered by the first-column fallback.
const FALLBACK_ROW_WINDOW: usize = 10;

/// Longest first-column label usable as a fallback title.
const FALLBACK_MAX_CHARS: usize = 60;

/// Tags whose text may serve as a structural title.
const TITLE_TAGS: &[&str] = &[
    "b", "strong", "h1", "h2", "h3", "h4", "h5", "h6", "p", "div", "span",
];

/// Tags accepted as a title on their own, without a keyword hit.
const EMPHASIS_TAGS: &[&str] = &["b", "strong", "h1", "h2", "h3", "h4"];

/// Words that mark nearby text as a financial table title.
const TITLE_KEYWORDS: &[&str] = &[
    "statement",
    "balance",
    "income",
    "cash flow",
    "operations",
    "financial",
    "schedule",
    "table",
    "equity",
    "debt",
    "assets",
    "liabilities",
    "revenue",
    "expenses",
    "shares",
    "stock",
    "compensation",
    "lease",
    "segment",
    "quarter",
    "annual",
    "fiscal",
    "consolidated",
    "unaudited",
    "warrant",
    "option",
    "restricted",
    "goodwill",
    "intangible",
    "depreciation",
    "amortization",
    "tax",
    "provision",
    "comprehensive",
    "accumulated",
    "capital",
    "investment",
];

/// A keyword group and the title it stands for.
#[derive(Debug, Clone, Copy)]
pub struct ContentPattern {
    /// Lowercase keywords counted against the table corpus.
    pub keywords: &'static [&'static str],
    /// Title returned when this group wins.
    pub title: &'static str,
}

const fn pattern(keywords: &'static [&'static str], title: &'static str) -> ContentPattern {
    ContentPattern { keywords, title }
}

/// Keyword groups in priority order.
///
/// Ties are broken by position, so more specific groups must come before the
/// generic ones they overlap with.
pub const CONTENT_PATTERNS: &[ContentPattern] = &[
    pattern(&["revenue", "sales", "net sales", "total revenue"], "Revenue Breakdown"),
    pattern(
        &["cost of revenue", "cost of goods", "cost of sales", "cogs"],
        "Cost of Revenue Detail",
    ),
    pattern(&["operating lease", "right-of-use", "rou asset"], "Lease Obligations"),
    pattern(&["finance lease"], "Finance Lease Schedule"),
    pattern(
        &[
            "long-term debt",
            "senior note",
            "credit facility",
            "term loan",
            "revolving",
            "maturity",
            "interest rate",
        ],
        "Debt Schedule",
    ),
    pattern(&["short-term borrowing", "commercial paper"], "Short-Term Borrowings"),
    pattern(
        &[
            "stock option",
            "option activity",
            "options outstanding",
            "exercise price",
            "weighted average exercise",
        ],
        "Stock Option Activity",
    ),
    pattern(
        &["restricted stock", "rsu", "psu", "performance share", "unvested"],
        "Restricted Stock / RSU Activity",
    ),
    pattern(&["warrant"], "Warrant Activity"),
    pattern(&["share repurchase", "buyback", "treasury stock"], "Share Repurchase Program"),
    pattern(&["goodwill"], "Goodwill"),
    pattern(
        &["intangible asset", "amortization of intangible", "finite-lived"],
        "Intangible Assets",
    ),
    pattern(
        &["property, plant", "property and equipment", "pp&e", "useful life"],
        "Property, Plant & Equipment",
    ),
    pattern(&["depreciation", "amortization schedule"], "Depreciation & Amortization"),
    pattern(
        &[
            "income tax",
            "tax provision",
            "deferred tax",
            "effective tax rate",
            "tax rate reconciliation",
        ],
        "Income Tax Detail",
    ),
    pattern(&["segment", "reportable segment", "operating segment"], "Segment Data"),
    pattern(
        &["geographic", "by country", "by region", "united states", "international"],
        "Geographic Breakdown",
    ),
    pattern(
        &["store", "supercenter", "location", "club", "unit count", "number of"],
        "Operating Metrics",
    ),
    pattern(
        &["accounts receivable", "receivable aging", "allowance for doubtful"],
        "Accounts Receivable Detail",
    ),
    pattern(
        &["inventory", "raw material", "finished goods", "work in process"],
        "Inventory Detail",
    ),
    pattern(
        &["accrued", "accrued liabilities", "accrued expenses"],
        "Accrued Liabilities Detail",
    ),
    pattern(
        &["pension", "retirement", "benefit obligation", "postretirement"],
        "Pension & Benefits",
    ),
    pattern(
        &["fair value", "level 1", "level 2", "level 3", "hierarchy"],
        "Fair Value Measurements",
    ),
    pattern(
        &["acquisition", "business combination", "purchase price"],
        "Acquisition Detail",
    ),
    pattern(
        &["commitment", "contractual obligation", "future minimum"],
        "Commitments & Obligations",
    ),
    pattern(&["dividend", "per share", "dividends declared"], "Dividend Information"),
    pattern(&["earnings per share", "basic and diluted", "eps"], "Earnings Per Share Detail"),
    pattern(
        &["comprehensive income", "other comprehensive", "oci"],
        "Other Comprehensive Income",
    ),
    pattern(
        &["selling, general", "sg&a", "operating expense"],
        "Operating Expense Detail",
    ),
    pattern(&["research and development", "r&d"], "Research & Development"),
    pattern(
        &["equity compensation", "stock-based compensation", "share-based"],
        "Stock-Based Compensation",
    ),
    pattern(&["capital expenditure", "capex"], "Capital Expenditures"),
    pattern(
        &["investment", "marketable securities", "available-for-sale", "held-to-maturity"],
        "Investment Securities",
    ),
];

/// Infers a title for `table` using the three-tier resolution.
///
/// `headers` and `rows` are the parsed (colspan-expanded) contents of the same
/// table. Returns `None` when no tier produces a title.
pub fn infer_title(
    table: ElementRef<'_>,
    headers: &[Vec<String>],
    rows: &[Vec<String>],
    lookback: usize,
) -> Option<String> {
    structural_title(table, lookback)
        .or_else(|| spanning_header_title(table))
        .or_else(|| infer_title_from_content(headers, rows))
}

fn within_title_bounds(text: &str) -> bool {
    (4..200).contains(&text.chars().count())
}

/// Tier 1: looks at up to `lookback` preceding siblings of the table.
///
/// A sibling `<table>` or `<hr>` ends the search since anything above it
/// belongs to different content.
pub fn structural_title(table: ElementRef<'_>, lookback: usize) -> Option<String> {
    for sibling in table.prev_siblings().take(lookback) {
        match sibling.value() {
            Node::Text(text) => {
                let cleaned = clean_text(text);
                if within_title_bounds(&cleaned) {
                    return Some(cleaned);
                }
            }
            Node::Element(element) => {
                let tag = element.name();
                if tag == "table" || tag == "hr" {
                    break;
                }
                if !TITLE_TAGS.contains(&tag) {
                    continue;
                }
                let Some(element_ref) = ElementRef::wrap(sibling) else {
                    continue;
                };
                let cleaned = clean_text(&element_ref.text().collect::<String>());
                if !within_title_bounds(&cleaned) {
                    continue;
                }
                let lower = cleaned.to_lowercase();
                if EMPHASIS_TAGS.contains(&tag) || TITLE_KEYWORDS.iter().any(|kw| lower.contains(kw))
                {
                    return Some(cleaned);
                }
            }
            _ => {}
        }
    }
    None
}

/// Tier 2: a first row made of exactly one short, non-numeric cell.
pub fn spanning_header_title(table: ElementRef<'_>) -> Option<String> {
    let first_row = table.select(&TR_SELECTOR).next()?;
    let mut cells = first_row.select(&CELL_SELECTOR);
    let only = cells.next()?;
    if cells.next().is_some() {
        return None;
    }
    let text = clean_text(&only.text().collect::<String>());
    (within_title_bounds(&text) && !is_numeric_cell(&text)).then_some(text)
}

/// Tier 3: scores [`CONTENT_PATTERNS`] against header text and row labels.
///
/// Falls back to the shortest non-numeric first-column label among the first
/// rows, formatted as `"Data: {label}..."`.
pub fn infer_title_from_content(headers: &[Vec<String>], rows: &[Vec<String>]) -> Option<String> {
    let mut pool: Vec<String> = Vec::new();
    for header_row in headers {
        pool.extend(header_row.iter().map(|cell| clean_text(cell).to_lowercase()));
    }
    for row in rows {
        if let Some(first) = row.first() {
            pool.push(clean_text(first).to_lowercase());
        }
    }
    let corpus = pool.join(" ");

    let mut best: Option<&ContentPattern> = None;
    let mut best_count = 0usize;
    for candidate in CONTENT_PATTERNS {
        let count = candidate
            .keywords
            .iter()
            .filter(|kw| corpus.contains(*kw))
            .count();
        // strictly greater: the earliest group reaching the max keeps the title
        if count > best_count {
            best_count = count;
            best = Some(candidate);
        }
    }
    if let Some(found) = best {
        return Some(found.title.to_string());
    }

    let shortest = rows
        .iter()
        .take(FALLBACK_ROW_WINDOW)
        .filter_map(|row| row.first())
        .map(|cell| clean_text(cell))
        .filter(|label| {
            !label.is_empty() && !is_numeric_cell(label) && label.chars().count() > 2
        })
        .fold(None::<String>, |shortest, label| match shortest {
            Some(current) if current.chars().count() <= label.chars().count() => Some(current),
            _ => Some(label),
        })?;

    (shortest.chars().count() <= FALLBACK_MAX_CHARS).then(|| format!("Data: {shortest}..."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    static TABLE_SELECTOR: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("table").expect("valid table selector"));

    fn strings(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| (*c).to_string()).collect())
            .collect()
    }

    fn title_of(html: &str) -> Option<String> {
        let doc = Html::parse_document(html);
        let table = doc.select(&TABLE_SELECTOR).next().expect("table in fixture");
        structural_title(table, DEFAULT_SIBLING_LOOKBACK)
    }

    #[test]
    fn test_bold_sibling_is_title() {
        let html = "<body><b>Quarterly Highlights</b><table><tr><td>1</td></tr></table></body>";
        assert_eq!(title_of(html).as_deref(), Some("Quarterly Highlights"));
    }

    #[test]
    fn test_plain_paragraph_needs_keyword() {
        let html = "<body><p>Some introductory words</p><table><tr><td>1</td></tr></table></body>";
        assert_eq!(title_of(html), None);

        let html = "<body><p>Schedule of maturities</p><table><tr><td>1</td></tr></table></body>";
        assert_eq!(title_of(html).as_deref(), Some("Schedule of maturities"));
    }

    #[test]
    fn test_free_text_sibling_is_title() {
        let html = "<body>Selected figures<table><tr><td>1</td></tr></table></body>";
        assert_eq!(title_of(html).as_deref(), Some("Selected figures"));
    }

    #[test]
    fn test_hr_stops_search() {
        let html =
            "<body><b>Balance Sheet</b><hr><table><tr><td>1</td></tr></table></body>";
        assert_eq!(title_of(html), None);
    }

    #[test]
    fn test_previous_table_stops_search() {
        let html = "<body><b>Balance Sheet</b><table><tr><td>0</td></tr></table>\
                    <table><tr><td>1</td></tr></table></body>";
        let doc = Html::parse_document(html);
        let second = doc.select(&TABLE_SELECTOR).nth(1).expect("second table");
        assert_eq!(structural_title(second, DEFAULT_SIBLING_LOOKBACK), None);
    }

    #[test]
    fn test_lookback_limit() {
        let html = "<body><b>Balance Sheet</b><span>x</span><span>y</span><span>z</span>\
                    <span>w</span><span>v</span><table><tr><td>1</td></tr></table></body>";
        assert_eq!(title_of(html), None);
    }

    #[test]
    fn test_too_short_or_too_long_is_skipped() {
        let html = "<body><b>Debt Summary</b><b>Tax</b><table><tr><td>1</td></tr></table></body>";
        assert_eq!(title_of(html).as_deref(), Some("Debt Summary"));

        let long = "x".repeat(200);
        let html = format!("<body><b>{long}</b><table><tr><td>1</td></tr></table></body>");
        assert_eq!(title_of(&html), None);
    }

    #[test]
    fn test_spanning_header_cell() {
        let html = "<table><tr><td colspan=\"3\">Share Activity</td></tr>\
                    <tr><td>a</td><td>1</td><td>2</td></tr></table>";
        let doc = Html::parse_document(html);
        let table = doc.select(&TABLE_SELECTOR).next().expect("table");
        assert_eq!(spanning_header_title(table).as_deref(), Some("Share Activity"));

        let html = "<table><tr><td>2024</td></tr><tr><td>1</td></tr></table>";
        let doc = Html::parse_document(html);
        let table = doc.select(&TABLE_SELECTOR).next().expect("table");
        assert_eq!(spanning_header_title(table), None);
    }

    #[test]
    fn test_content_keyword_scoring() {
        let headers = strings(&[&["", "2024", "2023"]]);
        let rows = strings(&[
            &["Goodwill, beginning of year", "100", "90"],
            &["Acquisitions", "10", "10"],
            &["Goodwill, end of year", "110", "100"],
        ]);
        // "goodwill" scores 1 for Goodwill, "acquisition" scores 1 for Acquisition
        // Detail; Goodwill is declared first and wins the tie
        assert_eq!(
            infer_title_from_content(&headers, &rows).as_deref(),
            Some("Goodwill")
        );
    }

    #[test]
    fn test_content_higher_score_wins() {
        let rows = strings(&[
            &["Current income tax", "5"],
            &["Deferred tax", "2"],
            &["Effective tax rate", "21%"],
            &["Total revenue", "1000"],
        ]);
        assert_eq!(
            infer_title_from_content(&[], &rows).as_deref(),
            Some("Income Tax Detail")
        );
    }

    #[test]
    fn test_content_fallback_to_shortest_label() {
        let rows = strings(&[&["Widgets shipped", "5"], &["Gizmos", "7"], &["ab", "1"]]);
        assert_eq!(
            infer_title_from_content(&[], &rows).as_deref(),
            Some("Data: Gizmos...")
        );
    }

    #[test]
    fn test_content_fallback_nothing_usable() {
        let rows = strings(&[&["1", "5"], &["2", "7"]]);
        assert_eq!(infer_title_from_content(&[], &rows), None);

        let long_label = "z".repeat(61);
        let rows = vec![
            vec![long_label.clone(), "1".to_string()],
            vec![long_label, "2".to_string()],
        ];
        assert_eq!(infer_title_from_content(&[], &rows), None);
    }

    #[test]
    fn test_patterns_declared_in_priority_order() {
        assert_eq!(CONTENT_PATTERNS[0].title, "Revenue Breakdown");
        assert!(CONTENT_PATTERNS.len() >= 30);
        assert!(
            CONTENT_PATTERNS
                .iter()
                .all(|p| p.keywords.iter().all(|kw| kw.to_lowercase() == *kw))
        );
    }
}
