//! Workbook assembly.
//!
//! Two layouts are supported. [`Layout::MultiSheet`] writes an `Index` sheet,
//! one sheet per non-empty statement and one per selected table.
//! [`Layout::SingleSheet`] stacks everything on one `All Data` sheet.

use crate::formula::{RenderError, render_at};
use crate::sheet::{Cell, RowKind, Sheet};
use crate::table_writer::write_table;
use chrono::{DateTime, Utc};
use edgarbook_data::edgar::filings::FilingDescriptor;
use edgarbook_data::statements::{FinancialStatements, StatementData, StatementKind};
use edgarbook_extract::ExtractedTable;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Longest sheet name spreadsheet applications accept.
pub const MAX_SHEET_NAME_CHARS: usize = 31;

/// Characters not allowed in sheet names.
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['\\', '/', '*', '?', '[', ']', ':'];

const INDEX_SHEET: &str = "Index";
const SINGLE_SHEET: &str = "All Data";

/// Strip forbidden characters, cap the length and trim.
pub fn safe_sheet_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| !FORBIDDEN_SHEET_CHARS.contains(c))
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    kept.trim().to_string()
}

/// Sanitized name not yet in `used`, suffixed ` (2)`, ` (3)`, … on clashes.
///
/// The chosen name is added to `used`.
pub fn unique_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    let mut base = safe_sheet_name(name);
    if base.is_empty() {
        base = "Table".to_string();
    }

    let mut candidate = base.clone();
    let mut counter = 2;
    while used.contains(&candidate) {
        let suffix = format!(" ({counter})");
        let keep = MAX_SHEET_NAME_CHARS.saturating_sub(suffix.chars().count());
        let prefix: String = base.chars().take(keep).collect();
        candidate = safe_sheet_name(&format!("{prefix}{suffix}"));
        counter += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Sheet arrangement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Index, statement and table sheets
    #[default]
    MultiSheet,
    /// Everything on one sheet
    SingleSheet,
}

/// A table chosen for the workbook, with the filing it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedTable {
    /// Extracted table
    pub table: ExtractedTable,
    /// Form type of the source filing
    pub filing_type: String,
    /// Filing date of the source filing
    pub filing_date: String,
}

impl SelectedTable {
    /// Attach a table to its filing.
    pub fn new(table: ExtractedTable, filing: &FilingDescriptor) -> Self {
        Self { table, filing_type: filing.form_type.clone(), filing_date: filing.date.clone() }
    }

    /// `"{type} ({date})"`.
    pub fn source(&self) -> String {
        format!("{} ({})", self.filing_type, self.filing_date)
    }
}

/// A finished workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    /// Company display name
    pub company_name: String,
    /// Ticker symbol
    pub ticker: String,
    /// When the workbook was built
    pub generated_at: DateTime<Utc>,
    /// Sheet arrangement
    pub layout: Layout,
    /// Sheets in order
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Base file name, e.g. `AAPL_SEC_Filings`.
    ///
    /// Uses the ticker, or the first ten characters of the company name when
    /// there is no ticker, keeping only ASCII letters and digits.
    pub fn file_stem(&self) -> String {
        let source: String = if self.ticker.is_empty() {
            self.company_name.chars().take(10).collect()
        } else {
            self.ticker.clone()
        };
        let safe: String = source.chars().filter(char::is_ascii_alphanumeric).collect();
        format!("{safe}_SEC_Filings")
    }

    /// Sheet by name.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    /// Sheet names in order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }
}

/// Builder for [`Workbook`].
#[derive(Debug, Default)]
pub struct WorkbookBuilder {
    company_name: String,
    ticker: String,
    layout: Layout,
    generated_at: Option<DateTime<Utc>>,
    statements: FinancialStatements,
    filings: Vec<FilingDescriptor>,
    tables: Vec<SelectedTable>,
}

impl WorkbookBuilder {
    /// Builder for a company.
    pub fn new(company_name: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self { company_name: company_name.into(), ticker: ticker.into(), ..Self::default() }
    }

    /// Set the layout.
    pub const fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Fix the generation timestamp; defaults to now.
    pub const fn generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    /// Assembled statements.
    pub fn statements(mut self, statements: FinancialStatements) -> Self {
        self.statements = statements;
        self
    }

    /// Filings listed on the index sheet.
    pub fn filings(mut self, filings: Vec<FilingDescriptor>) -> Self {
        self.filings = filings;
        self
    }

    /// Tables to include, in order.
    pub fn tables(mut self, tables: Vec<SelectedTable>) -> Self {
        self.tables = tables;
        self
    }

    /// Lay out every sheet.
    pub fn build(self) -> Result<Workbook, RenderError> {
        let generated_at = self.generated_at.unwrap_or_else(Utc::now);
        let sheets = match self.layout {
            Layout::MultiSheet => self.multi_sheet(generated_at)?,
            Layout::SingleSheet => vec![self.single_sheet(generated_at)?],
        };
        debug!(
            ticker = %self.ticker,
            layout = ?self.layout,
            sheets = sheets.len(),
            tables = self.tables.len(),
            "built workbook"
        );

        Ok(Workbook {
            company_name: self.company_name,
            ticker: self.ticker,
            generated_at,
            layout: self.layout,
            sheets,
        })
    }

    fn header_rows(&self, sheet: &mut Sheet, generated_at: DateTime<Utc>) {
        sheet.push(
            RowKind::Title,
            vec![Cell::text(format!("{} ({})", self.company_name, self.ticker))],
        );
        sheet.push(
            RowKind::Subtitle,
            vec![Cell::text(format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M")))],
        );
    }

    /// Non-empty statements in presentation order.
    fn statements_to_render(&self) -> impl Iterator<Item = (StatementKind, &StatementData)> {
        StatementKind::ALL.into_iter().filter_map(|kind| {
            self.statements.statement(kind).filter(|data| !data.is_empty()).map(|data| (kind, data))
        })
    }

    fn multi_sheet(&self, generated_at: DateTime<Utc>) -> Result<Vec<Sheet>, RenderError> {
        let mut used = HashSet::from([INDEX_SHEET.to_string()]);
        let mut index = Sheet::new(INDEX_SHEET);
        let mut sheets = Vec::new();

        self.header_rows(&mut index, generated_at);
        index.skip(1);
        index.push(RowKind::Section, vec![Cell::text("Filings Included:")]);
        index.push(RowKind::Header, vec![Cell::text("Type"), Cell::text("Date")]);
        for filing in &self.filings {
            index.push(RowKind::Item, vec![Cell::text(&filing.form_type), Cell::text(&filing.date)]);
        }

        for (kind, data) in self.statements_to_render() {
            let name = unique_sheet_name(kind.name(), &mut used);
            let mut sheet = Sheet::new(name).with_freeze_panes("B3");
            let rendered = render_at(kind.name(), data, &self.statements.periods, 1)?;
            sheet.append(rendered.rows, rendered.next_row);
            sheets.push(sheet);
        }

        if !self.tables.is_empty() {
            index.skip(1);
            index.push(RowKind::Section, vec![Cell::text("Additional Tables Included:")]);
            index.push(RowKind::Header, vec![Cell::text("Sheet Name"), Cell::text("Source")]);
        }
        for selected in &self.tables {
            let title = selected.table.title.as_deref().unwrap_or("Table");
            let name = unique_sheet_name(title, &mut used);
            let source = selected.source();

            let mut sheet = Sheet::new(name.clone()).with_freeze_panes("A3");
            write_table(&mut sheet, &selected.table, Some(&source));
            sheets.push(sheet);

            index.push(RowKind::Item, vec![Cell::text(name), Cell::text(source)]);
        }

        sheets.insert(0, index);
        Ok(sheets)
    }

    fn single_sheet(&self, generated_at: DateTime<Utc>) -> Result<Sheet, RenderError> {
        let mut sheet = Sheet::new(SINGLE_SHEET).with_freeze_panes("B1");
        self.header_rows(&mut sheet, generated_at);
        sheet.skip(1);

        for (kind, data) in self.statements_to_render() {
            let rendered = render_at(kind.name(), data, &self.statements.periods, sheet.next_row())?;
            sheet.append(rendered.rows, rendered.next_row);
            sheet.skip(1);
        }

        for selected in &self.tables {
            write_table(&mut sheet, &selected.table, Some(&selected.source()));
            sheet.skip(1);
        }
        Ok(sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case("Income Statement", "Income Statement")]
    #[case("Revenue: by [Segment]?", "Revenue by Segment")]
    #[case("a/b\\c*d", "abcd")]
    #[case("  padded  ", "padded")]
    #[case(
        "CONSOLIDATED STATEMENTS OF COMPREHENSIVE INCOME",
        "CONSOLIDATED STATEMENTS OF COMP"
    )]
    fn test_safe_sheet_name(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(safe_sheet_name(name), expected);
        assert!(safe_sheet_name(name).chars().count() <= MAX_SHEET_NAME_CHARS);
    }

    #[test]
    fn test_unique_sheet_names() {
        let mut used = HashSet::new();
        assert_eq!(unique_sheet_name("Debt", &mut used), "Debt");
        assert_eq!(unique_sheet_name("Debt", &mut used), "Debt (2)");
        assert_eq!(unique_sheet_name("Debt", &mut used), "Debt (3)");
        assert_eq!(unique_sheet_name("???", &mut used), "Table");
        assert_eq!(unique_sheet_name("", &mut used), "Table (2)");

        let long = "CONSOLIDATED STATEMENTS OF COMPREHENSIVE INCOME";
        assert_eq!(unique_sheet_name(long, &mut used), "CONSOLIDATED STATEMENTS OF COMP");
        let second = unique_sheet_name(long, &mut used);
        assert_eq!(second, "CONSOLIDATED STATEMENTS OF  (2)");
        assert_eq!(second.chars().count(), MAX_SHEET_NAME_CHARS);
    }

    fn fixture() -> WorkbookBuilder {
        let mut income = StatementData::new();
        income.insert("Revenue".to_string(), [("2023-12-31".to_string(), 1000.0)].into());
        income.insert("Cost of Revenue".to_string(), [("2023-12-31".to_string(), 400.0)].into());
        let mut statements = FinancialStatements::default();
        statements.statements.insert(StatementKind::Income, income);
        statements.statements.insert(StatementKind::Balance, StatementData::new());
        statements.periods = vec!["2023-12-31".to_string()];

        let filing = FilingDescriptor::new("10-K", "2024-02-01", "0000320193-24-000001");
        let table = |title: Option<&str>| ExtractedTable {
            title: title.map(str::to_string),
            headers: vec![],
            rows: vec![vec!["Cloud".to_string(), "100".to_string()]],
        };

        WorkbookBuilder::new("Apple Inc.", "AAPL")
            .generated_at(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap())
            .statements(statements)
            .filings(vec![filing.clone()])
            .tables(vec![
                SelectedTable::new(table(Some("Revenue by Segment")), &filing),
                SelectedTable::new(table(Some("Revenue by Segment")), &filing),
                SelectedTable::new(table(None), &filing),
            ])
    }

    #[test]
    fn test_multi_sheet_layout() {
        let workbook = fixture().build().unwrap();
        assert_eq!(
            workbook.sheet_names(),
            vec!["Index", "Income Statement", "Revenue by Segment", "Revenue by Segment (2)", "Table"]
        );

        let index = workbook.sheet("Index").unwrap();
        assert_eq!(index.row(1).unwrap().label(), Some("Apple Inc. (AAPL)"));
        assert_eq!(index.row(2).unwrap().label(), Some("Generated: 2024-03-01 09:30"));
        assert_eq!(index.row(4).unwrap().label(), Some("Filings Included:"));
        assert_eq!(index.row(6).unwrap().cells, vec![Cell::text("10-K"), Cell::text("2024-02-01")]);
        assert_eq!(index.row(8).unwrap().label(), Some("Additional Tables Included:"));
        assert_eq!(
            index.row(11).unwrap().cells,
            vec![Cell::text("Revenue by Segment (2)"), Cell::text("10-K (2024-02-01)")]
        );

        let income = workbook.sheet("Income Statement").unwrap();
        assert_eq!(income.freeze_panes.as_deref(), Some("B3"));
        let gross = income.find_row("Gross Profit").unwrap();
        assert_eq!(gross.cell(2).map(Cell::display), Some("=B3-B4".to_string()));

        let table = workbook.sheet("Table").unwrap();
        assert_eq!(table.row(2).unwrap().label(), Some("Source: 10-K (2024-02-01)"));
    }

    #[test]
    fn test_single_sheet_layout() {
        let workbook = fixture().layout(Layout::SingleSheet).build().unwrap();
        assert_eq!(workbook.sheet_names(), vec!["All Data"]);

        let sheet = &workbook.sheets[0];
        assert_eq!(sheet.row(1).unwrap().label(), Some("Apple Inc. (AAPL)"));
        assert_eq!(sheet.row(4).unwrap().label(), Some("Income Statement"));
        // revenue and cost sit on rows 6 and 7 once the statement starts at row 4
        let gross = sheet.find_row("Gross Profit").unwrap();
        assert_eq!(gross.cell(2).map(Cell::display), Some("=B6-B7".to_string()));
        assert!(sheet.find_row("Balance Sheet").is_none());

        let sources: Vec<&str> = sheet
            .rows
            .iter()
            .filter(|row| row.kind == RowKind::Subtitle)
            .filter_map(|row| row.label())
            .filter(|label| label.starts_with("Source: "))
            .collect();
        assert_eq!(sources.len(), 3);
    }

    #[test]
    fn test_file_stem() {
        let workbook = WorkbookBuilder::new("Berkshire Hathaway", "BRK.B").build().unwrap();
        assert_eq!(workbook.file_stem(), "BRKB_SEC_Filings");

        let unnamed = WorkbookBuilder::new("Acme & Co. Holdings", "").build().unwrap();
        assert_eq!(unnamed.file_stem(), "AcmeCo_SEC_Filings");
    }
}
