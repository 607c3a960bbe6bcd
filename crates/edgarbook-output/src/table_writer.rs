//! Writing extracted filing tables onto a sheet.

use crate::sheet::{Cell, RowKind, Sheet};
use edgarbook_extract::ExtractedTable;

/// Placeholders filings use for zero or not applicable.
const DASH_PLACEHOLDERS: [&str; 3] = ["\u{2014}", "\u{2013}", "-"];

/// A number recovered from cell text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedNumber {
    /// Numeric value; percentages are already divided by 100
    pub value: f64,
    /// Whether the text carried a `%` sign
    pub percent: bool,
}

impl ParsedNumber {
    /// Cell holding this number.
    pub fn into_cell(self) -> Cell {
        if self.percent { Cell::percent(self.value) } else { Cell::number(self.value) }
    }
}

/// Parse filing cell text such as `$1,234`, `(56)` or `12.5%`.
///
/// Currency symbols, thousands separators and spaces are ignored,
/// parentheses mean negative, and dash placeholders are not numbers.
pub fn try_parse_number(text: &str) -> Option<ParsedNumber> {
    if text.is_empty() || DASH_PLACEHOLDERS.contains(&text) {
        return None;
    }

    let mut cleaned: String =
        text.chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
    if let Some(inner) = cleaned.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        cleaned = format!("-{inner}");
    }

    let (digits, percent) = match cleaned.strip_suffix('%') {
        Some(digits) => (digits, true),
        None => (cleaned.as_str(), false),
    };
    let value: f64 = digits.parse().ok().filter(|v: &f64| v.is_finite())?;

    Some(ParsedNumber { value: if percent { value / 100.0 } else { value }, percent })
}

/// Write `table` at the sheet cursor.
///
/// Layout: a title row, an optional `Source: …` subtitle, the header rows,
/// then the data rows with numeric text converted to numbers. One blank row
/// is left after the table.
pub fn write_table(sheet: &mut Sheet, table: &ExtractedTable, source: Option<&str>) {
    let title = table.title.as_deref().unwrap_or("Table");
    sheet.push(RowKind::Title, vec![Cell::text(title)]);

    if let Some(source) = source {
        sheet.push(RowKind::Subtitle, vec![Cell::text(format!("Source: {source}"))]);
    }

    for header in &table.headers {
        sheet.push(RowKind::Header, header.iter().map(Cell::text).collect());
    }

    for row in &table.rows {
        let cells = row
            .iter()
            .map(|text| match try_parse_number(text) {
                Some(number) => number.into_cell(),
                None => Cell::text(text),
            })
            .collect();
        sheet.push(RowKind::Item, cells);
    }

    sheet.skip(1);
}
