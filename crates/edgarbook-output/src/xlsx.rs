//! Native `.xlsx` output.
//!
//! Every [`Sheet`] becomes one worksheet. Formula cells stay live, numbers
//! carry their display format and the sheet's pane anchor is frozen.

use crate::export::ExportError;
use crate::sheet::{Cell, NumberFormat, RowKind, Sheet};
use crate::workbook::Workbook;
use rust_xlsxwriter::{DocProperties, Format, FormatBorder, Workbook as XlsxWorkbook, Worksheet};
use std::path::Path;
use tracing::debug;

const LABEL_COLUMN_WIDTH: f64 = 48.0;
const VALUE_COLUMN_WIDTH: f64 = 16.0;

/// Excel number format code for `format`.
pub const fn number_format_code(format: NumberFormat) -> &'static str {
    match format {
        NumberFormat::Accounting => "#,##0;(#,##0)",
        NumberFormat::Decimal => "#,##0.00;(#,##0.00)",
        NumberFormat::Percent => "0.0%",
        NumberFormat::Plain => "0",
    }
}

fn row_format(kind: RowKind) -> Format {
    let format = Format::new();
    match kind {
        RowKind::Title => format.set_bold().set_font_size(14),
        RowKind::Subtitle => format.set_italic(),
        RowKind::Header => format.set_bold().set_border_bottom(FormatBorder::Thin),
        RowKind::Section => format.set_bold().set_italic(),
        RowKind::Subtotal => format.set_bold().set_border_top(FormatBorder::Thin),
        RowKind::Total => format
            .set_bold()
            .set_border_top(FormatBorder::Thin)
            .set_border_bottom(FormatBorder::Double),
        RowKind::Item | RowKind::Spacer => format,
    }
}

/// Zero-based `(row, column)` of a pane anchor such as `B3`.
///
/// Returns `None` for anything that is not column letters followed by a
/// row number of at least 1.
pub fn parse_anchor(anchor: &str) -> Option<(u32, u16)> {
    let split = anchor.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = anchor.split_at(split);
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    let column = letters
        .bytes()
        .try_fold(0u32, |acc, b| acc.checked_mul(26)?.checked_add(u32::from(b - b'A') + 1))?;
    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, u16::try_from(column - 1).ok()?))
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), ExportError> {
    worksheet.set_name(&sheet.name)?;

    for placed in &sheet.rows {
        let Some(row) = placed.row.checked_sub(1) else {
            continue;
        };
        let style = row_format(placed.kind);
        for (index, cell) in placed.cells.iter().enumerate() {
            let col = u16::try_from(index).map_err(|_| {
                ExportError::InvalidFormat(format!("sheet {} is too wide", sheet.name))
            })?;
            match cell {
                Cell::Empty => {}
                Cell::Text(text) => {
                    worksheet.write_string_with_format(row, col, text, &style)?;
                }
                Cell::Number { value, format } => {
                    let style = style.clone().set_num_format(number_format_code(*format));
                    worksheet.write_number_with_format(row, col, *value, &style)?;
                }
                Cell::Formula(formula) => {
                    let style =
                        style.clone().set_num_format(number_format_code(NumberFormat::Accounting));
                    worksheet.write_formula_with_format(
                        row,
                        col,
                        formula.expression().as_str(),
                        &style,
                    )?;
                }
            }
        }
    }

    worksheet.set_column_width(0, LABEL_COLUMN_WIDTH)?;
    for col in 1..sheet.column_count() {
        if let Ok(col) = u16::try_from(col) {
            worksheet.set_column_width(col, VALUE_COLUMN_WIDTH)?;
        }
    }

    match sheet.freeze_panes.as_deref().map(|anchor| (anchor, parse_anchor(anchor))) {
        Some((_, Some((row, col)))) => {
            worksheet.set_freeze_panes(row, col)?;
        }
        Some((anchor, None)) => debug!(sheet = %sheet.name, anchor, "ignoring bad pane anchor"),
        None => {}
    }
    Ok(())
}

/// Build the in-memory xlsx workbook.
pub fn to_xlsx(workbook: &Workbook) -> Result<XlsxWorkbook, ExportError> {
    let mut book = XlsxWorkbook::new();
    let properties = DocProperties::new()
        .set_title(format!("{} SEC Filings", workbook.company_name))
        .set_company(&workbook.company_name);
    book.set_properties(&properties);

    for sheet in &workbook.sheets {
        write_sheet(book.add_worksheet(), sheet)?;
    }
    Ok(book)
}

/// Write `workbook` as a single `.xlsx` file at `path`.
pub fn write_xlsx(workbook: &Workbook, path: &Path) -> Result<(), ExportError> {
    let mut book = to_xlsx(workbook)?;
    book.save(path)?;
    Ok(())
}
