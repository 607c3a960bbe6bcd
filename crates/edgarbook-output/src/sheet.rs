//! In-memory worksheet model.
//!
//! A [`Sheet`] is a sparse list of [`PlacedRow`]s. Rows are 1-based and columns
//! are 1-based (`A` = 1) to line up with spreadsheet references such as `B3`.

use serde::{Deserialize, Serialize};

/// How a numeric cell should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    /// Whole numbers with thousands separators, negatives in parentheses
    Accounting,
    /// Two decimal places, negatives in parentheses
    Decimal,
    /// Fraction shown as a percentage
    Percent,
    /// No separators; used for year-like values
    Plain,
}

impl NumberFormat {
    /// Format for a plain number.
    pub fn for_value(value: f64) -> Self {
        if is_year_like(value) {
            Self::Plain
        } else if value.fract() == 0.0 {
            Self::Accounting
        } else {
            Self::Decimal
        }
    }
}

/// Whether `value` looks like a calendar year (1900 to 2099).
pub fn is_year_like(value: f64) -> bool {
    value.fract() == 0.0 && (1900.0..=2099.0).contains(&value)
}

/// A live formula summing and subtracting cells of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    /// Column the referenced cells live in
    pub column: u32,
    /// Rows added
    pub plus: Vec<u32>,
    /// Rows subtracted
    pub minus: Vec<u32>,
    /// Whether the whole expression is sign-flipped
    pub negate: bool,
}

impl Formula {
    /// Spreadsheet expression, e.g. `=B3-B4`.
    pub fn expression(&self) -> String {
        let letter = column_letter(self.column);
        let mut terms = String::new();
        for row in &self.plus {
            terms.push_str(&format!("+{letter}{row}"));
        }
        for row in &self.minus {
            terms.push_str(&format!("-{letter}{row}"));
        }
        let terms = terms.strip_prefix('+').unwrap_or(&terms);
        match (terms.is_empty(), self.negate) {
            (true, _) => "=0".to_string(),
            (false, false) => format!("={terms}"),
            (false, true) => format!("=-({terms})"),
        }
    }
}

/// Contents of one cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    /// Nothing written
    #[default]
    Empty,
    /// Literal text
    Text(String),
    /// Literal number
    Number {
        /// Stored value
        value: f64,
        /// Display format
        format: NumberFormat,
    },
    /// Formula over other cells
    Formula(Formula),
}

impl Cell {
    /// Text cell.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Number cell with a format picked from the value.
    pub fn number(value: f64) -> Self {
        Self::Number { value, format: NumberFormat::for_value(value) }
    }

    /// Percentage cell holding a fraction.
    pub const fn percent(value: f64) -> Self {
        Self::Number { value, format: NumberFormat::Percent }
    }

    /// Whether nothing was written.
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Text as it would be written to a flat file.
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(text) => text.clone(),
            Self::Number { value, .. } => format_number(*value),
            Self::Formula(formula) => formula.expression(),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Role of a row, used for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    /// Sheet or block title
    Title,
    /// Secondary caption under a title
    Subtitle,
    /// Column headers
    Header,
    /// Bold section label inside a statement
    Section,
    /// Ordinary line item or table row
    Item,
    /// Derived subtotal
    Subtotal,
    /// Derived major total, double ruled
    Total,
    /// Intentionally blank row
    Spacer,
}

/// One row at a fixed position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedRow {
    /// 1-based row number
    pub row: u32,
    /// Presentation role
    pub kind: RowKind,
    /// Cells from column A onwards
    pub cells: Vec<Cell>,
}

impl PlacedRow {
    /// Row at `row` with the given cells.
    pub const fn new(row: u32, kind: RowKind, cells: Vec<Cell>) -> Self {
        Self { row, kind, cells }
    }

    /// Cell at a 1-based column.
    pub fn cell(&self, column: u32) -> Option<&Cell> {
        let index = usize::try_from(column).ok()?.checked_sub(1)?;
        self.cells.get(index)
    }

    /// Text of column A, if any.
    pub fn label(&self) -> Option<&str> {
        match self.cells.first() {
            Some(Cell::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// Numeric value of a cell, following formulas to earlier rows.
///
/// Formulas may only refer to rows above their own; other references
/// evaluate to `None`.
pub fn evaluate(rows: &[PlacedRow], row: u32, column: u32) -> Option<f64> {
    let placed = rows.iter().find(|placed| placed.row == row)?;
    match placed.cell(column)? {
        Cell::Number { value, .. } => Some(*value),
        Cell::Formula(formula) => {
            let mut total = 0.0;
            for (refs, sign) in [(&formula.plus, 1.0), (&formula.minus, -1.0)] {
                for &referenced in refs {
                    if referenced >= row {
                        return None;
                    }
                    total += sign * evaluate(rows, referenced, formula.column).unwrap_or(0.0);
                }
            }
            Some(if formula.negate { -total } else { total })
        }
        Cell::Empty | Cell::Text(_) => None,
    }
}

/// Spreadsheet column letters for a 1-based index (`1` → `A`, `27` → `AA`).
pub fn column_letter(column: u32) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A named worksheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    /// Sheet name, already sanitized and unique within its workbook
    pub name: String,
    /// Top-left cell of the scrolling area, e.g. `B3`
    pub freeze_panes: Option<String>,
    /// Placed rows in ascending row order
    pub rows: Vec<PlacedRow>,
    next_row: u32,
}

impl Sheet {
    /// Empty sheet whose first free row is 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), freeze_panes: None, rows: Vec::new(), next_row: 1 }
    }

    /// Set the frozen pane anchor.
    pub fn with_freeze_panes(mut self, anchor: &str) -> Self {
        self.freeze_panes = Some(anchor.to_string());
        self
    }

    /// First row not yet written.
    pub const fn next_row(&self) -> u32 {
        self.next_row
    }

    /// Write a row at the cursor and advance it.
    pub fn push(&mut self, kind: RowKind, cells: Vec<Cell>) -> u32 {
        let row = self.next_row;
        self.rows.push(PlacedRow::new(row, kind, cells));
        self.next_row += 1;
        row
    }

    /// Leave `count` rows blank.
    pub const fn skip(&mut self, count: u32) {
        self.next_row += count;
    }

    /// Append rows placed elsewhere and move the cursor to `next_row`.
    pub fn append(&mut self, rows: Vec<PlacedRow>, next_row: u32) {
        self.rows.extend(rows);
        self.next_row = self.next_row.max(next_row);
    }

    /// Row at a 1-based position.
    pub fn row(&self, row: u32) -> Option<&PlacedRow> {
        self.rows.iter().find(|placed| placed.row == row)
    }

    /// First row whose column A reads `label`.
    pub fn find_row(&self, label: &str) -> Option<&PlacedRow> {
        self.rows.iter().find(|placed| placed.label() == Some(label))
    }

    /// Numeric value at a cell, following formulas.
    pub fn value_at(&self, row: u32, column: u32) -> Option<f64> {
        evaluate(&self.rows, row, column)
    }

    /// Widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|placed| placed.cells.len()).max().unwrap_or(0)
    }

    /// Dense grid of display strings, blank rows included, padded to equal width.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        let width = self.column_count();
        let height = self.rows.iter().map(|placed| placed.row).max().unwrap_or(0);
        let mut grid = vec![vec![String::new(); width]; height as usize];
        for placed in &self.rows {
            let Some(line) = (placed.row as usize).checked_sub(1).and_then(|i| grid.get_mut(i))
            else {
                continue;
            };
            for (slot, cell) in line.iter_mut().zip(&placed.cells) {
                *slot = cell.display();
            }
        }
        grid
    }
}
