//! Formula-linked statement rendering.
//!
//! Subtotals and totals are written as live formulas over the rows they add
//! up, so edits to a reported value flow through the sheet. When none of a
//! formula's inputs were emitted, the reported value for the total is used
//! instead.

use crate::sheet::{Cell, Formula, PlacedRow, RowKind, evaluate};
use crate::template::{DataItem, FormulaItem, LineItem, StatementStructure};
use edgarbook_data::statements::{StatementData, StatementKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::debug;

/// Errors raised while rendering a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// No template exists for the statement name.
    #[error("no template for statement `{0}`")]
    UnknownStatement(String),
}

/// Rows produced for one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderedStatement {
    /// Placed rows, ascending
    pub rows: Vec<PlacedRow>,
    /// First row free for whatever follows
    pub next_row: u32,
}

impl RenderedStatement {
    /// Row whose label reads `label`.
    pub fn find_row(&self, label: &str) -> Option<&PlacedRow> {
        self.rows.iter().find(|placed| placed.label() == Some(label))
    }

    /// Numeric value of a cell, following formulas.
    pub fn value_at(&self, row: u32, column: u32) -> Option<f64> {
        evaluate(&self.rows, row, column)
    }

    /// Whether nothing was rendered.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Render a built-in statement starting at row 1.
pub fn render(
    statement_name: &str,
    data: &StatementData,
    periods: &[String],
) -> Result<RenderedStatement, RenderError> {
    render_at(statement_name, data, periods, 1)
}

/// Render a built-in statement starting at `start_row`.
pub fn render_at(
    statement_name: &str,
    data: &StatementData,
    periods: &[String],
    start_row: u32,
) -> Result<RenderedStatement, RenderError> {
    let kind = statement_name
        .parse::<StatementKind>()
        .map_err(|_| RenderError::UnknownStatement(statement_name.to_string()))?;
    Ok(render_structure(
        kind.name(),
        StatementStructure::builtin(kind),
        data,
        periods,
        start_row,
    ))
}

/// Render any validated structure. Missing data never fails.
pub fn render_structure(
    title: &str,
    structure: &StatementStructure,
    data: &StatementData,
    periods: &[String],
    start_row: u32,
) -> RenderedStatement {
    if data.is_empty() {
        return RenderedStatement { rows: Vec::new(), next_row: start_row };
    }

    let mut renderer = Renderer { data, periods, row: start_row, rows: Vec::new(), placed: HashMap::new() };
    renderer.place(RowKind::Title, vec![Cell::text(title)]);

    let mut header = vec![Cell::text("Line Item")];
    header.extend(periods.iter().map(Cell::text));
    renderer.place(RowKind::Header, header);

    for item in structure.items() {
        match item {
            LineItem::Spacer => renderer.row += 1,
            LineItem::Section(label) => {
                renderer.place(RowKind::Section, vec![Cell::text(label)]);
            }
            LineItem::Data(item) => renderer.data_item(item),
            LineItem::Formula(item) => renderer.formula_item(item),
        }
    }

    debug!(statement = title, rows = renderer.rows.len(), "rendered statement");
    RenderedStatement { rows: renderer.rows, next_row: renderer.row + 1 }
}

struct Renderer<'a> {
    data: &'a StatementData,
    periods: &'a [String],
    row: u32,
    rows: Vec<PlacedRow>,
    /// Item id → row holding at least one value
    placed: HashMap<&'a str, u32>,
}

impl<'a> Renderer<'a> {
    fn place(&mut self, kind: RowKind, cells: Vec<Cell>) -> u32 {
        let row = self.row;
        self.rows.push(PlacedRow::new(row, kind, cells));
        self.row += 1;
        row
    }

    /// First candidate label with data; candidates are tried in order.
    fn lookup(&self, labels: &'a [String]) -> Option<(&'a str, &'a BTreeMap<String, f64>)> {
        labels
            .iter()
            .find_map(|label| self.data.get(label).map(|values| (label.as_str(), values)))
    }

    /// Value cells for each period; returns them and whether any was filled.
    fn value_cells(&self, values: &BTreeMap<String, f64>, negate: bool) -> (Vec<Cell>, bool) {
        let mut any = false;
        let cells = self
            .periods
            .iter()
            .map(|period| match values.get(period) {
                Some(&value) => {
                    any = true;
                    Cell::number(if negate { -value } else { value })
                }
                None => Cell::Empty,
            })
            .collect();
        (cells, any)
    }

    fn data_item(&mut self, item: &'a DataItem) {
        let Some((label, values)) = self.lookup(&item.labels) else {
            return;
        };
        let (values, any) = self.value_cells(values, item.negate);
        let mut cells = vec![Cell::text(label)];
        cells.extend(values);
        let row = self.place(RowKind::Item, cells);
        if any {
            self.placed.insert(&item.id, row);
        }
    }

    fn formula_item(&mut self, item: &'a FormulaItem) {
        let kind = if item.total { RowKind::Total } else { RowKind::Subtotal };
        let resolve = |ids: &[String]| -> Vec<u32> {
            ids.iter().filter_map(|id| self.placed.get(id.as_str()).copied()).collect()
        };
        let plus = resolve(&item.plus);
        let minus = resolve(&item.minus);

        if !plus.is_empty() || !minus.is_empty() {
            let mut cells = vec![Cell::text(&item.label)];
            for column in (2..).take(self.periods.len()) {
                cells.push(Cell::Formula(Formula {
                    column,
                    plus: plus.clone(),
                    minus: minus.clone(),
                    negate: item.negate,
                }));
            }
            let row = self.place(kind, cells);
            self.placed.insert(&item.id, row);
            return;
        }

        let Some((_, values)) = self.lookup(&item.fallback) else {
            return;
        };
        let (values, any) = self.value_cells(values, item.negate);
        let mut cells = vec![Cell::text(&item.label)];
        cells.extend(values);
        let row = self.place(kind, cells);
        if any {
            self.placed.insert(&item.id, row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn statement(entries: &[(&str, &[(&str, f64)])]) -> StatementData {
        entries
            .iter()
            .map(|(label, values)| {
                let values = values.iter().map(|(p, v)| ((*p).to_string(), *v)).collect();
                ((*label).to_string(), values)
            })
            .collect()
    }

    fn periods(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| (*p).to_string()).collect()
    }

    #[test]
    fn test_gross_profit_is_a_formula() {
        let data = statement(&[
            ("Revenue", &[("2023-12-31", 1000.0)]),
            ("Cost of Revenue", &[("2023-12-31", 400.0)]),
        ]);
        let rendered = render("Income Statement", &data, &periods(&["2023-12-31"])).unwrap();

        assert_eq!(rendered.rows[0].label(), Some("Income Statement"));
        assert_eq!(rendered.rows[1].cells, vec![Cell::text("Line Item"), Cell::text("2023-12-31")]);

        let revenue = rendered.find_row("Revenue").unwrap();
        let cost = rendered.find_row("Cost of Revenue").unwrap();
        assert_eq!((revenue.row, cost.row), (3, 4));

        let gross = rendered.find_row("Gross Profit").unwrap();
        assert_eq!(gross.kind, RowKind::Subtotal);
        let Some(Cell::Formula(formula)) = gross.cell(2) else {
            panic!("gross profit should be a formula: {gross:?}");
        };
        assert_eq!(formula.expression(), "=B3-B4");
        assert_relative_eq!(rendered.value_at(gross.row, 2).unwrap(), 600.0);
    }

    #[test]
    fn test_gross_profit_falls_back_to_reported_value() {
        let data = statement(&[("Gross Profit", &[("2023-12-31", 600.0)])]);
        let rendered = render("Income Statement", &data, &periods(&["2023-12-31"])).unwrap();

        let gross = rendered.find_row("Gross Profit").unwrap();
        assert_eq!(gross.row, 3);
        assert_eq!(gross.cell(2), Some(&Cell::number(600.0)));
    }

    #[test]
    fn test_fallback_row_feeds_later_formulas() {
        let data = statement(&[
            ("Gross Profit", &[("2023", 600.0)]),
            ("Research & Development", &[("2023", 100.0)]),
        ]);
        let rendered = render("Income Statement", &data, &periods(&["2023"])).unwrap();

        let operating = rendered.find_row("Operating Income (Loss)").unwrap();
        let Some(Cell::Formula(formula)) = operating.cell(2) else {
            panic!("operating income should be a formula");
        };
        let gross = rendered.find_row("Gross Profit").unwrap().row;
        let opex = rendered.find_row("Total Operating Expenses").unwrap().row;
        assert_eq!((formula.plus.clone(), formula.minus.clone()), (vec![gross], vec![opex]));
        assert_relative_eq!(rendered.value_at(operating.row, 2).unwrap(), 500.0);
    }

    #[test]
    fn test_missing_items_leave_no_gap() {
        let data = statement(&[("Revenue", &[("p", 10.0)]), ("Interest Expense", &[("p", 2.0)])]);
        let rendered = render("Income Statement", &data, &periods(&["p"])).unwrap();
        let rows: Vec<(u32, Option<&str>)> =
            rendered.rows.iter().map(|r| (r.row, r.label())).collect();
        // skipped items leave no row; consecutive spacers still advance
        assert_eq!(
            rows,
            vec![
                (1, Some("Income Statement")),
                (2, Some("Line Item")),
                (3, Some("Revenue")),
                (4, Some("Gross Profit")),
                (7, Some("Operating Income (Loss)")),
                (9, Some("Interest Expense")),
                (10, Some("Income Before Tax")),
                (12, Some("Net Income (Loss)")),
            ]
        );
        let pretax = rendered.find_row("Income Before Tax").unwrap();
        assert_eq!(pretax.cell(2).map(Cell::display), Some("=B7-B9".to_string()));
        assert_eq!(rendered.find_row("Net Income (Loss)").unwrap().kind, RowKind::Total);
        assert_eq!(rendered.next_row, 15);
    }

    #[test]
    fn test_negated_items_and_missing_periods() {
        let data = statement(&[
            ("Capital Expenditures", &[("2023", 50.0)]),
            ("Proceeds from Sale of Investments", &[("2022", 20.0)]),
        ]);
        let rendered = render("Cash Flow", &data, &periods(&["2022", "2023"])).unwrap();

        let capex = rendered.find_row("Capital Expenditures").unwrap();
        assert_eq!(capex.cells[1], Cell::Empty);
        assert_eq!(capex.cells[2], Cell::number(-50.0));

        let investing = rendered.find_row("Net Cash from Investing Activities").unwrap();
        assert_eq!(investing.cell(3).map(Cell::display), Some("=C6+C7".to_string()));
        assert_relative_eq!(rendered.value_at(investing.row, 2).unwrap(), 20.0);
        assert_relative_eq!(rendered.value_at(investing.row, 3).unwrap(), -50.0);
    }

    #[test]
    fn test_render_at_offsets_rows() {
        let data = statement(&[("Total Assets", &[("2023", 5.0)])]);
        let rendered = render_at("balance sheet", &data, &periods(&["2023"]), 10).unwrap();
        assert_eq!(rendered.rows[0].row, 10);
        assert_eq!(rendered.rows[0].label(), Some("Balance Sheet"));
        assert_eq!(rendered.rows[2].label(), Some("ASSETS"));
        assert_eq!(rendered.find_row("Total Assets").unwrap().kind, RowKind::Total);
    }

    #[test]
    fn test_empty_statement_renders_nothing() {
        let rendered = render_at("Cash Flow", &StatementData::new(), &periods(&["2023"]), 7).unwrap();
        assert!(rendered.is_empty());
        assert_eq!(rendered.next_row, 7);
    }

    #[test]
    fn test_unknown_statement() {
        let err = render("Statement of Equity", &StatementData::new(), &[]).unwrap_err();
        assert_eq!(err, RenderError::UnknownStatement("Statement of Equity".to_string()));
    }
}
