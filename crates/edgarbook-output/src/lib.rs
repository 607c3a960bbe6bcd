#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/edgarbook/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod formula;
pub mod sheet;
pub mod table_writer;
pub mod template;
pub mod workbook;
pub mod xlsx;

pub use export::{ExportError, ExportFormat, Exporter, Manifest, ManifestSheet, export_workbook};
pub use formula::{RenderError, RenderedStatement, render, render_at, render_structure};
pub use sheet::{Cell, Formula, NumberFormat, PlacedRow, RowKind, Sheet};
pub use table_writer::{ParsedNumber, try_parse_number, write_table};
pub use template::{DataItem, FormulaItem, LineItem, StatementStructure, TemplateError};
pub use workbook::{Layout, SelectedTable, Workbook, WorkbookBuilder};
pub use xlsx::{to_xlsx, write_xlsx};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
