//! Writing workbooks to disk.
//!
//! A workbook exports as a native `.xlsx` file, as one CSV file per sheet
//! plus a `manifest.json` describing them, or as a single JSON document.
//! Formula cells are written as expressions such as `=B3-B4`.

use crate::sheet::Sheet;
use crate::workbook::{Layout, Workbook};
use crate::xlsx::write_xlsx;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Name of the manifest written next to per-sheet CSV files.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV output was not valid UTF-8.
    #[error("encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// Spreadsheet writer error.
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Excel workbook with live formulas.
    Xlsx,

    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn to_json<T: Serialize>(value: &T, format: ExportFormat) -> Result<String, ExportError> {
    Ok(match format {
        ExportFormat::PrettyJson => serde_json::to_string_pretty(value)?,
        _ => serde_json::to_string(value)?,
    })
}

impl Exporter for Sheet {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for record in self.to_grid() {
                    wtr.write_record(&record)?;
                }
                let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
                Ok(String::from_utf8(bytes)?)
            }
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
            ExportFormat::Xlsx => Err(binary_format()),
        }
    }
}

impl Exporter for Workbook {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => Err(ExportError::InvalidFormat(
                "a workbook exports to one CSV file per sheet".to_string(),
            )),
            ExportFormat::Json | ExportFormat::PrettyJson => to_json(self, format),
            ExportFormat::Xlsx => Err(binary_format()),
        }
    }
}

fn binary_format() -> ExportError {
    ExportError::InvalidFormat("xlsx is binary; write it with export_workbook".to_string())
}

/// One sheet listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSheet {
    /// Sheet name
    pub name: String,
    /// CSV file name, relative to the manifest
    pub file: String,
    /// Rows including blank spacer rows
    pub rows: usize,
    /// Widest row
    pub columns: usize,
    /// Frozen pane anchor
    pub freeze_panes: Option<String>,
}

/// Description of a per-sheet CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Company display name
    pub company_name: String,
    /// Ticker symbol
    pub ticker: String,
    /// When the workbook was built
    pub generated_at: DateTime<Utc>,
    /// Sheet arrangement
    pub layout: Layout,
    /// Sheets in workbook order
    pub sheets: Vec<ManifestSheet>,
}

fn file_slug(name: &str) -> String {
    let slug: String =
        name.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() { "sheet".to_string() } else { slug.to_string() }
}

/// Write `workbook` under `dir` and return the files written.
///
/// XLSX goes to `dir/{stem}.xlsx`; CSV goes to `dir/{stem}/NN_{sheet}.csv`
/// followed by `manifest.json`; JSON goes to `dir/{stem}.json`.
pub fn export_workbook(
    workbook: &Workbook,
    dir: &Path,
    format: ExportFormat,
) -> Result<Vec<PathBuf>, ExportError> {
    let stem = workbook.file_stem();

    if format != ExportFormat::Csv {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{stem}.{}", format.extension()));
        if format == ExportFormat::Xlsx {
            write_xlsx(workbook, &path)?;
        } else {
            workbook.export_to_file(&path, format)?;
        }
        info!(path = %path.display(), "exported workbook");
        return Ok(vec![path]);
    }

    let target = dir.join(&stem);
    fs::create_dir_all(&target)?;

    let mut written = Vec::with_capacity(workbook.sheets.len() + 1);
    let mut sheets = Vec::with_capacity(workbook.sheets.len());
    for (position, sheet) in workbook.sheets.iter().enumerate() {
        let file = format!("{:02}_{}.csv", position + 1, file_slug(&sheet.name));
        let path = target.join(&file);
        sheet.export_to_file(&path, ExportFormat::Csv)?;
        written.push(path);

        sheets.push(ManifestSheet {
            name: sheet.name.clone(),
            file,
            rows: sheet.to_grid().len(),
            columns: sheet.column_count(),
            freeze_panes: sheet.freeze_panes.clone(),
        });
    }

    let manifest = Manifest {
        company_name: workbook.company_name.clone(),
        ticker: workbook.ticker.clone(),
        generated_at: workbook.generated_at,
        layout: workbook.layout,
        sheets,
    };
    let manifest_path = target.join(MANIFEST_FILE);
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
    written.push(manifest_path);

    info!(path = %target.display(), files = written.len(), "exported workbook");
    Ok(written)
}
