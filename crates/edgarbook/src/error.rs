//! Error types for the scan and generate pipeline.

use edgarbook_data::DataError;
use edgarbook_output::{ExportError, RenderError};
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors surfaced by [`Pipeline`](crate::Pipeline).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// EDGAR access or parsing failed
    #[error(transparent)]
    Data(#[from] DataError),

    /// Statement rendering failed
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Writing the workbook failed
    #[error(transparent)]
    Export(#[from] ExportError),

    /// A request lacked a required input
    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    /// A table id was not `{accession}:{index}`
    #[error("Invalid table id: {0}")]
    InvalidTableId(String),
}
