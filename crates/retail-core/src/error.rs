use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the retail analysis pipeline.
///
/// Every variant is fatal for the batch run that encounters it. Routine
/// data-quality issues (non-positive quantities, missing customers) are
/// handled by the cleaning stage and never surface here.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The input source does not exist.
    #[error("Source not found: {0}")]
    SourceNotFound(PathBuf),

    /// The source is readable but is not a usable table.
    #[error("Failed to parse {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    /// A single value failed type coercion.
    #[error("Malformed record at row {row}, column {column}: {value:?} ({reason})")]
    MalformedRecord {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    /// A normalisation or ratio divisor was zero.
    #[error("Degenerate aggregation: {0}")]
    DegenerateAggregation(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An aggregate column was requested that the table does not carry.
    #[error("Unknown aggregate column: {0}")]
    UnknownColumn(String),

    /// Writing an output artifact failed.
    #[error("Failed to export {path}: {reason}")]
    Export { path: PathBuf, reason: String },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// Shorthand for a [`AnalysisError::MalformedRecord`].
    pub fn malformed(
        row: usize,
        column: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedRecord {
            row,
            column: column.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the retail crates.
pub type Result<T> = std::result::Result<T, AnalysisError>;
