use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while loading performance data.
///
/// Only the load boundary can fail. Filtering and aggregation model empty
/// selections and insufficient data as values, never as errors.
#[derive(Error, Debug)]
pub enum PerfError {
    /// A source file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader failed on the header or the underlying stream.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A column required by the canonical schema is absent from the header.
    #[error("Missing required column '{column}' in {table} data")]
    MissingColumn { table: &'static str, column: &'static str },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be produced.
    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the workspace crates.
pub type Result<T> = std::result::Result<T, PerfError>;
