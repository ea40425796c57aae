//! Error types for data package reading

use std::path::PathBuf;
use thiserror::Error;

/// Result type for data package operations
pub type DataPkgResult<T> = Result<T, DataPkgError>;

#[derive(Error, Debug)]
pub enum DataPkgError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid JSON or does not have the expected shape
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required key is absent
    #[error("{path}: missing required field '{field}'")]
    MissingField { path: PathBuf, field: String },

    /// A single data point could not be decoded
    #[error("Invalid data point #{index} of '{datatype}': {source}")]
    InvalidPoint {
        datatype: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}
