//! Error types for the catalog engine

use sea_orm::DbErr;
use stardb_datapkg::DataPkgError;
use stardb_entities::StructKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Problems with a table template document
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template region <{0}> is not terminated")]
    Unterminated(String),

    #[error("Closing tag </{found}> does not match open region <{open}>")]
    MismatchedClose { open: String, found: String },

    #[error("Unknown template kind '{0}'")]
    UnknownKind(String),

    #[error("No template defined for structural kind {0}")]
    Missing(StructKind),

    #[error("Failed to read template document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    /// A write operation was invoked without a mandatory field
    #[error("{operation}: missing required field '{field}'")]
    MissingRequiredField {
        operation: &'static str,
        field: &'static str,
    },

    /// The name authority has no record of the object
    #[error("Object '{0}' not found by the name authority")]
    UnknownObject(String),

    /// A referenced entity has no matching row
    #[error("{entity} not found in the database")]
    MissingData { entity: String },

    #[error("Datatype '{0}' does not exist")]
    UnknownDatatype(String),

    #[error("Datatype '{datatype}' has kind {actual}, expected {expected}")]
    KindMismatch {
        datatype: String,
        expected: &'static str,
        actual: StructKind,
    },

    /// Advisory sanity check failure listing every offending star
    #[error(
        "CHECK FAILED: {} stars of source {source_id} do not have '{datatype}' data: {}",
        .missing.len(),
        .missing.join(", ")
    )]
    CompletenessViolation {
        datatype: String,
        source_id: i32,
        missing: Vec<String>,
    },

    #[error("Invalid time representation: {0}")]
    InvalidTimeRepresentation(String),

    #[error("Invalid error representation: {0}")]
    InvalidErrorRepresentation(String),

    /// `err` given together with `errlo`/`errhi`
    #[error("Ambiguous error: 'err' cannot be combined with 'errlo'/'errhi'")]
    AmbiguousError,

    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Invalid structural kind '{0}', expected MEASURE, LABEL or TIMESERIES")]
    InvalidStructKind(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("{entity} '{key}' already exists")]
    Duplicate { entity: &'static str, key: String },

    #[error("Name authority error: {0}")]
    NameAuthority(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    DataPkg(#[from] DataPkgError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl CatalogError {
    pub(crate) fn missing(entity: &str, key: impl std::fmt::Display) -> Self {
        CatalogError::MissingData {
            entity: format!("{} '{}'", entity, key),
        }
    }

    /// Errors that leave the open transaction unusable
    pub fn is_database(&self) -> bool {
        matches!(self, CatalogError::Database(_))
    }
}
