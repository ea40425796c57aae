//! Datatype and instrument declaration files

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DataPkgError, DataPkgResult};
use crate::reader::read_json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatatypeDecl {
    pub name: String,
    /// Structural kind: MEASURE, LABEL or TIMESERIES
    #[serde(alias = "struct", alias = "type")]
    pub kind: String,
    #[serde(alias = "units")]
    pub unit: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentDecl {
    pub name: String,
    #[serde(alias = "long")]
    pub long_name: String,
    pub url: String,
    pub description: String,
}

#[derive(Deserialize)]
struct DatatypeFile {
    datatypes: Option<Vec<DatatypeDecl>>,
}

#[derive(Deserialize)]
struct InstrumentFile {
    instruments: Option<Vec<InstrumentDecl>>,
}

/// Read a `{"datatypes": [...]}` document
pub fn load_datatypes(path: &Path) -> DataPkgResult<Vec<DatatypeDecl>> {
    let file: DatatypeFile = read_json(path)?;
    file.datatypes.ok_or_else(|| DataPkgError::MissingField {
        path: path.to_path_buf(),
        field: "datatypes".to_string(),
    })
}

/// Read an `{"instruments": [...]}` document
pub fn load_instruments(path: &Path) -> DataPkgResult<Vec<InstrumentDecl>> {
    let file: InstrumentFile = read_json(path)?;
    file.instruments.ok_or_else(|| DataPkgError::MissingField {
        path: path.to_path_buf(),
        field: "instruments".to_string(),
    })
}
