//! Structural kind of a datatype
//!
//! The kind decides which template the datatype's physical table is built
//! from and which ingestion path its data points take.

use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};

/// Structural template of a datatype's storage table
///
/// - `Measure`: one numeric value per fact, with error bounds and observation time
/// - `Label`: one categorical string per fact
/// - `Timeseries`: an accumulating stream of numeric time points
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
pub enum StructKind {
    #[sea_orm(string_value = "MEASURE")]
    Measure,

    #[sea_orm(string_value = "LABEL")]
    Label,

    #[sea_orm(string_value = "TIMESERIES")]
    Timeseries,
}

impl std::fmt::Display for StructKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StructKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructKind::Measure => "MEASURE",
            StructKind::Label => "LABEL",
            StructKind::Timeseries => "TIMESERIES",
        }
    }

    /// Parse a kind tag, accepting any letter case
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "MEASURE" => Some(StructKind::Measure),
            "LABEL" => Some(StructKind::Label),
            "TIMESERIES" => Some(StructKind::Timeseries),
            _ => None,
        }
    }

    /// Facts of this kind are stored as immutable properties
    pub fn is_property(&self) -> bool {
        matches!(self, StructKind::Measure | StructKind::Label)
    }

    /// Values of this kind are numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, StructKind::Measure | StructKind::Timeseries)
    }
}
