//! Data point records as they appear in package files
//!
//! Values are carried exactly as written; interpreting percent errors and
//! time representations is left to the catalog's normalizer.

use serde::{Deserialize, Serialize};

/// Error magnitude as written in the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrValue {
    /// Absolute error in the datatype's unit
    Absolute(f64),
    /// Textual form, either `"<x>%"` or a number in a string
    Text(String),
}

/// Time as written in the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    /// ISO 8601 / RFC 3339 timestamp
    Text(String),
    /// Julian date
    Jd { jd: f64 },
    /// Modified Julian date
    Mjd { mjd: f64 },
    /// Julian epoch year, e.g. 2000.0
    JulianYear { jyear: f64 },
    /// Anything else; always rejected when normalized
    Other(serde_json::Value),
}

/// One input datum for a single datatype and star
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataPoint {
    /// Datatype name; set by the reader from the enclosing map key
    #[serde(default, rename = "type")]
    pub datatype: String,
    /// Star name, any alias the name authority understands
    pub star: String,
    #[serde(default)]
    pub val: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub err: Option<ErrValue>,
    #[serde(default)]
    pub errlo: Option<f64>,
    #[serde(default)]
    pub errhi: Option<f64>,
    /// Explicit closed error interval `[lo, hi]`
    #[serde(default)]
    pub errbounds: Option<(f64, f64)>,
    #[serde(default)]
    pub obs_time: Option<TimeValue>,
    /// Duration of the observation in seconds
    #[serde(default, alias = "int_time")]
    pub obs_duration: Option<f64>,
    #[serde(default)]
    pub obs_start: Option<TimeValue>,
    #[serde(default)]
    pub obs_end: Option<TimeValue>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

impl DataPoint {
    /// Measurement point with only a value
    pub fn measure(datatype: &str, star: &str, val: f64) -> Self {
        Self {
            datatype: datatype.to_string(),
            star: star.to_string(),
            val: Some(val),
            ..Default::default()
        }
    }

    /// Label point
    pub fn label(datatype: &str, star: &str, label: &str) -> Self {
        Self {
            datatype: datatype.to_string(),
            star: star.to_string(),
            label: Some(label.to_string()),
            ..Default::default()
        }
    }
}
