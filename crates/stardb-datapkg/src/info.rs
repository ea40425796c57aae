//! Package metadata: reference, origin, instrument and source

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Origin kind whose metadata is copied from the package reference
pub const PAPER_ORIGIN_KIND: &str = "paper";

/// Source kind for data read from package files
pub const FILE_SOURCE_KIND: &str = "FILE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceInfo {
    pub name: String,
    pub bibline: String,
    pub bibcode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginInfo {
    #[serde(default)]
    pub name: Option<String>,
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl OriginInfo {
    pub fn is_paper(&self) -> bool {
        self.kind.eq_ignore_ascii_case(PAPER_ORIGIN_KIND)
    }
}

/// Instrument named by a package; must already be declared in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    pub name: String,
}

/// Post-ingestion checks requested by a package
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SanityTasks {
    /// Datatypes that every star of the source must have
    #[serde(default)]
    pub exists_all_stars: Vec<String>,
}

impl SanityTasks {
    pub fn is_empty(&self) -> bool {
        self.exists_all_stars.is_empty()
    }
}

/// Contents of a package's `info.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub reference: ReferenceInfo,
    pub origin: OriginInfo,
    #[serde(default)]
    pub instrument: Option<InstrumentInfo>,
    #[serde(default)]
    pub sanity_check: Option<SanityTasks>,
    /// Unrecognized keys, kept for display
    #[serde(flatten)]
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl PackageInfo {
    /// A paper origin is described by the paper itself: copy name, ADS URL
    /// and bibline from the reference.
    pub fn apply_paper_origin(&mut self) {
        if !self.origin.is_paper() {
            return;
        }
        self.origin.name = Some(self.reference.name.clone());
        self.origin.url = Some(format!(
            "adslabs.harvard.edu/abs/{}",
            self.reference.bibcode
        ));
        self.origin.description = Some(self.reference.bibline.clone());
    }
}

/// The ingestion batch a package becomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub version: Option<String>,
    pub source_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(kind: &str) -> PackageInfo {
        serde_json::from_value(json!({
            "reference": {"name": "Smith 2001", "bibline": "Smith, J. 2001, ApJ, 1, 1", "bibcode": "2001ApJ.....1....1S"},
            "origin": {"kind": kind, "name": "archive"},
            "sanity_check": {"exists_all_stars": ["teff"]},
            "notes": "hand-typed"
        }))
        .unwrap()
    }

    #[test]
    fn test_paper_origin_copies_reference() {
        let mut info = info("Paper");
        info.apply_paper_origin();
        assert_eq!(info.origin.name.as_deref(), Some("Smith 2001"));
        assert_eq!(
            info.origin.url.as_deref(),
            Some("adslabs.harvard.edu/abs/2001ApJ.....1....1S")
        );
        assert_eq!(
            info.origin.description.as_deref(),
            Some("Smith, J. 2001, ApJ, 1, 1")
        );
    }

    #[test]
    fn test_other_origin_untouched() {
        let mut info = info("survey");
        info.apply_paper_origin();
        assert_eq!(info.origin.name.as_deref(), Some("archive"));
        assert_eq!(info.origin.url, None);
    }

    #[test]
    fn test_extras_and_sanity_tasks() {
        let info = info("survey");
        assert_eq!(info.extras.get("notes"), Some(&json!("hand-typed")));
        assert_eq!(
            info.sanity_check.map(|s| s.exists_all_stars),
            Some(vec!["teff".to_string()])
        );
    }
}
