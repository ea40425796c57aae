//! Data package readers
//!
//! A reader exposes package metadata plus a restartable stream of
//! [`DataPoint`]s. The ingestion pipeline only sees the trait, so new input
//! formats plug in without touching it.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{DataPkgError, DataPkgResult};
use crate::info::{
    InstrumentInfo, OriginInfo, PackageInfo, ReferenceInfo, SourceInfo, FILE_SOURCE_KIND,
};
use crate::record::DataPoint;

pub const INFO_FILE: &str = "info.json";
pub const PROPERTIES_FILE: &str = "properties.json";

/// Format-agnostic access to one data package
pub trait DataReader {
    /// Metadata describing where the data was published
    fn info(&self) -> &PackageInfo;

    /// The ingestion batch this package becomes
    fn source(&self) -> &SourceInfo;

    /// Every data point of the package. Each call starts a fresh, finite
    /// pass over the data.
    fn records(&self) -> Box<dyn Iterator<Item = DataPkgResult<DataPoint>> + '_>;
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> DataPkgResult<T> {
    let text = std::fs::read_to_string(path).map_err(|source| DataPkgError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| DataPkgError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn modification_time(path: &Path) -> DataPkgResult<DateTime<Utc>> {
    let io_err = |source| DataPkgError::Io {
        path: path.to_path_buf(),
        source,
    };
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(io_err)?;
    Ok(DateTime::<Utc>::from(modified))
}

fn package_name(path: &Path, stem: bool) -> DataPkgResult<String> {
    let name = if stem {
        path.file_stem()
    } else {
        path.file_name()
    };
    name.and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .ok_or_else(|| DataPkgError::MissingField {
            path: path.to_path_buf(),
            field: "package name".to_string(),
        })
}

#[derive(Deserialize)]
struct PropertiesDocument {
    properties: Option<BTreeMap<String, Vec<Value>>>,
    #[serde(default)]
    defaults: BTreeMap<String, Map<String, Value>>,
}

#[derive(Deserialize)]
struct SingleFileDocument {
    reference: ReferenceInfo,
    origin: OriginInfo,
    #[serde(default)]
    instrument: Option<InstrumentInfo>,
    #[serde(flatten)]
    properties: PropertiesDocument,
}

/// Reader for JSON packages
///
/// Two layouts are accepted: a directory holding `info.json` and
/// `properties.json`, or a single JSON file carrying `reference`, `origin`,
/// optional `instrument` and `properties` together. In both, an optional
/// `defaults` map supplies per-datatype keys for points that lack them.
#[derive(Debug, Clone)]
pub struct JsonDataReader {
    path: PathBuf,
    info: PackageInfo,
    source: SourceInfo,
    properties: BTreeMap<String, Vec<Value>>,
    defaults: BTreeMap<String, Map<String, Value>>,
}

impl JsonDataReader {
    /// Open a package directory
    pub fn from_dir(dir: &Path) -> DataPkgResult<Self> {
        let mut info: PackageInfo = read_json(&dir.join(INFO_FILE))?;
        info.apply_paper_origin();

        let properties_path = dir.join(PROPERTIES_FILE);
        let document: PropertiesDocument = read_json(&properties_path)?;
        let properties = document.properties.ok_or_else(|| DataPkgError::MissingField {
            path: properties_path.clone(),
            field: "properties".to_string(),
        })?;

        let source = SourceInfo {
            name: package_name(dir, false)?,
            kind: FILE_SOURCE_KIND.to_string(),
            version: None,
            source_time: modification_time(dir)?,
        };
        debug!(
            "Opened package directory {} ({} datatypes)",
            dir.display(),
            properties.len()
        );

        Self::build(dir, info, source, properties, document.defaults)
    }

    /// Open a single-file package
    pub fn from_file(file: &Path) -> DataPkgResult<Self> {
        let document: SingleFileDocument = read_json(file)?;
        let mut info = PackageInfo {
            reference: document.reference,
            origin: document.origin,
            instrument: document.instrument,
            sanity_check: None,
            extras: BTreeMap::new(),
        };
        info.apply_paper_origin();

        let properties = document
            .properties
            .properties
            .ok_or_else(|| DataPkgError::MissingField {
                path: file.to_path_buf(),
                field: "properties".to_string(),
            })?;

        let source = SourceInfo {
            name: package_name(file, true)?,
            kind: FILE_SOURCE_KIND.to_string(),
            version: None,
            source_time: modification_time(file)?,
        };
        debug!(
            "Opened package file {} ({} datatypes)",
            file.display(),
            properties.len()
        );

        Self::build(file, info, source, properties, document.properties.defaults)
    }

    fn build(
        path: &Path,
        info: PackageInfo,
        source: SourceInfo,
        properties: BTreeMap<String, Vec<Value>>,
        defaults: BTreeMap<String, Map<String, Value>>,
    ) -> DataPkgResult<Self> {
        if info.origin.name.is_none() {
            return Err(DataPkgError::MissingField {
                path: path.to_path_buf(),
                field: "origin.name".to_string(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            info,
            source,
            properties,
            defaults,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Override the source version (packages are unversioned by default)
    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.source.version = version;
        self
    }

    fn decode(&self, datatype: &str, index: usize, raw: &Value) -> DataPkgResult<DataPoint> {
        let mut object = raw.clone();
        if let (Value::Object(map), Some(defaults)) = (&mut object, self.defaults.get(datatype)) {
            for (key, value) in defaults {
                if !map.contains_key(key) {
                    map.insert(key.clone(), value.clone());
                }
            }
        }
        let mut point: DataPoint =
            serde_json::from_value(object).map_err(|source| DataPkgError::InvalidPoint {
                datatype: datatype.to_string(),
                index,
                source,
            })?;
        point.datatype = datatype.to_string();
        Ok(point)
    }
}

impl DataReader for JsonDataReader {
    fn info(&self) -> &PackageInfo {
        &self.info
    }

    fn source(&self) -> &SourceInfo {
        &self.source
    }

    fn records(&self) -> Box<dyn Iterator<Item = DataPkgResult<DataPoint>> + '_> {
        Box::new(self.properties.iter().flat_map(move |(datatype, points)| {
            points
                .iter()
                .enumerate()
                .map(move |(index, raw)| self.decode(datatype, index, raw))
        }))
    }
}

/// Open a package directory or single-file package
pub fn open_package(path: &Path) -> DataPkgResult<JsonDataReader> {
    if path.is_dir() {
        JsonDataReader::from_dir(path)
    } else {
        JsonDataReader::from_file(path)
    }
}
