//! Typed write requests
//!
//! Each write operation takes one of these instead of a loose map of
//! fields. Constructors reject absent natural keys up front, so the
//! registries never see a half-specified row.

use stardb_core::UtcDateTime;
use stardb_datapkg::{DatatypeDecl, InstrumentDecl, OriginInfo, ReferenceInfo, SourceInfo};
use stardb_entities::StructKind;

use crate::error::{CatalogError, CatalogResult};
use crate::ident::DatatypeName;

fn required(operation: &'static str, field: &'static str, value: &str) -> CatalogResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::MissingRequiredField { operation, field });
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDatatype {
    pub name: DatatypeName,
    pub kind: StructKind,
    pub unit: String,
    pub description: String,
}

impl NewDatatype {
    pub fn new(name: &str, kind: &str, unit: &str, description: &str) -> CatalogResult<Self> {
        let name = required("insert_datatype", "name", name)?;
        let kind_tag = required("insert_datatype", "kind", kind)?;
        let kind = StructKind::parse(&kind_tag).ok_or(CatalogError::InvalidStructKind(kind_tag))?;
        Ok(Self {
            name: DatatypeName::parse(&name)?,
            kind,
            unit: unit.to_string(),
            description: description.to_string(),
        })
    }

    pub fn from_decl(decl: &DatatypeDecl) -> CatalogResult<Self> {
        Self::new(&decl.name, &decl.kind, &decl.unit, &decl.description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInstrument {
    pub name: String,
    pub long_name: String,
    pub url: String,
    pub description: String,
}

impl NewInstrument {
    pub fn new(name: &str, long_name: &str, url: &str, description: &str) -> CatalogResult<Self> {
        Ok(Self {
            name: required("insert_instrument", "name", name)?,
            long_name: long_name.to_string(),
            url: url.to_string(),
            description: description.to_string(),
        })
    }

    pub fn from_decl(decl: &InstrumentDecl) -> CatalogResult<Self> {
        Self::new(&decl.name, &decl.long_name, &decl.url, &decl.description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReference {
    pub name: String,
    pub bibline: String,
    pub bibcode: String,
}

impl NewReference {
    pub fn new(name: &str, bibline: &str, bibcode: &str) -> CatalogResult<Self> {
        Ok(Self {
            name: required("insert_reference", "name", name)?,
            bibline: bibline.to_string(),
            bibcode: bibcode.to_string(),
        })
    }

    pub fn from_info(info: &ReferenceInfo) -> CatalogResult<Self> {
        Self::new(&info.name, &info.bibline, &info.bibcode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrigin {
    pub name: String,
    pub kind: String,
    pub url: Option<String>,
    pub description: Option<String>,
}

impl NewOrigin {
    pub fn new(name: &str, kind: &str) -> CatalogResult<Self> {
        Ok(Self {
            name: required("insert_origin", "name", name)?,
            kind: required("insert_origin", "kind", kind)?,
            url: None,
            description: None,
        })
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn from_info(info: &OriginInfo) -> CatalogResult<Self> {
        let name = info.name.as_deref().unwrap_or_default();
        Ok(Self::new(name, &info.kind)?
            .with_url(info.url.clone())
            .with_description(info.description.clone()))
    }
}

/// A new ingestion batch. Origin and source time are mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSource {
    pub name: String,
    pub kind: String,
    pub version: Option<String>,
    pub origin_id: i32,
    pub parent_source_id: Option<i32>,
    pub source_time: UtcDateTime,
}

impl NewSource {
    pub fn new(
        name: &str,
        kind: &str,
        origin_id: Option<i32>,
        source_time: Option<UtcDateTime>,
    ) -> CatalogResult<Self> {
        Ok(Self {
            name: required("insert_source", "name", name)?,
            kind: required("insert_source", "kind", kind)?,
            version: None,
            origin_id: origin_id.ok_or(CatalogError::MissingRequiredField {
                operation: "insert_source",
                field: "origin_id",
            })?,
            parent_source_id: None,
            source_time: source_time.ok_or(CatalogError::MissingRequiredField {
                operation: "insert_source",
                field: "source_time",
            })?,
        })
    }

    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn with_parent(mut self, parent_source_id: Option<i32>) -> Self {
        self.parent_source_id = parent_source_id;
        self
    }

    pub fn from_info(info: &SourceInfo, origin_id: i32) -> CatalogResult<Self> {
        Ok(
            Self::new(&info.name, &info.kind, Some(origin_id), Some(info.source_time))?
                .with_version(info.version.clone()),
        )
    }
}
