//! Identifier allow-list for dynamic table and column names
//!
//! Per-datatype tables are the only place where SQL text is built from
//! data. A name reaches SQL only after passing [`DatatypeName::parse`], and
//! table names are only derived from rows fetched from the datatype table.

use regex::Regex;
use stardb_entities::datatype;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{CatalogError, CatalogResult};

/// Prefix of every per-datatype table
pub const TABLE_PREFIX: &str = "dat_";

fn datatype_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9_]{0,47}$").expect("datatype name pattern is valid")
    })
}

/// Column name of the star key in table queries
pub const STAR_COLUMN: &str = "star";

/// Suffixes of the error-bound columns a table query derives from a name
pub const ERROR_SUFFIXES: [&str; 2] = ["_errlo", "_errhi"];

/// Validated datatype name: lowercase ASCII letter followed by up to 47
/// lowercase letters, digits or underscores. The star key column and names
/// ending in an error-bound suffix are reserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatatypeName(String);

impl DatatypeName {
    pub fn parse(name: &str) -> CatalogResult<Self> {
        let reserved =
            name == STAR_COLUMN || ERROR_SUFFIXES.iter().any(|suffix| name.ends_with(suffix));
        if datatype_name_pattern().is_match(name) && !reserved {
            Ok(Self(name.to_string()))
        } else {
            Err(CatalogError::InvalidIdentifier(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatatypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Physical table of a live datatype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    datatype: DatatypeName,
}

impl TableName {
    pub fn for_datatype(model: &datatype::Model) -> CatalogResult<Self> {
        Ok(Self {
            datatype: DatatypeName::parse(&model.name)?,
        })
    }

    pub fn datatype(&self) -> &DatatypeName {
        &self.datatype
    }

    /// Unquoted table name, e.g. `dat_teff`
    pub fn name(&self) -> String {
        format!("{}{}", TABLE_PREFIX, self.datatype)
    }

    /// Table name quoted for interpolation into SQL
    pub fn quoted(&self) -> String {
        quote(&self.name())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", TABLE_PREFIX, self.datatype)
    }
}

/// Double-quote an identifier that has already passed the allow-list
pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
