//! Query Assembler
//!
//! Read-only views over the per-datatype tables. A table query joins any
//! number of datatypes of one dataset onto the set of stars that have at
//! least one of them, one column group per datatype.

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, QueryFilter, QueryResult,
};
use serde::Serialize;
use stardb_core::DBDateTime;
use stardb_entities::{datatype, StructKind};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::coords::SkyCoord;
use crate::error::{CatalogError, CatalogResult};
use crate::ident::{TableName, ERROR_SUFFIXES, STAR_COLUMN};
use crate::sql::Params;
use crate::stars::find_by_alias;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    /// Keep stars lacking some of the datatypes, with null cells
    pub include_nulls: bool,
    /// Add `<name>_errlo`/`<name>_errhi` columns for measured datatypes
    pub include_errors: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            include_nulls: true,
            include_errors: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Number(v) => write!(f, "{}", v),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Rows of a table query, ordered by star name. The first column is
/// always `star`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl DataTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&CellValue>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

#[derive(Debug, Clone, PartialEq, FromQueryResult, Serialize)]
pub struct TimePoint {
    pub obs_time: DBDateTime,
    pub value: f64,
    pub errlo: Option<f64>,
    pub errhi: Option<f64>,
    pub obs_duration: Option<f64>,
    /// Name of the source the point was ingested under
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, FromQueryResult, Serialize)]
pub struct StarMatch {
    pub name: String,
    pub ra_deg: f64,
    pub dec_deg: f64,
}

/// One stored value with its provenance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvenancedValue {
    pub star: String,
    pub reference: String,
    pub origin: String,
    pub origin_kind: String,
    pub instrument: Option<String>,
    pub property_id: i32,
    pub value: CellValue,
}

struct Selected {
    model: datatype::Model,
    table: TableName,
}

fn cell(row: &QueryResult, column: &str, kind: StructKind) -> CatalogResult<CellValue> {
    let value = match kind {
        StructKind::Label => row
            .try_get::<Option<String>>("", column)?
            .map(CellValue::Text),
        _ => row
            .try_get::<Option<f64>>("", column)?
            .map(CellValue::Number),
    };
    Ok(value.unwrap_or(CellValue::Null))
}

pub struct QueryAssembler<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> QueryAssembler<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    async fn datatype(&self, name: &str) -> CatalogResult<datatype::Model> {
        datatype::Entity::find()
            .filter(datatype::Column::Name.eq(name))
            .one(self.db)
            .await?
            .ok_or_else(|| CatalogError::UnknownDatatype(name.to_string()))
    }

    /// One row per star of the dataset holding any of `datatypes`, one
    /// column group per datatype. Duplicate names are queried once.
    pub async fn fetch_table<S: AsRef<str>>(
        &self,
        dataset: &str,
        datatypes: &[S],
        options: TableOptions,
    ) -> CatalogResult<DataTable> {
        let mut selected: Vec<Selected> = Vec::new();
        for name in datatypes {
            let name = name.as_ref();
            if selected.iter().any(|s| s.model.name == name) {
                continue;
            }
            let model = self.datatype(name).await?;
            if !model.kind.is_property() {
                return Err(CatalogError::KindMismatch {
                    datatype: model.name,
                    expected: "MEASURE or LABEL",
                    actual: model.kind,
                });
            }
            let table = TableName::for_datatype(&model)?;
            selected.push(Selected { model, table });
        }
        if selected.is_empty() {
            return Err(CatalogError::MissingRequiredField {
                operation: "fetch_table",
                field: "datatypes",
            });
        }

        let mut params = Params::new(self.db.get_database_backend());
        let mut ctes = Vec::with_capacity(selected.len() + 1);
        for (i, s) in selected.iter().enumerate() {
            ctes.push(format!(
                "d{:02} AS (SELECT d.* FROM {} d \
                 JOIN dataset_map dm ON dm.property_id = d.property_id \
                 JOIN dataset ds ON ds.id = dm.dataset_id \
                 WHERE ds.name = {})",
                i,
                s.table.quoted(),
                params.bind(dataset)
            ));
        }
        let union: Vec<String> = (0..selected.len())
            .map(|i| format!("SELECT star_id FROM d{:02}", i))
            .collect();
        ctes.push(format!("uq_stars AS ({})", union.join(" UNION ")));

        // Result columns are aliased by position; display names only live in
        // `DataTable::columns`.
        let mut columns = vec![STAR_COLUMN.to_string()];
        let mut select = vec!["s.name AS c00".to_string()];
        let mut kinds = Vec::new();
        let mut joins = Vec::with_capacity(selected.len());
        let join = if options.include_nulls {
            "LEFT JOIN"
        } else {
            "JOIN"
        };
        for (i, s) in selected.iter().enumerate() {
            let name = &s.model.name;
            let mut fields = vec![("value", name.clone(), s.model.kind)];
            if options.include_errors && s.model.kind == StructKind::Measure {
                for (side, suffix) in ["errlo", "errhi"].into_iter().zip(ERROR_SUFFIXES) {
                    fields.push((side, format!("{}{}", name, suffix), StructKind::Measure));
                }
            }
            for (field, display, kind) in fields {
                kinds.push(kind);
                select.push(format!("d{:02}.{} AS c{:02}", i, field, kinds.len()));
                columns.push(display);
            }
            joins.push(format!("{} d{:02} ON d{:02}.star_id = s.id", join, i, i));
        }

        let sql = format!(
            "WITH {} SELECT {} FROM uq_stars us JOIN star s ON s.id = us.star_id {} ORDER BY s.name",
            ctes.join(", "),
            select.join(", "),
            joins.join(" ")
        );
        debug!("fetch_table: {}", sql);

        let rows = self.db.query_all(params.statement(sql)).await?;
        let mut table = DataTable {
            columns,
            rows: Vec::with_capacity(rows.len()),
        };
        for row in &rows {
            let mut cells = Vec::with_capacity(table.columns.len());
            cells.push(CellValue::Text(row.try_get::<String>("", "c00")?));
            for (k, kind) in kinds.iter().enumerate() {
                cells.push(cell(row, &format!("c{:02}", k + 1), *kind)?);
            }
            table.rows.push(cells);
        }
        Ok(table)
    }

    /// Column-oriented form of [`fetch_table`](Self::fetch_table)
    pub async fn fetch_columns<S: AsRef<str>>(
        &self,
        dataset: &str,
        datatypes: &[S],
        options: TableOptions,
    ) -> CatalogResult<BTreeMap<String, Vec<CellValue>>> {
        let table = self.fetch_table(dataset, datatypes, options).await?;
        let mut columns: BTreeMap<String, Vec<CellValue>> = table
            .columns
            .iter()
            .map(|c| (c.clone(), Vec::with_capacity(table.rows.len())))
            .collect();
        for row in table.rows {
            for (name, value) in table.columns.iter().zip(row) {
                if let Some(column) = columns.get_mut(name) {
                    column.push(value);
                }
            }
        }
        Ok(columns)
    }

    /// Timepoints of one star's stream, oldest first. Restricted to one
    /// source when `source` is given. An unknown star yields no rows.
    pub async fn fetch_timeseries(
        &self,
        datatype: &str,
        star: &str,
        source: Option<&str>,
    ) -> CatalogResult<Vec<TimePoint>> {
        let model = self.datatype(datatype).await?;
        if model.kind != StructKind::Timeseries {
            return Err(CatalogError::KindMismatch {
                datatype: model.name,
                expected: "TIMESERIES",
                actual: model.kind,
            });
        }
        let table = TableName::for_datatype(&model)?;
        let Some(star) = find_by_alias(self.db, star).await? else {
            return Ok(Vec::new());
        };

        let mut params = Params::new(self.db.get_database_backend());
        let mut sql = format!(
            "SELECT d.obs_time, d.value, d.errlo, d.errhi, d.obs_duration, s.name AS source \
             FROM {} d JOIN source s ON s.id = d.source_id WHERE d.star_id = {}",
            table.quoted(),
            params.bind(star.id)
        );
        if let Some(source) = source {
            sql.push_str(&format!(" AND s.name = {}", params.bind(source)));
        }
        sql.push_str(" ORDER BY d.obs_time, d.id");

        Ok(TimePoint::find_by_statement(params.statement(sql))
            .all(self.db)
            .await?)
    }

    /// Stars of a dataset inside the box of `side_deg` centered on
    /// `center`. The RA extent widens with declination and wraps at 0/360.
    pub async fn fetch_box_match(
        &self,
        dataset: &str,
        center: &SkyCoord,
        side_deg: f64,
    ) -> CatalogResult<Vec<StarMatch>> {
        if !side_deg.is_finite() || side_deg <= 0.0 {
            return Err(CatalogError::InvalidCoordinate(format!(
                "box side must be positive, got {}",
                side_deg
            )));
        }
        let half = side_deg / 2.0;

        // Declination narrows the scan; the RA extent, which widens with
        // declination and wraps at 0/360, is checked per candidate.
        let mut params = Params::new(self.db.get_database_backend());
        let sql = format!(
            "SELECT DISTINCT s.name AS name, s.ra_deg AS ra_deg, s.dec_deg AS dec_deg \
             FROM star s JOIN dataset_map dm ON dm.star_id = s.id \
             JOIN dataset ds ON ds.id = dm.dataset_id \
             WHERE ds.name = {} AND s.dec_deg BETWEEN {} AND {} ORDER BY s.name",
            params.bind(dataset),
            params.bind(center.dec_deg - half),
            params.bind(center.dec_deg + half)
        );

        let candidates = StarMatch::find_by_statement(params.statement(sql))
            .all(self.db)
            .await?;
        Ok(candidates
            .into_iter()
            .filter(|m| {
                let position = SkyCoord {
                    ra_deg: m.ra_deg,
                    dec_deg: m.dec_deg,
                };
                center.box_contains(&position, side_deg)
            })
            .collect())
    }

    /// Every stored value of a MEASURE or LABEL datatype with the star,
    /// reference, origin and instrument it came from
    pub async fn fetch_data(&self, datatype: &str) -> CatalogResult<Vec<ProvenancedValue>> {
        let model = self.datatype(datatype).await?;
        if !model.kind.is_property() {
            return Err(CatalogError::KindMismatch {
                datatype: model.name,
                expected: "MEASURE or LABEL",
                actual: model.kind,
            });
        }
        let table = TableName::for_datatype(&model)?;
        let sql = format!(
            "SELECT st.name AS star, r.name AS \"reference\", o.name AS origin, \
             o.kind AS origin_kind, i.name AS instrument, p.id AS property_id, d.value AS value \
             FROM {} d JOIN property p ON p.id = d.property_id \
             JOIN star st ON st.id = p.star_id \
             JOIN reference r ON r.id = p.reference_id \
             JOIN source so ON so.id = p.source_id \
             JOIN origin o ON o.id = so.origin_id \
             LEFT JOIN instrument i ON i.id = p.instrument_id \
             ORDER BY st.name, p.id",
            table.quoted()
        );
        let params = Params::new(self.db.get_database_backend());
        let rows = self.db.query_all(params.statement(sql)).await?;
        rows.iter()
            .map(|row| {
                Ok(ProvenancedValue {
                    star: row.try_get("", "star")?,
                    reference: row.try_get("", "reference")?,
                    origin: row.try_get("", "origin")?,
                    origin_kind: row.try_get("", "origin_kind")?,
                    instrument: row.try_get("", "instrument")?,
                    property_id: row.try_get("", "property_id")?,
                    value: cell(row, "value", model.kind)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(CellValue::Number(5778.0).to_string(), "5778");
        assert_eq!(CellValue::Text("G2V".to_string()).to_string(), "G2V");
    }

    #[test]
    fn test_table_column_lookup() {
        let table = DataTable {
            columns: vec!["star".to_string(), "teff".to_string()],
            rows: vec![
                vec![CellValue::Text("Sun".to_string()), CellValue::Number(5778.0)],
                vec![CellValue::Text("Vega".to_string()), CellValue::Null],
            ],
        };
        let teff = table.column("teff").unwrap();
        assert_eq!(teff[0].as_f64(), Some(5778.0));
        assert!(teff[1].is_null());
        assert!(table.column("logg").is_none());
    }
}
