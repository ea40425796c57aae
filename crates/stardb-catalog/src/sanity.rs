//! Sanity Checker
//!
//! Advisory checks run at the end of an ingestion batch. A failed check is
//! reported to the caller, which decides whether to commit anyway.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use stardb_datapkg::SanityTasks;
use stardb_entities::{datatype, source};
use tracing::{info, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::sql::Params;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanityReport {
    /// Datatypes that passed the completeness check
    pub checked: Vec<String>,
}

pub struct SanityChecker<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> SanityChecker<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Every star with any fact from `source_id` must also have a fact of
    /// `datatype` from that source. Fails with a listing of every star
    /// that does not.
    pub async fn check_completeness(&self, datatype: &str, source_id: i32) -> CatalogResult<()> {
        let model = datatype::Entity::find()
            .filter(datatype::Column::Name.eq(datatype))
            .one(self.db)
            .await?
            .ok_or_else(|| CatalogError::UnknownDatatype(datatype.to_string()))?;

        let mut params = Params::new(self.db.get_database_backend());
        let sql = format!(
            "WITH src_stars AS (\
                SELECT star_id FROM property WHERE source_id = {} \
                UNION SELECT star_id FROM timeseries WHERE source_id = {}), \
             have AS (\
                SELECT star_id FROM property WHERE source_id = {} AND datatype_id = {} \
                UNION SELECT star_id FROM timeseries WHERE source_id = {} AND datatype_id = {}) \
             SELECT s.name AS name FROM src_stars ss JOIN star s ON s.id = ss.star_id \
             WHERE ss.star_id NOT IN (SELECT star_id FROM have) ORDER BY s.name",
            params.bind(source_id),
            params.bind(source_id),
            params.bind(source_id),
            params.bind(model.id),
            params.bind(source_id),
            params.bind(model.id)
        );
        let rows = self.db.query_all(params.statement(sql)).await?;
        let missing = rows
            .iter()
            .map(|row| row.try_get::<String>("", "name"))
            .collect::<Result<Vec<_>, _>>()?;

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::CompletenessViolation {
                datatype: model.name,
                source_id,
                missing,
            })
        }
    }

    /// Run the package's task list against `source`. Every task is run;
    /// the first violation is returned after the rest were logged.
    pub async fn run(
        &self,
        tasks: &SanityTasks,
        source: &source::Model,
    ) -> CatalogResult<SanityReport> {
        let mut report = SanityReport::default();
        let mut first_violation = None;
        for datatype in &tasks.exists_all_stars {
            match self.check_completeness(datatype, source.id).await {
                Ok(()) => {
                    info!("CHECK OK: every star of '{}' has '{}'", source.name, datatype);
                    report.checked.push(datatype.clone());
                }
                Err(err @ CatalogError::CompletenessViolation { .. }) => {
                    warn!("{}", err);
                    first_violation.get_or_insert(err);
                }
                Err(err) => return Err(err),
            }
        }
        match first_violation {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }
}
