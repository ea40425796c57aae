//! Dataset Materializer
//!
//! A dataset is a named projection of properties. The automatic dataset of
//! a source carries the source's name and maps every property ingested
//! under it.

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use stardb_entities::{dataset, dataset_map};
use tracing::info;

use crate::error::{CatalogError, CatalogResult};
use crate::provenance::{Provenance, VersionFilter};
use crate::sql::Params;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRebuild {
    pub dataset: dataset::Model,
    /// Mapping rows now in the dataset
    pub mapped: u64,
}

pub struct DatasetMaterializer<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> DatasetMaterializer<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn fetch(&self, name: &str) -> CatalogResult<Option<dataset::Model>> {
        Ok(dataset::Entity::find()
            .filter(dataset::Column::Name.eq(name))
            .one(self.db)
            .await?)
    }

    async fn ensure(&self, name: &str) -> CatalogResult<dataset::Model> {
        if let Some(existing) = self.fetch(name).await? {
            return Ok(existing);
        }
        Ok(dataset::ActiveModel {
            name: Set(name.to_string()),
            description: Set(format!(
                "Dataset automatically generated from data source '{}'",
                name
            )),
            ..Default::default()
        }
        .insert(self.db)
        .await?)
    }

    /// Replace the mapping extent of the dataset named after the source
    /// with every current property of that source. Safe to re-run.
    pub async fn rebuild(&self, source_name: &str) -> CatalogResult<DatasetRebuild> {
        Provenance::new(self.db)
            .fetch_source(source_name, &VersionFilter::Any)
            .await?
            .ok_or_else(|| CatalogError::missing("Source", source_name))?;
        let dataset = self.ensure(source_name).await?;

        let removed = dataset_map::Entity::delete_many()
            .filter(dataset_map::Column::DatasetId.eq(dataset.id))
            .exec(self.db)
            .await?
            .rows_affected;

        let mut params = Params::new(self.db.get_database_backend());
        let sql = format!(
            "INSERT INTO dataset_map (dataset_id, star_id, datatype_id, property_id) \
             SELECT {}, p.star_id, p.datatype_id, p.id \
             FROM property p JOIN source s ON s.id = p.source_id \
             WHERE s.name = {} ORDER BY p.id",
            params.bind(dataset.id),
            params.bind(source_name)
        );
        let mapped = self
            .db
            .execute(params.statement(sql))
            .await?
            .rows_affected();

        info!(
            "Rebuilt dataset '{}': {} mappings ({} replaced)",
            dataset.name, mapped, removed
        );
        Ok(DatasetRebuild { dataset, mapped })
    }
}
