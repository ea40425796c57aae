//! Provenance Registry
//!
//! Lookup and insert for the low-relationship provenance entities:
//! references, origins, instruments and sources. Callers check before they
//! insert; the check-then-insert pair is only atomic within the caller's
//! transaction.

use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use stardb_entities::{
    datatype, dataset, dataset_map, instrument, origin, property, reference, source, timeseries,
};
use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::ident::TableName;
use crate::requests::{NewInstrument, NewOrigin, NewReference, NewSource};
use crate::sql::Params;

/// How a source lookup treats the version column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionFilter {
    /// Ignore the version; the most recently inserted row wins
    Any,
    /// Match the version exactly, `None` meaning the unversioned source
    Exact(Option<String>),
}

/// Rows removed by [`Provenance::delete_source`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDeletion {
    pub sources: u64,
    pub properties: u64,
    pub values: u64,
    pub timeseries: u64,
    pub dataset_mappings: u64,
    pub datasets: u64,
}

pub struct Provenance<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> Provenance<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    // References

    pub async fn fetch_reference(&self, name: &str) -> CatalogResult<Option<reference::Model>> {
        Ok(reference::Entity::find()
            .filter(reference::Column::Name.eq(name))
            .one(self.db)
            .await?)
    }

    pub async fn insert_reference(&self, new: &NewReference) -> CatalogResult<reference::Model> {
        if self.fetch_reference(&new.name).await?.is_some() {
            return Err(CatalogError::Duplicate {
                entity: "Reference",
                key: new.name.clone(),
            });
        }
        let model = reference::ActiveModel {
            name: Set(new.name.clone()),
            bibline: Set(new.bibline.clone()),
            bibcode: Set(new.bibcode.clone()),
            ..Default::default()
        }
        .insert(self.db)
        .await?;
        debug!("Inserted reference '{}'", model.name);
        Ok(model)
    }

    /// Fetch the reference, inserting it when absent
    pub async fn ensure_reference(&self, new: &NewReference) -> CatalogResult<reference::Model> {
        match self.fetch_reference(&new.name).await? {
            Some(existing) => Ok(existing),
            None => self.insert_reference(new).await,
        }
    }

    // Origins

    pub async fn fetch_origin(&self, name: &str) -> CatalogResult<Option<origin::Model>> {
        Ok(origin::Entity::find()
            .filter(origin::Column::Name.eq(name))
            .one(self.db)
            .await?)
    }

    pub async fn insert_origin(&self, new: &NewOrigin) -> CatalogResult<origin::Model> {
        if self.fetch_origin(&new.name).await?.is_some() {
            return Err(CatalogError::Duplicate {
                entity: "Origin",
                key: new.name.clone(),
            });
        }
        let model = origin::ActiveModel {
            name: Set(new.name.clone()),
            kind: Set(new.kind.clone()),
            url: Set(new.url.clone()),
            description: Set(new.description.clone()),
            ..Default::default()
        }
        .insert(self.db)
        .await?;
        debug!("Inserted origin '{}'", model.name);
        Ok(model)
    }

    /// Fetch the origin, inserting it when absent
    pub async fn ensure_origin(&self, new: &NewOrigin) -> CatalogResult<origin::Model> {
        match self.fetch_origin(&new.name).await? {
            Some(existing) => Ok(existing),
            None => self.insert_origin(new).await,
        }
    }

    // Instruments

    pub async fn fetch_instrument(&self, name: &str) -> CatalogResult<Option<instrument::Model>> {
        Ok(instrument::Entity::find()
            .filter(instrument::Column::Name.eq(name))
            .one(self.db)
            .await?)
    }

    pub async fn insert_instrument(&self, new: &NewInstrument) -> CatalogResult<instrument::Model> {
        if self.fetch_instrument(&new.name).await?.is_some() {
            return Err(CatalogError::Duplicate {
                entity: "Instrument",
                key: new.name.clone(),
            });
        }
        let model = instrument::ActiveModel {
            name: Set(new.name.clone()),
            long_name: Set(new.long_name.clone()),
            url: Set(new.url.clone()),
            description: Set(new.description.clone()),
            ..Default::default()
        }
        .insert(self.db)
        .await?;
        debug!("Inserted instrument '{}'", model.name);
        Ok(model)
    }

    // Sources

    pub async fn fetch_source(
        &self,
        name: &str,
        version: &VersionFilter,
    ) -> CatalogResult<Option<source::Model>> {
        let query = source::Entity::find().filter(source::Column::Name.eq(name));
        let query = match version {
            VersionFilter::Any => query,
            VersionFilter::Exact(Some(v)) => query.filter(source::Column::Version.eq(v.as_str())),
            VersionFilter::Exact(None) => query.filter(source::Column::Version.is_null()),
        };
        Ok(query
            .order_by_desc(source::Column::Id)
            .one(self.db)
            .await?)
    }

    pub async fn fetch_source_by_id(&self, id: i32) -> CatalogResult<Option<source::Model>> {
        Ok(source::Entity::find_by_id(id).one(self.db).await?)
    }

    pub async fn insert_source(&self, new: &NewSource) -> CatalogResult<source::Model> {
        let version = VersionFilter::Exact(new.version.clone());
        if self.fetch_source(&new.name, &version).await?.is_some() {
            return Err(CatalogError::Duplicate {
                entity: "Source",
                key: match &new.version {
                    Some(v) => format!("{} ({})", new.name, v),
                    None => new.name.clone(),
                },
            });
        }
        let model = source::ActiveModel {
            name: Set(new.name.clone()),
            kind: Set(new.kind.clone()),
            version: Set(new.version.clone()),
            origin_id: Set(new.origin_id),
            parent_source_id: Set(new.parent_source_id),
            source_time: Set(new.source_time),
            ..Default::default()
        }
        .insert(self.db)
        .await?;
        debug!("Inserted source '{}' (id {})", model.name, model.id);
        Ok(model)
    }

    /// Remove every source named `name` together with everything derived
    /// from it: dataset mappings, per-datatype values, properties,
    /// timeseries headers and the dataset named after the source.
    pub async fn delete_source(&self, name: &str) -> CatalogResult<SourceDeletion> {
        let sources = source::Entity::find()
            .filter(source::Column::Name.eq(name))
            .all(self.db)
            .await?;
        if sources.is_empty() {
            return Err(CatalogError::missing("Source", name));
        }
        let source_ids: Vec<i32> = sources.iter().map(|s| s.id).collect();
        let mut deletion = SourceDeletion::default();

        let source_properties = Query::select()
            .column(property::Column::Id)
            .from(property::Entity)
            .and_where(property::Column::SourceId.is_in(source_ids.clone()))
            .to_owned();
        deletion.dataset_mappings += dataset_map::Entity::delete_many()
            .filter(dataset_map::Column::PropertyId.in_subquery(source_properties))
            .exec(self.db)
            .await?
            .rows_affected;

        let backend = self.db.get_database_backend();
        for model in datatype::Entity::find().all(self.db).await? {
            let table = TableName::for_datatype(&model)?;
            let mut params = Params::new(backend);
            let placeholders: Vec<String> =
                source_ids.iter().map(|id| params.bind(*id)).collect();
            let sql = format!(
                "DELETE FROM {} WHERE source_id IN ({})",
                table.quoted(),
                placeholders.join(", ")
            );
            deletion.values += self.db.execute(params.statement(sql)).await?.rows_affected();
        }

        deletion.properties = property::Entity::delete_many()
            .filter(property::Column::SourceId.is_in(source_ids.clone()))
            .exec(self.db)
            .await?
            .rows_affected;
        deletion.timeseries = timeseries::Entity::delete_many()
            .filter(timeseries::Column::SourceId.is_in(source_ids.clone()))
            .exec(self.db)
            .await?
            .rows_affected;
        // Derived sources keep existing without their parent
        source::Entity::update_many()
            .col_expr(
                source::Column::ParentSourceId,
                sea_orm::sea_query::Expr::value(Option::<i32>::None),
            )
            .filter(source::Column::ParentSourceId.is_in(source_ids.clone()))
            .exec(self.db)
            .await?;
        deletion.sources = source::Entity::delete_many()
            .filter(source::Column::Id.is_in(source_ids))
            .exec(self.db)
            .await?
            .rows_affected;

        if let Some(ds) = dataset::Entity::find()
            .filter(dataset::Column::Name.eq(name))
            .one(self.db)
            .await?
        {
            deletion.dataset_mappings += dataset_map::Entity::delete_many()
                .filter(dataset_map::Column::DatasetId.eq(ds.id))
                .exec(self.db)
                .await?
                .rows_affected;
            deletion.datasets = dataset::Entity::delete_by_id(ds.id)
                .exec(self.db)
                .await?
                .rows_affected;
        }

        info!(
            "Dropped source '{}': {} properties, {} values, {} timeseries",
            name, deletion.properties, deletion.values, deletion.timeseries
        );
        Ok(deletion)
    }
}
