//! Datatype Registry
//!
//! Inserting a datatype also materializes its physical table from the
//! template of its structural kind; dropping it removes every dependent
//! fact before the table itself.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use stardb_entities::{dataset_map, datatype, property, timeseries, StructKind};
use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::ident::TableName;
use crate::requests::NewDatatype;
use crate::templates::{TemplateParams, TemplateRegistry};

pub struct DatatypeRegistry<'a, C: ConnectionTrait> {
    db: &'a C,
    templates: &'a TemplateRegistry,
}

impl<'a, C: ConnectionTrait> DatatypeRegistry<'a, C> {
    pub fn new(db: &'a C, templates: &'a TemplateRegistry) -> Self {
        Self { db, templates }
    }

    pub async fn fetch(&self, name: &str) -> CatalogResult<Option<datatype::Model>> {
        Ok(datatype::Entity::find()
            .filter(datatype::Column::Name.eq(name))
            .one(self.db)
            .await?)
    }

    /// Fetch a datatype that must exist
    pub async fn get(&self, name: &str) -> CatalogResult<datatype::Model> {
        self.fetch(name)
            .await?
            .ok_or_else(|| CatalogError::UnknownDatatype(name.to_string()))
    }

    pub async fn fetch_by_id(&self, id: i32) -> CatalogResult<Option<datatype::Model>> {
        Ok(datatype::Entity::find_by_id(id).one(self.db).await?)
    }

    pub async fn fetch_all(&self) -> CatalogResult<Vec<datatype::Model>> {
        Ok(datatype::Entity::find()
            .order_by_asc(datatype::Column::Name)
            .all(self.db)
            .await?)
    }

    /// Physical table holding the datatype's values
    pub fn table_for(&self, model: &datatype::Model) -> CatalogResult<TableName> {
        TableName::for_datatype(model)
    }

    /// Insert the metadata row and create the datatype's table
    pub async fn insert(&self, new: &NewDatatype) -> CatalogResult<datatype::Model> {
        if self.fetch(new.name.as_str()).await?.is_some() {
            return Err(CatalogError::Duplicate {
                entity: "Datatype",
                key: new.name.to_string(),
            });
        }

        let model = datatype::ActiveModel {
            name: Set(new.name.to_string()),
            kind: Set(new.kind),
            unit: Set(new.unit.clone()),
            description: Set(new.description.clone()),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        let ddl = self.templates.instantiate(
            model.kind,
            &TemplateParams {
                name: &new.name,
                id: model.id,
            },
        )?;
        for statement in ddl.statements() {
            debug!("DDL: {}", statement);
            self.db.execute_unprepared(statement).await?;
        }

        info!(
            "Created datatype '{}' ({}) with table {}",
            model.name,
            model.kind,
            TableName::for_datatype(&model)?
        );
        Ok(model)
    }

    /// Drop a datatype: dataset mappings, properties, timeseries headers,
    /// the metadata row and finally the table, in that order.
    pub async fn drop(&self, name: &str) -> CatalogResult<()> {
        let model = self.get(name).await?;
        let table = TableName::for_datatype(&model)?;

        let mappings = dataset_map::Entity::delete_many()
            .filter(dataset_map::Column::DatatypeId.eq(model.id))
            .exec(self.db)
            .await?
            .rows_affected;
        let properties = property::Entity::delete_many()
            .filter(property::Column::DatatypeId.eq(model.id))
            .exec(self.db)
            .await?
            .rows_affected;
        let headers = if model.kind == StructKind::Timeseries {
            // Timepoints reference their header
            self.db
                .execute_unprepared(&format!("DELETE FROM {}", table.quoted()))
                .await?;
            timeseries::Entity::delete_many()
                .filter(timeseries::Column::DatatypeId.eq(model.id))
                .exec(self.db)
                .await?
                .rows_affected
        } else {
            0
        };
        datatype::Entity::delete_by_id(model.id)
            .exec(self.db)
            .await?;
        self.db
            .execute_unprepared(&format!("DROP TABLE {}", table.quoted()))
            .await?;

        info!(
            "Dropped datatype '{}' ({} mappings, {} properties, {} timeseries)",
            model.name, mappings, properties, headers
        );
        Ok(())
    }
}
