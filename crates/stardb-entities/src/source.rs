use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use stardb_core::DBDateTime;

/// One ingestion batch. `(name, version)` is unique; a `None` version is the
/// unversioned singleton for that name.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "source")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub kind: String,
    pub version: Option<String>,
    pub origin_id: i32,
    /// Source this one was derived from, if any
    pub parent_source_id: Option<i32>,
    pub source_time: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::origin::Entity",
        from = "Column::OriginId",
        to = "super::origin::Column::Id"
    )]
    Origin,
    #[sea_orm(has_many = "super::property::Entity")]
    Properties,
}

impl Related<super::origin::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Origin.def()
    }
}

impl Related<super::property::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Properties.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
