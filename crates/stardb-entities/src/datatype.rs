use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::StructKind;

/// Metadata of a measurable quantity. Each live row owns exactly one
/// physical table, `dat_<name>`, built from the template for `kind`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "datatype")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub kind: StructKind,
    pub unit: String,
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::property::Entity")]
    Properties,
    #[sea_orm(has_many = "super::timeseries::Entity")]
    Timeseries,
}

impl Related<super::property::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Properties.def()
    }
}

impl Related<super::timeseries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Timeseries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
