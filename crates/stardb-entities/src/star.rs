use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Canonical astronomical object, named by the name authority's main identifier
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "star")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    /// Sexagesimal ICRS coordinates as reported by the name authority
    pub coord: String,
    pub ra_deg: f64,
    pub dec_deg: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::star_alias::Entity")]
    Aliases,
    #[sea_orm(has_many = "super::property::Entity")]
    Properties,
}

impl Related<super::star_alias::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Aliases.def()
    }
}

impl Related<super::property::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Properties.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
