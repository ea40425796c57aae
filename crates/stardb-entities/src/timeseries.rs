use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use stardb_core::DBDateTime;

/// Header of an accumulating stream. At most one header exists per
/// (star, datatype, source, reference, instrument) key.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "timeseries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub star_id: i32,
    pub datatype_id: i32,
    pub source_id: i32,
    pub reference_id: i32,
    pub instrument_id: Option<i32>,
    pub last_appended: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::star::Entity",
        from = "Column::StarId",
        to = "super::star::Column::Id"
    )]
    Star,
    #[sea_orm(
        belongs_to = "super::datatype::Entity",
        from = "Column::DatatypeId",
        to = "super::datatype::Column::Id"
    )]
    Datatype,
    #[sea_orm(
        belongs_to = "super::source::Entity",
        from = "Column::SourceId",
        to = "super::source::Column::Id"
    )]
    Source,
}

impl Related<super::datatype::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Datatype.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
