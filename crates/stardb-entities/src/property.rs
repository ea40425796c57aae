use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Generic fact row. The value itself lives in the datatype's physical
/// table, keyed by this row's id.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "property")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub star_id: i32,
    pub datatype_id: i32,
    pub source_id: i32,
    pub reference_id: i32,
    pub instrument_id: Option<i32>,
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
    #[sea_orm(
        belongs_to = "super::reference::Entity",
        from = "Column::ReferenceId",
        to = "super::reference::Column::Id"
    )]
    Reference,
    #[sea_orm(
        belongs_to = "super::instrument::Entity",
        from = "Column::InstrumentId",
        to = "super::instrument::Column::Id"
    )]
    Instrument,
}

impl Related<super::star::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Star.def()
    }
}

impl Related<super::datatype::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Datatype.def()
    }
}

impl Related<super::source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Source.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
