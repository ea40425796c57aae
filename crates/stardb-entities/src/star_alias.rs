use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "star_alias")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub star_id: i32,
    /// Catalogue prefix of the identifier, e.g. `HD`, `HIP`, `NAME`
    pub alias_type: String,
    /// Whitespace-compressed identifier
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::star::Entity",
        from = "Column::StarId",
        to = "super::star::Column::Id"
    )]
    Star,
}

impl Related<super::star::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Star.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
