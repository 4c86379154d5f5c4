//! Map block. `map_link` is the source of truth; coordinates are parsed from it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "progress_maps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub progress_id: i32,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    pub zoom: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub map_link: Option<String>,

    pub index_order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::progress::Entity",
        from = "Column::ProgressId",
        to = "super::progress::Column::Id",
        on_delete = "Cascade"
    )]
    Progress,
}

impl Related<super::progress::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Progress.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
