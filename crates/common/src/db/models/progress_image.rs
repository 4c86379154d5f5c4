//! Image block. Rows sharing an `index_order` render as one image group.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "progress_images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub progress_id: i32,

    /// Path relative to the storage root, e.g. `documentation/progress/20240101120000_0_ab12cd.jpg`
    #[sea_orm(column_type = "Text")]
    pub image: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub keterangan: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub caption: Option<String>,

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
