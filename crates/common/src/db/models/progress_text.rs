//! Bilingual rich-text block

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "progress_text_editors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub progress_id: i32,

    #[sea_orm(column_type = "Text")]
    pub text_editor_id: String,

    #[sea_orm(column_type = "Text")]
    pub text_editor_en: String,

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
