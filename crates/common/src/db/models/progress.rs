//! Research progress entity, the owner of ordered content blocks

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "research_progress")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub research_id: i32,

    #[sea_orm(column_type = "Text")]
    pub judul_progres: String,

    #[sea_orm(column_type = "Text")]
    pub title_progress: String,

    /// Derived from the first text block (Indonesian body)
    #[sea_orm(column_type = "Text")]
    pub ringkasan: String,

    /// Derived from the first text block (English body)
    #[sea_orm(column_type = "Text")]
    pub summary: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::research::Entity",
        from = "Column::ResearchId",
        to = "super::research::Column::Id",
        on_delete = "Cascade"
    )]
    Research,

    #[sea_orm(has_many = "super::progress_text::Entity")]
    Texts,

    #[sea_orm(has_many = "super::progress_video::Entity")]
    Videos,

    #[sea_orm(has_many = "super::progress_image::Entity")]
    Images,

    #[sea_orm(has_many = "super::progress_map::Entity")]
    Maps,
}

impl Related<super::research::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Research.def()
    }
}

impl Related<super::progress_text::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Texts.def()
    }
}

impl Related<super::progress_video::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Videos.def()
    }
}

impl Related<super::progress_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::progress_map::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Maps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
