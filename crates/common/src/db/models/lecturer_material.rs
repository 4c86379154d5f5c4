//! Lecturer material entity: either an uploaded file or a video link

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lecturer_materials")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub judul: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// "file" or "video"
    #[sea_orm(column_type = "Text")]
    pub material_type: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub file_path: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub video_link: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
