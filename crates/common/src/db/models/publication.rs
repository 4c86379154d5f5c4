//! Publication entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "publications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Author names separated by `;` (or `,`)
    #[sea_orm(column_type = "Text")]
    pub authors: String,

    pub year: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub journal: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub volume: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub issue: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub pages: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub doi: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub link: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
