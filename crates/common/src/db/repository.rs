//! Repository pattern for database operations
//!
//! Provides a clean interface for the plain CRUD data access
//! (research, progress listings, lecturer materials, publications).
//! Ordered content blocks are written through `content::ProgressService`.

use crate::content::slug;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};

/// Editable research columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchFields {
    pub judul: String,
    pub title: String,
    pub deskripsi: String,
    pub description: String,
}

/// Editable publication columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicationFields {
    pub title: String,
    pub authors: String,
    pub year: Option<i32>,
    pub journal: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    pub link: Option<String>,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Research Operations
    // ========================================================================

    /// Create a new research entry
    pub async fn create_research(&self, fields: ResearchFields) -> Result<Research> {
        let now = chrono::Utc::now();

        let research = ResearchActiveModel {
            id: NotSet,
            judul: Set(fields.judul),
            title: Set(fields.title),
            deskripsi: Set(fields.deskripsi),
            description: Set(fields.description),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        research.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find research by ID
    pub async fn find_research_by_id(&self, id: i32) -> Result<Option<Research>> {
        ResearchEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List research entries, newest first
    pub async fn list_research(&self) -> Result<Vec<Research>> {
        ResearchEntity::find()
            .order_by_desc(ResearchColumn::CreatedAt)
            .order_by_desc(ResearchColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find research whose Indonesian or English title matches a slug.
    /// Lowest id wins when several titles normalize to the same slug.
    pub async fn find_research_by_slug(&self, key: &str) -> Result<Option<Research>> {
        let research = ResearchEntity::find()
            .order_by_asc(ResearchColumn::Id)
            .all(self.read_conn())
            .await?;

        Ok(research
            .into_iter()
            .find(|r| slug::matches_either(&r.judul, &r.title, key)))
    }

    /// Update research fields
    pub async fn update_research(&self, id: i32, fields: ResearchFields) -> Result<Research> {
        let mut research: ResearchActiveModel = ResearchEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::not_found("research", id))?
            .into();

        research.judul = Set(fields.judul);
        research.title = Set(fields.title);
        research.deskripsi = Set(fields.deskripsi);
        research.description = Set(fields.description);
        research.updated_at = Set(chrono::Utc::now().into());

        research.update(self.write_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Progress Reads
    // ========================================================================

    /// List progress entries of a research, oldest first
    pub async fn list_progress(&self, research_id: i32) -> Result<Vec<Progress>> {
        ProgressEntity::find()
            .filter(ProgressColumn::ResearchId.eq(research_id))
            .order_by_asc(ProgressColumn::CreatedAt)
            .order_by_asc(ProgressColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a progress entry scoped to its research
    pub async fn find_progress(&self, research_id: i32, progress_id: i32) -> Result<Option<Progress>> {
        ProgressEntity::find_by_id(progress_id)
            .filter(ProgressColumn::ResearchId.eq(research_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Lecturer Material Operations
    // ========================================================================

    /// Insert a lecturer material row
    pub async fn create_material(
        &self,
        judul: String,
        title: String,
        material_type: &str,
        file_path: Option<String>,
        video_link: Option<String>,
    ) -> Result<LecturerMaterial> {
        let now = chrono::Utc::now();

        let material = LecturerMaterialActiveModel {
            id: NotSet,
            judul: Set(judul),
            title: Set(title),
            material_type: Set(material_type.to_string()),
            file_path: Set(file_path),
            video_link: Set(video_link),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        material.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find lecturer material by ID
    pub async fn find_material(&self, id: i32) -> Result<Option<LecturerMaterial>> {
        LecturerMaterialEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List lecturer materials, newest first
    pub async fn list_materials(&self) -> Result<Vec<LecturerMaterial>> {
        LecturerMaterialEntity::find()
            .order_by_desc(LecturerMaterialColumn::CreatedAt)
            .order_by_desc(LecturerMaterialColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Overwrite the editable columns of an existing material
    pub async fn update_material(
        &self,
        existing: LecturerMaterial,
        judul: String,
        title: String,
        material_type: &str,
        file_path: Option<String>,
        video_link: Option<String>,
    ) -> Result<LecturerMaterial> {
        let mut material: LecturerMaterialActiveModel = existing.into();

        material.judul = Set(judul);
        material.title = Set(title);
        material.material_type = Set(material_type.to_string());
        material.file_path = Set(file_path);
        material.video_link = Set(video_link);
        material.updated_at = Set(chrono::Utc::now().into());

        material.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete lecturer material by ID
    pub async fn delete_material(&self, id: i32) -> Result<bool> {
        let result = LecturerMaterialEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Publication Operations
    // ========================================================================

    /// Create a publication
    pub async fn create_publication(&self, fields: PublicationFields) -> Result<Publication> {
        let now = chrono::Utc::now();

        let publication = PublicationActiveModel {
            id: NotSet,
            title: Set(fields.title),
            authors: Set(fields.authors),
            year: Set(fields.year),
            journal: Set(fields.journal),
            volume: Set(fields.volume),
            issue: Set(fields.issue),
            pages: Set(fields.pages),
            doi: Set(fields.doi),
            link: Set(fields.link),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        publication.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find publication by ID
    pub async fn find_publication(&self, id: i32) -> Result<Option<Publication>> {
        PublicationEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List publications, most recent year first; undated entries last
    pub async fn list_publications(&self) -> Result<Vec<Publication>> {
        let mut publications = PublicationEntity::find()
            .order_by_desc(PublicationColumn::Id)
            .all(self.read_conn())
            .await?;

        publications.sort_by(|a, b| b.year.cmp(&a.year));
        Ok(publications)
    }

    /// Update a publication
    pub async fn update_publication(&self, id: i32, fields: PublicationFields) -> Result<Publication> {
        let mut publication: PublicationActiveModel = PublicationEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::not_found("publication", id))?
            .into();

        publication.title = Set(fields.title);
        publication.authors = Set(fields.authors);
        publication.year = Set(fields.year);
        publication.journal = Set(fields.journal);
        publication.volume = Set(fields.volume);
        publication.issue = Set(fields.issue);
        publication.pages = Set(fields.pages);
        publication.doi = Set(fields.doi);
        publication.link = Set(fields.link);
        publication.updated_at = Set(chrono::Utc::now().into());

        publication.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete publication by ID
    pub async fn delete_publication(&self, id: i32) -> Result<bool> {
        let result = PublicationEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}
