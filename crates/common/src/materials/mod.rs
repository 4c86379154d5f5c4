//! Lecturer materials: a downloadable file or a video link.
//!
//! The type decides which of `file_path` / `video_link` is populated; the
//! other one is cleared whenever the type is (re)set. A replaced or
//! abandoned file is deleted only after the row update succeeded.

use crate::db::models::LecturerMaterial;
use crate::db::Repository;
use crate::errors::{AppError, FieldErrors, Result};
use crate::metrics::{self, BlockChanges};
use crate::storage::{self, FileStorage, Upload};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Storage subfolder for material files
pub const MATERIALS_SUBFOLDER: &str = "materials";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    File,
    Video,
}

impl MaterialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::File => "file",
            MaterialType::Video => "video",
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(MaterialType::File),
            "video" => Ok(MaterialType::Video),
            _ => Err(AppError::validation("type", "must be one of: file, video")),
        }
    }
}

/// Raw material form
#[derive(Debug, Clone, Default)]
pub struct MaterialSubmission {
    pub judul: Option<String>,
    pub title: Option<String>,
    pub material_type: Option<String>,
    pub video_link: Option<String>,
    pub file: Option<Upload>,
}

struct MaterialFields {
    judul: String,
    title: String,
    material_type: MaterialType,
    video_link: Option<String>,
    file: Option<Upload>,
}

impl MaterialSubmission {
    fn validate(self) -> Result<MaterialFields> {
        let mut errors = FieldErrors::new();

        let judul = non_blank(self.judul);
        if judul.is_none() {
            errors.add("judul", "is required");
        }
        let title = non_blank(self.title);
        if title.is_none() {
            errors.add("title", "is required");
        }

        let material_type = match non_blank(self.material_type) {
            None => {
                errors.add("type", "is required");
                None
            }
            Some(raw) => match raw.parse::<MaterialType>() {
                Ok(t) => Some(t),
                Err(e) => {
                    if let Some(field_errors) = e.field_errors() {
                        errors.extend(field_errors.clone());
                    }
                    None
                }
            },
        };

        errors.into_result()?;

        Ok(MaterialFields {
            judul: judul.unwrap_or_default(),
            title: title.unwrap_or_default(),
            material_type: material_type.unwrap_or(MaterialType::File),
            video_link: non_blank(self.video_link),
            file: self.file.filter(|f| !f.is_empty()),
        })
    }
}

/// A material as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct MaterialView {
    #[serde(flatten)]
    pub material: LecturerMaterial,
    pub file_url: Option<String>,
}

#[derive(Clone)]
pub struct MaterialService {
    repo: Repository,
    storage: Arc<dyn FileStorage>,
}

impl MaterialService {
    pub fn new(repo: Repository, storage: Arc<dyn FileStorage>) -> Self {
        Self { repo, storage }
    }

    pub fn view(&self, material: LecturerMaterial) -> MaterialView {
        let file_url = material.file_path.as_deref().map(|p| self.storage.public_url(p));
        MaterialView { material, file_url }
    }

    pub async fn list(&self) -> Result<Vec<LecturerMaterial>> {
        self.repo.list_materials().await
    }

    pub async fn find(&self, id: i32) -> Result<Option<LecturerMaterial>> {
        self.repo.find_material(id).await
    }

    #[instrument(skip(self, submission))]
    pub async fn create(&self, submission: MaterialSubmission) -> Result<LecturerMaterial> {
        let started = Instant::now();
        let fields = submission.validate()?;

        let (file_path, video_link) = match fields.material_type {
            MaterialType::Video => (None, Some(require_video_link(fields.video_link)?)),
            MaterialType::File => {
                let upload = fields.file.ok_or_else(missing_file)?;
                let path = storage::store_upload(self.storage.as_ref(), MATERIALS_SUBFOLDER, 0, &upload).await?;
                (Some(path), None)
            }
        };

        let created = self
            .repo
            .create_material(
                fields.judul,
                fields.title,
                fields.material_type.as_str(),
                file_path.clone(),
                video_link,
            )
            .await;

        match created {
            Ok(material) => {
                record_write("create", BlockChanges { inserted: 1, ..Default::default() }, started);
                info!(material_id = material.id, material_type = %fields.material_type, "Material created");
                Ok(material)
            }
            Err(e) => Err(self.discard(file_path, e).await),
        }
    }

    #[instrument(skip(self, submission))]
    pub async fn update(&self, id: i32, submission: MaterialSubmission) -> Result<LecturerMaterial> {
        let started = Instant::now();
        let existing = self
            .repo
            .find_material(id)
            .await?
            .ok_or_else(|| AppError::not_found("lecturer material", id))?;
        let fields = submission.validate()?;

        let mut staged = None;
        let (file_path, video_link) = match fields.material_type {
            MaterialType::Video => (None, Some(require_video_link(fields.video_link)?)),
            MaterialType::File => match (fields.file, &existing.file_path) {
                (Some(upload), _) => {
                    let path = storage::store_upload(self.storage.as_ref(), MATERIALS_SUBFOLDER, 0, &upload).await?;
                    staged = Some(path.clone());
                    (Some(path), None)
                }
                (None, Some(current)) => (Some(current.clone()), None),
                (None, None) => return Err(missing_file()),
            },
        };

        // File that is no longer referenced once the update lands
        let superseded = existing
            .file_path
            .clone()
            .filter(|old| file_path.as_deref() != Some(old.as_str()));

        let updated = self
            .repo
            .update_material(
                existing,
                fields.judul,
                fields.title,
                fields.material_type.as_str(),
                file_path,
                video_link,
            )
            .await;

        let material = match updated {
            Ok(material) => material,
            Err(e) => return Err(self.discard(staged, e).await),
        };

        if let Some(old) = superseded {
            storage::delete_best_effort(self.storage.as_ref(), &[old]).await;
        }

        record_write("update", BlockChanges { updated: 1, ..Default::default() }, started);
        info!(material_id = id, material_type = %fields.material_type, "Material updated");
        Ok(material)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<()> {
        let started = Instant::now();
        let existing = self
            .repo
            .find_material(id)
            .await?
            .ok_or_else(|| AppError::not_found("lecturer material", id))?;

        if !self.repo.delete_material(id).await? {
            return Err(AppError::not_found("lecturer material", id));
        }

        if let Some(path) = existing.file_path {
            storage::delete_best_effort(self.storage.as_ref(), &[path]).await;
        }

        record_write("delete", BlockChanges { deleted: 1, ..Default::default() }, started);
        info!(material_id = id, "Material deleted");
        Ok(())
    }

    async fn discard(&self, staged: Option<String>, error: AppError) -> AppError {
        if let Some(path) = staged {
            warn!(path = %path, error = %error, "Material write failed, removing stored file");
            storage::delete_best_effort(self.storage.as_ref(), &[path]).await;
        }
        error
    }
}

fn record_write(operation: &str, changes: BlockChanges, started: Instant) {
    metrics::record_content_write(operation, changes, started.elapsed().as_secs_f64());
}

fn require_video_link(link: Option<String>) -> Result<String> {
    link.ok_or_else(|| AppError::business_rule("video material requires a video link"))
}

fn missing_file() -> AppError {
    AppError::business_rule("file material requires an uploaded file")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::memory_pool;
    use crate::storage::MemoryStorage;

    async fn service() -> (MaterialService, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new("/storage"));
        let repo = Repository::new(memory_pool().await);
        (MaterialService::new(repo, storage.clone()), storage)
    }

    fn form(material_type: &str) -> MaterialSubmission {
        MaterialSubmission {
            judul: Some("Modul Praktikum".into()),
            title: Some("Lab Module".into()),
            material_type: Some(material_type.into()),
            ..Default::default()
        }
    }

    fn pdf(name: &str) -> Upload {
        Upload::new(Some(name.to_string()), Some("application/pdf".into()), b"%PDF-1.7".to_vec())
    }

    fn business_message(err: AppError) -> String {
        match err {
            AppError::BusinessRule { message } => message,
            other => panic!("expected business rule error, got {other:?}"),
        }
    }

    #[test]
    fn test_material_type_parsing() {
        assert_eq!("file".parse::<MaterialType>().unwrap(), MaterialType::File);
        assert_eq!(" Video ".parse::<MaterialType>().unwrap(), MaterialType::Video);
        assert!("audio".parse::<MaterialType>().is_err());
    }

    #[tokio::test]
    async fn test_video_requires_link() {
        let (service, _) = service().await;
        let err = service.create(form("video")).await.unwrap_err();
        assert_eq!(business_message(err), "video material requires a video link");
    }

    #[tokio::test]
    async fn test_file_requires_upload() {
        let (service, storage) = service().await;
        let mut submission = form("file");
        submission.file = Some(Upload::new(Some(String::new()), None, Vec::new()));

        let err = service.create(submission).await.unwrap_err();
        assert_eq!(business_message(err), "file material requires an uploaded file");
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_form_is_field_keyed() {
        let (service, _) = service().await;
        let err = service
            .create(MaterialSubmission {
                material_type: Some("podcast".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        let errors = err.field_errors().unwrap();
        assert!(errors.contains("judul"));
        assert!(errors.contains("title"));
        assert!(errors.contains("type"));
    }

    #[tokio::test]
    async fn test_switching_file_to_video_deletes_file() {
        let (service, storage) = service().await;
        let mut submission = form("file");
        submission.file = Some(pdf("modul.pdf"));
        let created = service.create(submission).await.unwrap();
        let path = created.file_path.clone().unwrap();
        assert!(path.starts_with("documentation/materials/"));
        assert_eq!(service.view(created.clone()).file_url, Some(format!("/storage/{path}")));

        let mut switch = form("video");
        switch.video_link = Some("https://youtu.be/dQw4w9WgXcQ".into());
        let updated = service.update(created.id, switch).await.unwrap();

        assert_eq!(updated.material_type, "video");
        assert_eq!(updated.file_path, None);
        assert!(updated.video_link.is_some());
        assert!(storage.get(&path).is_none());
        assert_eq!(storage.delete_attempts(), vec![path]);
    }

    #[tokio::test]
    async fn test_switching_video_to_file_needs_upload() {
        let (service, storage) = service().await;
        let mut video = form("video");
        video.video_link = Some("https://youtu.be/dQw4w9WgXcQ".into());
        let created = service.create(video).await.unwrap();

        let err = service.update(created.id, form("file")).await.unwrap_err();
        assert_eq!(business_message(err), "file material requires an uploaded file");

        let mut with_file = form("file");
        with_file.file = Some(pdf("slides.pdf"));
        let updated = service.update(created.id, with_file).await.unwrap();
        assert_eq!(updated.video_link, None);
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_file_kept_or_replaced_on_update() {
        let (service, storage) = service().await;
        let mut submission = form("file");
        submission.file = Some(pdf("v1.pdf"));
        let created = service.create(submission).await.unwrap();
        let first = created.file_path.clone().unwrap();

        let kept = service.update(created.id, form("file")).await.unwrap();
        assert_eq!(kept.file_path.as_deref(), Some(first.as_str()));
        assert!(storage.delete_attempts().is_empty());

        let mut replace = form("file");
        replace.file = Some(pdf("v2.pdf"));
        let replaced = service.update(created.id, replace).await.unwrap();
        let second = replaced.file_path.unwrap();
        assert_ne!(second, first);
        assert!(storage.get(&second).is_some());
        assert!(storage.get(&first).is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_file() {
        let (service, storage) = service().await;
        let mut submission = form("file");
        submission.file = Some(pdf("notes.pdf"));
        let created = service.create(submission).await.unwrap();

        service.delete(created.id).await.unwrap();
        assert!(storage.is_empty());
        assert!(service.find(created.id).await.unwrap().is_none());
        assert!(matches!(
            service.delete(created.id).await.unwrap_err(),
            AppError::NotFound { .. }
        ));
        assert!(matches!(
            service.update(created.id, form("video")).await.unwrap_err(),
            AppError::NotFound { .. }
        ));
    }
}
