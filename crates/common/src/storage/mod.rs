//! Uploaded file storage
//!
//! Files live under a `documentation/` tree, optionally namespaced by a
//! subfolder, and are named `<YmdHis>_<index>_<token>.<ext>`:
//! - `LocalDiskStorage` writes below a configured root directory
//! - `MemoryStorage` keeps bytes in memory (local runs and tests)
//!
//! Writers store a replacement before the row that references it is
//! committed, and delete the superseded file only after the commit.

use crate::config::{StorageBackend, StorageConfig};
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Top-level folder every stored path starts with
pub const STORAGE_ROOT_DIR: &str = "documentation";

/// A file received from a multipart form
#[derive(Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Upload {
    pub fn new(file_name: Option<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Browsers send an empty part for an untouched file input
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty() && self.file_name.as_deref().map_or(true, str::is_empty)
    }

    /// File extension taken from the client file name, or guessed from the MIME type
    pub fn extension(&self) -> Option<String> {
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| {
                !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
            });

        from_name.or_else(|| {
            let ext = match self.content_type.as_deref()? {
                "image/jpeg" => "jpg",
                "image/png" => "png",
                "image/gif" => "gif",
                "image/webp" => "webp",
                "application/pdf" => "pdf",
                _ => return None,
            };
            Some(ext.to_string())
        })
    }
}

/// `<YmdHis>_<suffix>[.<ext>]`
pub fn stored_file_name(at: DateTime<Utc>, suffix: &str, extension: Option<&str>) -> String {
    let stamp = at.format("%Y%m%d%H%M%S");
    match extension {
        Some(ext) => format!("{stamp}_{suffix}.{ext}"),
        None => format!("{stamp}_{suffix}"),
    }
}

/// `documentation/<subfolder>/<file_name>`, or `documentation/<file_name>` without a subfolder
pub fn storage_path(subfolder: &str, file_name: &str) -> String {
    let subfolder = subfolder.trim_matches('/');
    if subfolder.is_empty() {
        format!("{STORAGE_ROOT_DIR}/{file_name}")
    } else {
        format!("{STORAGE_ROOT_DIR}/{subfolder}/{file_name}")
    }
}

/// Trait for uploaded-file backends
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Write a new file. Never overwrites an existing path.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Remove a file. `Ok(false)` when it was already absent.
    async fn delete(&self, path: &str) -> Result<bool>;

    async fn exists(&self, path: &str) -> Result<bool>;

    /// URL the file is served under
    fn public_url(&self, path: &str) -> String;

    fn backend_name(&self) -> &'static str;
}

/// Store an upload under `documentation/<subfolder>` and return its relative path
pub async fn store_upload(
    storage: &dyn FileStorage,
    subfolder: &str,
    index: usize,
    upload: &Upload,
) -> Result<String> {
    let token: [u8; 3] = rand::random();
    let suffix = format!("{index}_{}", hex::encode(token));
    let name = stored_file_name(Utc::now(), &suffix, upload.extension().as_deref());
    let path = storage_path(subfolder, &name);

    match storage.put(&path, &upload.bytes).await {
        Ok(()) => {
            metrics::record_file_operation("store", storage.backend_name(), true);
            debug!(path = %path, bytes = upload.bytes.len(), "Stored upload");
            Ok(path)
        }
        Err(e) => {
            metrics::record_file_operation("store", storage.backend_name(), false);
            Err(e)
        }
    }
}

/// Delete every path once, logging failures instead of returning them.
/// Returns how many files were actually removed.
pub async fn delete_best_effort(storage: &dyn FileStorage, paths: &[String]) -> usize {
    if paths.is_empty() {
        return 0;
    }

    let results = futures::future::join_all(paths.iter().map(|path| storage.delete(path))).await;

    let mut removed = 0;
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(true) => {
                removed += 1;
                metrics::record_file_operation("delete", storage.backend_name(), true);
            }
            Ok(false) => debug!(path = %path, "File already absent"),
            Err(e) => {
                metrics::record_file_operation("delete", storage.backend_name(), false);
                warn!(path = %path, error = %e, "Failed to delete stored file");
            }
        }
    }
    removed
}

/// Create a storage backend based on configuration
pub fn create_storage(config: &StorageConfig) -> Arc<dyn FileStorage> {
    match config.backend {
        StorageBackend::Local => {
            info!(root = %config.root, "Using local disk storage");
            Arc::new(LocalDiskStorage::new(&config.root, &config.public_prefix))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, uploads are lost on restart");
            Arc::new(MemoryStorage::new(&config.public_prefix))
        }
    }
}

fn public_url(prefix: &str, path: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Reject absolute paths and parent-directory components
fn validate_relative(path: &str) -> Result<&Path> {
    let relative = Path::new(path);
    let safe = !path.is_empty()
        && relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

    if safe {
        Ok(relative)
    } else {
        Err(AppError::Storage {
            message: format!("Refusing unsafe storage path: {path}"),
        })
    }
}

/// Files on the local filesystem
pub struct LocalDiskStorage {
    root: PathBuf,
    public_prefix: String,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>, public_prefix: &str) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_relative(path)?))
    }
}

#[async_trait]
impl FileStorage for LocalDiskStorage {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let target = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&target).await?)
    }

    fn public_url(&self, path: &str) -> String {
        public_url(&self.public_prefix, path)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

/// In-memory storage that also records every delete attempt
pub struct MemoryStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
    delete_attempts: Mutex<Vec<String>>,
    public_prefix: String,
}

impl MemoryStorage {
    pub fn new(public_prefix: &str) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            delete_attempts: Mutex::new(Vec::new()),
            public_prefix: public_prefix.to_string(),
        }
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every path passed to `delete`, in call order
    pub fn delete_attempts(&self) -> Vec<String> {
        self.delete_attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        validate_relative(path)?;
        let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        if files.contains_key(path) {
            return Err(AppError::Storage {
                message: format!("File already exists: {path}"),
            });
        }
        files.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        self.delete_attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_string());
        Ok(self
            .files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path)
            .is_some())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self
            .files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(path))
    }

    fn public_url(&self, path: &str) -> String {
        public_url(&self.public_prefix, path)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn upload(name: &str, bytes: &[u8]) -> Upload {
        Upload::new(Some(name.to_string()), None, bytes.to_vec())
    }

    #[test]
    fn test_stored_file_name_uses_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(stored_file_name(at, "0_abc123", Some("jpg")), "20240309140507_0_abc123.jpg");
        assert_eq!(stored_file_name(at, "2", None), "20240309140507_2");
    }

    #[test]
    fn test_storage_path_namespacing() {
        assert_eq!(storage_path("progress", "a.png"), "documentation/progress/a.png");
        assert_eq!(storage_path("", "a.png"), "documentation/a.png");
        assert_eq!(storage_path("/materials/", "a.pdf"), "documentation/materials/a.pdf");
    }

    #[test]
    fn test_upload_extension() {
        assert_eq!(upload("Photo.JPG", b"x").extension().as_deref(), Some("jpg"));
        assert_eq!(upload("archive.tar.gz", b"x").extension().as_deref(), Some("gz"));
        assert_eq!(upload("noext", b"x").extension(), None);
        assert_eq!(upload("evil.p/h", b"x").extension(), None);

        let typed = Upload::new(None, Some("image/png".into()), b"x".to_vec());
        assert_eq!(typed.extension().as_deref(), Some("png"));
    }

    #[test]
    fn test_empty_upload_detection() {
        assert!(Upload::new(Some(String::new()), None, Vec::new()).is_empty());
        assert!(!upload("a.png", b"").is_empty());
    }

    #[test]
    fn test_public_url() {
        let storage = MemoryStorage::new("/storage/");
        assert_eq!(
            storage.public_url("documentation/progress/a.png"),
            "/storage/documentation/progress/a.png"
        );
    }

    #[tokio::test]
    async fn test_memory_storage_store_and_delete() {
        let storage = MemoryStorage::new("/storage");
        let path = store_upload(&storage, "progress", 0, &upload("a.png", b"png"))
            .await
            .unwrap();

        assert!(path.starts_with("documentation/progress/"));
        assert!(path.ends_with(".png"));
        assert_eq!(storage.get(&path).unwrap(), b"png");

        let removed = delete_best_effort(&storage, &[path.clone(), "documentation/gone.png".into()]).await;
        assert_eq!(removed, 1);
        assert_eq!(storage.delete_attempts().len(), 2);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_unsafe_paths_rejected() {
        let storage = MemoryStorage::new("/storage");
        assert!(tokio_test::block_on(storage.put("../etc/passwd", b"x")).is_err());
        assert!(tokio_test::block_on(storage.put("/abs/path", b"x")).is_err());
        assert!(validate_relative("documentation/./a.png").is_ok());
    }

    #[tokio::test]
    async fn test_local_disk_storage_round_trip() {
        let token: [u8; 8] = rand::random();
        let root = std::env::temp_dir().join(format!("labsite-storage-{}", hex::encode(token)));
        let storage = LocalDiskStorage::new(&root, "/storage");

        let path = store_upload(&storage, "materials", 1, &upload("notes.pdf", b"%PDF"))
            .await
            .unwrap();
        assert!(storage.exists(&path).await.unwrap());
        assert!(storage.put(&path, b"again").await.is_err());

        assert!(storage.delete(&path).await.unwrap());
        assert!(!storage.delete(&path).await.unwrap());

        tokio::fs::remove_dir_all(&root).await.ok();
    }
}
