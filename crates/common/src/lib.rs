//! Labsite Common Library
//!
//! Shared code for the Labsite research-lab backend including:
//! - Database models and repository patterns
//! - Ordered progress content (blocks, reconciliation, composition)
//! - Lecturer materials and publications
//! - Uploaded file storage
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod content;
pub mod db;
pub mod errors;
pub mod materials;
pub mod metrics;
pub mod publications;
pub mod storage;

// Re-export commonly used types
pub use config::AppConfig;
pub use content::ProgressService;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use materials::MaterialService;
pub use storage::FileStorage;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
