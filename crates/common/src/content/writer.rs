//! Progress service: composed reads and transactional writes.
//!
//! File ordering for every write:
//! 1. new uploads are stored before the rows that reference them
//! 2. all row changes of one request commit in a single transaction
//! 3. files no longer referenced are deleted only after the commit
//!
//! If anything fails before the commit, the files stored for this request
//! are removed again (best-effort) and the previous state stays intact.

use crate::content::compose::{compose, ComposedProgress};
use crate::content::reconcile::{self, ReconcilePlan, StoredIds};
use crate::content::slug;
use crate::content::store::{self, StoredBlocks};
use crate::content::submission::{ProgressSubmission, ValidatedProgress};
use crate::db::models::*;
use crate::db::{DbPool, Repository};
use crate::errors::{AppError, Result};
use crate::metrics::{self, BlockChanges};
use crate::storage::{self, FileStorage};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, NotSet, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Storage subfolder for progress images
pub const PROGRESS_SUBFOLDER: &str = "progress";

#[derive(Clone)]
pub struct ProgressService {
    pool: DbPool,
    repo: Repository,
    storage: Arc<dyn FileStorage>,
}

/// Result of a committed delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub progress_deleted: usize,
    pub files_removed: usize,
}

impl ProgressService {
    pub fn new(pool: DbPool, storage: Arc<dyn FileStorage>) -> Self {
        let repo = Repository::new(pool.clone());
        Self { pool, repo, storage }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Progress entries of a research, oldest first
    pub async fn list(&self, research_id: i32) -> Result<Vec<Progress>> {
        if self.repo.find_research_by_id(research_id).await?.is_none() {
            return Err(AppError::not_found("research", research_id));
        }
        self.repo.list_progress(research_id).await
    }

    /// Composed progress addressed by ids; `None` when either is missing
    pub async fn compose_by_id(&self, research_id: i32, progress_id: i32) -> Result<Option<ComposedProgress>> {
        let Some(research) = self.repo.find_research_by_id(research_id).await? else {
            return Ok(None);
        };
        let Some(progress) = self.repo.find_progress(research_id, progress_id).await? else {
            return Ok(None);
        };

        self.compose_progress(research, progress).await.map(Some)
    }

    /// Composed progress addressed by title slugs (either language).
    /// Lowest progress id wins when several titles share a slug.
    pub async fn compose_by_slug(&self, research_key: &str, progress_key: &str) -> Result<Option<ComposedProgress>> {
        let Some(research) = self.repo.find_research_by_slug(research_key).await? else {
            return Ok(None);
        };

        let progress = self
            .repo
            .list_progress(research.id)
            .await?
            .into_iter()
            .filter(|p| slug::matches_either(&p.judul_progres, &p.title_progress, progress_key))
            .min_by_key(|p| p.id);

        match progress {
            Some(progress) => self.compose_progress(research, progress).await.map(Some),
            None => Ok(None),
        }
    }

    async fn compose_progress(&self, research: Research, progress: Progress) -> Result<ComposedProgress> {
        let stored = store::fetch_blocks(self.pool.read(), progress.id).await?;
        let blocks = compose(stored, |path| self.storage.public_url(path));

        Ok(ComposedProgress {
            progress,
            research,
            blocks,
        })
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Create a progress entry with all of its blocks
    #[instrument(skip(self, submission), fields(blocks = submission.blocks.len()))]
    pub async fn create(&self, research_id: i32, submission: ProgressSubmission) -> Result<Progress> {
        let started = Instant::now();
        let ValidatedProgress {
            judul_progres,
            title_progress,
            blocks,
        } = submission.validate()?;

        let txn = self.pool.write().begin().await?;
        if ResearchEntity::find_by_id(research_id).one(&txn).await?.is_none() {
            return Err(AppError::not_found("research", research_id));
        }

        let mut plan = reconcile::plan(&StoredIds::default(), blocks);
        plan.ensure_new_images_have_files()?;
        let changes = plan.changes();
        let mut staged = Vec::new();

        let written = async {
            self.stage_uploads(&mut plan, &mut staged).await?;

            let now = chrono::Utc::now();
            let progress = ProgressActiveModel {
                id: NotSet,
                research_id: Set(research_id),
                judul_progres: Set(judul_progres),
                title_progress: Set(title_progress),
                ringkasan: Set(plan.summary.indonesian.clone()),
                summary: Set(plan.summary.english.clone()),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;

            apply_plan(&txn, progress.id, &StoredBlocks::default(), &plan).await?;
            txn.commit().await?;
            Ok::<_, AppError>(progress)
        }
        .await;

        let progress = match written {
            Ok(progress) => progress,
            Err(e) => return Err(self.discard(staged, e).await),
        };

        metrics::record_content_write("create", changes, started.elapsed().as_secs_f64());
        info!(progress_id = progress.id, research_id, inserted = changes.inserted, "Progress created");
        Ok(progress)
    }

    /// Reconcile the stored blocks of a progress with a new submission
    #[instrument(skip(self, submission), fields(blocks = submission.blocks.len()))]
    pub async fn update(&self, research_id: i32, progress_id: i32, submission: ProgressSubmission) -> Result<Progress> {
        let started = Instant::now();
        let ValidatedProgress {
            judul_progres,
            title_progress,
            blocks,
        } = submission.validate()?;

        let txn = self.pool.write().begin().await?;
        let existing = ProgressEntity::find_by_id(progress_id)
            .filter(ProgressColumn::ResearchId.eq(research_id))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("progress", progress_id))?;

        let stored = store::fetch_blocks(&txn, progress_id).await?;
        let mut plan = reconcile::plan(&stored.ids(), blocks);
        plan.ensure_new_images_have_files()?;
        let changes = plan.changes();
        let mut staged = Vec::new();

        let written = async {
            self.stage_uploads(&mut plan, &mut staged).await?;

            let removed = apply_plan(&txn, progress_id, &stored, &plan).await?;

            let mut progress: ProgressActiveModel = existing.into();
            progress.judul_progres = Set(judul_progres);
            progress.title_progress = Set(title_progress);
            progress.ringkasan = Set(plan.summary.indonesian.clone());
            progress.summary = Set(plan.summary.english.clone());
            progress.updated_at = Set(chrono::Utc::now().into());
            let progress = progress.update(&txn).await?;

            txn.commit().await?;
            Ok::<_, AppError>((progress, removed))
        }
        .await;

        let (progress, removed) = match written {
            Ok(written) => written,
            Err(e) => return Err(self.discard(staged, e).await),
        };

        let files_removed = storage::delete_best_effort(self.storage.as_ref(), &removed).await;

        metrics::record_content_write("update", changes, started.elapsed().as_secs_f64());
        info!(
            progress_id,
            inserted = changes.inserted,
            updated = changes.updated,
            deleted = changes.deleted,
            files_removed,
            "Progress updated"
        );
        Ok(progress)
    }

    /// Delete a progress entry, its blocks and their image files
    #[instrument(skip(self))]
    pub async fn delete(&self, research_id: i32, progress_id: i32) -> Result<DeleteOutcome> {
        let started = Instant::now();
        let txn = self.pool.write().begin().await?;

        if ProgressEntity::find_by_id(progress_id)
            .filter(ProgressColumn::ResearchId.eq(research_id))
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(AppError::not_found("progress", progress_id));
        }

        let (paths, deleted_blocks) = delete_progress_rows(&txn, progress_id).await?;
        txn.commit().await?;

        let files_removed = storage::delete_best_effort(self.storage.as_ref(), &paths).await;

        metrics::record_content_write(
            "delete",
            BlockChanges {
                deleted: deleted_blocks,
                ..Default::default()
            },
            started.elapsed().as_secs_f64(),
        );
        info!(progress_id, files_removed, "Progress deleted");

        Ok(DeleteOutcome {
            progress_deleted: 1,
            files_removed,
        })
    }

    /// Delete a research entry together with every progress it owns
    #[instrument(skip(self))]
    pub async fn delete_research(&self, research_id: i32) -> Result<DeleteOutcome> {
        let started = Instant::now();
        let txn = self.pool.write().begin().await?;

        if ResearchEntity::find_by_id(research_id).one(&txn).await?.is_none() {
            return Err(AppError::not_found("research", research_id));
        }

        let progress_ids: Vec<i32> = ProgressEntity::find()
            .filter(ProgressColumn::ResearchId.eq(research_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let mut paths = Vec::new();
        let mut deleted_blocks = 0;
        for progress_id in &progress_ids {
            let (removed, count) = delete_progress_rows(&txn, *progress_id).await?;
            paths.extend(removed);
            deleted_blocks += count;
        }

        ResearchEntity::delete_by_id(research_id).exec(&txn).await?;
        txn.commit().await?;

        let files_removed = storage::delete_best_effort(self.storage.as_ref(), &paths).await;

        metrics::record_content_write(
            "delete",
            BlockChanges {
                deleted: deleted_blocks,
                ..Default::default()
            },
            started.elapsed().as_secs_f64(),
        );
        info!(research_id, progress = progress_ids.len(), files_removed, "Research deleted");

        Ok(DeleteOutcome {
            progress_deleted: progress_ids.len(),
            files_removed,
        })
    }

    /// Store every pending image upload, recording each path in `staged`
    async fn stage_uploads(&self, plan: &mut ReconcilePlan, staged: &mut Vec<String>) -> Result<()> {
        for (index, draft) in plan.pending_uploads().enumerate() {
            let Some(upload) = draft.upload.take() else {
                continue;
            };
            let path = storage::store_upload(self.storage.as_ref(), PROGRESS_SUBFOLDER, index, &upload).await?;
            staged.push(path.clone());
            draft.stored_path = Some(path);
        }
        Ok(())
    }

    /// Remove files stored for a write that did not commit
    async fn discard(&self, staged: Vec<String>, error: AppError) -> AppError {
        if !staged.is_empty() {
            warn!(files = staged.len(), error = %error, "Write failed, removing staged uploads");
            storage::delete_best_effort(self.storage.as_ref(), &staged).await;
        }
        error
    }
}

/// Apply a plan inside an open transaction.
/// Returns the stored files that are no longer referenced once it commits.
async fn apply_plan(
    txn: &DatabaseTransaction,
    progress_id: i32,
    stored: &StoredBlocks,
    plan: &ReconcilePlan,
) -> Result<Vec<String>> {
    let mut removed = Vec::new();

    // Text
    store::delete_by_ids::<TextBlockEntity, _>(txn, TextBlockColumn::Id, &plan.text.delete).await?;
    for (id, draft) in &plan.text.update {
        store::update_text(txn, *id, draft).await?;
    }
    for draft in &plan.text.insert {
        store::insert_text(txn, progress_id, draft).await?;
    }

    // Videos
    store::delete_by_ids::<VideoBlockEntity, _>(txn, VideoBlockColumn::Id, &plan.videos.delete).await?;
    for draft in &plan.videos.insert {
        store::insert_video(txn, progress_id, draft).await?;
    }

    // Images
    store::delete_by_ids::<ImageBlockEntity, _>(txn, ImageBlockColumn::Id, &plan.images.delete).await?;
    removed.extend(
        plan.images
            .delete
            .iter()
            .filter_map(|id| stored.image_path(*id).map(String::from)),
    );
    for (id, draft) in &plan.images.update {
        store::update_image(txn, *id, draft).await?;
        if draft.stored_path.is_some() {
            removed.extend(stored.image_path(*id).map(String::from));
        }
    }
    for draft in &plan.images.insert {
        store::insert_image(txn, progress_id, draft).await?;
    }

    // Maps
    store::delete_by_ids::<MapBlockEntity, _>(txn, MapBlockColumn::Id, &plan.maps.delete).await?;
    for draft in &plan.maps.insert {
        store::insert_map(txn, progress_id, draft).await?;
    }

    Ok(removed)
}

/// Delete a progress row with all its blocks; returns image paths and block count
async fn delete_progress_rows(txn: &DatabaseTransaction, progress_id: i32) -> Result<(Vec<String>, usize)> {
    let stored = store::fetch_blocks(txn, progress_id).await?;
    let count = stored.text.len() + stored.videos.len() + stored.images.len() + stored.maps.len();

    let paths = store::delete_all_blocks(txn, progress_id).await?;
    ProgressEntity::delete_by_id(progress_id).exec(txn).await?;

    Ok((paths, count))
}
