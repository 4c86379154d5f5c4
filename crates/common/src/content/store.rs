//! Row-level access to the four block tables.
//!
//! Every function is generic over `ConnectionTrait` so it runs the same on a
//! pooled connection and inside a transaction.

use crate::content::reconcile::{ImageDraft, MapDraft, StoredIds, TextDraft, VideoDraft};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    QuerySelect, Set, Unchanged,
};

/// Every stored block of one progress, each kind ordered by position then id
#[derive(Debug, Clone, Default)]
pub struct StoredBlocks {
    pub text: Vec<TextBlockRow>,
    pub videos: Vec<VideoBlockRow>,
    pub images: Vec<ImageBlockRow>,
    pub maps: Vec<MapBlockRow>,
}

impl StoredBlocks {
    pub fn ids(&self) -> StoredIds {
        StoredIds {
            text: self.text.iter().map(|r| r.id).collect(),
            videos: self.videos.iter().map(|r| r.id).collect(),
            images: self.images.iter().map(|r| r.id).collect(),
            maps: self.maps.iter().map(|r| r.id).collect(),
        }
    }

    /// Stored file of an image row
    pub fn image_path(&self, id: i32) -> Option<&str> {
        self.images
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.image.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.videos.is_empty() && self.images.is_empty() && self.maps.is_empty()
    }
}

pub async fn fetch_blocks<C: ConnectionTrait>(conn: &C, progress_id: i32) -> Result<StoredBlocks> {
    let text = TextBlockEntity::find()
        .filter(TextBlockColumn::ProgressId.eq(progress_id))
        .order_by_asc(TextBlockColumn::IndexOrder)
        .order_by_asc(TextBlockColumn::Id)
        .all(conn)
        .await?;

    let videos = VideoBlockEntity::find()
        .filter(VideoBlockColumn::ProgressId.eq(progress_id))
        .order_by_asc(VideoBlockColumn::IndexOrder)
        .order_by_asc(VideoBlockColumn::Id)
        .all(conn)
        .await?;

    let images = ImageBlockEntity::find()
        .filter(ImageBlockColumn::ProgressId.eq(progress_id))
        .order_by_asc(ImageBlockColumn::IndexOrder)
        .order_by_asc(ImageBlockColumn::Id)
        .all(conn)
        .await?;

    let maps = MapBlockEntity::find()
        .filter(MapBlockColumn::ProgressId.eq(progress_id))
        .order_by_asc(MapBlockColumn::IndexOrder)
        .order_by_asc(MapBlockColumn::Id)
        .all(conn)
        .await?;

    Ok(StoredBlocks {
        text,
        videos,
        images,
        maps,
    })
}

/// Delete every block row of a progress and return the image paths that were referenced
pub async fn delete_all_blocks<C: ConnectionTrait>(conn: &C, progress_id: i32) -> Result<Vec<String>> {
    let image_paths: Vec<String> = ImageBlockEntity::find()
        .select_only()
        .column(ImageBlockColumn::Image)
        .filter(ImageBlockColumn::ProgressId.eq(progress_id))
        .order_by_asc(ImageBlockColumn::Id)
        .into_tuple()
        .all(conn)
        .await?;

    TextBlockEntity::delete_many()
        .filter(TextBlockColumn::ProgressId.eq(progress_id))
        .exec(conn)
        .await?;
    VideoBlockEntity::delete_many()
        .filter(VideoBlockColumn::ProgressId.eq(progress_id))
        .exec(conn)
        .await?;
    ImageBlockEntity::delete_many()
        .filter(ImageBlockColumn::ProgressId.eq(progress_id))
        .exec(conn)
        .await?;
    MapBlockEntity::delete_many()
        .filter(MapBlockColumn::ProgressId.eq(progress_id))
        .exec(conn)
        .await?;

    Ok(image_paths)
}

/// Delete rows of one block table by id
pub async fn delete_by_ids<E, C>(conn: &C, column: E::Column, ids: &[i32]) -> Result<u64>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(0);
    }

    let result = E::delete_many()
        .filter(column.is_in(ids.iter().copied()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub async fn insert_text<C: ConnectionTrait>(conn: &C, progress_id: i32, draft: &TextDraft) -> Result<i32> {
    let row = TextBlockActiveModel {
        id: NotSet,
        progress_id: Set(progress_id),
        text_editor_id: Set(draft.text_editor_id.clone()),
        text_editor_en: Set(draft.text_editor_en.clone()),
        index_order: Set(draft.position),
    }
    .insert(conn)
    .await?;
    Ok(row.id)
}

pub async fn update_text<C: ConnectionTrait>(conn: &C, id: i32, draft: &TextDraft) -> Result<()> {
    TextBlockActiveModel {
        id: Unchanged(id),
        progress_id: NotSet,
        text_editor_id: Set(draft.text_editor_id.clone()),
        text_editor_en: Set(draft.text_editor_en.clone()),
        index_order: Set(draft.position),
    }
    .update(conn)
    .await?;
    Ok(())
}

pub async fn insert_video<C: ConnectionTrait>(conn: &C, progress_id: i32, draft: &VideoDraft) -> Result<i32> {
    let row = VideoBlockActiveModel {
        id: NotSet,
        progress_id: Set(progress_id),
        youtube_link: Set(draft.youtube_link.clone()),
        index_order: Set(draft.position),
    }
    .insert(conn)
    .await?;
    Ok(row.id)
}

/// Insert a new image entry; its file must already be stored
pub async fn insert_image<C: ConnectionTrait>(conn: &C, progress_id: i32, draft: &ImageDraft) -> Result<i32> {
    let image = draft.stored_path.clone().ok_or_else(|| AppError::Internal {
        message: "image entry inserted before its file was stored".to_string(),
    })?;

    let row = ImageBlockActiveModel {
        id: NotSet,
        progress_id: Set(progress_id),
        image: Set(image),
        keterangan: Set(draft.keterangan.clone()),
        caption: Set(draft.caption.clone()),
        index_order: Set(draft.position),
    }
    .insert(conn)
    .await?;
    Ok(row.id)
}

/// Update an image entry; the file column only changes when a new file was stored
pub async fn update_image<C: ConnectionTrait>(conn: &C, id: i32, draft: &ImageDraft) -> Result<()> {
    ImageBlockActiveModel {
        id: Unchanged(id),
        progress_id: NotSet,
        image: match &draft.stored_path {
            Some(path) => Set(path.clone()),
            None => NotSet,
        },
        keterangan: Set(draft.keterangan.clone()),
        caption: Set(draft.caption.clone()),
        index_order: Set(draft.position),
    }
    .update(conn)
    .await?;
    Ok(())
}

pub async fn insert_map<C: ConnectionTrait>(conn: &C, progress_id: i32, draft: &MapDraft) -> Result<i32> {
    let row = MapBlockActiveModel {
        id: NotSet,
        progress_id: Set(progress_id),
        latitude: Set(draft.coordinates.latitude),
        longitude: Set(draft.coordinates.longitude),
        zoom: Set(draft.coordinates.zoom),
        map_link: Set(draft.map_link.clone()),
        index_order: Set(draft.position),
    }
    .insert(conn)
    .await?;
    Ok(row.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::links::MapCoordinates;
    use crate::db::testing::memory_pool;
    use crate::db::{Repository, ResearchFields};

    async fn seeded_progress(pool: &crate::db::DbPool) -> i32 {
        let repo = Repository::new(pool.clone());
        let research = repo
            .create_research(ResearchFields {
                judul: "Riset".into(),
                title: "Research".into(),
                deskripsi: String::new(),
                description: String::new(),
            })
            .await
            .unwrap();

        let now = chrono::Utc::now();
        let progress = ProgressActiveModel {
            id: NotSet,
            research_id: Set(research.id),
            judul_progres: Set("Tahap".into()),
            title_progress: Set("Stage".into()),
            ringkasan: Set(String::new()),
            summary: Set(String::new()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(pool.write())
        .await
        .unwrap();
        progress.id
    }

    fn image(position: i32, path: &str) -> ImageDraft {
        ImageDraft {
            field: format!("images[{position}_0]"),
            position,
            upload: None,
            stored_path: Some(path.to_string()),
            keterangan: None,
            caption: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_orders_by_position_then_id() {
        let pool = memory_pool().await;
        let progress_id = seeded_progress(&pool).await;
        let conn = pool.write();

        let late = insert_image(conn, progress_id, &image(2, "documentation/progress/b.png")).await.unwrap();
        let early = insert_image(conn, progress_id, &image(1, "documentation/progress/a.png")).await.unwrap();
        let tie = insert_image(conn, progress_id, &image(2, "documentation/progress/c.png")).await.unwrap();

        let stored = fetch_blocks(conn, progress_id).await.unwrap();
        let ids: Vec<_> = stored.images.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![early, late, tie]);
        assert_eq!(stored.image_path(tie), Some("documentation/progress/c.png"));
    }

    #[tokio::test]
    async fn test_update_image_keeps_file_without_new_upload() {
        let pool = memory_pool().await;
        let progress_id = seeded_progress(&pool).await;
        let conn = pool.write();

        let id = insert_image(conn, progress_id, &image(1, "documentation/progress/a.png")).await.unwrap();
        let mut edit = image(5, "unused");
        edit.stored_path = None;
        edit.caption = Some("Figure".into());
        update_image(conn, id, &edit).await.unwrap();

        let stored = fetch_blocks(conn, progress_id).await.unwrap();
        assert_eq!(stored.images[0].image, "documentation/progress/a.png");
        assert_eq!(stored.images[0].index_order, 5);
        assert_eq!(stored.images[0].caption.as_deref(), Some("Figure"));
    }

    #[tokio::test]
    async fn test_delete_all_blocks_returns_image_paths() {
        let pool = memory_pool().await;
        let progress_id = seeded_progress(&pool).await;
        let conn = pool.write();

        insert_text(
            conn,
            progress_id,
            &TextDraft {
                position: 1,
                text_editor_id: "<p>a</p>".into(),
                text_editor_en: String::new(),
            },
        )
        .await
        .unwrap();
        insert_map(
            conn,
            progress_id,
            &MapDraft {
                position: 2,
                coordinates: MapCoordinates::default(),
                map_link: None,
            },
        )
        .await
        .unwrap();
        insert_image(conn, progress_id, &image(3, "documentation/progress/a.png")).await.unwrap();

        let paths = delete_all_blocks(conn, progress_id).await.unwrap();
        assert_eq!(paths, vec!["documentation/progress/a.png".to_string()]);
        assert!(fetch_blocks(conn, progress_id).await.unwrap().is_empty());
    }
}
