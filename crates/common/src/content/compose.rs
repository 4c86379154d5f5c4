//! Merge the per-kind block rows into one ordered sequence

use crate::content::block::{Block, ImageEntry, ImageGroup, MapBlock, TextBlock, VideoBlock};
use crate::content::store::StoredBlocks;
use crate::db::models::{Progress, Research};
use serde::Serialize;

/// A progress entry with its blocks in display order
#[derive(Debug, Clone, Serialize)]
pub struct ComposedProgress {
    #[serde(flatten)]
    pub progress: Progress,
    pub research: Research,
    pub blocks: Vec<Block>,
}

/// Order all stored blocks by position.
///
/// The sort is stable over the fetch order (text, video, image, map, each
/// by id), so equal positions keep that order. Image rows sharing a
/// position become one group.
pub fn compose(stored: StoredBlocks, url_for: impl Fn(&str) -> String) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::with_capacity(
        stored.text.len() + stored.videos.len() + stored.images.len() + stored.maps.len(),
    );

    blocks.extend(stored.text.into_iter().map(|row| Block::Text(TextBlock::from(row))));
    blocks.extend(stored.videos.into_iter().map(|row| Block::Video(VideoBlock::from(row))));

    let mut group: Option<ImageGroup> = None;
    for row in stored.images {
        let position = row.index_order;
        let url = url_for(&row.image);
        let entry = ImageEntry::from_row(row, url);
        match group.as_mut() {
            Some(current) if current.index_order == position => current.images.push(entry),
            _ => {
                if let Some(done) = group.take() {
                    blocks.push(Block::ImageGroup(done));
                }
                group = Some(ImageGroup {
                    index_order: position,
                    images: vec![entry],
                });
            }
        }
    }
    if let Some(done) = group {
        blocks.push(Block::ImageGroup(done));
    }

    blocks.extend(stored.maps.into_iter().map(|row| Block::Map(MapBlock::from(row))));

    blocks.sort_by_key(Block::position);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::block::BlockKind;
    use crate::db::models::{ImageBlockRow, MapBlockRow, TextBlockRow, VideoBlockRow};

    fn text(id: i32, index_order: i32) -> TextBlockRow {
        TextBlockRow {
            id,
            progress_id: 1,
            text_editor_id: format!("<p>teks {id}</p>"),
            text_editor_en: format!("<p>text {id}</p>"),
            index_order,
        }
    }

    fn video(id: i32, index_order: i32) -> VideoBlockRow {
        VideoBlockRow {
            id,
            progress_id: 1,
            youtube_link: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".into(),
            index_order,
        }
    }

    fn image(id: i32, index_order: i32) -> ImageBlockRow {
        ImageBlockRow {
            id,
            progress_id: 1,
            image: format!("documentation/progress/{id}.png"),
            keterangan: None,
            caption: Some(format!("Figure {id}")),
            index_order,
        }
    }

    fn map(id: i32, index_order: i32) -> MapBlockRow {
        MapBlockRow {
            id,
            progress_id: 1,
            latitude: Some(-6.2),
            longitude: Some(106.8),
            zoom: Some(12),
            map_link: None,
            index_order,
        }
    }

    fn url(path: &str) -> String {
        format!("/storage/{path}")
    }

    #[test]
    fn test_compose_groups_images_by_position() {
        let stored = StoredBlocks {
            text: vec![text(1, 1)],
            videos: vec![video(1, 2)],
            images: vec![image(1, 3), image(2, 3)],
            maps: Vec::new(),
        };

        let blocks = compose(stored, url);
        assert_eq!(blocks.len(), 3);
        assert_eq!(
            blocks.iter().map(Block::kind).collect::<Vec<_>>(),
            vec![BlockKind::Text, BlockKind::Video, BlockKind::Image]
        );

        match &blocks[1] {
            Block::Video(v) => assert_eq!(v.youtube_id.as_deref(), Some("dQw4w9WgXcQ")),
            other => panic!("unexpected block {other:?}"),
        }
        match &blocks[2] {
            Block::ImageGroup(group) => {
                assert_eq!(group.images.len(), 2);
                assert_eq!(group.images[0].url, "/storage/documentation/progress/1.png");
            }
            other => panic!("unexpected block {other:?}"),
        }
    }

    #[test]
    fn test_equal_positions_keep_fetch_order() {
        let stored = StoredBlocks {
            text: vec![text(4, 2), text(9, 2)],
            videos: vec![video(1, 2)],
            images: vec![image(3, 2)],
            maps: vec![map(1, 1)],
        };

        let blocks = compose(stored, url);
        let order: Vec<_> = blocks.iter().map(|b| (b.kind(), b.position())).collect();
        assert_eq!(
            order,
            vec![
                (BlockKind::Map, 1),
                (BlockKind::Text, 2),
                (BlockKind::Text, 2),
                (BlockKind::Video, 2),
                (BlockKind::Image, 2),
            ]
        );
        match (&blocks[1], &blocks[2]) {
            (Block::Text(a), Block::Text(b)) => assert!(a.id < b.id),
            other => panic!("unexpected blocks {other:?}"),
        }
    }

    #[test]
    fn test_image_groups_split_on_position_change() {
        let stored = StoredBlocks {
            images: vec![image(1, 1), image(2, 4), image(3, 4)],
            ..Default::default()
        };

        let blocks = compose(stored, url);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].position(), 1);
        assert_eq!(blocks[1].position(), 4);
    }

    #[test]
    fn test_compose_empty() {
        assert!(compose(StoredBlocks::default(), url).is_empty());
    }
}
