//! Reconciliation of a submitted block set against the stored one.
//!
//! Planning is pure: it decides which rows to delete, update and insert
//! per kind, and derives the summary, without touching storage or the
//! database. Creating a progress is planning against an empty stored set.

use crate::content::block::BlockId;
use crate::content::links::MapCoordinates;
use crate::content::submission::{PlacedBlock, PlacedContent};
use crate::content::summary::BilingualSummary;
use crate::errors::{AppError, FieldErrors, Result};
use crate::metrics::BlockChanges;
use crate::storage::Upload;
use std::collections::HashSet;

/// Row changes for one block kind
#[derive(Debug, Clone, PartialEq)]
pub struct KindDiff<T> {
    pub delete: Vec<i32>,
    pub update: Vec<(i32, T)>,
    pub insert: Vec<T>,
}

impl<T> Default for KindDiff<T> {
    fn default() -> Self {
        Self {
            delete: Vec::new(),
            update: Vec::new(),
            insert: Vec::new(),
        }
    }
}

impl<T> KindDiff<T> {
    /// Drop every stored row and insert the submitted set
    pub fn replace_all(stored: &[i32], items: Vec<T>) -> Self {
        Self {
            delete: stored.to_vec(),
            update: Vec::new(),
            insert: items,
        }
    }

    pub fn changes(&self) -> BlockChanges {
        BlockChanges {
            inserted: self.insert.len(),
            updated: self.update.len(),
            deleted: self.delete.len(),
        }
    }
}

/// Match submitted items to stored rows by id.
///
/// A persisted id present in `stored` becomes an update; drafts and ids that
/// are not stored become inserts; stored ids nobody claimed are deleted.
pub fn diff_by_id<T>(stored: &[i32], submitted: Vec<(BlockId, T)>) -> KindDiff<T> {
    let stored_set: HashSet<i32> = stored.iter().copied().collect();
    let mut claimed = HashSet::new();
    let mut diff = KindDiff::default();

    for (id, item) in submitted {
        match id.persisted() {
            Some(id) if stored_set.contains(&id) && claimed.insert(id) => diff.update.push((id, item)),
            _ => diff.insert.push(item),
        }
    }

    diff.delete = stored
        .iter()
        .copied()
        .filter(|id| !claimed.contains(id))
        .collect();
    diff
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDraft {
    pub position: i32,
    pub text_editor_id: String,
    pub text_editor_en: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDraft {
    pub position: i32,
    pub youtube_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDraft {
    /// Form key the entry was submitted under
    pub field: String,
    pub position: i32,
    /// New file to store; `None` keeps the stored file of an updated entry
    pub upload: Option<Upload>,
    /// Set once `upload` has been written to storage
    pub stored_path: Option<String>,
    pub keterangan: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapDraft {
    pub position: i32,
    pub coordinates: MapCoordinates,
    pub map_link: Option<String>,
}

/// Row ids currently stored for a progress, per kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredIds {
    pub text: Vec<i32>,
    pub videos: Vec<i32>,
    pub images: Vec<i32>,
    pub maps: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    pub text: KindDiff<TextDraft>,
    pub videos: KindDiff<VideoDraft>,
    pub images: KindDiff<ImageDraft>,
    pub maps: KindDiff<MapDraft>,
    pub summary: BilingualSummary,
}

impl ReconcilePlan {
    pub fn changes(&self) -> BlockChanges {
        [
            self.text.changes(),
            self.videos.changes(),
            self.images.changes(),
            self.maps.changes(),
        ]
        .into_iter()
        .fold(BlockChanges::default(), |acc, c| BlockChanges {
            inserted: acc.inserted + c.inserted,
            updated: acc.updated + c.updated,
            deleted: acc.deleted + c.deleted,
        })
    }

    /// Every inserted image needs a file. This also catches persisted ids
    /// that are not stored for this progress and therefore become inserts.
    pub fn ensure_new_images_have_files(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        for draft in self.images.insert.iter().filter(|d| d.upload.is_none() && d.stored_path.is_none()) {
            errors.add(format!("{}[image]", draft.field), "is required for a new image");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation { errors })
        }
    }

    /// Image drafts that carry a file still to be stored
    pub fn pending_uploads(&mut self) -> impl Iterator<Item = &mut ImageDraft> + '_ {
        self.images
            .update
            .iter_mut()
            .map(|(_, draft)| draft)
            .chain(self.images.insert.iter_mut())
            .filter(|draft| draft.upload.is_some() && draft.stored_path.is_none())
    }
}

/// Summary source: the text block with the smallest position, ties broken
/// by submission order
pub fn summary_of(blocks: &[PlacedBlock]) -> BilingualSummary {
    blocks
        .iter()
        .filter_map(|block| match &block.content {
            PlacedContent::Text {
                text_editor_id,
                text_editor_en,
                ..
            } => Some(((block.position, block.sequence), text_editor_id, text_editor_en)),
            _ => None,
        })
        .min_by_key(|(key, _, _)| *key)
        .map(|(_, id, en)| BilingualSummary::from_bodies(id, en))
        .unwrap_or_default()
}

/// Plan the row changes that turn `stored` into the submitted block set
pub fn plan(stored: &StoredIds, blocks: Vec<PlacedBlock>) -> ReconcilePlan {
    let summary = summary_of(&blocks);

    let mut text = Vec::new();
    let mut videos = Vec::new();
    let mut images = Vec::new();
    let mut maps = Vec::new();

    for block in blocks {
        let position = block.position;
        match block.content {
            PlacedContent::Text {
                id,
                text_editor_id,
                text_editor_en,
            } => text.push((
                id,
                TextDraft {
                    position,
                    text_editor_id,
                    text_editor_en,
                },
            )),
            PlacedContent::Video { youtube_link } => videos.push(VideoDraft {
                position,
                youtube_link,
            }),
            PlacedContent::Images(entries) => {
                images.extend(entries.into_iter().map(|entry| {
                    (
                        entry.id,
                        ImageDraft {
                            field: entry.field,
                            position,
                            upload: entry.upload,
                            stored_path: None,
                            keterangan: entry.keterangan,
                            caption: entry.caption,
                        },
                    )
                }));
            }
            PlacedContent::Map {
                coordinates,
                map_link,
            } => maps.push(MapDraft {
                position,
                coordinates,
                map_link,
            }),
        }
    }

    ReconcilePlan {
        text: diff_by_id(&stored.text, text),
        videos: KindDiff::replace_all(&stored.videos, videos),
        images: diff_by_id(&stored.images, images),
        maps: KindDiff::replace_all(&stored.maps, maps),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::submission::PlacedImage;

    fn text_block(position: i32, sequence: usize, id: BlockId, body: &str) -> PlacedBlock {
        PlacedBlock {
            position,
            sequence,
            content: PlacedContent::Text {
                id,
                text_editor_id: body.to_string(),
                text_editor_en: String::new(),
            },
        }
    }

    #[test]
    fn test_diff_updates_persisted_and_inserts_drafts() {
        let diff = diff_by_id(
            &[5, 8],
            vec![
                (BlockId::Persisted(5), "edited"),
                (BlockId::Draft("1718000000000".into()), "new"),
            ],
        );

        assert_eq!(diff.update, vec![(5, "edited")]);
        assert_eq!(diff.insert, vec!["new"]);
        assert_eq!(diff.delete, vec![8]);
    }

    #[test]
    fn test_foreign_persisted_id_is_inserted() {
        let diff = diff_by_id(&[1], vec![(BlockId::Persisted(99), "x")]);
        assert!(diff.update.is_empty());
        assert_eq!(diff.insert, vec!["x"]);
        assert_eq!(diff.delete, vec![1]);
    }

    #[test]
    fn test_plan_edits_text_and_replaces_videos() {
        let stored = StoredIds {
            text: vec![5],
            videos: vec![2, 3],
            ..Default::default()
        };
        let blocks = vec![
            text_block(1, 0, BlockId::Persisted(5), "<p>edited</p>"),
            text_block(2, 1, BlockId::Draft(String::new()), "<p>new</p>"),
            PlacedBlock {
                position: 3,
                sequence: 2,
                content: PlacedContent::Video {
                    youtube_link: "https://youtu.be/dQw4w9WgXcQ".into(),
                },
            },
        ];

        let plan = plan(&stored, blocks);
        assert_eq!(plan.text.update.len(), 1);
        assert_eq!(plan.text.update[0].0, 5);
        assert_eq!(plan.text.insert.len(), 1);
        assert!(plan.text.delete.is_empty());
        assert_eq!(plan.videos.delete, vec![2, 3]);
        assert_eq!(plan.videos.insert.len(), 1);
        assert_eq!(plan.summary.indonesian, "edited");
        assert_eq!(
            plan.changes(),
            BlockChanges {
                inserted: 2,
                updated: 1,
                deleted: 2
            }
        );
    }

    #[test]
    fn test_summary_uses_smallest_position() {
        let blocks = vec![
            text_block(3, 0, BlockId::Draft(String::new()), "<p>third</p>"),
            text_block(1, 1, BlockId::Draft(String::new()), "<p>Hello world</p>"),
            text_block(2, 2, BlockId::Draft(String::new()), "<p>second</p>"),
        ];
        assert_eq!(summary_of(&blocks).indonesian, "Hello world");
    }

    #[test]
    fn test_summary_ties_follow_submission_order() {
        let blocks = vec![
            text_block(1, 0, BlockId::Draft(String::new()), "<p>first</p>"),
            text_block(1, 1, BlockId::Draft(String::new()), "<p>second</p>"),
        ];
        assert_eq!(summary_of(&blocks).indonesian, "first");
        assert_eq!(summary_of(&[]), BilingualSummary::default());
    }

    #[test]
    fn test_image_entries_share_group_position() {
        let blocks = vec![PlacedBlock {
            position: 4,
            sequence: 0,
            content: PlacedContent::Images(vec![
                PlacedImage {
                    field: "images[0_0]".into(),
                    id: BlockId::Persisted(7),
                    upload: None,
                    keterangan: Some("lama".into()),
                    caption: None,
                },
                PlacedImage {
                    field: "images[0_1]".into(),
                    id: BlockId::Draft("x".into()),
                    upload: Some(Upload::new(Some("b.png".into()), None, b"png".to_vec())),
                    keterangan: None,
                    caption: None,
                },
            ]),
        }];

        let mut plan = plan(
            &StoredIds {
                images: vec![7, 9],
                ..Default::default()
            },
            blocks,
        );
        assert_eq!(plan.images.update[0].0, 7);
        assert_eq!(plan.images.update[0].1.position, 4);
        assert_eq!(plan.images.insert[0].position, 4);
        assert_eq!(plan.images.delete, vec![9]);
        assert_eq!(plan.pending_uploads().count(), 1);
        assert!(plan.ensure_new_images_have_files().is_ok());
    }

    #[test]
    fn test_unstored_image_id_without_file_is_rejected() {
        let blocks = vec![PlacedBlock {
            position: 1,
            sequence: 0,
            content: PlacedContent::Images(vec![PlacedImage {
                field: "images[0_0]".into(),
                id: BlockId::Persisted(42),
                upload: None,
                keterangan: None,
                caption: None,
            }]),
        }];

        let plan = plan(
            &StoredIds {
                images: vec![7],
                ..Default::default()
            },
            blocks,
        );
        assert_eq!(plan.images.insert.len(), 1);

        let err = plan.ensure_new_images_have_files().unwrap_err();
        let errors = err.field_errors().unwrap();
        assert!(errors.contains("images[0_0][image]"));
    }
}
