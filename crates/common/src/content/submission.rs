//! Submitted progress forms and their validation.
//!
//! A `ProgressSubmission` holds the raw, string-typed groups exactly as the
//! multipart form delivered them, in first-appearance order. `validate`
//! turns it into a `ValidatedProgress` with every block placed at a
//! concrete position, or a field-keyed error map. Nothing is written before
//! validation has passed.

use crate::content::block::BlockId;
use crate::content::links::{self, MapCoordinates};
use crate::errors::{AppError, FieldErrors, Result};
use crate::storage::Upload;
use std::collections::HashSet;

/// Raw progress form
#[derive(Debug, Clone, Default)]
pub struct ProgressSubmission {
    pub judul_progres: Option<String>,
    pub title_progress: Option<String>,
    /// Groups in the order they first appeared in the form
    pub blocks: Vec<SubmittedBlock>,
}

/// One group of the form, e.g. everything under `videos[0]`
#[derive(Debug, Clone)]
pub struct SubmittedBlock {
    /// Form key of the group, used to address validation errors
    pub field: String,
    pub index_order: Option<String>,
    pub input: BlockInput,
}

#[derive(Debug, Clone)]
pub enum BlockInput {
    Text(TextInput),
    Video(VideoInput),
    /// Entries sharing one position
    Image(Vec<ImageInput>),
    Map(MapInput),
}

#[derive(Debug, Clone, Default)]
pub struct TextInput {
    pub id: Option<String>,
    pub text_editor_id: Option<String>,
    pub text_editor_en: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VideoInput {
    pub id: Option<String>,
    pub youtube_link: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ImageInput {
    /// Form key of the entry, e.g. `images[0_1]`
    pub field: String,
    pub id: Option<String>,
    pub upload: Option<Upload>,
    pub keterangan: Option<String>,
    pub caption: Option<String>,
    /// Position sent with this entry. Every entry of a group must agree.
    pub index_order: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MapInput {
    pub id: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub zoom: Option<String>,
    pub map_link: Option<String>,
}

/// A progress form that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedProgress {
    pub judul_progres: String,
    pub title_progress: String,
    pub blocks: Vec<PlacedBlock>,
}

#[derive(Debug, Clone)]
pub struct PlacedBlock {
    pub position: i32,
    /// Zero-based submission order
    pub sequence: usize,
    pub content: PlacedContent,
}

#[derive(Debug, Clone)]
pub enum PlacedContent {
    Text {
        id: BlockId,
        text_editor_id: String,
        text_editor_en: String,
    },
    Video {
        youtube_link: String,
    },
    Images(Vec<PlacedImage>),
    Map {
        coordinates: MapCoordinates,
        map_link: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct PlacedImage {
    /// Form key of the entry, e.g. `images[0_1]`
    pub field: String,
    pub id: BlockId,
    pub upload: Option<Upload>,
    pub keterangan: Option<String>,
    pub caption: Option<String>,
}

impl ProgressSubmission {
    /// Check the whole form and place every block.
    ///
    /// Blocks without an explicit `index_order` are placed at `sequence + 1`.
    pub fn validate(self) -> Result<ValidatedProgress> {
        let mut errors = FieldErrors::new();

        let judul_progres = required(&mut errors, "judul_progres", self.judul_progres);
        let title_progress = required(&mut errors, "title_progress", self.title_progress);

        let mut seen_text_ids = HashSet::new();
        let mut seen_image_ids = HashSet::new();
        let mut blocks = Vec::with_capacity(self.blocks.len());

        for (sequence, block) in self.blocks.into_iter().enumerate() {
            let position = match non_blank(block.index_order) {
                None => sequence as i32 + 1,
                Some(raw) => match raw.parse::<i32>() {
                    Ok(position) => position,
                    Err(_) => {
                        errors.add(format!("{}[index_order]", block.field), "must be an integer");
                        continue;
                    }
                },
            };

            let content = match block.input {
                BlockInput::Text(input) => {
                    let id = BlockId::from_wire(input.id.as_deref());
                    if let Some(persisted) = id.persisted() {
                        if !seen_text_ids.insert(persisted) {
                            errors.add(format!("{}[id]", block.field), "is submitted more than once");
                        }
                    }
                    PlacedContent::Text {
                        id,
                        text_editor_id: input.text_editor_id.unwrap_or_default(),
                        text_editor_en: input.text_editor_en.unwrap_or_default(),
                    }
                }
                BlockInput::Video(input) => {
                    let key = format!("{}[youtube_link]", block.field);
                    match non_blank(input.youtube_link) {
                        Some(youtube_link) => PlacedContent::Video { youtube_link },
                        None => {
                            errors.add(key, "is required");
                            continue;
                        }
                    }
                }
                BlockInput::Image(entries) => {
                    if entries.is_empty() {
                        errors.add(block.field.clone(), "must contain at least one image");
                        continue;
                    }
                    let positions: HashSet<String> = entries
                        .iter()
                        .filter_map(|e| non_blank(e.index_order.clone()))
                        .collect();
                    if positions.len() > 1 {
                        errors.add(
                            format!("{}[index_order]", block.field),
                            "differs between entries of the same image group",
                        );
                    }

                    let mut images = Vec::with_capacity(entries.len());
                    for entry in entries {
                        let id = BlockId::from_wire(entry.id.as_deref());
                        let upload = entry.upload.filter(|u| !u.is_empty());

                        if let Some(persisted) = id.persisted() {
                            if !seen_image_ids.insert(persisted) {
                                errors.add(format!("{}[id]", entry.field), "is submitted more than once");
                            }
                        } else if upload.is_none() {
                            errors.add(format!("{}[image]", entry.field), "is required for a new image");
                        }

                        images.push(PlacedImage {
                            field: entry.field,
                            id,
                            upload,
                            keterangan: non_blank(entry.keterangan),
                            caption: non_blank(entry.caption),
                        });
                    }
                    PlacedContent::Images(images)
                }
                BlockInput::Map(input) => {
                    let explicit = MapCoordinates {
                        latitude: number(&mut errors, &block.field, "latitude", input.latitude, 90.0),
                        longitude: number(&mut errors, &block.field, "longitude", input.longitude, 180.0),
                        zoom: number(&mut errors, &block.field, "zoom", input.zoom, f64::from(i32::MAX))
                            .map(|z| z.round() as i32),
                    };
                    let map_link = non_blank(input.map_link);
                    PlacedContent::Map {
                        coordinates: links::resolve_map(map_link.as_deref(), explicit),
                        map_link,
                    }
                }
            };

            blocks.push(PlacedBlock {
                position,
                sequence,
                content,
            });
        }

        if !errors.is_empty() {
            return Err(AppError::Validation { errors });
        }

        Ok(ValidatedProgress {
            judul_progres: judul_progres.unwrap_or_default(),
            title_progress: title_progress.unwrap_or_default(),
            blocks,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(errors: &mut FieldErrors, field: &str, value: Option<String>) -> Option<String> {
    let value = non_blank(value);
    if value.is_none() {
        errors.add(field, "is required");
    }
    value
}

/// Optional decimal field with an absolute bound
fn number(
    errors: &mut FieldErrors,
    group: &str,
    name: &str,
    value: Option<String>,
    bound: f64,
) -> Option<f64> {
    let raw = non_blank(value)?;
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() && n.abs() <= bound => Some(n),
        Ok(_) => {
            errors.add(format!("{group}[{name}]"), "is out of range");
            None
        }
        Err(_) => {
            errors.add(format!("{group}[{name}]"), "must be a number");
            None
        }
    }
}
