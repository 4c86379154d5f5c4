//! Multipart form decoding
//!
//! Progress forms use bracketed keys such as `videos[0][youtube_link]` or
//! `images[1_0][caption]`. Groups keep the order in which their first field
//! arrived; that order is the submission sequence of each block.

use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::StatusCode,
};
use labsite_common::{
    content::{
        BlockInput, ImageInput, MapInput, ProgressSubmission, SubmittedBlock, TextInput,
        VideoInput,
    },
    errors::{AppError, Result},
    materials::MaterialSubmission,
    storage::Upload,
};
use std::collections::HashMap;

/// One decoded multipart part
#[derive(Debug, Clone)]
pub enum FormValue {
    Text(String),
    File(Upload),
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

impl FormField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, upload: Upload) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File(upload),
        }
    }
}

/// Drain a multipart body. Parts with a file name are read as uploads.
pub async fn read_fields(mut multipart: Multipart) -> Result<Vec<FormField>> {
    let mut fields = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name.is_empty() {
            continue;
        }

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                fields.push(FormField::file(
                    name,
                    Upload::new(Some(file_name), content_type, bytes.to_vec()),
                ));
            }
            None => {
                let text = field.text().await.map_err(multipart_error)?;
                fields.push(FormField::text(name, text));
            }
        }
    }

    Ok(fields)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge {
            message: err.body_text(),
        }
    } else {
        AppError::InvalidFormat {
            message: err.body_text(),
        }
    }
}

/// Split `prefix[group][attr]`
fn parse_key(name: &str) -> Option<(&str, &str, &str)> {
    let (prefix, rest) = name.split_once('[')?;
    let (group, rest) = rest.split_once("][")?;
    let attr = rest.strip_suffix(']')?;
    if prefix.is_empty() || group.is_empty() || attr.is_empty() || attr.contains(['[', ']']) {
        return None;
    }
    Some((prefix, group, attr))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GroupKind {
    Text,
    Video,
    Image,
    Map,
}

impl GroupKind {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "text_editors" => Some(GroupKind::Text),
            "videos" => Some(GroupKind::Video),
            "images" => Some(GroupKind::Image),
            "maps" => Some(GroupKind::Map),
            _ => None,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            GroupKind::Text => "text_editors",
            GroupKind::Video => "videos",
            GroupKind::Image => "images",
            GroupKind::Map => "maps",
        }
    }
}

#[derive(Debug, Default)]
struct EntryBuilder {
    key: String,
    text: HashMap<String, String>,
    upload: Option<Upload>,
}

impl EntryBuilder {
    fn take(&mut self, attr: &str) -> Option<String> {
        self.text.remove(attr)
    }
}

#[derive(Debug)]
struct GroupBuilder {
    kind: GroupKind,
    key: String,
    /// Image groups hold several entries; other kinds use exactly one
    entries: Vec<EntryBuilder>,
}

impl GroupBuilder {
    fn entry(&mut self, key: &str) -> &mut EntryBuilder {
        let index = match self.entries.iter().position(|e| e.key == key) {
            Some(index) => index,
            None => {
                self.entries.push(EntryBuilder {
                    key: key.to_string(),
                    ..Default::default()
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }

    fn field(&self) -> String {
        format!("{}[{}]", self.kind.prefix(), self.key)
    }

    fn into_block(mut self) -> SubmittedBlock {
        let field = self.field();
        // Image entries keep their own copy so conflicting values can be reported
        let index_order = self
            .entries
            .iter()
            .find_map(|e| e.text.get("index_order").filter(|v| !v.trim().is_empty()).cloned());

        let input = match self.kind {
            GroupKind::Image => BlockInput::Image(
                self.entries
                    .into_iter()
                    .map(|mut entry| ImageInput {
                        field: format!("images[{}_{}]", self.key, entry.key),
                        id: entry.take("id"),
                        upload: entry.upload.take(),
                        keterangan: entry.take("keterangan"),
                        caption: entry.take("caption"),
                        index_order: entry.take("index_order"),
                    })
                    .collect(),
            ),
            kind => {
                let mut entry = self.entries.pop().unwrap_or_default();
                match kind {
                    GroupKind::Text => BlockInput::Text(TextInput {
                        id: entry.take("id"),
                        text_editor_id: entry.take("text_editor_id"),
                        text_editor_en: entry.take("text_editor_en"),
                    }),
                    GroupKind::Video => BlockInput::Video(VideoInput {
                        id: entry.take("id"),
                        youtube_link: entry.take("youtube_link"),
                    }),
                    _ => BlockInput::Map(MapInput {
                        id: entry.take("id"),
                        latitude: entry.take("latitude"),
                        longitude: entry.take("longitude"),
                        zoom: entry.take("zoom"),
                        map_link: entry.take("map_link"),
                    }),
                }
            }
        };

        SubmittedBlock {
            field,
            index_order,
            input,
        }
    }
}

/// Assemble a progress submission from decoded form fields
pub fn progress_submission(fields: Vec<FormField>) -> ProgressSubmission {
    let mut submission = ProgressSubmission::default();
    let mut groups: Vec<GroupBuilder> = Vec::new();
    let mut positions: HashMap<(GroupKind, String), usize> = HashMap::new();

    for FormField { name, value } in fields {
        match (name.as_str(), value) {
            ("judul_progres", FormValue::Text(text)) => submission.judul_progres = Some(text),
            ("title_progress", FormValue::Text(text)) => submission.title_progress = Some(text),
            (name, value) => {
                let Some((prefix, group, attr)) = parse_key(name) else {
                    continue;
                };
                let Some(kind) = GroupKind::from_prefix(prefix) else {
                    continue;
                };

                // Empty file inputs are sent as zero-byte parts; they carry nothing
                if matches!(&value, FormValue::File(upload) if upload.is_empty()) {
                    continue;
                }

                let (group_key, entry_key) = match kind {
                    GroupKind::Image => group.split_once('_').unwrap_or((group, "0")),
                    _ => (group, "0"),
                };

                let index = *positions
                    .entry((kind, group_key.to_string()))
                    .or_insert_with(|| {
                        groups.push(GroupBuilder {
                            kind,
                            key: group_key.to_string(),
                            entries: Vec::new(),
                        });
                        groups.len() - 1
                    });

                let entry = groups[index].entry(entry_key);
                match value {
                    FormValue::File(upload) => entry.upload = Some(upload),
                    FormValue::Text(text) => {
                        entry.text.insert(attr.to_string(), text);
                    }
                }
            }
        }
    }

    submission.blocks = groups.into_iter().map(GroupBuilder::into_block).collect();
    submission
}

/// Assemble a lecturer material submission from decoded form fields
pub fn material_submission(fields: Vec<FormField>) -> MaterialSubmission {
    let mut submission = MaterialSubmission::default();

    for FormField { name, value } in fields {
        match (name.as_str(), value) {
            ("judul", FormValue::Text(text)) => submission.judul = Some(text),
            ("title", FormValue::Text(text)) => submission.title = Some(text),
            ("type", FormValue::Text(text)) => submission.material_type = Some(text),
            ("video_link", FormValue::Text(text)) => submission.video_link = Some(text),
            ("file", FormValue::File(upload)) if !upload.is_empty() => submission.file = Some(upload),
            _ => {}
        }
    }

    submission
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, bytes: &[u8]) -> FormField {
        FormField::file(name, Upload::new(Some("photo.png".into()), Some("image/png".into()), bytes.to_vec()))
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("videos[0][youtube_link]"), Some(("videos", "0", "youtube_link")));
        assert_eq!(parse_key("images[2_1][image]"), Some(("images", "2_1", "image")));
        assert_eq!(parse_key("judul_progres"), None);
        assert_eq!(parse_key("videos[0]"), None);
        assert_eq!(parse_key("videos[0][a][b]"), None);
    }

    #[test]
    fn test_groups_follow_first_appearance() {
        let submission = progress_submission(vec![
            FormField::text("judul_progres", "Tahap Satu"),
            FormField::text("videos[3][youtube_link]", "https://youtu.be/dQw4w9WgXcQ"),
            FormField::text("text_editors[0][text_editor_id]", "<p>Halo</p>"),
            FormField::text("videos[3][index_order]", "5"),
            FormField::text("text_editors[0][text_editor_en]", "<p>Hello</p>"),
            FormField::text("maps[0][map_link]", "https://maps.google.com/@1,2,3z"),
            FormField::text("title_progress", "Stage One"),
            FormField::text("unknown[0][x]", "ignored"),
        ]);

        assert_eq!(submission.judul_progres.as_deref(), Some("Tahap Satu"));
        assert_eq!(submission.title_progress.as_deref(), Some("Stage One"));

        let fields: Vec<_> = submission.blocks.iter().map(|b| b.field.as_str()).collect();
        assert_eq!(fields, vec!["videos[3]", "text_editors[0]", "maps[0]"]);
        assert_eq!(submission.blocks[0].index_order.as_deref(), Some("5"));

        match &submission.blocks[1].input {
            BlockInput::Text(text) => {
                assert_eq!(text.text_editor_id.as_deref(), Some("<p>Halo</p>"));
                assert_eq!(text.text_editor_en.as_deref(), Some("<p>Hello</p>"));
            }
            other => panic!("unexpected input {other:?}"),
        }
    }

    #[test]
    fn test_image_entries_grouped_by_prefix() {
        let submission = progress_submission(vec![
            file("images[0_0][image]", b"a"),
            FormField::text("images[0_0][keterangan]", "Gambar A"),
            FormField::text("images[0_1][id]", "12"),
            FormField::text("images[0_1][caption]", "Figure B"),
            FormField::file("images[0_1][image]", Upload::new(Some(String::new()), None, Vec::new())),
            FormField::text("images[0_1][index_order]", "4"),
            file("images[1_0][image]", b"c"),
        ]);

        assert_eq!(submission.blocks.len(), 2);
        let first = &submission.blocks[0];
        match &first.input {
            BlockInput::Image(entries) => {
                assert_eq!(entries[0].index_order, None);
                assert_eq!(entries[1].index_order.as_deref(), Some("4"));
            }
            other => panic!("unexpected input {other:?}"),
        }
        assert_eq!(first.field, "images[0]");
        assert_eq!(first.index_order.as_deref(), Some("4"));

        match &first.input {
            BlockInput::Image(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].field, "images[0_0]");
                assert!(entries[0].upload.is_some());
                assert_eq!(entries[0].keterangan.as_deref(), Some("Gambar A"));
                assert_eq!(entries[1].id.as_deref(), Some("12"));
                assert!(entries[1].upload.is_none());
            }
            other => panic!("unexpected input {other:?}"),
        }
    }

    #[test]
    fn test_material_form() {
        let submission = material_submission(vec![
            FormField::text("judul", "Modul"),
            FormField::text("title", "Module"),
            FormField::text("type", "file"),
            FormField::file("file", Upload::new(Some(String::new()), None, Vec::new())),
        ]);

        assert_eq!(submission.material_type.as_deref(), Some("file"));
        assert!(submission.file.is_none());
    }
}
