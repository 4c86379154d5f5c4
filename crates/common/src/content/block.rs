//! Block identity and the composed (read-side) block shapes

use crate::content::links;
use crate::db::models::{ImageBlockRow, MapBlockRow, TextBlockRow, VideoBlockRow};
use serde::Serialize;

/// Wire ids at or above this value are client-side draft tokens (e.g. `Date.now()`)
pub const DRAFT_ID_THRESHOLD: i64 = 1_000_000_000;

/// Identity of a submitted block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockId {
    /// Row id of a stored block; may be used as an update target
    Persisted(i32),
    /// Not stored yet; the token is whatever the client sent (possibly empty)
    Draft(String),
}

impl BlockId {
    /// Interpret the optional `id` form field of a block group
    pub fn from_wire(raw: Option<&str>) -> Self {
        let raw = raw.map(str::trim).unwrap_or_default();
        match raw.parse::<i64>() {
            Ok(n) if n > 0 && n < DRAFT_ID_THRESHOLD => BlockId::Persisted(n as i32),
            _ => BlockId::Draft(raw.to_string()),
        }
    }

    pub fn persisted(&self) -> Option<i32> {
        match self {
            BlockId::Persisted(id) => Some(*id),
            BlockId::Draft(_) => None,
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, BlockId::Draft(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Video,
    Image,
    Map,
}

/// One logical entry of a composed progress, ordered by `index_order`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Text(TextBlock),
    Video(VideoBlock),
    #[serde(rename = "image")]
    ImageGroup(ImageGroup),
    Map(MapBlock),
}

impl Block {
    pub fn position(&self) -> i32 {
        match self {
            Block::Text(b) => b.index_order,
            Block::Video(b) => b.index_order,
            Block::ImageGroup(b) => b.index_order,
            Block::Map(b) => b.index_order,
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Text(_) => BlockKind::Text,
            Block::Video(_) => BlockKind::Video,
            Block::ImageGroup(_) => BlockKind::Image,
            Block::Map(_) => BlockKind::Map,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextBlock {
    pub id: i32,
    pub index_order: i32,
    pub text_editor_id: String,
    pub text_editor_en: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoBlock {
    pub id: i32,
    pub index_order: i32,
    pub youtube_link: String,
    /// Absent when the link is not a recognizable YouTube URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageGroup {
    pub index_order: i32,
    pub images: Vec<ImageEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageEntry {
    pub id: i32,
    pub image: String,
    pub url: String,
    pub keterangan: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapBlock {
    pub id: i32,
    pub index_order: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub zoom: Option<i32>,
    pub map_link: Option<String>,
}

impl From<TextBlockRow> for TextBlock {
    fn from(row: TextBlockRow) -> Self {
        Self {
            id: row.id,
            index_order: row.index_order,
            text_editor_id: row.text_editor_id,
            text_editor_en: row.text_editor_en,
        }
    }
}

impl From<VideoBlockRow> for VideoBlock {
    fn from(row: VideoBlockRow) -> Self {
        Self {
            id: row.id,
            index_order: row.index_order,
            youtube_id: links::youtube_id(&row.youtube_link),
            youtube_link: row.youtube_link,
        }
    }
}

impl From<MapBlockRow> for MapBlock {
    fn from(row: MapBlockRow) -> Self {
        Self {
            id: row.id,
            index_order: row.index_order,
            latitude: row.latitude,
            longitude: row.longitude,
            zoom: row.zoom,
            map_link: row.map_link,
        }
    }
}

impl ImageEntry {
    pub fn from_row(row: ImageBlockRow, url: String) -> Self {
        Self {
            id: row.id,
            image: row.image,
            url,
            keterangan: row.keterangan,
            caption: row.caption,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id_from_wire() {
        assert_eq!(BlockId::from_wire(Some("5")), BlockId::Persisted(5));
        assert_eq!(BlockId::from_wire(Some(" 12 ")), BlockId::Persisted(12));
        assert_eq!(
            BlockId::from_wire(Some("1718000000000")),
            BlockId::Draft("1718000000000".into())
        );
        assert_eq!(BlockId::from_wire(Some("1000000000")).persisted(), None);
        assert_eq!(BlockId::from_wire(Some("999999999")).persisted(), Some(999_999_999));
        assert!(BlockId::from_wire(None).is_draft());
        assert!(BlockId::from_wire(Some("")).is_draft());
        assert!(BlockId::from_wire(Some("0")).is_draft());
        assert!(BlockId::from_wire(Some("-4")).is_draft());
        assert!(BlockId::from_wire(Some("tmp-1")).is_draft());
    }

    #[test]
    fn test_block_serializes_with_kind_tag() {
        let block = Block::ImageGroup(ImageGroup {
            index_order: 3,
            images: vec![ImageEntry {
                id: 1,
                image: "documentation/progress/a.png".into(),
                url: "/storage/documentation/progress/a.png".into(),
                keterangan: Some("Gambar".into()),
                caption: None,
            }],
        });

        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["kind"], "image");
        assert_eq!(json["index_order"], 3);
        assert_eq!(json["images"][0]["keterangan"], "Gambar");
        assert_eq!(block.kind(), BlockKind::Image);
    }

    #[test]
    fn test_video_block_omits_unrecognized_youtube_id() {
        let block = Block::Video(VideoBlock {
            id: 2,
            index_order: 1,
            youtube_link: "https://vimeo.com/123".into(),
            youtube_id: None,
        });
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["kind"], "video");
        assert!(json.get("youtube_id").is_none());
    }
}
