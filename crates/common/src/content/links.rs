//! Parsing of external links: map coordinates and YouTube video ids

use regex_lite::Regex;
use std::sync::LazyLock;

/// `@<lat>,<lon>,<zoom>z` as found in map share links
static MAP_COORDINATES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(-?\d+(?:\.\d+)?),(-?\d+(?:\.\d+)?),(\d+(?:\.\d+)?)z").expect("valid map regex")
});

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/|live/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .expect("valid youtube regex")
});

/// Coordinates of a map block
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MapCoordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub zoom: Option<i32>,
}

/// Extract latitude, longitude and zoom from a map link
pub fn parse_map_link(link: &str) -> Option<MapCoordinates> {
    let captures = MAP_COORDINATES.captures(link)?;
    let latitude = captures.get(1)?.as_str().parse::<f64>().ok()?;
    let longitude = captures.get(2)?.as_str().parse::<f64>().ok()?;
    let zoom = captures.get(3)?.as_str().parse::<f64>().ok()?;

    Some(MapCoordinates {
        latitude: Some(latitude),
        longitude: Some(longitude),
        zoom: Some(zoom.round() as i32),
    })
}

/// Coordinates parsed from the link, or the explicit values when the link
/// is absent or does not match
pub fn resolve_map(link: Option<&str>, explicit: MapCoordinates) -> MapCoordinates {
    link.and_then(parse_map_link).unwrap_or(explicit)
}

/// The 11-character video id of a YouTube link
pub fn youtube_id(link: &str) -> Option<String> {
    YOUTUBE_ID
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_map_link() {
        let link = "https://www.google.com/maps/place/Monas/@-6.20876,106.84513,12z/data=!3m1";
        let coords = parse_map_link(link).unwrap();
        assert_eq!(coords.latitude, Some(-6.20876));
        assert_eq!(coords.longitude, Some(106.84513));
        assert_eq!(coords.zoom, Some(12));
    }

    #[test]
    fn test_parse_map_link_fractional_zoom() {
        let coords = parse_map_link("https://maps.app/@1.5,-2,15.75z").unwrap();
        assert_eq!(coords.latitude, Some(1.5));
        assert_eq!(coords.longitude, Some(-2.0));
        assert_eq!(coords.zoom, Some(16));
    }

    #[test]
    fn test_resolve_map_falls_back_to_explicit_values() {
        let explicit = MapCoordinates {
            latitude: Some(-7.25),
            longitude: Some(112.75),
            zoom: Some(10),
        };
        assert_eq!(resolve_map(Some("https://maps.google.com/?q=surabaya"), explicit), explicit);
        assert_eq!(resolve_map(None, explicit), explicit);
        assert_eq!(
            resolve_map(Some("not a map"), MapCoordinates::default()),
            MapCoordinates::default()
        );
    }

    #[test]
    fn test_youtube_id() {
        for link in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?t=10",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://youtube.com/shorts/dQw4w9WgXcQ",
        ] {
            assert_eq!(youtube_id(link).as_deref(), Some("dQw4w9WgXcQ"), "{link}");
        }
        assert_eq!(youtube_id("https://vimeo.com/1234"), None);
        assert_eq!(youtube_id(""), None);
    }
}
