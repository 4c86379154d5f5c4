//! Plain-text summary derived from rich-text bodies

use scraper::{Html, Selector};
use serde::Serialize;

/// Summary pair stored on the progress row (`ringkasan` / `summary`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BilingualSummary {
    pub indonesian: String,
    pub english: String,
}

impl BilingualSummary {
    pub fn from_bodies(indonesian_html: &str, english_html: &str) -> Self {
        Self {
            indonesian: first_paragraph(indonesian_html),
            english: first_paragraph(english_html),
        }
    }
}

/// Text of the first non-empty `<p>`, markup stripped and whitespace collapsed.
/// Bodies without paragraphs fall back to their first non-empty line.
pub fn first_paragraph(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let fragment = Html::parse_fragment(html);

    if let Ok(selector) = Selector::parse("p") {
        for paragraph in fragment.select(&selector) {
            let text = collapse_whitespace(&paragraph.text().collect::<String>());
            if !text.is_empty() {
                return text;
            }
        }
    }

    let text: String = fragment.root_element().text().collect();
    text.lines()
        .map(collapse_whitespace)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}

/// Text nodes must be joined before this runs, so inline markup inside a
/// word does not split it
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_paragraph_strips_tags() {
        assert_eq!(first_paragraph("<p>Hello world</p>"), "Hello world");
        assert_eq!(
            first_paragraph("<p>Hello <strong>bold</strong>\n world</p><p>Second</p>"),
            "Hello bold world"
        );
    }

    #[test]
    fn test_inline_markup_inside_words_is_joined() {
        assert_eq!(
            first_paragraph("<p>re<em>search</em> on H<sub>2</sub>O</p>"),
            "research on H2O"
        );
        assert_eq!(first_paragraph("<div>multi<b>part</b> line</div>"), "multipart line");
    }

    #[test]
    fn test_first_paragraph_skips_empty_paragraphs() {
        assert_eq!(first_paragraph("<p><br></p><p>&nbsp;</p><p>Isi</p>"), "Isi");
    }

    #[test]
    fn test_first_paragraph_decodes_entities() {
        assert_eq!(first_paragraph("<p>Tom &amp; Jerry</p>"), "Tom & Jerry");
    }

    #[test]
    fn test_plain_text_falls_back_to_first_line() {
        assert_eq!(first_paragraph("First line\n\nSecond"), "First line");
        assert_eq!(first_paragraph("<h2>Heading</h2>"), "Heading");
        assert_eq!(first_paragraph("   "), "");
        assert_eq!(first_paragraph(""), "");
    }

    #[test]
    fn test_bilingual_summary() {
        let summary = BilingualSummary::from_bodies("<p>Halo dunia</p>", "");
        assert_eq!(summary.indonesian, "Halo dunia");
        assert_eq!(summary.english, "");
    }
}
