//! Publications and their reference-style citation

use crate::db::models::Publication;
use crate::db::PublicationFields;
use serde::{Deserialize, Serialize};
use validator::Validate;

const DOI_RESOLVER: &str = "https://doi.org/";

/// Create / update request body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PublicationInput {
    #[validate(length(min = 1, max = 1000), custom(function = "crate::errors::not_blank"))]
    pub title: String,

    #[validate(length(min = 1, max = 2000), custom(function = "crate::errors::not_blank"))]
    pub authors: String,

    #[validate(range(min = 1900, max = 2100))]
    pub year: Option<i32>,

    #[validate(length(max = 500))]
    pub journal: Option<String>,

    #[validate(length(max = 50))]
    pub volume: Option<String>,

    #[validate(length(max = 50))]
    pub issue: Option<String>,

    #[validate(length(max = 50))]
    pub pages: Option<String>,

    #[validate(length(max = 255))]
    pub doi: Option<String>,

    #[validate(url)]
    pub link: Option<String>,
}

impl From<PublicationInput> for PublicationFields {
    fn from(input: PublicationInput) -> Self {
        Self {
            title: input.title.trim().to_string(),
            authors: input.authors.trim().to_string(),
            year: input.year,
            journal: non_blank(input.journal),
            volume: non_blank(input.volume),
            issue: non_blank(input.issue),
            pages: non_blank(input.pages),
            doi: non_blank(input.doi),
            link: non_blank(input.link),
        }
    }
}

/// A publication with its formatted citation
#[derive(Debug, Clone, Serialize)]
pub struct PublicationView {
    #[serde(flatten)]
    pub publication: Publication,
    pub citation: String,
}

impl From<Publication> for PublicationView {
    fn from(publication: Publication) -> Self {
        let citation = format_citation(&publication);
        Self {
            publication,
            citation,
        }
    }
}

/// `Authors (Year). Title. Journal, Volume(Issue), Pages. https://doi.org/DOI`
///
/// Missing parts are left out together with their punctuation. Without a
/// DOI the plain link is used instead.
pub fn format_citation(publication: &Publication) -> String {
    let mut segments = Vec::new();

    let authors = join_authors(&publication.authors);
    match (authors.is_empty(), publication.year) {
        (false, Some(year)) => segments.push(format!("{authors} ({year}).")),
        (false, None) => segments.push(terminate(&authors)),
        (true, Some(year)) => segments.push(format!("({year}).")),
        (true, None) => {}
    }

    let title = publication.title.trim();
    if !title.is_empty() {
        segments.push(terminate(title));
    }

    let volume_issue = match (present(&publication.volume), present(&publication.issue)) {
        (Some(volume), Some(issue)) => Some(format!("{volume}({issue})")),
        (Some(volume), None) => Some(volume.to_string()),
        (None, Some(issue)) => Some(format!("({issue})")),
        (None, None) => None,
    };
    let source: Vec<String> = [
        present(&publication.journal).map(String::from),
        volume_issue,
        present(&publication.pages).map(String::from),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !source.is_empty() {
        segments.push(format!("{}.", source.join(", ")));
    }

    if let Some(doi) = present(&publication.doi) {
        segments.push(doi_url(doi));
    } else if let Some(link) = present(&publication.link) {
        segments.push(link.to_string());
    }

    segments.join(" ")
}

/// `A`, `A & B`, `A, B, & C`. Names are separated by `;`, or by `,` when no `;` is present.
pub fn join_authors(authors: &str) -> String {
    let separator = if authors.contains(';') { ';' } else { ',' };
    let names: Vec<&str> = authors
        .split(separator)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    match names.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        [first, second] => format!("{first} & {second}"),
        [rest @ .., last] => format!("{}, & {last}", rest.join(", ")),
    }
}

fn doi_url(doi: &str) -> String {
    let bare = doi
        .trim_start_matches("https://doi.org/")
        .trim_start_matches("http://doi.org/")
        .trim_start_matches("doi:");
    format!("{DOI_RESOLVER}{bare}")
}

/// Append a period unless the text already ends a sentence
fn terminate(text: &str) -> String {
    if text.ends_with(['.', '?', '!']) {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
