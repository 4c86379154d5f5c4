//! Research CRUD handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::AppState;
use labsite_common::{
    db::{models::Research, ResearchFields},
    errors::{not_blank, AppError, Result},
};

/// Create / update request body
#[derive(Debug, Deserialize, Validate)]
pub struct ResearchInput {
    #[validate(length(min = 1, max = 500), custom(function = "not_blank"))]
    pub judul: String,

    #[validate(length(min = 1, max = 500), custom(function = "not_blank"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 50000))]
    pub deskripsi: String,

    #[serde(default)]
    #[validate(length(max = 50000))]
    pub description: String,
}

impl From<ResearchInput> for ResearchFields {
    fn from(input: ResearchInput) -> Self {
        Self {
            judul: input.judul.trim().to_string(),
            title: input.title.trim().to_string(),
            deskripsi: input.deskripsi,
            description: input.description,
        }
    }
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Research>>> {
    Ok(Json(state.repo.list_research().await?))
}

/// Look up by numeric id, or by a title slug in either language
pub async fn get(State(state): State<AppState>, Path(key): Path<String>) -> Result<Json<Research>> {
    let research = match key.parse::<i32>() {
        Ok(id) => state.repo.find_research_by_id(id).await?,
        Err(_) => state.repo.find_research_by_slug(&key).await?,
    };

    research
        .map(Json)
        .ok_or_else(|| AppError::not_found("research", key))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<ResearchInput>,
) -> Result<(StatusCode, Json<Research>)> {
    request.validate()?;

    let research = state.repo.create_research(request.into()).await?;
    tracing::info!(research_id = research.id, "Research created");

    Ok((StatusCode::CREATED, Json(research)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<ResearchInput>,
) -> Result<Json<Research>> {
    request.validate()?;

    let research = state.repo.update_research(id, request.into()).await?;
    tracing::info!(research_id = id, "Research updated");

    Ok(Json(research))
}

/// Delete a research entry with all its progress entries and their files
pub async fn delete(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    state.progress.delete_research(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(judul: &str, title: &str) -> ResearchInput {
        ResearchInput {
            judul: judul.into(),
            title: title.into(),
            deskripsi: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_titles_must_not_be_blank() {
        assert!(input("Pemetaan", "Mapping").validate().is_ok());

        let err = AppError::from(input("   ", "Ok").validate().unwrap_err());
        let errors = err.field_errors().unwrap();
        assert!(errors.contains("judul"));
        assert!(!errors.contains("title"));
    }

    #[test]
    fn test_fields_are_trimmed() {
        let fields = ResearchFields::from(input("  Pemetaan ", "Mapping\n"));
        assert_eq!(fields.judul, "Pemetaan");
        assert_eq!(fields.title, "Mapping");
    }
}
