//! Publication CRUD handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::AppState;
use labsite_common::{
    errors::{AppError, Result},
    publications::{PublicationInput, PublicationView},
};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<PublicationView>>> {
    let publications = state.repo.list_publications().await?;
    Ok(Json(publications.into_iter().map(PublicationView::from).collect()))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<PublicationView>> {
    state
        .repo
        .find_publication(id)
        .await?
        .map(|p| Json(PublicationView::from(p)))
        .ok_or_else(|| AppError::not_found("publication", id))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<PublicationInput>,
) -> Result<(StatusCode, Json<PublicationView>)> {
    request.validate()?;

    let publication = state.repo.create_publication(request.into()).await?;
    tracing::info!(publication_id = publication.id, "Publication created");

    Ok((StatusCode::CREATED, Json(publication.into())))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<PublicationInput>,
) -> Result<Json<PublicationView>> {
    request.validate()?;

    let publication = state.repo.update_publication(id, request.into()).await?;
    tracing::info!(publication_id = id, "Publication updated");

    Ok(Json(publication.into()))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    if !state.repo.delete_publication(id).await? {
        return Err(AppError::not_found("publication", id));
    }
    tracing::info!(publication_id = id, "Publication deleted");
    Ok(StatusCode::NO_CONTENT)
}
