//! Research progress handlers

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::handlers::form;
use crate::AppState;
use labsite_common::{
    content::ComposedProgress,
    db::models::Progress,
    errors::Result,
};

/// Response after creating a progress entry
#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: i32,
}

pub async fn list(State(state): State<AppState>, Path(research_id): Path<i32>) -> Result<Json<Vec<Progress>>> {
    Ok(Json(state.progress.list(research_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Path(research_id): Path<i32>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let fields = form::read_fields(multipart).await?;
    let submission = form::progress_submission(fields);

    let progress = state.progress.create(research_id, submission).await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id: progress.id })))
}

/// Composed read addressed by titles; `null` when nothing matches
pub async fn get_by_slug(
    State(state): State<AppState>,
    Path((research, progress)): Path<(String, String)>,
) -> Result<Json<Option<ComposedProgress>>> {
    Ok(Json(state.progress.compose_by_slug(&research, &progress).await?))
}

/// Composed read addressed by ids; `null` when nothing matches
pub async fn get_by_id(
    State(state): State<AppState>,
    Path((research_id, progress_id)): Path<(i32, i32)>,
) -> Result<Json<Option<ComposedProgress>>> {
    Ok(Json(state.progress.compose_by_id(research_id, progress_id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path((research_id, progress_id)): Path<(i32, i32)>,
    multipart: Multipart,
) -> Result<Json<Progress>> {
    let fields = form::read_fields(multipart).await?;
    let submission = form::progress_submission(fields);

    Ok(Json(state.progress.update(research_id, progress_id, submission).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((research_id, progress_id)): Path<(i32, i32)>,
) -> Result<StatusCode> {
    state.progress.delete(research_id, progress_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
