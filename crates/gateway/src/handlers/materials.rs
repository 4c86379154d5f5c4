//! Lecturer material handlers

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};

use crate::handlers::form;
use crate::AppState;
use labsite_common::{
    errors::{AppError, Result},
    materials::MaterialView,
};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<MaterialView>>> {
    let materials = state.materials.list().await?;
    Ok(Json(materials.into_iter().map(|m| state.materials.view(m)).collect()))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<MaterialView>> {
    state
        .materials
        .find(id)
        .await?
        .map(|m| Json(state.materials.view(m)))
        .ok_or_else(|| AppError::not_found("lecturer material", id))
}

pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MaterialView>)> {
    let fields = form::read_fields(multipart).await?;
    let material = state.materials.create(form::material_submission(fields)).await?;

    Ok((StatusCode::CREATED, Json(state.materials.view(material))))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<MaterialView>> {
    let fields = form::read_fields(multipart).await?;
    let material = state.materials.update(id, form::material_submission(fields)).await?;

    Ok(Json(state.materials.view(material)))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    state.materials.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
