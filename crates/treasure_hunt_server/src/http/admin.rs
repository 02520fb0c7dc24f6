//! Admin handlers. All routes sit behind [`super::auth::require_admin`].

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use treasure_hunt::{Clue, ClueId, GameSettings};

use crate::http::{AppState, blocking};
use crate::service::ClueDraft;
use crate::views::{AdminDashboard, VariantPreview};
use crate::HuntError;

/// New play order.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    ids: Vec<ClueId>,
}

/// Variant preview query.
#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    team: String,
    clue_id: ClueId,
}

/// Import result.
#[derive(Debug, Serialize)]
pub struct ImportReport {
    imported: usize,
}

#[instrument(skip(state))]
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<AdminDashboard>, HuntError> {
    Ok(Json(blocking(state.service(), |s| s.dashboard()).await?))
}

#[instrument(skip(state))]
pub async fn reset(State(state): State<AppState>) -> Result<Response, HuntError> {
    let removed = blocking(state.service(), |s| s.reset()).await?;
    info!(removed, "Progress reset from admin");
    Ok(Json(json!({ "removed": removed })).into_response())
}

#[instrument(skip(state))]
pub async fn list_clues(State(state): State<AppState>) -> Result<Json<Vec<Clue>>, HuntError> {
    Ok(Json(blocking(state.service(), |s| s.list_clues()).await?))
}

#[instrument(skip(state))]
pub async fn get_clue(
    State(state): State<AppState>,
    Path(id): Path<ClueId>,
) -> Result<Json<Clue>, HuntError> {
    Ok(Json(blocking(state.service(), move |s| s.get_clue(id)).await?))
}

#[instrument(skip(state, draft))]
pub async fn create_clue(
    State(state): State<AppState>,
    Json(draft): Json<ClueDraft>,
) -> Result<Response, HuntError> {
    let clue = blocking(state.service(), move |s| s.create_clue(draft)).await?;
    Ok((StatusCode::CREATED, Json(clue)).into_response())
}

#[instrument(skip(state, draft))]
pub async fn update_clue(
    State(state): State<AppState>,
    Path(id): Path<ClueId>,
    Json(draft): Json<ClueDraft>,
) -> Result<Json<Clue>, HuntError> {
    Ok(Json(
        blocking(state.service(), move |s| s.update_clue(id, draft)).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_clue(
    State(state): State<AppState>,
    Path(id): Path<ClueId>,
) -> Result<StatusCode, HuntError> {
    blocking(state.service(), move |s| s.delete_clue(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn reorder_clues(
    State(state): State<AppState>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<Vec<Clue>>, HuntError> {
    Ok(Json(
        blocking(state.service(), move |s| s.reorder_clues(&request.ids)).await?,
    ))
}

#[instrument(skip(state))]
pub async fn get_config(State(state): State<AppState>) -> Json<GameSettings> {
    Json(state.service().settings())
}

#[instrument(skip(state))]
pub async fn update_config(
    State(state): State<AppState>,
    Json(values): Json<BTreeMap<String, i64>>,
) -> Result<Json<GameSettings>, HuntError> {
    Ok(Json(
        blocking(state.service(), move |s| s.update_settings(&values)).await?,
    ))
}

#[instrument(skip(state))]
pub async fn export(State(state): State<AppState>) -> Result<Response, HuntError> {
    let document = blocking(state.service(), |s| s.export()).await?;
    let body = document.to_json()?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"treasure_hunt_export.json\"",
            ),
        ],
        body,
    )
        .into_response())
}

#[instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn import(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ImportReport>, HuntError> {
    let imported = blocking(state.service(), move |s| s.import_json(&body)).await?;
    Ok(Json(ImportReport { imported }))
}

#[instrument(skip(state))]
pub async fn preview(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<VariantPreview>, HuntError> {
    Ok(Json(
        blocking(state.service(), move |s| {
            s.preview_variant(&query.team, query.clue_id)
        })
        .await?,
    ))
}
