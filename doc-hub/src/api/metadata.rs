use axum::{extract::State, http::StatusCode, Json};
use doc_hub_core::ShortDocument;
use serde::Deserialize;

use super::{ApiResult, AppState};

#[derive(Deserialize)]
pub struct FavoriteRequest {
    path: String,
}

pub async fn last_viewed(State(state): State<AppState>) -> Json<Vec<ShortDocument>> {
    Json(state.metadata.last_viewed())
}

pub async fn favorites(State(state): State<AppState>) -> Json<Vec<ShortDocument>> {
    Json(state.metadata.favorites())
}

pub async fn add_favorite(
    State(state): State<AppState>,
    Json(req): Json<FavoriteRequest>,
) -> ApiResult<StatusCode> {
    let doc = state.storage.document(&req.path)?;
    state.metadata.add_favorite(doc.to_short());
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Json(req): Json<FavoriteRequest>,
) -> ApiResult<StatusCode> {
    state.metadata.remove_favorite(req.path.trim_matches('/'));
    Ok(StatusCode::NO_CONTENT)
}
