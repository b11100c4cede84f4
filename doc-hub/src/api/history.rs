use axum::{
    extract::{Path, State},
    Json,
};
use doc_hub_core::{Document, HistoryEntry};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult, AppState};

#[derive(Serialize)]
pub struct HistoryResponse {
    history: Vec<HistoryEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    commit_hash: String,
    #[serde(default)]
    original_path: Option<String>,
}

pub async fn document_history(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Json<HistoryResponse>> {
    let history = state.history()?.document_history(&path)?;
    Ok(Json(HistoryResponse { history }))
}

/// `rest` is `<document path>/<commit hash>`.
pub async fn historical_document(
    State(state): State<AppState>,
    Path(rest): Path<String>,
) -> ApiResult<Json<Document>> {
    let (path, commit) = rest
        .trim_end_matches('/')
        .rsplit_once('/')
        .ok_or_else(|| ApiError::bad_request("expected <path>/<commit>"))?;
    Ok(Json(state.history()?.historical_document(path, commit)?))
}

pub async fn restore_document(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(req): Json<RestoreRequest>,
) -> ApiResult<Json<Document>> {
    let original = req
        .original_path
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| path.clone());
    let mut doc = state
        .history()?
        .restore_historical_document(&path, &original, &req.commit_hash)?;
    state.index.updated(&path, &doc)?;
    if doc.path != path.trim_matches('/') {
        state.metadata.forget(path.trim_matches('/'));
    }
    doc.favorite = state.metadata.is_favorite(&doc.path);
    Ok(Json(doc))
}
