use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use doc_hub_core::document::{base_id, join_path};
use doc_hub_core::{Document, ShortDocument, StoreError};
use serde::Deserialize;
use tracing::warn;

use super::{ApiResult, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    #[serde(default)]
    parent_path: String,
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
pub struct CreateParams {
    draft: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateRequest {
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    commit_changes: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    #[serde(default)]
    target_path: String,
}

pub async fn list_roots(State(state): State<AppState>) -> ApiResult<Json<Vec<ShortDocument>>> {
    Ok(Json(state.storage.root_documents()?))
}

pub async fn list_children(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Json<Vec<ShortDocument>>> {
    Ok(Json(state.storage.child_documents(&path)?))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Json<Document>> {
    let mut doc = state.storage.document(&path)?;
    doc.favorite = state.metadata.is_favorite(&doc.path);
    state.metadata.record_view(doc.to_short());
    Ok(Json(doc))
}

/// Creates under `parentPath`. When that parent no longer exists the
/// document is created at the root instead and `202 Accepted` is returned.
pub async fn create_document(
    State(state): State<AppState>,
    Query(params): Query<CreateParams>,
    Json(req): Json<CreateRequest>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let (status, doc) =
        match state
            .storage
            .create_document(&req.parent_path, &req.title, &req.content)
        {
            Ok(doc) => (StatusCode::OK, doc),
            Err(StoreError::ParentMissing(parent)) => {
                warn!(parent = %parent, "parent missing, creating document at root");
                let doc = state.storage.create_document("", &req.title, &req.content)?;
                (StatusCode::ACCEPTED, doc)
            }
            Err(e) => return Err(e.into()),
        };
    state.index.created(&doc);

    if let Some(draft) = params.draft.filter(|d| !d.is_empty()) {
        if let Err(e) = state.drafts.delete(&draft) {
            warn!(draft = %draft, error = %e, "failed to discard draft");
        }
    }
    Ok((status, Json(doc)))
}

pub async fn update_document(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> ApiResult<Json<Document>> {
    let mut doc =
        state
            .storage
            .update_document(&path, &req.title, &req.content, req.commit_changes)?;
    state.index.updated(&path, &doc)?;
    if doc.path != path.trim_matches('/') {
        state.metadata.forget(path.trim_matches('/'));
    }
    doc.favorite = state.metadata.is_favorite(&doc.path);
    Ok(Json(doc))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<StatusCode> {
    state.storage.delete_document(&path)?;
    state.index.deleted(&path);
    state.metadata.forget(path.trim_matches('/'));
    Ok(StatusCode::NO_CONTENT)
}

pub async fn move_document(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<Json<Document>> {
    let source = path.trim_matches('/');
    state.storage.move_document(source, &req.target_path)?;
    let new_path = join_path(req.target_path.trim_matches('/'), base_id(source));
    state.index.moved(source, &new_path)?;
    state.metadata.forget(source);
    Ok(Json(state.storage.document(&new_path)?))
}

pub async fn related_documents(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Json<BTreeMap<String, Vec<ShortDocument>>>> {
    Ok(Json(state.storage.related_documents(&path)?))
}
