use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use doc_hub_core::Draft;

use super::{ApiResult, AppState};

pub async fn list_drafts(State(state): State<AppState>) -> ApiResult<Json<Vec<Draft>>> {
    Ok(Json(state.drafts.list()?))
}

pub async fn get_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Draft>> {
    Ok(Json(state.drafts.get(&id)?))
}

pub async fn save_draft(
    State(state): State<AppState>,
    Json(draft): Json<Draft>,
) -> ApiResult<StatusCode> {
    state.drafts.upsert(draft)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.drafts.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
