use axum::{
    extract::{Query, State},
    Json,
};
use doc_hub_core::search::DEFAULT_PAGE_SIZE;
use doc_hub_core::Document;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult, AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    q: Option<String>,
    page: Option<i64>,
    page_size: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    results: Vec<Document>,
    total: usize,
    current_page: usize,
    total_pages: usize,
    page_size: usize,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("query parameter 'q' is required"))?;
    let page = params.page.filter(|p| *p > 0).map_or(1, |p| p as usize);
    let page_size = params
        .page_size
        .filter(|s| *s > 0)
        .map_or(DEFAULT_PAGE_SIZE, |s| s as usize);

    let (results, total) = state.index.search(&query, page, page_size);
    Ok(Json(SearchResponse {
        results,
        total,
        current_page: page,
        total_pages: total.div_ceil(page_size),
        page_size,
    }))
}
