//! HTTP API layer over the document store.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use doc_hub_core::{
    DraftStore, ErrorKind, GitStorage, HistoryCapable, LiveIndex, Metadata, SearchIndex, Storage,
    StoreError, TreeStore,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{Backend, Config};

pub use frontend::with_frontend;

mod documents;
mod drafts;
mod frontend;
mod history;
mod metadata;
mod search;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub index: Arc<LiveIndex>,
    pub metadata: Arc<Metadata>,
    pub drafts: Arc<DraftStore>,
}

impl AppState {
    /// Open the stores under the configured data directory and warm the
    /// search index.
    pub fn open(config: &Config) -> Result<Self, StoreError> {
        let data_dir = &config.data_dir;
        let storage: Arc<dyn Storage> = match config.backend {
            Backend::Git => Arc::new(GitStorage::new(data_dir)?),
            Backend::Files => Arc::new(TreeStore::new(data_dir.join("docs"))?),
        };
        let search = Arc::new(SearchIndex::new(config.languages.as_slice())?);
        let index = Arc::new(LiveIndex::new(search, storage.clone()));
        let indexed = index.warm()?;
        info!(
            backend = ?config.backend,
            dir = %data_dir.display(),
            documents = indexed,
            "document store ready"
        );
        Ok(Self {
            storage,
            index,
            metadata: Arc::new(Metadata::open(data_dir)?),
            drafts: Arc::new(DraftStore::new(data_dir)?),
        })
    }

    fn history(&self) -> Result<&dyn HistoryCapable, ApiError> {
        self.storage.history().ok_or_else(|| ApiError {
            status: StatusCode::NOT_IMPLEMENTED,
            message: "history is not supported by this storage backend".to_string(),
        })
    }
}

/// Error returned by handlers, rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match err.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict | ErrorKind::Invalid => StatusCode::BAD_REQUEST,
            ErrorKind::Io | ErrorKind::VersionControl => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, "request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/documents", get(documents::list_roots))
        .route("/api/documents/{*path}", get(documents::list_children))
        .route("/api/document", post(documents::create_document))
        .route(
            "/api/document/{*path}",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/api/move/{*path}", post(documents::move_document))
        .route("/api/related/{*path}", get(documents::related_documents))
        .route("/api/search", get(search::search))
        .route("/api/history/tree/{*path}", get(history::document_history))
        .route("/api/history/doc/{*rest}", get(history::historical_document))
        .route("/api/history/restore/{*path}", post(history::restore_document))
        .route("/api/drafts", get(drafts::list_drafts))
        .route("/api/draft", post(drafts::save_draft))
        .route(
            "/api/draft/{id}",
            get(drafts::get_draft).delete(drafts::delete_draft),
        )
        .route("/api/views/last", get(metadata::last_viewed))
        .route("/api/favorites", get(metadata::favorites))
        .route(
            "/api/favorite",
            post(metadata::add_favorite).delete(metadata::remove_favorite),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
