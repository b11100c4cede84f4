//! Static frontend served next to the API.

use std::path::Path;

use axum::{
    extract::Request,
    http::StatusCode,
    response::IntoResponse,
    Router,
};
use tower::util::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

/// Serve files from `dir` for every path the API does not route. Unknown
/// paths get `index.html` so client-side routes survive a reload; unknown
/// `/api` paths stay 404.
pub fn with_frontend(router: Router, dir: &Path) -> Router {
    let site = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
    router.fallback(move |req: Request| {
        let site = site.clone();
        async move {
            if req.uri().path() == "/api" || req.uri().path().starts_with("/api/") {
                return StatusCode::NOT_FOUND.into_response();
            }
            match site.oneshot(req).await {
                Ok(resp) => resp.into_response(),
                Err(never) => match never {},
            }
        }
    })
}
