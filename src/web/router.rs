//! Router configuration for the web server.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::{
    download_file, link_code, preview_file, serve_file, upload_file, AppState, MULTIPART_OVERHEAD,
};
use super::middleware::{create_cors_layer, security_headers};
use crate::config::ServerConfig;

/// Create the main router.
pub fn create_router(app_state: Arc<AppState>, config: &ServerConfig) -> Router {
    let body_limit =
        usize::try_from(app_state.max_upload_size + MULTIPART_OVERHEAD).unwrap_or(usize::MAX);

    let file_routes = Router::new()
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/file/:key", get(serve_file))
        .route("/download/:key", get(download_file))
        .route("/preview/:key", get(preview_file))
        .route("/qr/:key", get(link_code))
        .with_state(app_state);

    let mut router = file_routes.merge(create_health_router());

    if config.serve_static {
        match create_static_service(&config.static_path) {
            Some(static_files) => router = router.fallback_service(static_files),
            None => tracing::warn!(
                "Static path {} does not exist, front end will not be served",
                config.static_path
            ),
        }
    }

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(create_cors_layer(&config.cors_origins))
            .layer(middleware::from_fn(security_headers)),
    )
}

/// Create the static file service for the browser front end.
///
/// Returns `None` if `path` is not a directory.
pub fn create_static_service(path: &str) -> Option<ServeDir> {
    if !std::path::Path::new(path).is_dir() {
        return None;
    }
    Some(ServeDir::new(path).append_index_html_on_directories(true))
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
