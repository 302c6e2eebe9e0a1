pub mod error;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::adapters::http::state::HttpState;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub max_upload_bytes: usize,
    /// Frontend build served for unmatched paths.
    pub static_dir: Option<PathBuf>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self { max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES, static_dir: None }
    }
}

pub fn router(state: HttpState, opts: &RouterOptions) -> Router {
    let mut app = Router::new()
        .route("/upload", post(routes::upload))
        .route("/detections", get(routes::latest_detections))
        .route("/detections/:id", get(routes::detections_by_request))
        .route("/health", get(routes::health))
        .route("/api/config", get(routes::get_config))
        .with_state(state);

    if let Some(dir) = &opts.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(opts.max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(routes::exposed_headers()),
        )
        .layer(TraceLayer::new_for_http())
}
