use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Ingest. The handler caps each field itself, after checking its type.
        .route(
            "/upload",
            post(handlers::upload_asset).layer(DefaultBodyLimit::disable()),
        )
        // Resolution (indirection tokens point here)
        .route("/asset/", get(handlers::serve_empty_key))
        .route(
            "/asset/*key",
            get(handlers::serve_asset).layer(CorsLayer::permissive()),
        )
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
