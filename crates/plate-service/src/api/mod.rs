pub mod routes;

use crate::state::PlateServiceState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use telemetry::CorrelationIdLayer;
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn router(state: PlateServiceState) -> Router {
    let body_limit = state.max_upload_bytes();

    Router::new()
        // Pages
        .route("/", get(routes::home))
        .route("/upload", get(routes::upload_form).post(routes::upload))
        .route("/capture", get(routes::capture))
        .route("/about", get(routes::about))
        .route("/static/scripts.js", get(routes::capture_script))
        // Recognition
        .route("/process_image_route", post(routes::process_image_route))
        // Health and metrics endpoints
        .route("/healthz", get(routes::healthz))
        .route("/readyz", get(routes::readyz))
        .route("/metrics", get(routes::metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorrelationIdLayer::new())
        .with_state(state)
}
