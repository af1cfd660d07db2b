use crate::error::ApiError;
use crate::pages;
use crate::state::PlateServiceState;
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use common::payload::decode_image_payload;
use common::recognition::{RecognitionResponse, RecognizeRequest};
use serde_json::json;
use std::time::Instant;
use telemetry::metrics::{PLATE_SERVICE_RECOGNITION_LATENCY, PLATE_SERVICE_REQUESTS};

fn observe_request(route: &str, status: StatusCode, start: Instant) {
    PLATE_SERVICE_REQUESTS
        .with_label_values(&[route, status.as_str()])
        .inc();
    PLATE_SERVICE_RECOGNITION_LATENCY
        .with_label_values(&[route])
        .observe(start.elapsed().as_secs_f64());
}

fn status_of<T>(result: &Result<T, ApiError>) -> StatusCode {
    match result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status(),
    }
}

pub async fn home() -> Html<String> {
    Html(pages::home())
}

pub async fn upload_form() -> Html<String> {
    Html(pages::upload_form())
}

pub async fn capture() -> Html<String> {
    Html(pages::capture())
}

pub async fn about() -> Html<String> {
    Html(pages::about())
}

pub async fn capture_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        pages::CAPTURE_SCRIPT,
    )
}

/// Recognize an image submitted through the upload form
pub async fn upload(
    State(state): State<PlateServiceState>,
    multipart: Multipart,
) -> Result<Html<String>, ApiError> {
    let start = Instant::now();
    let result = handle_upload(&state, multipart).await;
    observe_request("upload", status_of(&result), start);
    result
}

async fn handle_upload(
    state: &PlateServiceState,
    mut multipart: Multipart,
) -> Result<Html<String>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        // plain form values are not file parts
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        if filename.is_empty() {
            return Err(ApiError::bad_request("No selected file"));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("No selected file"));
        }

        tracing::debug!(filename = %filename, size = bytes.len(), "Received upload");

        let report = state.recognize_upload(&bytes).await.map_err(|e| {
            tracing::error!("Failed to process upload {}: {:#}", filename, e);
            ApiError::from(e)
        })?;
        return Ok(Html(pages::result(&report)));
    }

    Err(ApiError::bad_request("No file part"))
}

/// Recognize a base64 encoded image (webcam capture)
pub async fn process_image_route(
    State(state): State<PlateServiceState>,
    Json(request): Json<RecognizeRequest>,
) -> Result<Json<RecognitionResponse>, ApiError> {
    let start = Instant::now();
    let result = recognize_payload(&state, request).await;
    observe_request("process_image_route", status_of(&result), start);
    result
}

async fn recognize_payload(
    state: &PlateServiceState,
    request: RecognizeRequest,
) -> Result<Json<RecognitionResponse>, ApiError> {
    let payload = request
        .image
        .ok_or_else(|| ApiError::bad_request("No image provided"))?;

    let bytes = decode_image_payload(&payload)
        .map_err(|e| ApiError::bad_request(format!("{:#}", e)))?;

    let report = state.recognize_bytes(&bytes).await.map_err(|e| {
        tracing::error!("Failed to process image: {:#}", e);
        ApiError::from(e)
    })?;

    Ok(Json(report.to_response()))
}

/// Health check endpoint
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "plate-service",
            "version": common::VERSION,
        })),
    )
}

/// Readiness check endpoint
pub async fn readyz(State(state): State<PlateServiceState>) -> impl IntoResponse {
    let detectors = state.detector_health().await;
    let all_healthy = detectors.iter().all(|d| d.healthy);

    if all_healthy {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "detectors": detectors
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not ready",
                "detectors": detectors
            })),
        )
    }
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics() -> impl IntoResponse {
    match telemetry::metrics::encode_metrics() {
        Ok(body) => body.into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}
