/// Integration tests for the plate recognition service
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use common::detections::BoundingBox;
use common::recognition::RecognitionResponse;
use image::{ImageFormat, Rgb, RgbImage};
use plate_service::{
    annotate, api,
    detector::StaticDetector,
    PipelineConfig, PlateServiceState, RecognitionPipeline,
};
use std::io::Cursor;
use std::sync::Arc;

const CHARACTER_LABELS: [&str; 4] = ["BA", "2", "PA", "1"];

/// Plate at (100, 100)-(300, 300) with "BA 2 PA" on the first row and "1" below
fn plate_pipeline() -> RecognitionPipeline {
    let plates = StaticDetector::new(vec!["vehicle".into(), "license_plate".into()], Vec::new())
        .with_detection(0, 0.97, BoundingBox::new(0.0, 0.0, 400.0, 400.0))
        .with_detection(1, 0.91, BoundingBox::new(100.0, 100.0, 300.0, 300.0));

    let characters = StaticDetector::new(
        CHARACTER_LABELS.iter().map(|l| l.to_string()).collect(),
        Vec::new(),
    )
    .with_detection(2, 0.88, BoundingBox::new(150.0, 20.0, 190.0, 80.0))
    .with_detection(0, 0.93, BoundingBox::new(10.0, 22.0, 50.0, 82.0))
    .with_detection(1, 0.90, BoundingBox::new(80.0, 18.0, 120.0, 78.0))
    .with_detection(3, 0.86, BoundingBox::new(90.0, 120.0, 130.0, 180.0));

    RecognitionPipeline::new(
        Arc::new(plates),
        Arc::new(characters),
        PipelineConfig::default(),
    )
}

fn setup_test_server(pipeline: RecognitionPipeline) -> TestServer {
    let state = PlateServiceState::new(pipeline, annotate::default_font().unwrap());
    TestServer::new(api::router(state)).unwrap()
}

fn empty_pipeline() -> RecognitionPipeline {
    RecognitionPipeline::new(
        Arc::new(StaticDetector::empty()),
        Arc::new(StaticDetector::empty()),
        PipelineConfig::default(),
    )
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

fn base64_png(width: u32, height: u32) -> String {
    common::payload::encode_base64(&png_bytes(width, height))
}

#[tokio::test]
async fn test_healthz() {
    let server = setup_test_server(empty_pipeline());

    let response = server.get("/healthz").await;
    assert_eq!(response.status_code(), 200);

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "plate-service");
}

#[tokio::test]
async fn test_readyz_reports_both_detectors() {
    let server = setup_test_server(plate_pipeline());

    let response = server.get("/readyz").await;
    assert_eq!(response.status_code(), 200);

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ready");
    let detectors = body["detectors"].as_array().unwrap();
    assert_eq!(detectors.len(), 2);
    assert_eq!(detectors[0]["role"], "plate");
    assert_eq!(detectors[1]["role"], "character");
    assert_eq!(detectors[1]["num_classes"], 4);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = setup_test_server(empty_pipeline());

    server
        .post("/process_image_route")
        .json(&serde_json::json!({ "image": base64_png(32, 32) }))
        .await;

    let response = server.get("/metrics").await;
    assert_eq!(response.status_code(), 200);
    assert!(response.text().contains("plate_service_requests_total"));
}

#[tokio::test]
async fn test_pages_render() {
    let server = setup_test_server(empty_pipeline());

    for path in ["/", "/upload", "/capture", "/about"] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), 200, "GET {}", path);
        assert!(response.text().contains("<!DOCTYPE html>"));
    }

    let script = server.get("/static/scripts.js").await;
    assert_eq!(script.status_code(), 200);
    assert!(script.text().contains("/process_image_route"));
}

#[tokio::test]
async fn test_process_image_reads_plate() {
    let server = setup_test_server(plate_pipeline());

    let response = server
        .post("/process_image_route")
        .json(&serde_json::json!({ "image": base64_png(400, 400) }))
        .await;
    assert_eq!(response.status_code(), 200);

    let result: RecognitionResponse = response.json();
    assert_eq!(result.english_text, "BA 2 PA\n1");
    assert_eq!(result.nepali_text, "बा २ PA\n१");
    assert!(result.is_bagmati);

    let jpeg = common::payload::decode_image_payload(&result.processed_image).unwrap();
    let annotated = image::load_from_memory(&jpeg).unwrap();
    assert_eq!((annotated.width(), annotated.height()), (400, 400));
}

#[tokio::test]
async fn test_process_image_accepts_data_uri() {
    let server = setup_test_server(empty_pipeline());

    let payload = format!("data:image/png;base64,{}", base64_png(64, 48));
    let response = server
        .post("/process_image_route")
        .json(&serde_json::json!({ "image": payload }))
        .await;
    assert_eq!(response.status_code(), 200);

    let result: RecognitionResponse = response.json();
    assert_eq!(result.english_text, "");
    assert_eq!(result.nepali_text, "");
    assert!(!result.is_bagmati);
    assert!(!result.processed_image.is_empty());
}

#[tokio::test]
async fn test_process_image_missing_image() {
    let server = setup_test_server(empty_pipeline());

    let response = server
        .post("/process_image_route")
        .json(&serde_json::json!({}))
        .await;
    assert_eq!(response.status_code(), 400);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "No image provided");
}

#[tokio::test]
async fn test_process_image_invalid_base64() {
    let server = setup_test_server(empty_pipeline());

    let response = server
        .post("/process_image_route")
        .json(&serde_json::json!({ "image": "not base64!!" }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_process_image_undecodable_image() {
    let server = setup_test_server(empty_pipeline());

    let payload = common::payload::encode_base64(b"definitely not an image");
    let response = server
        .post("/process_image_route")
        .json(&serde_json::json!({ "image": payload }))
        .await;
    assert_eq!(response.status_code(), 500);

    let body: serde_json::Value = response.json();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Failed to decode image"));
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let server = setup_test_server(empty_pipeline());

    let form = MultipartForm::new().add_text("comment", "no file here");
    let response = server.post("/upload").multipart(form).await;
    assert_eq!(response.status_code(), 400);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "No file part");
}

#[tokio::test]
async fn test_upload_file_field_without_filename() {
    let server = setup_test_server(empty_pipeline());

    let form = MultipartForm::new().add_text("file", "car.png");
    let response = server.post("/upload").multipart(form).await;
    assert_eq!(response.status_code(), 400);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "No file part");
}

#[tokio::test]
async fn test_upload_with_empty_filename() {
    let server = setup_test_server(empty_pipeline());

    let form = MultipartForm::new().add_part("file", Part::bytes(Vec::new()).file_name(""));
    let response = server.post("/upload").multipart(form).await;
    assert_eq!(response.status_code(), 400);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "No selected file");
}

#[tokio::test]
async fn test_upload_renders_result_page() {
    let server = setup_test_server(plate_pipeline());

    let part = Part::bytes(png_bytes(400, 400))
        .file_name("car.png")
        .mime_type("image/png");
    let form = MultipartForm::new().add_part("file", part);

    let response = server.post("/upload").multipart(form).await;
    assert_eq!(response.status_code(), 200);

    let page = response.text();
    assert!(page.contains("BA 2 PA\n1"));
    assert!(page.contains("बा २ PA\n१"));
    assert!(page.contains("Bagmati province plate"));
    assert!(page.contains(r#"alt="Input image""#));
    assert!(page.contains(r#"alt="Annotated image""#));
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let server = setup_test_server(empty_pipeline());

    let response = server
        .get("/healthz")
        .add_header(
            axum::http::HeaderName::from_static("x-correlation-id"),
            axum::http::HeaderValue::from_static("test-correlation-id"),
        )
        .await;

    assert_eq!(response.header("x-correlation-id"), "test-correlation-id");
}

#[tokio::test]
async fn test_body_limit_bounds_image_payload() {
    let state = PlateServiceState::with_upload_limit(
        empty_pipeline(),
        annotate::default_font().unwrap(),
        1024,
    );
    let server = TestServer::new(api::router(state)).unwrap();

    let response = server
        .post("/process_image_route")
        .json(&serde_json::json!({ "image": "A".repeat(4096) }))
        .await;
    assert_eq!(response.status_code(), 413);

    let response = server
        .post("/process_image_route")
        .json(&serde_json::json!({ "image": base64_png(4, 4) }))
        .await;
    assert_eq!(response.status_code(), 200);
}
