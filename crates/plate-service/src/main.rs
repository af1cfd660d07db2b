use anyhow::{Context, Result};
use plate_service::{
    annotate, api,
    config::DetectorBackend,
    detector::{Detector, StaticDetector, YoloV8Config, YoloV8Detector},
    PipelineConfig, PlateServiceConfig, PlateServiceState, RecognitionPipeline,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = telemetry::init_with_service("plate-service");

    info!("Starting Plate Service...");

    let config = PlateServiceConfig::from_env()?;
    info!(
        "Plate Service configuration: bind={}, backend={:?}, provider={}",
        config.bind_addr, config.backend, config.execution_provider
    );

    let (plate_detector, character_detector) = build_detectors(&config)?;

    let pipeline = RecognitionPipeline::new(
        plate_detector,
        character_detector,
        PipelineConfig {
            plate_class_id: config.plate_class_id,
            char_input_size: config.char_input_size,
            row_threshold: config.row_threshold,
        },
    );

    let font = match &config.font_path {
        Some(path) => {
            info!("Using annotation font {}", path);
            annotate::load_font(path)?
        }
        None => annotate::default_font()?,
    };

    let state = PlateServiceState::with_upload_limit(pipeline, font, config.max_upload_bytes);

    // Build HTTP router
    let app = api::router(state);

    info!("Binding to {}", config.bind_addr);
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Plate Service listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_detectors(config: &PlateServiceConfig) -> Result<(Arc<dyn Detector>, Arc<dyn Detector>)> {
    match config.backend {
        DetectorBackend::Static => {
            warn!("Using static detectors; no plates will be recognized");
            Ok((
                Arc::new(StaticDetector::empty()),
                Arc::new(StaticDetector::empty()),
            ))
        }
        DetectorBackend::Onnx => {
            let detector_config = |role: &str, path: &str, size: u32, labels: &Option<Vec<String>>| {
                let mut detector_config = YoloV8Config::new(role, path, size);
                detector_config.confidence_threshold = config.detection_confidence;
                detector_config.execution_provider = config.execution_provider.clone();
                detector_config.class_names = labels.clone();
                detector_config
            };

            let plate = YoloV8Detector::load(detector_config(
                "plate",
                &config.plate_model_path,
                config.plate_input_size,
                &config.plate_labels,
            ))
            .context("Failed to load plate detector")?;

            let character = YoloV8Detector::load(detector_config(
                "character",
                &config.character_model_path,
                config.char_input_size,
                &config.character_labels,
            ))
            .context("Failed to load character detector")?;

            Ok((Arc::new(plate), Arc::new(character)))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
