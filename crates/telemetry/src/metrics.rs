use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref PLATE_SERVICE_REQUESTS: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "plate_service_requests_total",
                "Total number of recognition requests",
            ),
            &["route", "status"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref PLATE_SERVICE_PLATES_DETECTED: IntCounter = {
        let metric = IntCounter::new(
            "plate_service_plates_detected_total",
            "Total number of license plate regions detected",
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref PLATE_SERVICE_CHARACTERS_DETECTED: IntCounterVec = {
        let metric = IntCounterVec::new(
            Opts::new(
                "plate_service_characters_detected_total",
                "Total number of plate characters detected",
            ),
            &["label"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref PLATE_SERVICE_INFERENCE_TIME: HistogramVec = {
        let metric = HistogramVec::new(
            HistogramOpts::new(
                "plate_service_inference_seconds",
                "Model inference time",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
            &["model", "execution_provider"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref PLATE_SERVICE_RECOGNITION_LATENCY: HistogramVec = {
        let metric = HistogramVec::new(
            HistogramOpts::new(
                "plate_service_recognition_latency_seconds",
                "End-to-end latency of recognizing one image",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["route"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };

    pub static ref PLATE_SERVICE_DETECTOR_HEALTH: IntGaugeVec = {
        let metric = IntGaugeVec::new(
            Opts::new(
                "plate_service_detector_health",
                "Health status of detectors (1=healthy, 0=unhealthy)",
            ),
            &["role"],
        )
        .expect("metric can be created");
        REGISTRY.register(Box::new(metric.clone())).ok();
        metric
    };
}

/// Encode all registered metrics in the Prometheus text format
pub fn encode_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
