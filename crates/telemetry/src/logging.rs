use serde::{Deserialize, Serialize};
use std::env;
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogFormat {
    /// Human-readable format (default for development)
    #[default]
    Pretty,
    /// Compact text format
    Compact,
    /// JSON format for log aggregation systems
    Json,
}

impl LogFormat {
    /// Parse log format from the `LOG_FORMAT` environment variable
    pub fn from_env() -> Self {
        Self::parse(&env::var("LOG_FORMAT").unwrap_or_default())
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Configuration for structured logging
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log output format (pretty/compact/json)
    pub format: LogFormat,
    /// Service name (e.g., "plate-service")
    pub service_name: String,
    pub service_version: String,
    /// Environment (dev/staging/production)
    pub environment: String,
    /// Enable span events (new/close)
    pub enable_span_events: bool,
    /// Also write JSON logs to a daily rolling file in `log_dir`
    pub log_to_file: bool,
    pub log_dir: Option<String>,
}

impl LogConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            format: LogFormat::from_env(),
            service_name: service_name.into(),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            enable_span_events: env_flag("LOG_SPAN_EVENTS"),
            log_to_file: env_flag("LOG_TO_FILE"),
            log_dir: env::var("LOG_DIR").ok(),
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_span_events(mut self, enable: bool) -> Self {
        self.enable_span_events = enable;
        self
    }

    pub fn with_file_logging(mut self, log_dir: impl Into<String>) -> Self {
        self.log_to_file = true;
        self.log_dir = Some(log_dir.into());
        self
    }

    fn span_events(&self) -> FmtSpan {
        if self.enable_span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false)
}

fn env_filter() -> EnvFilter {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    ["hyper=warn", "tokio=warn", "ort=warn"]
        .iter()
        .filter_map(|d| d.parse().ok())
        .fold(filter, |f, directive| f.add_directive(directive))
}

/// Initialize structured logging with the given configuration.
///
/// When file logging is enabled the returned guard must be held for the
/// lifetime of the process, otherwise buffered lines are lost.
pub fn init_structured_logging(config: LogConfig) -> Option<WorkerGuard> {
    let span_events = config.span_events();

    let stdout_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(io::stdout)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_span_events(span_events)
            .with_target(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_target(true)
            .with_line_number(true)
            .boxed(),
    };

    let (file_layer, guard) = match (config.log_to_file, config.log_dir.as_deref()) {
        (true, Some(log_dir)) => {
            let file_name = format!("{}.log", config.service_name);
            let appender = tracing_appender::rolling::daily(log_dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_span_events(config.span_events())
                .with_writer(non_blocking)
                .boxed();
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    let initialized = tracing_subscriber::registry()
        .with(env_filter())
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    if initialized.is_ok() {
        tracing::info!(
            service.name = %config.service_name,
            service.version = %config.service_version,
            environment = %config.environment,
            format = ?config.format,
            "structured logging initialized"
        );
    }

    guard
}

/// Initialize logging with service name
pub fn init_with_service(service_name: impl Into<String>) -> Option<WorkerGuard> {
    init_structured_logging(LogConfig::new(service_name))
}
