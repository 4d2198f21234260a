use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Registry,
    Layer,
};
use tracing_appender::rolling;

use crate::error::{StampError, StampResult};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: PathBuf,
    pub enable_file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            enable_file_logging: false,
        }
    }
}

/// Initialize the logging system
pub fn init_logging(config: &LoggingConfig) -> StampResult<()> {
    if config.enable_file_logging {
        fs::create_dir_all(&config.log_dir)
            .map_err(|e| StampError::file_io(
                config.log_dir.to_string_lossy().to_string(),
                e
            ))?;
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "waybill_stamper={},{}",
                config.level, config.level
            ))
        });

    let registry = Registry::default().with(env_filter);

    // the console layer is built per branch: a boxed layer is typed by
    // the subscriber it sits on, and the two stacks differ
    if config.enable_file_logging {
        let file_appender = rolling::daily(&config.log_dir, "waybill.log");
        let file_layer = fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .boxed();
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .compact()
            .boxed();

        registry.with(file_layer).with(console_layer).init();
    } else {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .compact()
            .boxed();

        registry.with(console_layer).init();
    }

    info!("Log level: {}", config.level);
    if config.enable_file_logging {
        info!("File logging enabled: {}", config.log_dir.display());
    }

    Ok(())
}

/// Performance logging utilities
pub struct PerformanceTimer {
    start: std::time::Instant,
    operation: String,
}

impl PerformanceTimer {
    pub fn start(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        info!("Starting: {}", operation);
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    pub fn checkpoint(&self, checkpoint: &str) {
        let elapsed = self.start.elapsed();
        info!("{} - {}: {}ms", self.operation, checkpoint, elapsed.as_millis());
    }
}

impl Drop for PerformanceTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        info!("Completed {}: {}ms", self.operation, elapsed.as_millis());
    }
}
