//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Pick the console output format from configuration
//! - Optionally mirror every event as JSON into rotating log files
//!
//! # Design Decisions
//! - JSON format for production, pretty or compact for development
//! - `RUST_LOG` wins over the configured level when set
//! - File output goes through a non-blocking writer; keep the returned guard
//!   alive or buffered lines are lost
//! - Safe to call more than once; later calls are no-ops

use std::fs;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::{LogFileConfig, LogFormat, LogRotation, ObservabilityConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open log file: {0}")]
    Appender(#[from] InitError),
}

/// Keeps the log file writer alive. Dropping it flushes pending lines.
#[must_use]
pub struct LogGuard {
    installed: bool,
    _file: Option<WorkerGuard>,
}

impl LogGuard {
    /// Whether this call installed the global subscriber.
    pub fn installed(&self) -> bool {
        self.installed
    }
}

/// Initialize logging for the process.
pub fn init(config: &ObservabilityConfig) -> Result<LogGuard, LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let (layers, file_guard) = build_layers(config)?;
    let installed = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .is_ok();

    Ok(LogGuard {
        installed,
        _file: file_guard,
    })
}

fn build_layers(config: &ObservabilityConfig) -> Result<(Vec<BoxedLayer>, Option<WorkerGuard>), LoggingError> {
    let console: BoxedLayer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().pretty().boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer().compact().boxed(),
    };
    let mut layers = vec![console];

    let Some(file) = &config.log_file else {
        return Ok((layers, None));
    };

    let (writer, guard) = tracing_appender::non_blocking(rolling_appender(file)?);
    layers.push(
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(false)
            .with_writer(writer)
            .boxed(),
    );
    Ok((layers, Some(guard)))
}

fn rolling_appender(config: &LogFileConfig) -> Result<RollingFileAppender, LoggingError> {
    fs::create_dir_all(&config.directory)?;

    let rotation = match config.rotation {
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.clone())
        .filename_suffix(config.suffix.clone())
        .max_log_files(config.max_files)
        .build(&config.directory)?;
    Ok(appender)
}

fn default_directives(level: &str) -> String {
    format!("course_catalog={level},tower_http={level}")
}
