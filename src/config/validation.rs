//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. Every problem is
//! reported, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{CatalogConfig, SpanExporterKind, StoreBackend};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &CatalogConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::new("listener.max_body_size", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.store.backend == StoreBackend::JsonFile && config.store.path.trim().is_empty() {
        errors.push(ValidationError::new("store.path", "required for the json_file backend"));
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("'{}' is not one of {}", observability.log_level, LOG_LEVELS.join(", ")),
        ));
    }
    if observability.service_name.trim().is_empty() {
        errors.push(ValidationError::new("observability.service_name", "must not be empty"));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if let Some(log_file) = &observability.log_file {
        if log_file.directory.trim().is_empty() {
            errors.push(ValidationError::new("observability.log_file.directory", "must not be empty"));
        }
        if log_file.prefix.trim().is_empty() {
            errors.push(ValidationError::new("observability.log_file.prefix", "must not be empty"));
        }
        if log_file.max_files == 0 {
            errors.push(ValidationError::new(
                "observability.log_file.max_files",
                "must be greater than 0",
            ));
        }
    }

    let tracing = &observability.tracing;
    if tracing.exporter == SpanExporterKind::Otlp
        && !(tracing.otlp_endpoint.starts_with("http://") || tracing.otlp_endpoint.starts_with("https://"))
    {
        errors.push(ValidationError::new(
            "observability.tracing.otlp_endpoint",
            "must be an http(s) URL",
        ));
    }
    if tracing.batch_size == 0 {
        errors.push(ValidationError::new("observability.tracing.batch_size", "must be greater than 0"));
    }
    if tracing.batch_size > tracing.max_queue_size {
        errors.push(ValidationError::new(
            "observability.tracing.batch_size",
            format!("must not exceed max_queue_size ({})", tracing.max_queue_size),
        ));
    }
    if tracing.flush_interval_ms == 0 {
        errors.push(ValidationError::new(
            "observability.tracing.flush_interval_ms",
            "must be greater than 0",
        ));
    }
    if tracing.export_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "observability.tracing.export_timeout_ms",
            "must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
