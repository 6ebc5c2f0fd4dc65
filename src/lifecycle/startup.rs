//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the record store selected by configuration
//! - Build the span exporter and start its batch task
//! - Assemble the instrumented catalog service
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;

use thiserror::Error;

use crate::catalog::CatalogService;
use crate::config::{CatalogConfig, SpanExporterKind};
use crate::observability::metrics::MetricsAggregator;
use crate::observability::otlp::{OtlpError, OtlpExporter};
use crate::observability::tracing::{LogExporter, NoopExporter, SpanExporter, Tracer};
use crate::observability::Instrumentation;
use crate::store::{self, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open record store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to build span exporter: {0}")]
    Exporter(#[from] OtlpError),
}

/// Everything the HTTP server needs, plus the exporter to flush after it stops.
pub struct Services {
    pub catalog: CatalogService,
    pub otlp: Option<OtlpExporter>,
}

/// Build the catalog service from configuration.
///
/// Must be called from within a Tokio runtime when the OTLP exporter is
/// selected.
pub fn build_services(config: &CatalogConfig) -> Result<Services, StartupError> {
    let store = store::open(&config.store)?;
    tracing::info!(backend = ?config.store.backend, "Record store opened");

    let mut otlp = None;
    let tracing_config = &config.observability.tracing;
    let exporter: Arc<dyn SpanExporter> = match tracing_config.exporter {
        SpanExporterKind::None => Arc::new(NoopExporter),
        SpanExporterKind::Log => Arc::new(LogExporter),
        SpanExporterKind::Otlp => {
            let exporter = OtlpExporter::new(tracing_config, &config.observability.service_name)?;
            otlp = Some(exporter.clone());
            Arc::new(exporter)
        }
    };
    tracing::info!(exporter = ?tracing_config.exporter, "Span exporter ready");

    let instrumentation = Instrumentation::new(Tracer::new(exporter), Arc::new(MetricsAggregator::new()));
    let catalog = CatalogService::new(store, config.validation.clone(), instrumentation);

    Ok(Services { catalog, otlp })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CourseCandidate;
    use crate::config::StoreBackend;

    #[test]
    fn test_build_memory_services() {
        let mut config = CatalogConfig::default();
        config.store.backend = StoreBackend::Memory;
        config.observability.tracing.exporter = SpanExporterKind::None;

        let services = build_services(&config).unwrap();
        assert!(services.otlp.is_none());

        services
            .catalog
            .add_course(CourseCandidate::new("Algo", "CS101", 4, "Dr. A"))
            .unwrap();
        assert_eq!(services.catalog.list_courses().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_build_otlp_services() {
        let mut config = CatalogConfig::default();
        config.store.backend = StoreBackend::Memory;
        config.observability.tracing.exporter = SpanExporterKind::Otlp;
        config.observability.tracing.otlp_endpoint = "http://127.0.0.1:9".to_string();
        config.observability.tracing.export_timeout_ms = 200;

        let services = build_services(&config).unwrap();
        services.catalog.list_courses().unwrap();

        let exporter = services.otlp.expect("OTLP exporter");
        tokio::time::timeout(std::time::Duration::from_secs(5), exporter.shutdown())
            .await
            .expect("exporter did not stop");
    }

    #[test]
    fn test_corrupt_catalog_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "[{").unwrap();

        let mut config = CatalogConfig::default();
        config.store.path = path.to_string_lossy().into_owned();

        assert!(matches!(
            build_services(&config),
            Err(StartupError::Store(_))
        ));
    }
}
