//! OTLP/HTTP span export through the OpenTelemetry SDK.
//!
//! Closed spans are replayed into an SDK tracer with their original ids,
//! timestamps, attributes and events. The SDK batch processor queues them and
//! a Tokio task posts protobuf batches to `<endpoint>/v1/traces`, the
//! ingestion route served by Jaeger and the OpenTelemetry collector.
//!
//! # Design Decisions
//! - The queue is bounded by `max_queue_size`; spans beyond it are dropped
//!   and requests never wait on the collector
//! - The exporter does not listen for the shutdown signal. It is flushed by
//!   [`OtlpExporter::shutdown`] once the HTTP server has drained, so spans
//!   closed by in-flight requests still go out

use std::time::Duration;

use opentelemetry::trace::{
    Event, Span as _, SpanBuilder, SpanId, SpanKind, Status, TraceError, TraceId, Tracer as _,
    TracerProvider as _,
};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::export::trace::SpanExporter as SdkSpanExporter;
use opentelemetry_sdk::trace::{self as sdktrace, BatchConfigBuilder, BatchSpanProcessor, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use thiserror::Error;

use crate::config::TracingConfig;
use crate::observability::tracing::{SpanExporter, SpanRecord, SpanStatus};

#[derive(Debug, Error)]
pub enum OtlpError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to build OTLP exporter: {0}")]
    Exporter(#[from] TraceError),
}

/// Span exporter backed by an OpenTelemetry tracer provider.
#[derive(Clone)]
pub struct OtlpExporter {
    provider: TracerProvider,
    tracer: sdktrace::Tracer,
}

impl OtlpExporter {
    /// Build the exporter and start its batch task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &TracingConfig, service_name: &str) -> Result<Self, OtlpError> {
        let timeout = Duration::from_millis(config.export_timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let url = traces_url(&config.otlp_endpoint);
        let exporter = opentelemetry_otlp::new_exporter()
            .http()
            .with_http_client(client)
            .with_endpoint(url.clone())
            .with_timeout(timeout)
            .build_span_exporter()?;

        tracing::info!(
            url = %url,
            batch_size = config.batch_size,
            max_queue_size = config.max_queue_size,
            "OTLP span exporter starting"
        );
        Ok(Self::with_exporter(exporter, config, service_name))
    }

    /// Batch spans into any SDK exporter.
    pub fn with_exporter<E>(exporter: E, config: &TracingConfig, service_name: &str) -> Self
    where
        E: SdkSpanExporter + 'static,
    {
        let batch = BatchConfigBuilder::default()
            .with_max_queue_size(config.max_queue_size.max(1))
            .with_max_export_batch_size(config.batch_size.max(1))
            .with_scheduled_delay(Duration::from_millis(config.flush_interval_ms.max(1)))
            .with_max_export_timeout(Duration::from_millis(config.export_timeout_ms))
            .build();
        let processor = BatchSpanProcessor::builder(exporter, runtime::Tokio)
            .with_batch_config(batch)
            .build();

        let resource = Resource::new(vec![KeyValue::new("service.name", service_name.to_string())]);
        let provider = TracerProvider::builder()
            .with_span_processor(processor)
            .with_config(sdktrace::Config::default().with_resource(resource))
            .build();
        let tracer = provider.tracer(env!("CARGO_PKG_NAME"));

        Self { provider, tracer }
    }

    /// Export every queued span, then stop the batch task.
    ///
    /// Call after the HTTP server has stopped so late spans are included.
    pub async fn shutdown(self) {
        let Self { provider, tracer } = self;
        drop(tracer);

        // The SDK blocks on the batch task; keep that off the async workers.
        match tokio::task::spawn_blocking(move || provider.shutdown()).await {
            Ok(Ok(())) => tracing::info!("OTLP exporter flushed and stopped"),
            Ok(Err(e)) => tracing::warn!(error = %e, "OTLP exporter shutdown failed"),
            Err(e) => tracing::warn!(error = %e, "OTLP exporter shutdown task failed"),
        }
    }
}

impl SpanExporter for OtlpExporter {
    fn export(&self, span: SpanRecord) {
        let attributes: Vec<KeyValue> = span
            .attributes
            .into_iter()
            .map(|(key, value)| KeyValue::new(key, value))
            .collect();
        let events: Vec<Event> = span
            .events
            .into_iter()
            .map(|event| {
                let attributes = event
                    .attributes
                    .into_iter()
                    .map(|(key, value)| KeyValue::new(key, value))
                    .collect();
                Event::new(event.name, event.timestamp, attributes, 0)
            })
            .collect();

        let mut builder = SpanBuilder::from_name(span.route)
            .with_kind(SpanKind::Server)
            .with_start_time(span.start)
            .with_attributes(attributes)
            .with_events(events);
        builder.trace_id = TraceId::from_hex(&span.trace_id).ok();
        builder.span_id = SpanId::from_hex(&span.span_id).ok();

        let mut otel_span = self.tracer.build(builder);
        otel_span.set_status(match span.status {
            SpanStatus::Ok => Status::Ok,
            SpanStatus::Error => Status::error(span.message.unwrap_or_default()),
        });
        otel_span.end_with_timestamp(span.end);
    }
}

/// The OTLP/HTTP traces route under `endpoint`.
pub fn traces_url(endpoint: &str) -> String {
    format!("{}/v1/traces", endpoint.trim_end_matches('/'))
}
