//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every catalog operation runs inside Instrumentation::run:
//!     → tracing.rs (one span per call, closed by a drop guard)
//!         → SpanExporter (log, OpenTelemetry OTLP/HTTP, in-memory)
//!     → metrics.rs (route/outcome counters, error kinds, latency)
//!
//! Consumers:
//!     → Log aggregation (logging.rs, stdout)
//!     → Metrics snapshot (GET /metrics/snapshot) and Prometheus scrape
//!     → Distributed tracing backend (otlp.rs, e.g. Jaeger)
//! ```
//!
//! # Design Decisions
//! - Instrumentation is applied by one wrapper, never per route by hand
//! - The span guard owns the metrics increment, so both happen exactly once

pub mod logging;
pub mod metrics;
pub mod otlp;
pub mod tracing;

use std::fmt;
use std::sync::Arc;

use self::metrics::MetricsAggregator;
use self::tracing::{run_in, ActiveSpan, Classify, OperationKind, Tracer};

/// Where an operation was requested from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub method: String,
    pub url: String,
    pub client_ip: Option<String>,
    pub request_id: Option<String>,
}

impl RequestContext {
    fn tag(&self, span: &mut ActiveSpan) {
        span.set_attribute("http.method", &self.method);
        span.set_attribute("http.url", &self.url);
        if let Some(ip) = &self.client_ip {
            span.set_attribute("user.ip", ip);
        }
        if let Some(id) = &self.request_id {
            span.set_attribute("http.request_id", id);
        }
    }
}

/// Tracer and counters applied together to every operation.
#[derive(Clone)]
pub struct Instrumentation {
    tracer: Tracer,
    metrics: Arc<MetricsAggregator>,
    request: Option<Arc<RequestContext>>,
}

impl Instrumentation {
    pub fn new(tracer: Tracer, metrics: Arc<MetricsAggregator>) -> Self {
        Self {
            tracer,
            metrics,
            request: None,
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsAggregator> {
        &self.metrics
    }

    /// A copy that tags every span with `request`.
    pub fn for_request(&self, request: RequestContext) -> Self {
        Self {
            request: Some(Arc::new(request)),
            ..self.clone()
        }
    }

    /// Run `body` in a span for `route`, counting its outcome once.
    pub fn run<T, E, F>(&self, route: &'static str, operation: OperationKind, body: F) -> Result<T, E>
    where
        E: Classify + fmt::Display,
        F: FnOnce(&mut ActiveSpan) -> Result<T, E>,
    {
        let mut span = self
            .tracer
            .start_span(route, operation)
            .with_metrics(self.metrics.clone());
        if let Some(request) = &self.request {
            request.tag(&mut span);
        }
        run_in(span, body)
    }
}
