//! Per-request spans.
//!
//! # Responsibilities
//! - Open one span per catalog operation
//! - Tag it with route, operation kind, outcome and error kind
//! - Close and export it exactly once, whatever path the operation takes
//!
//! # Design Decisions
//! - The span lives in a drop guard, so returns, errors and panics all export
//! - Export is a trait; transports (log, OTLP) stay out of the core
//! - Ids follow the W3C sizes: 16-byte trace id, 8-byte span id, hex encoded

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use serde::Serialize;
use uuid::Uuid;

use crate::observability::metrics::{MetricsAggregator, OutcomeKind};

/// What a route does to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    List,
    Read,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::List => "list",
            OperationKind::Read => "read",
            OperationKind::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStatus {
    Ok,
    Error,
}

/// Errors that can be classified for spans and counters.
pub trait Classify {
    fn outcome(&self) -> OutcomeKind;
    fn error_kind(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpanEvent {
    pub name: String,
    pub timestamp: SystemTime,
    pub attributes: BTreeMap<&'static str, String>,
}

/// A closed span, ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRecord {
    pub trace_id: String,
    pub span_id: String,
    pub route: &'static str,
    pub operation: OperationKind,
    pub status: SpanStatus,
    pub outcome: OutcomeKind,
    pub error_kind: Option<&'static str>,
    pub message: Option<String>,
    pub attributes: BTreeMap<&'static str, String>,
    pub events: Vec<SpanEvent>,
    pub start: SystemTime,
    pub end: SystemTime,
    pub duration: Duration,
}

impl SpanRecord {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Destination for closed spans.
///
/// Called on the request path, so implementations must not block.
pub trait SpanExporter: Send + Sync {
    fn export(&self, span: SpanRecord);
}

/// Discards every span.
#[derive(Debug, Default)]
pub struct NoopExporter;

impl SpanExporter for NoopExporter {
    fn export(&self, _span: SpanRecord) {}
}

/// Writes every span as a structured log event.
#[derive(Debug, Default)]
pub struct LogExporter;

impl SpanExporter for LogExporter {
    fn export(&self, span: SpanRecord) {
        tracing::info!(
            target: "course_catalog::span",
            trace_id = %span.trace_id,
            span_id = %span.span_id,
            route = span.route,
            operation = span.operation.as_str(),
            outcome = span.outcome.as_str(),
            error_kind = span.error_kind.unwrap_or(""),
            duration_us = span.duration.as_micros() as u64,
            attributes = ?span.attributes,
            "span closed"
        );
    }
}

/// Keeps spans in memory for inspection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExporter {
    spans: Arc<Mutex<Vec<SpanRecord>>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.spans.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SpanExporter for InMemoryExporter {
    fn export(&self, span: SpanRecord) {
        if let Ok(mut spans) = self.spans.lock() {
            spans.push(span);
        }
    }
}

struct Completion {
    outcome: OutcomeKind,
    error_kind: Option<&'static str>,
    message: Option<String>,
}

/// An open span. Exported when dropped.
pub struct ActiveSpan {
    trace_id: String,
    span_id: String,
    route: &'static str,
    operation: OperationKind,
    attributes: BTreeMap<&'static str, String>,
    events: Vec<SpanEvent>,
    start: SystemTime,
    started: Instant,
    completion: Option<Completion>,
    exporter: Arc<dyn SpanExporter>,
    metrics: Option<Arc<MetricsAggregator>>,
}

impl ActiveSpan {
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn set_attribute(&mut self, key: &'static str, value: impl ToString) {
        self.attributes.insert(key, value.to_string());
    }

    pub fn add_event(&mut self, name: impl Into<String>, attributes: BTreeMap<&'static str, String>) {
        self.events.push(SpanEvent {
            name: name.into(),
            timestamp: SystemTime::now(),
            attributes,
        });
    }

    /// Flag a problem that did not stop the operation.
    pub fn warn(&mut self, kind: &'static str, message: impl fmt::Display) {
        let message = message.to_string();
        self.set_attribute("warning.kind", kind);
        self.set_attribute("warning.message", &message);

        let mut attributes = BTreeMap::new();
        attributes.insert("severity", "warning".to_string());
        attributes.insert("details", message);
        self.add_event("Potential issue detected", attributes);
    }

    /// Count this span in `metrics` when it closes.
    pub fn with_metrics(mut self, metrics: Arc<MetricsAggregator>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn succeed(&mut self) {
        self.completion = Some(Completion {
            outcome: OutcomeKind::Success,
            error_kind: None,
            message: None,
        });
    }

    pub fn fail<E: Classify + fmt::Display>(&mut self, error: &E) {
        self.completion = Some(Completion {
            outcome: error.outcome(),
            error_kind: Some(error.error_kind()),
            message: Some(error.to_string()),
        });
    }

    fn close(&mut self) -> SpanRecord {
        let completion = self.completion.take().unwrap_or_else(|| Completion {
            outcome: OutcomeKind::ServerError,
            error_kind: Some(if std::thread::panicking() { "panic" } else { "aborted" }),
            message: Some("operation ended without reporting an outcome".to_string()),
        });

        let mut attributes = std::mem::take(&mut self.attributes);
        attributes.insert("route", self.route.to_string());
        attributes.insert("operation", self.operation.as_str().to_string());
        attributes.insert("outcome", completion.outcome.as_str().to_string());
        if let Some(kind) = completion.error_kind {
            attributes.insert("error.kind", kind.to_string());
        }
        if let Some(message) = &completion.message {
            attributes.insert("error.message", message.clone());
        }

        let status = if completion.outcome.is_error() {
            SpanStatus::Error
        } else {
            SpanStatus::Ok
        };

        SpanRecord {
            trace_id: std::mem::take(&mut self.trace_id),
            span_id: std::mem::take(&mut self.span_id),
            route: self.route,
            operation: self.operation,
            status,
            outcome: completion.outcome,
            error_kind: completion.error_kind,
            message: completion.message,
            attributes,
            events: std::mem::take(&mut self.events),
            start: self.start,
            end: SystemTime::now(),
            duration: self.started.elapsed(),
        }
    }
}

impl Drop for ActiveSpan {
    fn drop(&mut self) {
        let record = self.close();

        if let Some(metrics) = &self.metrics {
            metrics.record(record.route, record.outcome);
            if let Some(kind) = record.error_kind {
                metrics.record_error(record.route, kind);
            }
            metrics.record_duration(record.route, record.duration);
        }

        self.exporter.export(record);
    }
}

/// Opens spans and hands closed ones to an exporter.
#[derive(Clone)]
pub struct Tracer {
    exporter: Arc<dyn SpanExporter>,
}

impl Tracer {
    pub fn new(exporter: Arc<dyn SpanExporter>) -> Self {
        Self { exporter }
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(NoopExporter))
    }

    pub fn start_span(&self, route: &'static str, operation: OperationKind) -> ActiveSpan {
        let trace_id = Uuid::new_v4().simple().to_string();
        let span_id = Uuid::new_v4().simple().to_string()[..16].to_string();

        ActiveSpan {
            trace_id,
            span_id,
            route,
            operation,
            attributes: BTreeMap::new(),
            events: Vec::new(),
            start: SystemTime::now(),
            started: Instant::now(),
            completion: None,
            exporter: self.exporter.clone(),
            metrics: None,
        }
    }

    /// Run `body` inside a span tagged with its outcome.
    pub fn in_span<T, E, F>(&self, route: &'static str, operation: OperationKind, body: F) -> Result<T, E>
    where
        E: Classify + fmt::Display,
        F: FnOnce(&mut ActiveSpan) -> Result<T, E>,
    {
        run_in(self.start_span(route, operation), body)
    }
}

pub(crate) fn run_in<T, E, F>(mut span: ActiveSpan, body: F) -> Result<T, E>
where
    E: Classify + fmt::Display,
    F: FnOnce(&mut ActiveSpan) -> Result<T, E>,
{
    let result = body(&mut span);
    match &result {
        Ok(_) => span.succeed(),
        Err(e) => span.fail(e),
    }
    result
}
