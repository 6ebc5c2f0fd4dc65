//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count every catalog operation by route and outcome
//! - Count errors by route and error kind
//! - Expose an in-process snapshot for the API and CLI
//! - Mirror counts into the `metrics` facade for Prometheus scraping
//!
//! # Metrics
//! - `catalog_requests_total` (counter): requests by route, outcome
//! - `catalog_errors_total` (counter): errors by route, kind
//! - `catalog_request_duration_seconds` (histogram): latency by route
//!
//! # Design Decisions
//! - Counters only ever increase; there is no reset short of a restart
//! - Increments happen under a dashmap shard lock, so concurrent requests
//!   never lose updates

use dashmap::DashMap;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Tri-state classification of an operation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    ClientError,
    ServerError,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::ClientError => "client_error",
            OutcomeKind::ServerError => "server_error",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, OutcomeKind::Success)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for a single route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteCounters {
    pub outcomes: BTreeMap<OutcomeKind, u64>,
    pub errors: BTreeMap<String, u64>,
}

impl RouteCounters {
    pub fn count(&self, outcome: OutcomeKind) -> u64 {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.outcomes.values().sum()
    }

    pub fn error_total(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|(kind, _)| kind.is_error())
            .map(|(_, n)| n)
            .sum()
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub routes: BTreeMap<String, RouteCounters>,
}

impl MetricsSnapshot {
    pub fn route(&self, route: &str) -> RouteCounters {
        self.routes.get(route).cloned().unwrap_or_default()
    }

    pub fn total_requests(&self) -> u64 {
        self.routes.values().map(RouteCounters::total).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.routes.values().map(RouteCounters::error_total).sum()
    }
}

/// Process-wide request and error counters.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    outcomes: DashMap<(&'static str, OutcomeKind), u64>,
    errors: DashMap<(&'static str, &'static str), u64>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one completed request on `route`.
    pub fn record(&self, route: &'static str, outcome: OutcomeKind) {
        *self.outcomes.entry((route, outcome)).or_insert(0) += 1;
        metrics::counter!("catalog_requests_total", "route" => route, "outcome" => outcome.as_str())
            .increment(1);
    }

    /// Count one error of `kind` on `route`.
    pub fn record_error(&self, route: &'static str, kind: &'static str) {
        *self.errors.entry((route, kind)).or_insert(0) += 1;
        metrics::counter!("catalog_errors_total", "route" => route, "kind" => kind).increment(1);
    }

    pub fn record_duration(&self, route: &'static str, duration: Duration) {
        metrics::histogram!("catalog_request_duration_seconds", "route" => route)
            .record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot::default();
        for entry in self.outcomes.iter() {
            let ((route, outcome), count) = (*entry.key(), *entry.value());
            snapshot
                .routes
                .entry(route.to_string())
                .or_default()
                .outcomes
                .insert(outcome, count);
        }
        for entry in self.errors.iter() {
            let ((route, kind), count) = (*entry.key(), *entry.value());
            snapshot
                .routes
                .entry(route.to_string())
                .or_default()
                .errors
                .insert(kind.to_string(), count);
        }
        snapshot
    }
}

/// Install the Prometheus recorder with an HTTP scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus metrics exporter started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}
