//! Request identification.
//!
//! # Responsibilities
//! - Name the request ID header
//! - Open the per-request log span carrying method, path and request ID
//! - Extract the request details that catalog spans are tagged with
//!
//! # Design Decisions
//! - Request ID added as early as possible (outermost layer) for tracing
//! - Client-supplied IDs are kept so callers can correlate their own logs

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{header, request::Parts, HeaderMap, Request};
use tracing::Span;

use crate::observability::RequestContext;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Read the request ID header, if it is present and valid UTF-8.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Log span for one HTTP request; used as the `TraceLayer` span maker.
pub fn make_request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id(request.headers()),
    )
}

/// Method, full URL, peer address and request ID of the request.
///
/// The peer address is only known when the server was started with connect
/// info.
pub fn request_context(parts: &Parts) -> RequestContext {
    let path = parts.uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let url = match parts.headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("http://{}{}", host, path),
        None => path.to_string(),
    };

    RequestContext {
        method: parts.method.to_string(),
        url,
        client_ip: parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string()),
        request_id: parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(request_context(parts))
    }
}
