//! Route handlers.
//!
//! Handlers only translate between HTTP and the catalog service. Catalog
//! operations touch the record store synchronously, so they run on the
//! blocking pool inside the request's log span.
//!
//! The add body is taken as raw JSON so that any well-formed body reaches
//! validation, whatever its field types.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::catalog::{CatalogError, CatalogService, CourseCandidate, CourseId, CourseRecord};
use crate::http::response::{AddCourseResponse, ApiError};
use crate::http::server::AppState;
use crate::observability::metrics::MetricsSnapshot;
use crate::observability::RequestContext;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn list_courses(
    State(state): State<AppState>,
    request: RequestContext,
) -> Result<Json<Vec<CourseRecord>>, ApiError> {
    let courses = run_blocking(&state, request, |catalog| catalog.list_courses()).await?;
    Ok(Json(courses))
}

pub async fn add_course(
    State(state): State<AppState>,
    request: RequestContext,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<AddCourseResponse>), ApiError> {
    let candidate = CourseCandidate::from_json(body);
    let added = run_blocking(&state, request, move |catalog| catalog.add_course(candidate)).await?;
    Ok((StatusCode::CREATED, Json(AddCourseResponse::from(added))))
}

pub async fn get_course(
    State(state): State<AppState>,
    request: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<CourseRecord>, ApiError> {
    let id = CourseId::from(id);
    let course = run_blocking(&state, request, move |catalog| catalog.get_course(&id)).await?;
    Ok(Json(course))
}

pub async fn delete_course(
    State(state): State<AppState>,
    request: RequestContext,
    Path(id): Path<String>,
) -> Result<Json<CourseRecord>, ApiError> {
    let id = CourseId::from(id);
    let course = run_blocking(&state, request, move |catalog| catalog.delete_course(&id)).await?;
    Ok(Json(course))
}

pub async fn metrics_snapshot(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.catalog.instrumentation().metrics().snapshot())
}

async fn run_blocking<T, F>(state: &AppState, request: RequestContext, operation: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&CatalogService) -> Result<T, CatalogError> + Send + 'static,
{
    let catalog = state.catalog.for_request(request);
    let span = tracing::Span::current();

    tokio::task::spawn_blocking(move || span.in_scope(|| operation(&catalog)))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}
