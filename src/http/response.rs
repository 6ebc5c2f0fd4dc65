//! Response bodies and error mapping.
//!
//! # Responsibilities
//! - Shape catalog results into JSON bodies
//! - Map catalog errors to HTTP status codes
//!
//! # Design Decisions
//! - Rejections are 422 with the exact validation reason
//! - Warnings ride along on a 201 so clients can show a distinct banner
//! - Store failures are 500 and never leak internal detail beyond the message

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::catalog::{AddedCourse, CatalogError, CourseRecord, RejectReason, WarningReason};
use crate::observability::tracing::Classify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    Accepted,
    Warned,
}

#[derive(Debug, Serialize)]
pub struct WarningBody {
    pub kind: &'static str,
    pub message: String,
}

impl From<&WarningReason> for WarningBody {
    fn from(reason: &WarningReason) -> Self {
        Self {
            kind: reason.kind(),
            message: reason.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddCourseResponse {
    pub outcome: AddOutcome,
    pub course: CourseRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<WarningBody>,
}

impl From<AddedCourse> for AddCourseResponse {
    fn from(added: AddedCourse) -> Self {
        let outcome = if added.warning.is_some() {
            AddOutcome::Warned
        } else {
            AddOutcome::Accepted
        };
        Self {
            outcome,
            warning: added.warning.as_ref().map(WarningBody::from),
            course: added.course,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub outcome: &'static str,
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

/// Errors returned by HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    Catalog(CatalogError),
    /// The operation task died before producing a result.
    Internal(String),
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        ApiError::Catalog(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Catalog(e) => {
                let (status, outcome, field) = match &e {
                    CatalogError::Rejected(RejectReason::MissingField { field }) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "rejected", Some(*field))
                    }
                    CatalogError::Rejected(_) => (StatusCode::UNPROCESSABLE_ENTITY, "rejected", None),
                    CatalogError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
                    CatalogError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "error", None),
                };
                let body = ErrorBody {
                    outcome,
                    kind: e.error_kind(),
                    message: e.to_string(),
                    field,
                };
                (status, body)
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Catalog operation aborted");
                let body = ErrorBody {
                    outcome: "error",
                    kind: "internal",
                    message: "internal error".to_string(),
                    field: None,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CourseId;
    use crate::store::StoreError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                CatalogError::Rejected(RejectReason::MissingField { field: "name" }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (CatalogError::Rejected(RejectReason::InvalidCredits), StatusCode::UNPROCESSABLE_ENTITY),
            (CatalogError::NotFound(CourseId::from("x")), StatusCode::NOT_FOUND),
            (
                CatalogError::Store(StoreError::Unavailable("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(ApiError::from(error).into_response().status(), status);
        }
        assert_eq!(
            ApiError::Internal("join".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
