//! Catalog operations.
//!
//! Each operation runs through [`Instrumentation::run`], which opens the span,
//! counts the outcome, and exports on every exit path.

use std::sync::Arc;
use thiserror::Error;

use crate::catalog::types::{CourseCandidate, CourseId, CourseRecord};
use crate::catalog::validator::{RejectReason, ValidationConfig, ValidationOutcome, Validator, WarningReason};
use crate::observability::metrics::OutcomeKind;
use crate::observability::tracing::{Classify, OperationKind};
use crate::observability::{Instrumentation, RequestContext};
use crate::store::{CourseStore, StoreError};

/// Route names used for spans and counters.
pub mod routes {
    pub const ADD_COURSE: &str = "add-course";
    pub const LIST_COURSES: &str = "render-course-catalog";
    pub const VIEW_COURSE: &str = "view-course-details";
    pub const DELETE_COURSE: &str = "delete-course";
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    Rejected(RejectReason),

    #[error("no course found with id '{0}'")]
    NotFound(CourseId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Classify for CatalogError {
    fn outcome(&self) -> OutcomeKind {
        match self {
            CatalogError::Rejected(_) | CatalogError::NotFound(_) => OutcomeKind::ClientError,
            CatalogError::Store(_) => OutcomeKind::ServerError,
        }
    }

    fn error_kind(&self) -> &'static str {
        match self {
            CatalogError::Rejected(reason) => reason.kind(),
            CatalogError::NotFound(_) => "not_found",
            CatalogError::Store(_) => "store_failure",
        }
    }
}

/// A course that was written, with the warning raised while validating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedCourse {
    pub course: CourseRecord,
    pub warning: Option<WarningReason>,
}

/// Validates, stores and instruments course operations.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CourseStore>,
    validator: Validator,
    instrumentation: Instrumentation,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn CourseStore>,
        validation: ValidationConfig,
        instrumentation: Instrumentation,
    ) -> Self {
        Self {
            store,
            validator: Validator::new(validation),
            instrumentation,
        }
    }

    pub fn instrumentation(&self) -> &Instrumentation {
        &self.instrumentation
    }

    /// A handle whose spans carry the caller's request details.
    pub fn for_request(&self, request: RequestContext) -> Self {
        Self {
            instrumentation: self.instrumentation.for_request(request),
            ..self.clone()
        }
    }

    pub fn add_course(&self, candidate: CourseCandidate) -> Result<AddedCourse, CatalogError> {
        self.instrumentation
            .run(routes::ADD_COURSE, OperationKind::Create, |span| {
                let code = candidate.code.trim();
                span.set_attribute("course.code", code);

                let existing = self.store.list().map_err(store_failure)?;
                let warning = match self.validator.validate(&candidate, &existing) {
                    ValidationOutcome::Rejected(reason) => {
                        tracing::error!(event = "course-add-error", code, reason = %reason, "Course rejected");
                        return Err(CatalogError::Rejected(reason));
                    }
                    ValidationOutcome::Warned(reason) => {
                        tracing::warn!(event = "course-add-warning", code, reason = %reason, "Course accepted with warning");
                        span.warn(reason.kind(), &reason);
                        Some(reason)
                    }
                    ValidationOutcome::Accepted => None,
                };

                let draft = candidate
                    .to_draft()
                    .ok_or(CatalogError::Rejected(RejectReason::InvalidCredits))?;
                let course = self.store.create(draft).map_err(store_failure)?;
                span.set_attribute("course.id", &course.id);

                tracing::info!(
                    event = "course-added",
                    id = %course.id,
                    code = %course.code,
                    name = %course.name,
                    "Course added"
                );
                Ok(AddedCourse { course, warning })
            })
    }

    pub fn list_courses(&self) -> Result<Vec<CourseRecord>, CatalogError> {
        self.instrumentation
            .run(routes::LIST_COURSES, OperationKind::List, |span| {
                let courses = self.store.list().map_err(store_failure)?;
                span.set_attribute("courses.count", courses.len());
                tracing::debug!(event = "render-course-catalog", count = courses.len(), "Listed courses");
                Ok(courses)
            })
    }

    pub fn get_course(&self, id: &CourseId) -> Result<CourseRecord, CatalogError> {
        self.instrumentation
            .run(routes::VIEW_COURSE, OperationKind::Read, |span| {
                span.set_attribute("course.id", id);
                match self.store.get(id).map_err(store_failure)? {
                    Some(course) => {
                        span.set_attribute("course.code", &course.code);
                        tracing::info!(event = "view-course-details", id = %id, "Course viewed");
                        Ok(course)
                    }
                    None => {
                        tracing::error!(event = "view-course-details-error", id = %id, "No course found");
                        Err(CatalogError::NotFound(id.clone()))
                    }
                }
            })
    }

    pub fn delete_course(&self, id: &CourseId) -> Result<CourseRecord, CatalogError> {
        self.instrumentation
            .run(routes::DELETE_COURSE, OperationKind::Delete, |span| {
                span.set_attribute("course.id", id);
                match self.store.delete(id).map_err(store_failure)? {
                    Some(course) => {
                        span.set_attribute("course.code", &course.code);
                        tracing::info!(event = "course-deleted", id = %id, code = %course.code, "Course deleted");
                        Ok(course)
                    }
                    None => {
                        tracing::error!(event = "course-delete-error", id = %id, "No course found");
                        Err(CatalogError::NotFound(id.clone()))
                    }
                }
            })
    }
}

fn store_failure(e: StoreError) -> CatalogError {
    tracing::error!(event = "store-failure", error = %e, "Record store failed");
    CatalogError::Store(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{CourseDraft, CreditsInput};
    use crate::observability::metrics::MetricsAggregator;
    use crate::observability::tracing::{InMemoryExporter, SpanStatus, Tracer};
    use crate::store::MemoryStore;

    struct BrokenStore;

    impl CourseStore for BrokenStore {
        fn create(&self, _draft: CourseDraft) -> Result<CourseRecord, StoreError> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
        fn list(&self) -> Result<Vec<CourseRecord>, StoreError> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
        fn get(&self, _id: &CourseId) -> Result<Option<CourseRecord>, StoreError> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
        fn delete(&self, _id: &CourseId) -> Result<Option<CourseRecord>, StoreError> {
            Err(StoreError::Unavailable("disk gone".into()))
        }
    }

    fn service_with(store: Arc<dyn CourseStore>) -> (CatalogService, InMemoryExporter) {
        let exporter = InMemoryExporter::new();
        let instrumentation = Instrumentation::new(
            Tracer::new(Arc::new(exporter.clone())),
            Arc::new(MetricsAggregator::new()),
        );
        let service = CatalogService::new(store, ValidationConfig::default(), instrumentation);
        (service, exporter)
    }

    fn service() -> (CatalogService, InMemoryExporter) {
        service_with(Arc::new(MemoryStore::new()))
    }

    fn algo() -> CourseCandidate {
        CourseCandidate::new("Algo", "CS101", 4, "Dr. A")
    }

    #[test]
    fn test_add_scenario() {
        let (service, exporter) = service();

        let err = service
            .add_course(CourseCandidate::new("", "CS101", 4, "Dr. A"))
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Rejected(RejectReason::MissingField { field: "name" })
        ));

        let first = service.add_course(algo()).unwrap();
        assert_eq!(first.warning, None);

        let second = service.add_course(algo()).unwrap();
        assert_eq!(
            second.warning,
            Some(WarningReason::DuplicateCode { code: "CS101".into() })
        );
        assert_ne!(first.course.id, second.course.id);

        assert_eq!(service.list_courses().unwrap().len(), 2);
        // 3 adds + 1 list
        assert_eq!(exporter.len(), 4);

        let spans = exporter.spans();
        assert_eq!(spans[0].status, SpanStatus::Error);
        assert_eq!(spans[0].error_kind, Some("missing_field"));
        assert_eq!(spans[2].attribute("warning.kind"), Some("duplicate_code"));
        assert_eq!(spans[3].attribute("courses.count"), Some("2"));
    }

    #[test]
    fn test_round_trip() {
        let (service, _) = service();
        let candidate = algo().with_description("Sorting and searching");
        let added = service.add_course(candidate).unwrap();

        let fetched = service.get_course(&added.course.id).unwrap();
        assert_eq!(fetched, added.course);
        assert_eq!(fetched.name, "Algo");
        assert_eq!(fetched.code, "CS101");
        assert_eq!(fetched.credits, Some(4));
        assert_eq!(fetched.instructor, "Dr. A");
        assert_eq!(fetched.details.description.as_deref(), Some("Sorting and searching"));
    }

    #[test]
    fn test_delete_is_not_idempotent() {
        let (service, exporter) = service();
        let id = service.add_course(algo()).unwrap().course.id;

        assert_eq!(service.delete_course(&id).unwrap().id, id);
        assert!(matches!(service.get_course(&id), Err(CatalogError::NotFound(_))));
        assert!(matches!(service.delete_course(&id), Err(CatalogError::NotFound(_))));

        let last = exporter.spans().pop().unwrap();
        assert_eq!(last.route, routes::DELETE_COURSE);
        assert_eq!(last.error_kind, Some("not_found"));
    }

    #[test]
    fn test_invalid_credits_rejected_without_write() {
        let (service, _) = service();
        let mut candidate = algo();
        candidate.credits = Some(CreditsInput::Decimal(2.5));

        assert!(matches!(
            service.add_course(candidate),
            Err(CatalogError::Rejected(RejectReason::InvalidCredits))
        ));
        assert!(service.list_courses().unwrap().is_empty());
    }

    #[test]
    fn test_counters_match_outcomes() {
        let (service, _) = service();
        for i in 0..5 {
            service
                .add_course(CourseCandidate::new("Course", format!("C{i}"), 3, "Dr. A"))
                .unwrap();
        }
        for _ in 0..3 {
            let _ = service.add_course(CourseCandidate::new("Course", "C9", 0, "Dr. A"));
        }

        let snapshot = service.instrumentation().metrics().snapshot();
        let add = snapshot.route(routes::ADD_COURSE);
        assert_eq!(add.count(OutcomeKind::Success), 5);
        assert_eq!(add.count(OutcomeKind::ClientError), 3);
        assert_eq!(add.errors.get("invalid_credits"), Some(&3));
    }

    #[test]
    fn test_store_failure_is_server_error_and_still_traced() {
        let (service, exporter) = service_with(Arc::new(BrokenStore));

        assert!(matches!(service.add_course(algo()), Err(CatalogError::Store(_))));
        assert!(matches!(service.list_courses(), Err(CatalogError::Store(_))));
        assert!(matches!(
            service.get_course(&CourseId::from("x")),
            Err(CatalogError::Store(_))
        ));
        assert!(matches!(
            service.delete_course(&CourseId::from("x")),
            Err(CatalogError::Store(_))
        ));

        let spans = exporter.spans();
        assert_eq!(spans.len(), 4);
        assert!(spans
            .iter()
            .all(|s| s.outcome == OutcomeKind::ServerError && s.error_kind == Some("store_failure")));

        let snapshot = service.instrumentation().metrics().snapshot();
        assert_eq!(snapshot.total_errors(), 4);
    }
}
