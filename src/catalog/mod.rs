//! Course catalog subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → service.rs (instrumented operation)
//!     → validator.rs (accept / reject / warn)
//!     → store (create, list, get, delete)
//! ```

pub mod service;
pub mod types;
pub mod validator;

pub use service::{routes, AddedCourse, CatalogError, CatalogService};
pub use types::{CourseCandidate, CourseDetails, CourseDraft, CourseId, CourseRecord, CreditsInput};
pub use validator::{validate, RejectReason, ValidationConfig, ValidationOutcome, Validator, WarningReason};
