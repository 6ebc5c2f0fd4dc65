//! Course validation rules.
//!
//! Rules are evaluated in order and the first match wins:
//! 1. a blank required field rejects the course
//! 2. credits that are not a positive integer reject the course
//! 3. a code already present in the catalog accepts it with a warning
//! 4. blank optional fields accept it with a warning, when enabled
//!
//! Validation is a pure function of the candidate and the existing records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::types::{CourseCandidate, CourseRecord};

/// Why a candidate was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    MissingField { field: &'static str },
    InvalidCredits,
}

impl RejectReason {
    pub fn kind(&self) -> &'static str {
        match self {
            RejectReason::MissingField { .. } => "missing_field",
            RejectReason::InvalidCredits => "invalid_credits",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingField { field } => write!(f, "'{}' field is required", field),
            RejectReason::InvalidCredits => write!(f, "credits must be a positive whole number"),
        }
    }
}

/// Why an accepted candidate was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningReason {
    DuplicateCode { code: String },
    EmptyOptionalFields { fields: Vec<&'static str> },
}

impl WarningReason {
    pub fn kind(&self) -> &'static str {
        match self {
            WarningReason::DuplicateCode { .. } => "duplicate_code",
            WarningReason::EmptyOptionalFields { .. } => "empty_optional_fields",
        }
    }
}

impl fmt::Display for WarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningReason::DuplicateCode { code } => {
                write!(f, "a course with code '{}' already exists", code)
            }
            WarningReason::EmptyOptionalFields { fields } => {
                write!(f, "'{}' field is empty", fields.join(", "))
            }
        }
    }
}

/// Result of validating one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted,
    Rejected(RejectReason),
    Warned(WarningReason),
}

/// Tunable validation behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Warn when optional fields such as semester or grading are left blank.
    pub warn_on_empty_optional: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, candidate: &CourseCandidate, existing: &[CourseRecord]) -> ValidationOutcome {
        if let Some(field) = missing_required_field(candidate) {
            return ValidationOutcome::Rejected(RejectReason::MissingField { field });
        }

        if candidate.credits.as_ref().and_then(|c| c.as_positive()).is_none() {
            return ValidationOutcome::Rejected(RejectReason::InvalidCredits);
        }

        let code = candidate.code.trim();
        if existing.iter().any(|record| record.code == code) {
            return ValidationOutcome::Warned(WarningReason::DuplicateCode {
                code: code.to_string(),
            });
        }

        if self.config.warn_on_empty_optional {
            let fields: Vec<&'static str> = candidate
                .details
                .fields()
                .into_iter()
                .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
                .map(|(name, _)| name)
                .collect();
            if !fields.is_empty() {
                return ValidationOutcome::Warned(WarningReason::EmptyOptionalFields { fields });
            }
        }

        ValidationOutcome::Accepted
    }
}

/// Validate with the default rule set.
pub fn validate(candidate: &CourseCandidate, existing: &[CourseRecord]) -> ValidationOutcome {
    Validator::default().validate(candidate, existing)
}

fn missing_required_field(candidate: &CourseCandidate) -> Option<&'static str> {
    if candidate.name.trim().is_empty() {
        return Some("name");
    }
    if candidate.code.trim().is_empty() {
        return Some("code");
    }
    match &candidate.credits {
        None => return Some("credits"),
        Some(credits) if credits.is_blank() => return Some("credits"),
        Some(_) => {}
    }
    if candidate.instructor.trim().is_empty() {
        return Some("instructor");
    }
    None
}
