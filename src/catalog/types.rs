//! Catalog domain types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Identifier of a stored course.
///
/// Generated by the store on creation. Any string can be looked up; strings
/// that were never issued simply do not match a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    /// Issue a fresh, globally unique identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CourseId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CourseId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Read any JSON value as form text. Numbers keep their digits; anything
/// that is not text or a number reads as empty.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    })
}

fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// Optional scheduling details attached to a course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseDetails {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_optional_text")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_optional_text")]
    pub semester: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_optional_text")]
    pub schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_optional_text")]
    pub classroom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_optional_text")]
    pub prerequisites: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_optional_text")]
    pub grading: Option<String>,
}

impl CourseDetails {
    /// Names of the optional fields paired with their values, in form order.
    pub fn fields(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("description", self.description.as_deref()),
            ("semester", self.semester.as_deref()),
            ("schedule", self.schedule.as_deref()),
            ("classroom", self.classroom.as_deref()),
            ("prerequisites", self.prerequisites.as_deref()),
            ("grading", self.grading.as_deref()),
        ]
    }

    /// Trim every field and drop the ones left empty.
    pub fn normalized(&self) -> Self {
        fn clean(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        Self {
            description: clean(&self.description),
            semester: clean(&self.semester),
            schedule: clean(&self.schedule),
            classroom: clean(&self.classroom),
            prerequisites: clean(&self.prerequisites),
            grading: clean(&self.grading),
        }
    }
}

/// A course as persisted in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: CourseId,
    pub name: String,
    pub code: String,
    /// Always set on courses added through the catalog. Absent only on
    /// records imported from catalog files written before credits existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<u32>,
    pub instructor: String,
    #[serde(flatten)]
    pub details: CourseDetails,
}

/// A validated course waiting for the store to assign it an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseDraft {
    pub name: String,
    pub code: String,
    pub credits: u32,
    pub instructor: String,
    pub details: CourseDetails,
}

impl CourseDraft {
    pub fn into_record(self, id: CourseId) -> CourseRecord {
        CourseRecord {
            id,
            name: self.name,
            code: self.code,
            credits: Some(self.credits),
            instructor: self.instructor,
            details: self.details,
        }
    }
}

/// Credits as submitted by a client.
///
/// Forms submit text, JSON clients submit numbers. Keeping the raw value lets
/// the validator reject bad input instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreditsInput {
    Integer(i64),
    Decimal(f64),
    Text(String),
    /// Booleans, arrays, objects: never a credit count.
    Other(Value),
}

impl CreditsInput {
    /// Whether the client left the field empty.
    pub fn is_blank(&self) -> bool {
        matches!(self, CreditsInput::Text(text) if text.trim().is_empty())
    }

    /// The credit count, if it is a positive integer that fits in `u32`.
    pub fn as_positive(&self) -> Option<u32> {
        let value = match self {
            CreditsInput::Integer(n) => *n,
            CreditsInput::Decimal(f) => whole_number(*f)?,
            CreditsInput::Text(text) => {
                let text = text.trim();
                match text.parse::<i64>() {
                    Ok(n) => n,
                    Err(_) => whole_number(text.parse::<f64>().ok()?)?,
                }
            }
            CreditsInput::Other(_) => return None,
        };

        if value <= 0 {
            return None;
        }
        u32::try_from(value).ok()
    }
}

fn whole_number(value: f64) -> Option<i64> {
    if !value.is_finite() || value.fract() != 0.0 || value.abs() > u32::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

impl From<i64> for CreditsInput {
    fn from(value: i64) -> Self {
        CreditsInput::Integer(value)
    }
}

impl From<i32> for CreditsInput {
    fn from(value: i32) -> Self {
        CreditsInput::Integer(i64::from(value))
    }
}

impl From<u32> for CreditsInput {
    fn from(value: u32) -> Self {
        CreditsInput::Integer(i64::from(value))
    }
}

impl From<&str> for CreditsInput {
    fn from(value: &str) -> Self {
        CreditsInput::Text(value.to_string())
    }
}

/// A course submitted for addition, before validation.
///
/// Deserializing never fails on an object: fields of the wrong type read as
/// empty, so the validator gets to classify them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseCandidate {
    #[serde(deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub code: String,
    pub credits: Option<CreditsInput>,
    #[serde(deserialize_with = "lenient_text")]
    pub instructor: String,
    #[serde(flatten)]
    pub details: CourseDetails,
}

impl CourseCandidate {
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        credits: impl Into<CreditsInput>,
        instructor: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            credits: Some(credits.into()),
            instructor: instructor.into(),
            details: CourseDetails::default(),
        }
    }

    /// Read a submitted JSON body. A body that is not an object yields an
    /// empty candidate, which validation rejects.
    pub fn from_json(body: Value) -> Self {
        serde_json::from_value(body).unwrap_or_default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.details.description = Some(description.into());
        self
    }

    /// Build the storable form of this candidate.
    ///
    /// Returns `None` when credits are not a positive integer; callers are
    /// expected to have validated first.
    pub fn to_draft(&self) -> Option<CourseDraft> {
        let credits = self.credits.as_ref()?.as_positive()?;
        Some(CourseDraft {
            name: self.name.trim().to_string(),
            code: self.code.trim().to_string(),
            credits,
            instructor: self.instructor.trim().to_string(),
            details: self.details.normalized(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credits_parsing() {
        assert_eq!(CreditsInput::Integer(4).as_positive(), Some(4));
        assert_eq!(CreditsInput::Text(" 3 ".into()).as_positive(), Some(3));
        assert_eq!(CreditsInput::Decimal(2.0).as_positive(), Some(2));
        assert_eq!(CreditsInput::Text("4.0".into()).as_positive(), Some(4));

        assert_eq!(CreditsInput::Integer(0).as_positive(), None);
        assert_eq!(CreditsInput::Integer(-2).as_positive(), None);
        assert_eq!(CreditsInput::Decimal(3.5).as_positive(), None);
        assert_eq!(CreditsInput::Text("four".into()).as_positive(), None);
        assert_eq!(CreditsInput::Text("4.5".into()).as_positive(), None);
        assert_eq!(CreditsInput::Text("-2.0".into()).as_positive(), None);
        assert_eq!(CreditsInput::Text("NaN".into()).as_positive(), None);
        assert_eq!(CreditsInput::Other(Value::Bool(true)).as_positive(), None);
        assert_eq!(CreditsInput::Integer(i64::from(u32::MAX) + 1).as_positive(), None);
        assert!(CreditsInput::Text("  ".into()).is_blank());
    }

    #[test]
    fn test_candidate_deserializes_numbers_and_text() {
        let json = r#"{"name":"Algo","code":"CS101","credits":4,"instructor":"Dr. A"}"#;
        let candidate: CourseCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.credits, Some(CreditsInput::Integer(4)));

        let json = r#"{"name":"Algo","code":"CS101","credits":"4.5","instructor":"Dr. A"}"#;
        let candidate: CourseCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.credits, Some(CreditsInput::Text("4.5".into())));

        let candidate: CourseCandidate = serde_json::from_str(r#"{"code":"CS1"}"#).unwrap();
        assert!(candidate.name.is_empty());
        assert!(candidate.credits.is_none());
    }

    #[test]
    fn test_candidate_tolerates_wrong_types() {
        let candidate = CourseCandidate::from_json(serde_json::json!({
            "name": {"first": "Algo"},
            "code": 101,
            "credits": true,
            "instructor": ["Dr. A"],
            "semester": false
        }));
        assert!(candidate.name.is_empty());
        assert_eq!(candidate.code, "101");
        assert_eq!(candidate.credits, Some(CreditsInput::Other(Value::Bool(true))));
        assert!(candidate.instructor.is_empty());
        assert_eq!(candidate.details.semester, None);

        for credits in [serde_json::json!([4]), serde_json::json!({})] {
            let candidate = CourseCandidate::from_json(serde_json::json!({ "credits": credits }));
            assert!(matches!(candidate.credits, Some(CreditsInput::Other(_))));
        }

        assert_eq!(CourseCandidate::from_json(serde_json::json!([1, 2])), CourseCandidate::default());
    }

    #[test]
    fn test_draft_trims_and_drops_empty_details() {
        let mut candidate = CourseCandidate::new(" Algo ", "CS101 ", 4, "Dr. A");
        candidate.details.semester = Some("   ".into());
        candidate.details.grading = Some(" A-F ".into());

        let draft = candidate.to_draft().unwrap();
        assert_eq!(draft.name, "Algo");
        assert_eq!(draft.code, "CS101");
        assert_eq!(draft.details.semester, None);
        assert_eq!(draft.details.grading.as_deref(), Some("A-F"));
    }
}
