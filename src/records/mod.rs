//! Typed access to the four record tables.
//!
//! Every function takes the connection it should run on; nothing here holds
//! onto one. Multi-statement writes open their own transaction so a failure
//! part-way leaves the previous state intact.

pub mod grades;
pub mod plan;
pub mod students;
pub mod subjects;

use serde::Serialize;
use serde_json::json;

pub const MIN_AGE: i64 = 1;
pub const MAX_AGE: i64 = 100;
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("subject {subject_id} is not assigned to student {student_id}")]
    NotEnrolled { student_id: i64, subject_id: i64 },

    #[error(
        "subject {subject_id} is still referenced by {enrollments} enrollment(s) and {grades} grade(s)"
    )]
    SubjectInUse {
        subject_id: i64,
        enrollments: i64,
        grades: i64,
    },

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

impl RecordsError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "bad_params",
            Self::NotFound { .. } => "not_found",
            Self::NotEnrolled { .. } => "not_enrolled",
            Self::SubjectInUse { .. } => "subject_in_use",
            Self::Db(_) => "db_query_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            Self::NotEnrolled {
                student_id,
                subject_id,
            } => Some(json!({ "studentId": student_id, "subjectId": subject_id })),
            Self::SubjectInUse {
                subject_id,
                enrollments,
                grades,
            } => Some(json!({
                "subjectId": subject_id,
                "enrollments": enrollments,
                "grades": grades
            })),
            Self::Validation(_) | Self::Db(_) => None,
        }
    }
}

pub type RecordsResult<T> = Result<T, RecordsError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub grade_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub subject_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: i64,
    pub student_id: i64,
    pub subject_id: i64,
    pub score: f64,
    /// ISO `YYYY-MM-DD`.
    pub date: String,
}

fn required_text(field: &str, value: &str) -> RecordsResult<String> {
    let t = value.trim();
    if t.is_empty() {
        return Err(RecordsError::validation(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(t.to_string())
}

fn check_age(age: i64) -> RecordsResult<i64> {
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(RecordsError::validation(format!(
            "age must be between {} and {}",
            MIN_AGE, MAX_AGE
        )));
    }
    Ok(age)
}
