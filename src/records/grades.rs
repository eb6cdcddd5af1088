use super::plan::is_enrolled;
use super::students::require_student;
use super::subjects::require_subject;
use super::{Grade, RecordsError, RecordsResult, MAX_SCORE, MIN_SCORE};
use chrono::{Local, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct NewGrade {
    pub student_id: i64,
    pub subject_id: i64,
    pub score: f64,
    /// `YYYY-MM-DD`; today when absent.
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub grade_id: i64,
    pub subject_id: i64,
    pub subject_name: String,
    pub score: f64,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeHistory {
    pub entries: Vec<HistoryEntry>,
    /// Mean over every grade regardless of subject.
    pub general_average: Option<f64>,
}

pub fn check_score(score: f64) -> RecordsResult<f64> {
    if !score.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(RecordsError::validation(format!(
            "score must be between {:.1} and {:.1}",
            MIN_SCORE, MAX_SCORE
        )));
    }
    Ok(score)
}

pub fn parse_date(raw: &str) -> RecordsResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| RecordsError::validation("date must be YYYY-MM-DD"))
}

/// Records a grade. The subject must currently be part of the student's plan.
pub fn add_grade(conn: &Connection, new: &NewGrade) -> RecordsResult<Grade> {
    let score = check_score(new.score)?;
    let date = match new.date.as_deref() {
        Some(raw) if !raw.trim().is_empty() => parse_date(raw)?,
        _ => Local::now().date_naive(),
    };
    require_student(conn, new.student_id)?;
    require_subject(conn, new.subject_id)?;
    if !is_enrolled(conn, new.student_id, new.subject_id)? {
        return Err(RecordsError::NotEnrolled {
            student_id: new.student_id,
            subject_id: new.subject_id,
        });
    }

    let date = date.format(DATE_FORMAT).to_string();
    conn.execute(
        "INSERT INTO grades(student_id, subject_id, score, recorded_on) VALUES(?, ?, ?, ?)",
        (new.student_id, new.subject_id, score, &date),
    )?;
    let id = conn.last_insert_rowid();
    info!(
        grade_id = id,
        student_id = new.student_id,
        subject_id = new.subject_id,
        "grade recorded"
    );

    Ok(Grade {
        id,
        student_id: new.student_id,
        subject_id: new.subject_id,
        score,
        date,
    })
}

/// All grades of a student, newest first.
pub fn grade_history(conn: &Connection, student_id: i64) -> RecordsResult<GradeHistory> {
    require_student(conn, student_id)?;

    let mut stmt = conn.prepare(
        "SELECT g.id, g.subject_id, m.name, g.score, g.recorded_on
         FROM grades g
         JOIN subjects m ON m.id = g.subject_id
         WHERE g.student_id = ?
         ORDER BY g.recorded_on DESC, g.id DESC",
    )?;
    let entries = stmt
        .query_map([student_id], |r| {
            Ok(HistoryEntry {
                grade_id: r.get(0)?,
                subject_id: r.get(1)?,
                subject_name: r.get(2)?,
                score: r.get(3)?,
                date: r.get(4)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;

    let general_average = if entries.is_empty() {
        None
    } else {
        Some(entries.iter().map(|e| e.score).sum::<f64>() / entries.len() as f64)
    };

    Ok(GradeHistory {
        entries,
        general_average,
    })
}
