use crate::records::students::require_student;
use crate::records::{RecordsResult, Student};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

/// One recorded grade as it appears in the full history sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRow {
    pub student_name: String,
    pub subject_id: i64,
    pub subject_name: String,
    pub score: f64,
    pub date: String,
}

/// Per-subject aggregate. `average` is the plain arithmetic mean, unrounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub student_name: String,
    pub subject_id: i64,
    pub subject_name: String,
    pub average: f64,
    pub grade_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub student: Student,
    pub summary: Vec<SummaryRow>,
    pub detail: Vec<DetailRow>,
}

impl Report {
    /// True when the student exists but has no grades yet.
    pub fn is_empty(&self) -> bool {
        self.detail.is_empty()
    }
}

pub fn build_report(conn: &Connection, student_id: i64) -> RecordsResult<Report> {
    let student = require_student(conn, student_id)?;

    // Subject id is part of the sort so same-named subjects stay contiguous.
    let mut stmt = conn.prepare(
        "SELECT a.name, m.id, m.name, g.score, g.recorded_on
         FROM grades g
         JOIN students a ON a.id = g.student_id
         JOIN subjects m ON m.id = g.subject_id
         WHERE g.student_id = ?
         ORDER BY m.name, m.id, g.recorded_on DESC, g.id DESC",
    )?;
    let detail = stmt
        .query_map([student_id], |r| {
            Ok(DetailRow {
                student_name: r.get(0)?,
                subject_id: r.get(1)?,
                subject_name: r.get(2)?,
                score: r.get(3)?,
                date: r.get(4)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;

    let summary = summarize(&detail);
    Ok(Report {
        student,
        summary,
        detail,
    })
}

/// Groups detail rows by subject id and computes mean and count per group.
/// Output is ordered by subject name, then id.
pub fn summarize(detail: &[DetailRow]) -> Vec<SummaryRow> {
    let mut slot_by_subject: HashMap<i64, usize> = HashMap::new();
    let mut sums: Vec<(f64, usize)> = Vec::new();
    let mut out: Vec<SummaryRow> = Vec::new();

    for row in detail {
        let slot = *slot_by_subject.entry(row.subject_id).or_insert_with(|| {
            out.push(SummaryRow {
                student_name: row.student_name.clone(),
                subject_id: row.subject_id,
                subject_name: row.subject_name.clone(),
                average: 0.0,
                grade_count: 0,
            });
            sums.push((0.0, 0));
            out.len() - 1
        });
        sums[slot].0 += row.score;
        sums[slot].1 += 1;
    }

    for (row, (sum, count)) in out.iter_mut().zip(sums) {
        row.grade_count = count;
        row.average = sum / count as f64;
    }

    out.sort_by(|a, b| {
        a.subject_name
            .cmp(&b.subject_name)
            .then(a.subject_id.cmp(&b.subject_id))
    });
    out
}
