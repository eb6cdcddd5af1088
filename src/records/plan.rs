use super::students::require_student;
use super::subjects::require_subject;
use super::{Enrollment, RecordsResult, Subject};
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeSet;
use tracing::info;

pub fn assigned_subjects(conn: &Connection, student_id: i64) -> RecordsResult<Vec<Subject>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.name, m.description
         FROM subjects m
         JOIN enrollments e ON e.subject_id = m.id
         WHERE e.student_id = ?
         ORDER BY m.name, m.id",
    )?;
    let rows = stmt
        .query_map([student_id], |r| {
            Ok(Subject {
                id: r.get(0)?,
                name: r.get(1)?,
                description: r.get(2)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(rows)
}

pub fn enrollments_for_student(
    conn: &Connection,
    student_id: i64,
) -> RecordsResult<Vec<Enrollment>> {
    let mut stmt = conn.prepare(
        "SELECT id, student_id, subject_id
         FROM enrollments
         WHERE student_id = ?
         ORDER BY subject_id",
    )?;
    let rows = stmt
        .query_map([student_id], |r| {
            Ok(Enrollment {
                id: r.get(0)?,
                student_id: r.get(1)?,
                subject_id: r.get(2)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(rows)
}

pub fn is_enrolled(conn: &Connection, student_id: i64, subject_id: i64) -> RecordsResult<bool> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM enrollments WHERE student_id = ? AND subject_id = ?",
            (student_id, subject_id),
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

/// Replaces the student's whole plan with `subject_ids`.
///
/// Existing rows are dropped and the desired set re-inserted inside one
/// transaction. Repeated ids collapse, so applying the same set twice leaves
/// the same rows behind.
pub fn set_student_plan(
    conn: &Connection,
    student_id: i64,
    subject_ids: &[i64],
) -> RecordsResult<Vec<Enrollment>> {
    require_student(conn, student_id)?;
    let desired: BTreeSet<i64> = subject_ids.iter().copied().collect();
    for subject_id in &desired {
        require_subject(conn, *subject_id)?;
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM enrollments WHERE student_id = ?", [student_id])?;
    {
        let mut insert =
            tx.prepare("INSERT INTO enrollments(student_id, subject_id) VALUES(?, ?)")?;
        for subject_id in &desired {
            insert.execute((student_id, subject_id))?;
        }
    }
    tx.commit()?;

    info!(student_id, subjects = desired.len(), "study plan replaced");
    enrollments_for_student(conn, student_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory;
    use crate::records::students::{create_student, NewStudent};
    use crate::records::subjects::create_subject;
    use crate::records::RecordsError;

    fn setup() -> (Connection, i64, [i64; 3]) {
        let conn = open_memory();
        let s = create_student(
            &conn,
            &NewStudent {
                name: "Ana".into(),
                age: 12,
                grade_level: "6A".into(),
            },
        )
        .expect("student");
        let a = create_subject(&conn, "A", "").expect("a").id;
        let b = create_subject(&conn, "B", "").expect("b").id;
        let c = create_subject(&conn, "C", "").expect("c").id;
        (conn, s.id, [a, b, c])
    }

    fn enrolled_ids(conn: &Connection, student_id: i64) -> Vec<i64> {
        enrollments_for_student(conn, student_id)
            .expect("enrollments")
            .into_iter()
            .map(|e| e.subject_id)
            .collect()
    }

    #[test]
    fn second_plan_replaces_first() {
        let (conn, s, [a, b, c]) = setup();
        set_student_plan(&conn, s, &[a, b]).expect("first");
        set_student_plan(&conn, s, &[b, c]).expect("second");
        assert_eq!(enrolled_ids(&conn, s), vec![b, c]);
    }

    #[test]
    fn replace_is_idempotent_and_collapses_duplicates() {
        let (conn, s, [a, b, _]) = setup();
        let first = set_student_plan(&conn, s, &[b, a, b, a]).expect("first");
        assert_eq!(first.len(), 2);
        set_student_plan(&conn, s, &[a, b]).expect("again");

        let rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM enrollments WHERE student_id = ?",
                [s],
                |r| r.get(0),
            )
            .expect("count");
        assert_eq!(rows, 2);
        assert_eq!(enrolled_ids(&conn, s), vec![a, b]);
        assert!(is_enrolled(&conn, s, a).expect("enrolled"));
    }

    #[test]
    fn empty_plan_clears_everything() {
        let (conn, s, [a, _, _]) = setup();
        set_student_plan(&conn, s, &[a]).expect("plan");
        assert!(set_student_plan(&conn, s, &[]).expect("clear").is_empty());
        assert!(assigned_subjects(&conn, s).expect("assigned").is_empty());
    }

    #[test]
    fn unknown_subject_leaves_existing_plan_untouched() {
        let (conn, s, [a, b, _]) = setup();
        set_student_plan(&conn, s, &[a, b]).expect("plan");
        let result = set_student_plan(&conn, s, &[a, 999]);
        assert!(matches!(
            result,
            Err(RecordsError::NotFound {
                entity: "subject",
                id: 999
            })
        ));
        assert_eq!(enrolled_ids(&conn, s), vec![a, b]);
    }

    #[test]
    fn assigned_subjects_are_ordered_by_name() {
        let (conn, s, [a, _, c]) = setup();
        set_student_plan(&conn, s, &[c, a]).expect("plan");
        let names: Vec<String> = assigned_subjects(&conn, s)
            .expect("assigned")
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["A", "C"]);
    }
}
