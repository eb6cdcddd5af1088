use super::{required_text, RecordsError, RecordsResult, Subject};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRemoval {
    pub enrollments_removed: usize,
    pub grades_removed: usize,
}

fn subject_from_row(r: &Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: r.get(0)?,
        name: r.get(1)?,
        description: r.get(2)?,
    })
}

pub fn create_subject(conn: &Connection, name: &str, description: &str) -> RecordsResult<Subject> {
    let name = required_text("name", name)?;
    let description = description.trim().to_string();
    conn.execute(
        "INSERT INTO subjects(name, description) VALUES(?, ?)",
        (&name, &description),
    )?;
    let id = conn.last_insert_rowid();
    info!(subject_id = id, "subject created");
    Ok(Subject {
        id,
        name,
        description,
    })
}

pub fn get_subject(conn: &Connection, subject_id: i64) -> RecordsResult<Option<Subject>> {
    let subject = conn
        .query_row(
            "SELECT id, name, description FROM subjects WHERE id = ?",
            [subject_id],
            subject_from_row,
        )
        .optional()?;
    Ok(subject)
}

pub fn require_subject(conn: &Connection, subject_id: i64) -> RecordsResult<Subject> {
    get_subject(conn, subject_id)?.ok_or(RecordsError::NotFound {
        entity: "subject",
        id: subject_id,
    })
}

pub fn list_subjects(conn: &Connection) -> RecordsResult<Vec<Subject>> {
    let mut stmt =
        conn.prepare("SELECT id, name, description FROM subjects ORDER BY name, id")?;
    let rows = stmt
        .query_map([], subject_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(rows)
}

/// Deletes a subject. Without `cascade` the delete is refused while any
/// enrollment or grade still points at it.
pub fn delete_subject(
    conn: &Connection,
    subject_id: i64,
    cascade: bool,
) -> RecordsResult<SubjectRemoval> {
    require_subject(conn, subject_id)?;

    let (enrollments, grades): (i64, i64) = conn.query_row(
        "SELECT
           (SELECT COUNT(*) FROM enrollments WHERE subject_id = ?1),
           (SELECT COUNT(*) FROM grades WHERE subject_id = ?1)",
        [subject_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    if !cascade && (enrollments > 0 || grades > 0) {
        warn!(subject_id, enrollments, grades, "subject delete refused");
        return Err(RecordsError::SubjectInUse {
            subject_id,
            enrollments,
            grades,
        });
    }

    let tx = conn.unchecked_transaction()?;
    let grades_removed = tx.execute("DELETE FROM grades WHERE subject_id = ?", [subject_id])?;
    let enrollments_removed =
        tx.execute("DELETE FROM enrollments WHERE subject_id = ?", [subject_id])?;
    tx.execute("DELETE FROM subjects WHERE id = ?", [subject_id])?;
    tx.commit()?;

    info!(
        subject_id,
        enrollments_removed, grades_removed, "subject deleted"
    );
    Ok(SubjectRemoval {
        enrollments_removed,
        grades_removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory;
    use crate::records::students::{create_student, NewStudent};
    use crate::records::{grades, plan};

    #[test]
    fn list_is_ordered_by_name() {
        let conn = open_memory();
        create_subject(&conn, "Math", "Numbers").expect("math");
        create_subject(&conn, "Art", "").expect("art");
        create_subject(&conn, "History", "  Past  ").expect("history");

        let names: Vec<String> = list_subjects(&conn)
            .expect("list")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Art", "History", "Math"]);
        assert!(create_subject(&conn, "", "x").is_err());
    }

    #[test]
    fn delete_is_guarded_unless_cascading() {
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
        let math = create_subject(&conn, "Math", "").expect("math");
        let art = create_subject(&conn, "Art", "").expect("art");
        plan::set_student_plan(&conn, s.id, &[math.id]).expect("plan");
        grades::add_grade(
            &conn,
            &grades::NewGrade {
                student_id: s.id,
                subject_id: math.id,
                score: 7.5,
                date: None,
            },
        )
        .expect("grade");

        match delete_subject(&conn, math.id, false) {
            Err(RecordsError::SubjectInUse {
                enrollments,
                grades,
                ..
            }) => {
                assert_eq!(enrollments, 1);
                assert_eq!(grades, 1);
            }
            other => panic!("expected subject_in_use, got {:?}", other),
        }
        assert!(get_subject(&conn, math.id).expect("get").is_some());

        let unused = delete_subject(&conn, art.id, false).expect("delete unused");
        assert_eq!(unused.enrollments_removed, 0);

        let removal = delete_subject(&conn, math.id, true).expect("cascade");
        assert_eq!(removal.enrollments_removed, 1);
        assert_eq!(removal.grades_removed, 1);
        assert!(plan::assigned_subjects(&conn, s.id).expect("plan").is_empty());
    }
}
