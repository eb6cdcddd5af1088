use super::{check_age, required_text, RecordsError, RecordsResult, Student};
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub age: i64,
    pub grade_level: String,
}

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub grade_level: Option<String>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.grade_level.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentOverview {
    #[serde(flatten)]
    pub student: Student,
    pub subject_count: i64,
    pub grade_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRemoval {
    pub enrollments_removed: usize,
    pub grades_removed: usize,
}

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        name: r.get(1)?,
        age: r.get(2)?,
        grade_level: r.get(3)?,
    })
}

pub fn create_student(conn: &Connection, new: &NewStudent) -> RecordsResult<Student> {
    let name = required_text("name", &new.name)?;
    let age = check_age(new.age)?;
    let grade_level = new.grade_level.trim().to_string();

    conn.execute(
        "INSERT INTO students(name, age, grade_level) VALUES(?, ?, ?)",
        (&name, age, &grade_level),
    )?;
    let id = conn.last_insert_rowid();
    info!(student_id = id, "student registered");

    Ok(Student {
        id,
        name,
        age,
        grade_level,
    })
}

pub fn get_student(conn: &Connection, student_id: i64) -> RecordsResult<Option<Student>> {
    let student = conn
        .query_row(
            "SELECT id, name, age, grade_level FROM students WHERE id = ?",
            [student_id],
            student_from_row,
        )
        .optional()?;
    Ok(student)
}

pub fn require_student(conn: &Connection, student_id: i64) -> RecordsResult<Student> {
    get_student(conn, student_id)?.ok_or(RecordsError::NotFound {
        entity: "student",
        id: student_id,
    })
}

pub fn list_students(conn: &Connection) -> RecordsResult<Vec<StudentOverview>> {
    // Correlated subqueries avoid double-counting from joining both child tables.
    let mut stmt = conn.prepare(
        "SELECT
           s.id,
           s.name,
           s.age,
           s.grade_level,
           (SELECT COUNT(*) FROM enrollments e WHERE e.student_id = s.id) AS subject_count,
           (SELECT COUNT(*) FROM grades g WHERE g.student_id = s.id) AS grade_count
         FROM students s
         ORDER BY s.id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(StudentOverview {
                student: student_from_row(r)?,
                subject_count: r.get(4)?,
                grade_count: r.get(5)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())?;
    Ok(rows)
}

pub fn update_student(
    conn: &Connection,
    student_id: i64,
    patch: &StudentPatch,
) -> RecordsResult<Student> {
    if patch.is_empty() {
        return Err(RecordsError::validation("patch has no fields to update"));
    }

    let mut set_parts: Vec<&str> = Vec::new();
    let mut bind_values: Vec<Value> = Vec::new();

    if let Some(name) = patch.name.as_deref() {
        set_parts.push("name = ?");
        bind_values.push(Value::Text(required_text("name", name)?));
    }
    if let Some(age) = patch.age {
        set_parts.push("age = ?");
        bind_values.push(Value::Integer(check_age(age)?));
    }
    if let Some(grade_level) = patch.grade_level.as_deref() {
        set_parts.push("grade_level = ?");
        bind_values.push(Value::Text(grade_level.trim().to_string()));
    }
    bind_values.push(Value::Integer(student_id));

    let sql = format!("UPDATE students SET {} WHERE id = ?", set_parts.join(", "));
    let changed = conn.execute(&sql, params_from_iter(bind_values))?;
    if changed == 0 {
        return Err(RecordsError::NotFound {
            entity: "student",
            id: student_id,
        });
    }

    require_student(conn, student_id)
}

/// Removes the student along with every enrollment and grade that references it.
pub fn delete_student(conn: &Connection, student_id: i64) -> RecordsResult<StudentRemoval> {
    require_student(conn, student_id)?;

    let tx = conn.unchecked_transaction()?;
    // Dependency order; the schema has no ON DELETE CASCADE.
    let grades_removed = tx.execute("DELETE FROM grades WHERE student_id = ?", [student_id])?;
    let enrollments_removed =
        tx.execute("DELETE FROM enrollments WHERE student_id = ?", [student_id])?;
    tx.execute("DELETE FROM students WHERE id = ?", [student_id])?;
    tx.commit()?;

    info!(
        student_id,
        enrollments_removed, grades_removed, "student deleted"
    );
    Ok(StudentRemoval {
        enrollments_removed,
        grades_removed,
    })
}
