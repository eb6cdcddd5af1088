use crate::ipc::error::{err, ok, records_err};
use crate::ipc::helpers::{db_conn, optional_str, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::records::students::{self, NewStudent, StudentPatch};
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "students": [] }));
    };
    match students::list_students(conn) {
        Ok(rows) => ok(&req.id, json!({ "students": rows })),
        Err(e) => records_err(&req.id, e),
    }
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match students::require_student(conn, student_id) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => records_err(&req.id, e),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let age = match required_i64(req, "age") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let grade_level = match optional_str(req, "gradeLevel") {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return e,
    };

    let new = NewStudent {
        name,
        age,
        grade_level,
    };
    match students::create_student(conn, &new) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => records_err(&req.id, e),
    }
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing/invalid patch", None);
    };

    let mut student_patch = StudentPatch::default();
    if let Some(v) = patch.get("name") {
        let Some(s) = v.as_str() else {
            return err(&req.id, "bad_params", "patch.name must be a string", None);
        };
        student_patch.name = Some(s.to_string());
    }
    if let Some(v) = patch.get("age") {
        let Some(n) = v.as_i64() else {
            return err(&req.id, "bad_params", "patch.age must be an integer", None);
        };
        student_patch.age = Some(n);
    }
    if let Some(v) = patch.get("gradeLevel") {
        if v.is_null() {
            student_patch.grade_level = Some(String::new());
        } else if let Some(s) = v.as_str() {
            student_patch.grade_level = Some(s.to_string());
        } else {
            return err(
                &req.id,
                "bad_params",
                "patch.gradeLevel must be a string or null",
                None,
            );
        }
    }

    match students::update_student(conn, student_id, &student_patch) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => records_err(&req.id, e),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match students::delete_student(conn, student_id) {
        Ok(removal) => ok(
            &req.id,
            json!({
                "ok": true,
                "enrollmentsRemoved": removal.enrollments_removed,
                "gradesRemoved": removal.grades_removed
            }),
        ),
        Err(e) => records_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
