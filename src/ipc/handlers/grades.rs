use crate::ipc::error::{ok, records_err};
use crate::ipc::helpers::{db_conn, optional_str, required_f64, required_i64};
use crate::ipc::types::{AppState, Request};
use crate::records::grades::{self, NewGrade};
use serde_json::json;

fn handle_grades_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject_id = match required_i64(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let score = match required_f64(req, "score") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let date = match optional_str(req, "date") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let new = NewGrade {
        student_id,
        subject_id,
        score,
        date,
    };
    match grades::add_grade(conn, &new) {
        Ok(grade) => ok(&req.id, json!({ "grade": grade })),
        Err(e) => records_err(&req.id, e),
    }
}

fn handle_grades_history(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match grades::grade_history(conn, student_id) {
        Ok(history) => ok(&req.id, json!(history)),
        Err(e) => records_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.add" => Some(handle_grades_add(state, req)),
        "grades.history" => Some(handle_grades_history(state, req)),
        _ => None,
    }
}
