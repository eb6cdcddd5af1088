use crate::ipc::error::{err, ok, records_err};
use crate::ipc::helpers::{db_conn, required_i64};
use crate::ipc::types::{AppState, Request};
use crate::records::{plan, students};
use serde_json::json;

fn handle_plan_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = students::require_student(conn, student_id) {
        return records_err(&req.id, e);
    }
    match plan::assigned_subjects(conn, student_id) {
        Ok(subjects) => ok(
            &req.id,
            json!({ "studentId": student_id, "subjects": subjects }),
        ),
        Err(e) => records_err(&req.id, e),
    }
}

fn parse_subject_ids(req: &Request) -> Result<Vec<i64>, serde_json::Value> {
    let Some(items) = req.params.get("subjectIds").and_then(|v| v.as_array()) else {
        return Err(err(&req.id, "bad_params", "missing subjectIds", None));
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(id) = item.as_i64() else {
            return Err(err(
                &req.id,
                "bad_params",
                "subjectIds must contain integers",
                Some(json!({ "index": i })),
            ));
        };
        out.push(id);
    }
    Ok(out)
}

fn handle_plan_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject_ids = match parse_subject_ids(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match plan::set_student_plan(conn, student_id, &subject_ids) {
        Ok(enrollments) => {
            let ids: Vec<i64> = enrollments.iter().map(|e| e.subject_id).collect();
            ok(
                &req.id,
                json!({
                    "studentId": student_id,
                    "subjectIds": ids,
                    "enrollments": enrollments
                }),
            )
        }
        Err(e) => records_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "plan.get" => Some(handle_plan_get(state, req)),
        "plan.set" => Some(handle_plan_set(state, req)),
        _ => None,
    }
}
