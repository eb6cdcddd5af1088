use crate::ipc::error::{ok, records_err};
use crate::ipc::helpers::{db_conn, optional_str, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::records::subjects;
use serde_json::json;

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "subjects": [] }));
    };
    match subjects::list_subjects(conn) {
        Ok(rows) => ok(&req.id, json!({ "subjects": rows })),
        Err(e) => records_err(&req.id, e),
    }
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let description = match optional_str(req, "description") {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return e,
    };
    match subjects::create_subject(conn, &name, &description) {
        Ok(subject) => ok(&req.id, json!({ "subject": subject })),
        Err(e) => records_err(&req.id, e),
    }
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject_id = match required_i64(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let cascade = req
        .params
        .get("cascade")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    match subjects::delete_subject(conn, subject_id, cascade) {
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
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "subjects.create" => Some(handle_subjects_create(state, req)),
        "subjects.delete" => Some(handle_subjects_delete(state, req)),
        _ => None,
    }
}
