use crate::export;
use crate::ipc::error::{err, ok, records_err};
use crate::ipc::helpers::{db_conn, required_i64};
use crate::ipc::types::{AppState, Request};
use crate::report::{self, Report};
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

fn load_report(state: &AppState, req: &Request) -> Result<Report, serde_json::Value> {
    let conn = db_conn(state, req)?;
    let student_id = required_i64(req, "studentId")?;
    report::build_report(conn, student_id).map_err(|e| records_err(&req.id, e))
}

/// Exports need something to show; an ungraded student is reported, not encoded.
fn load_graded_report(state: &AppState, req: &Request) -> Result<Report, serde_json::Value> {
    let report = load_report(state, req)?;
    if report.is_empty() {
        warn!(student_id = report.student.id, "export requested for ungraded student");
        return Err(err(
            &req.id,
            "no_grades",
            format!("{} has no grades recorded yet", report.student.name),
            Some(json!({ "studentId": report.student.id })),
        ));
    }
    Ok(report)
}

fn out_dir(req: &Request) -> Result<PathBuf, serde_json::Value> {
    match req.params.get("outDir").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(PathBuf::from(v.trim())),
        _ => Err(err(&req.id, "bad_params", "missing outDir", None)),
    }
}

fn write_export(
    req: &Request,
    dir: PathBuf,
    file_name: String,
    mime: &str,
    bytes: Vec<u8>,
) -> serde_json::Value {
    if let Err(e) = std::fs::create_dir_all(&dir) {
        return err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": dir.to_string_lossy() })),
        );
    }
    let out = dir.join(export::disk_file_name(&file_name));
    if let Err(e) = std::fs::write(&out, &bytes) {
        return err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": out.to_string_lossy() })),
        );
    }
    info!(path = %out.display(), bytes = bytes.len(), "report exported");

    ok(
        &req.id,
        json!({
            "ok": true,
            "path": out.to_string_lossy(),
            "fileName": file_name,
            "mime": mime,
            "bytes": bytes.len()
        }),
    )
}

fn handle_reports_build(state: &mut AppState, req: &Request) -> serde_json::Value {
    match load_report(state, req) {
        Ok(report) => ok(
            &req.id,
            json!({
                "student": report.student,
                "empty": report.is_empty(),
                "summary": report.summary,
                "detail": report.detail
            }),
        ),
        Err(e) => e,
    }
}

fn handle_reports_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let dir = match out_dir(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let report = match load_graded_report(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let bytes = export::encode_summary_csv(&report.summary);
    write_export(
        req,
        dir,
        export::csv_file_name(&report.student.name),
        export::CSV_MIME,
        bytes,
    )
}

fn handle_reports_export_workbook(state: &mut AppState, req: &Request) -> serde_json::Value {
    let dir = match out_dir(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let report = match load_graded_report(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let bytes = match export::encode_workbook(&report.summary, &report.detail) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "export_failed", format!("{e:?}"), None),
    };
    write_export(
        req,
        dir,
        export::workbook_file_name(&report.student.name),
        export::XLSX_MIME,
        bytes,
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.build" => Some(handle_reports_build(state, req)),
        "reports.exportCsv" => Some(handle_reports_export_csv(state, req)),
        "reports.exportWorkbook" => Some(handle_reports_export_workbook(state, req)),
        _ => None,
    }
}
