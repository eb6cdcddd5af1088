use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .env_remove("GRADEBOOKD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("gradebook-router-smoke");
    let out_dir = workspace.join("out");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let calls = [
        ("health", json!({})),
        ("workspace.select", json!({ "path": workspace.to_string_lossy() })),
        ("students.list", json!({})),
        ("students.create", json!({ "name": "Smoke Student", "age": 10 })),
        ("students.get", json!({ "studentId": 1 })),
        ("students.update", json!({ "studentId": 1, "patch": { "name": "Smoke" } })),
        ("subjects.list", json!({})),
        ("subjects.create", json!({ "name": "Smoke Subject" })),
        ("plan.get", json!({ "studentId": 1 })),
        ("plan.set", json!({ "studentId": 1, "subjectIds": [1] })),
        ("grades.add", json!({ "studentId": 1, "subjectId": 1, "score": 5.5 })),
        ("grades.history", json!({ "studentId": 1 })),
        ("reports.build", json!({ "studentId": 1 })),
        ("reports.exportCsv", json!({ "studentId": 1, "outDir": out_dir.to_string_lossy() })),
        ("reports.exportWorkbook", json!({ "studentId": 1, "outDir": out_dir.to_string_lossy() })),
        ("subjects.delete", json!({ "subjectId": 1, "cascade": true })),
        ("students.delete", json!({ "studentId": 1 })),
    ];
    for (i, (method, params)) in calls.into_iter().enumerate() {
        let resp = request(&mut stdin, &mut reader, &(i + 1).to_string(), method, params);
        assert_eq!(
            resp.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            resp
        );
    }

    let unknown = request(&mut stdin, &mut reader, "99", "classes.list", json!({}));
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush garbage");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json response");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response");
    assert_eq!(error_code(&value), Some("bad_json"));

    // The daemon keeps serving after a bad line.
    let _ = request_ok(&mut stdin, &mut reader, "100", "health", json!({}));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
