mod config;
mod db;
mod export;
mod ipc;
mod records;
mod report;

use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(cfg: &config::Config) {
    // stdout carries the protocol; logs go to stderr only.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    dotenvy::dotenv().ok();
    let cfg = config::Config::from_env();
    init_tracing(&cfg);

    let mut state = ipc::AppState::default();
    if let Some(path) = cfg.workspace.as_deref() {
        if let Err(e) = ipc::open_workspace(&mut state, path) {
            error!(workspace = %path.display(), error = ?e, "startup workspace could not be opened");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "gradebookd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                warn!(error = %e, "unparseable request line");
                let _ = writeln!(stdout, "{}", ipc::err("", "bad_json", e.to_string(), None));
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
