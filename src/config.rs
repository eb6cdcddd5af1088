use std::path::PathBuf;

pub const WORKSPACE_ENV: &str = "GRADEBOOKD_WORKSPACE";
pub const LOG_ENV: &str = "GRADEBOOKD_LOG";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Workspace opened before the first request, if set.
    pub workspace: Option<PathBuf>,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            workspace: non_empty(WORKSPACE_ENV).map(PathBuf::from),
            log_filter: non_empty(LOG_ENV)
                .or_else(|| non_empty("RUST_LOG"))
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}
