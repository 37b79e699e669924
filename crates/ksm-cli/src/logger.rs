//! Append-only activity log: `[timestamp] message {json}` per line.
//!
//! Writes are best-effort. A failing log never changes a command's outcome.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::credentials;

pub struct Logger {
    path: Option<PathBuf>,
}

impl Logger {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// `~/.kimi-supermemory/supermemory.log`
    pub fn default_path() -> Option<PathBuf> {
        credentials::data_dir().map(|dir| dir.join("supermemory.log"))
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn log(&self, message: &str, data: Value) {
        let Some(path) = &self.path else {
            return;
        };
        let _ = Self::append(path, &format_line(message, &data));
    }

    fn append(path: &Path, line: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")
    }
}

fn format_line(message: &str, data: &Value) -> String {
    let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    if data.is_null() {
        format!("[{ts}] {message}")
    } else {
        format!("[{ts}] {message} {data}")
    }
}
