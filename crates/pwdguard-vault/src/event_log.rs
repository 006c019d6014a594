// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only JSON-lines log that the desktop app tails.
//!
//! Each line is `{"timestamp": RFC3339, "event": name, "data": {...}}`.
//! Write failures never reach the caller.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

/// Something worth telling the desktop app about.
#[derive(Debug, Clone, Copy)]
pub enum AppEvent<'a> {
    NativeHostStarted { pid: u32 },
    CredentialSaved { domain: &'a str, username: &'a str },
    CredentialDeleted { domain: &'a str, id: &'a str },
}

impl AppEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NativeHostStarted { .. } => "native-host-started",
            Self::CredentialSaved { .. } => "credential-saved",
            Self::CredentialDeleted { .. } => "credential-deleted",
        }
    }

    fn data(&self) -> Value {
        match *self {
            Self::NativeHostStarted { pid } => json!({ "pid": pid }),
            Self::CredentialSaved { domain, username } => {
                json!({ "domain": domain, "username": username })
            }
            Self::CredentialDeleted { domain, id } => json!({ "domain": domain, "id": id }),
        }
    }
}

#[derive(Serialize)]
struct LogLine<'a> {
    timestamp: String,
    event: &'a str,
    data: Value,
}

/// Handle to the event log. A disabled log accepts and drops events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one event.
    pub fn record(&self, event: AppEvent<'_>) {
        let Some(path) = &self.path else {
            return;
        };

        let line = LogLine {
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event: event.name(),
            data: event.data(),
        };

        if let Err(e) = append_line(path, &line) {
            debug!(path = %path.display(), event = event.name(), error = %e, "event log write failed");
        }
    }
}

fn append_line(path: &Path, line: &LogLine<'_>) -> std::io::Result<()> {
    let mut encoded = serde_json::to_vec(line)?;
    encoded.push(b'\n');

    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_append_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extension.log");
        let log = EventLog::new(&path);

        log.record(AppEvent::NativeHostStarted { pid: 42 });
        log.record(AppEvent::CredentialSaved {
            domain: "example.com",
            username: "alice",
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "native-host-started");
        assert_eq!(lines[0]["data"]["pid"], 42);
        assert_eq!(lines[1]["event"], "credential-saved");
        assert_eq!(lines[1]["data"]["username"], "alice");
        assert!(
            chrono::DateTime::parse_from_rfc3339(lines[1]["timestamp"].as_str().unwrap()).is_ok()
        );
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let log = EventLog::disabled();
        log.record(AppEvent::CredentialDeleted {
            domain: "example.com",
            id: "abc",
        });
        assert!(log.path().is_none());
    }

    #[test]
    fn unwritable_path_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for append.
        let log = EventLog::new(dir.path());
        log.record(AppEvent::NativeHostStarted { pid: 1 });
    }
}
