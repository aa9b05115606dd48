//! The append-only JSONL sink.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{AuditError, AuditResult};
use crate::event::AuditEvent;

/// Marker prefixed to records that could not be written to the log file.
const LOSS_MARKER: &str = "audit-loss:";

/// Append-only audit log writer.
///
/// Writes are serialised behind a mutex so each record occupies exactly one
/// line. [`AuditSink::append`] never fails: on any write error the record is
/// mirrored to stderr instead.
pub struct AuditSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditSink {
    /// Open (or create) the audit log at `path`, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Open`] if the file cannot be opened for append.
    pub fn open(path: impl AsRef<Path>) -> AuditResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| AuditError::Open {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::Open {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the underlying log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a single JSON line.
    ///
    /// A `ts` field (RFC 3339, UTC) is injected if the event does not
    /// already carry one. Failures never propagate to the caller; the
    /// record is written to stderr with an `audit-loss:` marker instead.
    pub fn append(&self, event: &AuditEvent) {
        let line = match render(event) {
            Some(line) => line,
            None => {
                // Serialisation of our own enum should not fail; keep the
                // record in debug form rather than dropping it.
                eprintln!("{LOSS_MARKER} {event:?}");
                return;
            }
        };

        let result = {
            let mut guard = match self.file.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            writeln!(guard, "{line}").and_then(|()| guard.flush())
        };

        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "audit write failed");
            eprintln!("{LOSS_MARKER} {line}");
        }
    }
}

impl std::fmt::Debug for AuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditSink")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Serialise an event to its log line, injecting `ts` when absent.
fn render(event: &AuditEvent) -> Option<String> {
    let mut value = serde_json::to_value(event).ok()?;
    if let Value::Object(map) = &mut value {
        map.entry("ts").or_insert_with(|| {
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
        });
    }
    Some(value.to_string())
}
