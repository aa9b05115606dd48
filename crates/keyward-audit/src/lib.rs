//! Keyward audit — append-only JSONL audit trail.
//!
//! Every decision point in the broker emits an [`AuditEvent`]; the
//! [`AuditSink`] serialises each event as one JSON object per line with an
//! injected UTC timestamp. Audit writes never fail the caller: if the log
//! file cannot be written, the record is mirrored to stderr with an
//! `audit-loss:` marker instead.
//!
//! There is no read/query API here; the log file is plain JSONL and offline
//! tooling reads it directly.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod event;
mod sink;

pub use error::{AuditError, AuditResult};
pub use event::{AuditEvent, ReadResult};
pub use sink::AuditSink;
