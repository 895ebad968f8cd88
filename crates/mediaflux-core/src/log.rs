//! Transaction-log entry types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::selection::RowId;

/// The kind of a transaction-log entry.
///
/// Every kind except `Comment` has a stable short id used by the structured
/// index projection; `Comment` entries are flat-log only and excluded from
/// structured replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum LogEntryKind {
    MoveFile,
    MoveDir,
    Delete,
    Rename,
    Gps,
    Copy,
    Comment,
}

impl LogEntryKind {
    /// Stable id for structured entries; `None` marks a comment.
    pub fn structured_id(&self) -> Option<&'static str> {
        match self {
            Self::MoveFile => Some("MF"),
            Self::MoveDir => Some("MD"),
            Self::Delete => Some("D"),
            Self::Rename => Some("R"),
            Self::Gps => Some("G"),
            Self::Copy => Some("C"),
            Self::Comment => None,
        }
    }

    /// Whether this entry participates in structured replay.
    pub fn is_structured(&self) -> bool {
        self.structured_id().is_some()
    }
}

/// One append-only record of a mutation.
///
/// Entries are owned by the active batch session and are never mutated or
/// deleted after being written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionLogEntry {
    /// Source index row, when the file was indexed.
    pub row_id: Option<RowId>,
    /// The path the mutation applied to.
    pub path: PathBuf,
    /// When the mutation happened.
    pub timestamp: DateTime<Utc>,
    /// Entry kind.
    pub kind: LogEntryKind,
    /// Free-form command payload (destination path, "lat lon", comment text).
    pub payload: String,
}

impl TransactionLogEntry {
    /// Create a structured entry stamped with the current time.
    pub fn new(
        row_id: Option<RowId>,
        path: impl Into<PathBuf>,
        kind: LogEntryKind,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            row_id,
            path: path.into(),
            timestamp: Utc::now(),
            kind,
            payload: payload.into(),
        }
    }

    /// Create a comment-only entry. Comments carry no row id.
    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            row_id: None,
            path: PathBuf::new(),
            timestamp: Utc::now(),
            kind: LogEntryKind::Comment,
            payload: text.into(),
        }
    }
}
