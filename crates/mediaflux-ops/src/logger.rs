//! Append-only transaction logging.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mediaflux_core::{EngineError, LogEntryKind, MediaIndex, TransactionLogEntry};

/// Append-only log sink for one batch session.
///
/// Structured entries are written to the flat JSON-lines log first and then
/// projected best-effort into the index's transaction table; the flat log is
/// the source of truth and a failed projection never invalidates it.
/// Comments are flat-log only. `open`/`close` bracket exactly one batch
/// session; reopening is tolerated and starts a fresh append position.
pub struct TransactionLogger {
    index: Arc<dyn MediaIndex>,
    log_path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl TransactionLogger {
    /// Create a closed logger bound to a flat-log path and an index for the
    /// structured projection.
    pub fn new(index: Arc<dyn MediaIndex>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            index,
            log_path: log_path.into(),
            writer: None,
        }
    }

    /// Path of the flat log.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Whether a session is currently open.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Open the log for appending, creating missing parent directories.
    /// Idempotent: an already-open session stays open.
    pub fn open(&mut self) -> Result<(), EngineError> {
        if self.writer.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.log_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| EngineError::io(&self.log_path, e))?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    /// Append one entry.
    ///
    /// The flat-log write must succeed; the index projection of structured
    /// entries is best effort and only logged when it fails.
    pub fn append(&mut self, entry: &TransactionLogEntry) -> Result<(), EngineError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| EngineError::io(&self.log_path, std::io::Error::other("log session is not open")))?;

        let line = serde_json::to_string(entry)
            .map_err(|e| EngineError::io(&self.log_path, std::io::Error::other(e)))?;
        writeln!(writer, "{line}").map_err(|e| EngineError::io(&self.log_path, e))?;
        writer.flush().map_err(|e| EngineError::io(&self.log_path, e))?;

        if entry.kind.is_structured() {
            if let Err(error) = self.index.record_transaction(entry) {
                tracing::warn!(
                    target: "mediaflux_ops",
                    path = %entry.path.display(),
                    kind = %entry.kind,
                    %error,
                    "transaction projection failed, flat log stands"
                );
            }
        }
        Ok(())
    }

    /// Append a comment-only entry, excluded from structured replay.
    pub fn comment(&mut self, text: impl Into<String>) -> Result<(), EngineError> {
        self.append(&TransactionLogEntry::comment(text))
    }

    /// Flush and close the session. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(error) = writer.flush() {
                tracing::warn!(target: "mediaflux_ops", path = %self.log_path.display(), %error, "flush on close failed");
            }
        }
    }
}

impl Drop for TransactionLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Read all entries back from a flat log. Used for audit and repair tooling
/// and by tests asserting log ordering.
pub fn read_log(path: &Path) -> Result<Vec<TransactionLogEntry>, EngineError> {
    let content = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    let mut entries = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        let entry = serde_json::from_str(line)
            .map_err(|e| EngineError::io(path, std::io::Error::other(e)))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Entries that participate in structured replay, in log order.
pub fn structured_entries(entries: &[TransactionLogEntry]) -> Vec<&TransactionLogEntry> {
    entries
        .iter()
        .filter(|e| e.kind != LogEntryKind::Comment)
        .collect()
}
