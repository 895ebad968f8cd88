//! Media-index collaborator interface.
//!
//! The engine never owns index rows; it only reads their (id, path) pairs
//! and issues update-by-path or delete-by-id-set commands through this
//! trait. The on-disk storage engine behind it is a deployment concern.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::log::TransactionLogEntry;
use crate::selection::RowId;

/// Media-index layer failure, distinct from "zero rows matched".
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index layer itself failed (storage error, lost connection, ...).
    #[error("Index layer failure: {message}")]
    Layer { message: String },
}

impl IndexError {
    /// Create a layer failure.
    pub fn layer(message: impl Into<String>) -> Self {
        Self::Layer {
            message: message.into(),
        }
    }
}

/// Scope of an index-change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeScope {
    /// Specific paths were touched and should be reconciled.
    Paths(Vec<PathBuf>),
    /// A whole subtree changed (directory rename).
    Subtree(PathBuf),
    /// Ignore-marker state changed somewhere; listing filters are stale.
    IgnoreMarkers,
}

/// External queryable store of per-file metadata rows.
///
/// All row-count results distinguish `Ok(0)` ("ran, no rows matched") from
/// `Err(IndexError)` ("the layer itself failed").
pub trait MediaIndex: Send + Sync {
    /// Rewrite the path of every row whose path starts with `old_prefix`.
    ///
    /// Callers pass prefixes with a trailing separator to avoid
    /// partial-name collisions.
    fn update_by_path_prefix(&self, old_prefix: &str, new_prefix: &str)
    -> Result<u64, IndexError>;

    /// Rewrite exactly the row stored under `old_path`.
    fn update_by_path(&self, old_path: &Path, new_path: &Path) -> Result<u64, IndexError>;

    /// Update the geo coordinates of the row stored under `path`.
    fn update_geo(&self, path: &Path, latitude: f64, longitude: f64) -> Result<u64, IndexError>;

    /// Delete the rows with the given ids.
    fn delete_by_ids(&self, ids: &[RowId]) -> Result<u64, IndexError>;

    /// Project a structured transaction-log entry into the index's
    /// transaction table. Best effort: the flat log remains the source of
    /// truth when this fails.
    fn record_transaction(&self, entry: &TransactionLogEntry) -> Result<(), IndexError>;

    /// Fire an index-change notification so attached views/scanners can
    /// reconcile the given scope with reality.
    fn notify_change(&self, scope: &ChangeScope);
}

/// One row of the in-memory reference index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRow {
    pub id: RowId,
    pub path: PathBuf,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<MemoryRow>,
    transactions: Vec<TransactionLogEntry>,
    notifications: Vec<ChangeScope>,
    fail_writes: bool,
}

/// In-process `MediaIndex` used as the reference implementation and as the
/// test double for the engine's index-consistency properties.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    state: Mutex<MemoryState>,
}

impl MemoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row.
    pub fn insert(&self, id: RowId, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().rows.push(MemoryRow {
            id,
            path: path.into(),
            latitude: None,
            longitude: None,
        });
    }

    /// Snapshot of all rows.
    pub fn rows(&self) -> Vec<MemoryRow> {
        self.state.lock().unwrap().rows.clone()
    }

    /// Look up a row by id.
    pub fn row(&self, id: RowId) -> Option<MemoryRow> {
        self.state
            .lock()
            .unwrap()
            .rows
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Entries projected into the transaction table so far.
    pub fn transactions(&self) -> Vec<TransactionLogEntry> {
        self.state.lock().unwrap().transactions.clone()
    }

    /// Change notifications fired so far.
    pub fn notifications(&self) -> Vec<ChangeScope> {
        self.state.lock().unwrap().notifications.clone()
    }

    /// Make every subsequent write call fail with a layer error. Used to
    /// exercise rollback and divergence handling.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    fn check_writable(state: &MemoryState) -> Result<(), IndexError> {
        if state.fail_writes {
            Err(IndexError::layer("simulated index failure"))
        } else {
            Ok(())
        }
    }
}

impl MediaIndex for MemoryIndex {
    fn update_by_path_prefix(
        &self,
        old_prefix: &str,
        new_prefix: &str,
    ) -> Result<u64, IndexError> {
        let mut state = self.state.lock().unwrap();
        Self::check_writable(&state)?;
        let mut affected = 0;
        for row in &mut state.rows {
            let path = row.path.to_string_lossy().into_owned();
            if let Some(rest) = path.strip_prefix(old_prefix) {
                row.path = PathBuf::from(format!("{new_prefix}{rest}"));
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn update_by_path(&self, old_path: &Path, new_path: &Path) -> Result<u64, IndexError> {
        let mut state = self.state.lock().unwrap();
        Self::check_writable(&state)?;
        let mut affected = 0;
        for row in &mut state.rows {
            if row.path == old_path {
                row.path = new_path.to_path_buf();
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn update_geo(&self, path: &Path, latitude: f64, longitude: f64) -> Result<u64, IndexError> {
        let mut state = self.state.lock().unwrap();
        Self::check_writable(&state)?;
        let mut affected = 0;
        for row in &mut state.rows {
            if row.path == path {
                row.latitude = Some(latitude);
                row.longitude = Some(longitude);
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn delete_by_ids(&self, ids: &[RowId]) -> Result<u64, IndexError> {
        let mut state = self.state.lock().unwrap();
        Self::check_writable(&state)?;
        let before = state.rows.len();
        state.rows.retain(|r| !ids.contains(&r.id));
        Ok((before - state.rows.len()) as u64)
    }

    fn record_transaction(&self, entry: &TransactionLogEntry) -> Result<(), IndexError> {
        let mut state = self.state.lock().unwrap();
        Self::check_writable(&state)?;
        state.transactions.push(entry.clone());
        Ok(())
    }

    fn notify_change(&self, scope: &ChangeScope) {
        self.state.lock().unwrap().notifications.push(scope.clone());
    }
}
