//! Error types for batch mutation operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::index::IndexError;

/// Errors surfaced by the mutation engine.
///
/// Per-item filesystem failures inside a batch are not raised through this
/// type; they are funneled through the structured exception hook and
/// aggregated into the batch counts. `EngineError` covers pre-flight
/// rejections and the failures that abort an operation as a whole.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A candidate file is write-protected; nothing was mutated.
    #[error("'{path}' is write-protected. '{action}' is not possible.")]
    WriteProtected { path: PathBuf, action: String },

    /// A rename destination could not be resolved; nothing was mutated.
    #[error("Cannot resolve destination path for '{path}': {message}")]
    PathResolution { path: PathBuf, message: String },

    /// A full-tree rescan is active; destructive operations are not admitted.
    #[error("Media scanner is busy, try again later")]
    ScannerBusy,

    /// Generic I/O error with path context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Media-index layer failure.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Invalid engine configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl EngineError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a write-protection error for the given path and action label.
    pub fn write_protected(path: impl Into<PathBuf>, action: impl Into<String>) -> Self {
        Self::WriteProtected {
            path: path.into(),
            action: action.into(),
        }
    }

    /// Create a path-resolution error.
    pub fn path_resolution(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PathResolution {
            path: path.into(),
            message: message.into(),
        }
    }
}
