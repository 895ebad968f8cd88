//! Core types and collaborator traits for mediaflux.
//!
//! This crate provides the fundamental data structures shared by the
//! mutation engine and the scan coordinator: batch selections, operation
//! codes, transaction-log entries, and the trait seams for the external
//! media index and the background scanner.

mod config;
mod error;
mod index;
mod log;
mod op;
mod scanner;
mod selection;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::EngineError;
pub use index::{ChangeScope, IndexError, MediaIndex, MemoryIndex, MemoryRow};
pub use log::{LogEntryKind, TransactionLogEntry};
pub use op::{BatchResult, OperationCode};
pub use scanner::{NoScanner, ScannerGate};
pub use selection::{RowId, SelectedFileSet};
