//! Scan-session coordination for mediaflux.
//!
//! The background full-tree scanner and the mutation engine share the media
//! index as a mutable resource. This crate owns the process-wide scan
//! registry: at most one scan session at a time, compare-and-set
//! registration, and the admission gate the engine consults before
//! destructive operations. The crawling itself lives behind the registry;
//! only its coordination surface is modelled here.

mod coordinator;
mod progress;

pub use coordinator::{ScanRegistry, ScanSession, SessionState};
pub use progress::ScanProgress;
