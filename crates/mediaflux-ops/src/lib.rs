//! Bulk file-mutation engine for mediaflux.
//!
//! This crate executes copy/move/rename/delete batches as one logical unit
//! of work: pre-flight write-protection checks, per-item execution with
//! progress reporting, transaction logging, and reconciliation with the
//! external media index. The batch loop runs on a single worker so that log
//! entries are appended in strict item order.

mod engine;
mod geotag;
mod hooks;
mod index_sync;
mod logger;
mod path_resolver;
mod write_guard;

pub use engine::MutationEngine;
pub use geotag::{GeoSession, GeoWriter, SidecarGeoWriter, format_lat_lon, sidecar_path};
pub use hooks::{DefaultHooks, EngineHooks, ProgressSink, SilentProgress};
pub use index_sync::IndexSynchronizer;
pub use logger::{TransactionLogger, read_log, structured_entries};
pub use path_resolver::resolve_rename;
pub use write_guard::first_write_protected;
