//! Deployment capability hooks and the progress protocol.

use std::path::Path;

use mediaflux_core::{BatchResult, OperationCode, SelectedFileSet};

/// Progress callback for batch loops.
///
/// Returning `false` is the caller's cancellation signal: remaining items
/// are abandoned, already-completed mutations stay. The callback may block
/// the worker pending a caller decision; this is the only intentional
/// suspension point inside the per-item loop.
pub trait ProgressSink {
    /// Report `(done, total)` items, optionally naming the current one.
    fn on_progress(&mut self, done: usize, total: usize, current: Option<&Path>) -> bool;
}

impl<F> ProgressSink for F
where
    F: FnMut(usize, usize, Option<&Path>) -> bool,
{
    fn on_progress(&mut self, done: usize, total: usize, current: Option<&Path>) -> bool {
        self(done, total, current)
    }
}

/// Sink that never cancels. For callers that do not track progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn on_progress(&mut self, _done: usize, _total: usize, _current: Option<&Path>) -> bool {
        true
    }
}

/// Per-deployment capabilities injected into the engine.
///
/// One implementation per deployment target supplies the environment
/// specifics the engine must not know about: GUI refreshes, user
/// confirmation, and the structured exception channel.
pub trait EngineHooks {
    /// Called before any mutation of a batch begins.
    fn on_pre_process(&mut self, what: &str, op: OperationCode, items: &SelectedFileSet) {
        let _ = (what, op, items);
    }

    /// Called once after a batch finished, with the aggregate result.
    fn on_post_process(&mut self, what: &str, op: OperationCode, result: &BatchResult) {
        let _ = (what, op, result);
    }

    /// Structured handler for per-item failures: operation name, involved
    /// path, underlying error. Must not panic; the batch continues.
    fn on_exception(&mut self, what: &str, path: &Path, error: &dyn std::error::Error) {
        tracing::error!(target: "mediaflux_ops", operation = what, path = %path.display(), %error, "item failed");
    }

    /// An ignore-marker file was touched; listing filters are stale and the
    /// hosting GUI should refresh its ignore state.
    fn on_media_ignore_changed(&mut self) {}

    /// Synchronous user confirmation for destructive operations.
    fn confirm(&mut self, prompt: &str) -> bool {
        let _ = prompt;
        true
    }
}

/// Hooks that log through `tracing` and confirm everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

impl EngineHooks for DefaultHooks {
    fn on_pre_process(&mut self, what: &str, op: OperationCode, items: &SelectedFileSet) {
        tracing::debug!(target: "mediaflux_ops", operation = what, op = %op, items = items.len(), "pre-process");
    }

    fn on_post_process(&mut self, what: &str, op: OperationCode, result: &BatchResult) {
        tracing::debug!(
            target: "mediaflux_ops",
            operation = what,
            op = %op,
            modified = result.modify_count,
            considered = result.item_count,
            "post-process"
        );
    }
}
