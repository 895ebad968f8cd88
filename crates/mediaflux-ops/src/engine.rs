//! The batch mutation engine.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mediaflux_core::{
    BatchResult, EngineConfig, EngineError, LogEntryKind, MediaIndex, OperationCode, RowId,
    ScannerGate, SelectedFileSet, TransactionLogEntry,
};

use crate::geotag::{GeoWriter, SidecarGeoWriter};
use crate::hooks::{DefaultHooks, EngineHooks, ProgressSink};
use crate::index_sync::IndexSynchronizer;
use crate::logger::TransactionLogger;
use crate::path_resolver::resolve_rename;
use crate::write_guard::first_write_protected;

/// Orchestrates pre-check, per-item mutation, transaction logging, index
/// sync and result aggregation for copy/move/rename/delete batches.
///
/// The batch loop runs on the calling thread: log entries are appended in
/// strict item order, the log append for an item happens before its index
/// update, which happens before its progress notification. Cancellation is
/// cooperative and checked at item boundaries only.
pub struct MutationEngine {
    pub(crate) config: EngineConfig,
    pub(crate) sync: IndexSynchronizer,
    pub(crate) scanner: Arc<dyn ScannerGate>,
    pub(crate) hooks: Box<dyn EngineHooks + Send>,
    pub(crate) logger: TransactionLogger,
    pub(crate) geo_writer: Box<dyn GeoWriter>,
    pub(crate) owes_ignore_refresh: bool,
}

impl MutationEngine {
    /// Create an engine with default hooks and the sidecar geo writer.
    pub fn new(
        config: EngineConfig,
        index: Arc<dyn MediaIndex>,
        scanner: Arc<dyn ScannerGate>,
    ) -> Self {
        let logger = TransactionLogger::new(index.clone(), &config.log_path);
        Self {
            config,
            sync: IndexSynchronizer::new(index),
            scanner,
            hooks: Box::new(DefaultHooks),
            logger,
            geo_writer: Box::new(SidecarGeoWriter),
            owes_ignore_refresh: false,
        }
    }

    /// Replace the deployment hooks.
    pub fn with_hooks(mut self, hooks: impl EngineHooks + Send + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Replace the embedded-metadata writer.
    pub fn with_geo_writer(mut self, writer: impl GeoWriter + 'static) -> Self {
        self.geo_writer = Box::new(writer);
        self
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one batch operation.
    ///
    /// `destination` is the target directory for copy/move and the new name
    /// (or relative/absolute destination path) for rename; it is ignored for
    /// delete. `Update` never touches the filesystem.
    pub fn execute(
        &mut self,
        op: OperationCode,
        items: &SelectedFileSet,
        destination: Option<&Path>,
        progress: &mut dyn ProgressSink,
    ) -> Result<BatchResult, EngineError> {
        match op {
            OperationCode::Copy | OperationCode::Move => {
                let dest = destination.ok_or_else(|| {
                    EngineError::path_resolution(PathBuf::new(), "destination directory required")
                })?;
                self.move_or_copy(op == OperationCode::Move, items, dest, progress)
            }
            OperationCode::Delete => self.delete(items, progress),
            OperationCode::Rename => {
                let source = items
                    .path_at(0)
                    .filter(|p| !p.as_os_str().is_empty())
                    .ok_or_else(|| {
                        EngineError::path_resolution(PathBuf::new(), "rename needs one source item")
                    })?
                    .to_path_buf();
                let new_name = destination
                    .ok_or_else(|| {
                        EngineError::path_resolution(&source, "rename needs a destination name")
                    })?
                    .to_string_lossy()
                    .into_owned();
                self.rename_item(&source, &new_name, items.id_at(0))
            }
            OperationCode::Update => Ok(BatchResult::new(op, 0, items.len())),
        }
    }

    /// Copy a batch into a destination directory.
    pub fn copy(
        &mut self,
        items: &SelectedFileSet,
        destination: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<BatchResult, EngineError> {
        self.move_or_copy(false, items, destination, progress)
    }

    /// Move a batch into a destination directory.
    pub fn move_to(
        &mut self,
        items: &SelectedFileSet,
        destination: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<BatchResult, EngineError> {
        self.move_or_copy(true, items, destination, progress)
    }

    /// Rename a single file or directory, atomically.
    ///
    /// `new_name` may be a plain name, a relative escape ("../sibling") or an
    /// absolute path. The filesystem rename and the index rewrite succeed or
    /// fail together: when the index reports a layer failure the filesystem
    /// rename is rolled back and the result carries the -1 sentinel.
    pub fn rename(&mut self, source: &Path, new_name: &str) -> Result<BatchResult, EngineError> {
        self.rename_item(source, new_name, None)
    }

    /// Delete a batch. Index rows are removed only when every non-degenerate
    /// candidate was deleted from the filesystem.
    pub fn delete(
        &mut self,
        items: &SelectedFileSet,
        progress: &mut dyn ProgressSink,
    ) -> Result<BatchResult, EngineError> {
        let op = OperationCode::Delete;
        self.begin_batch("delete", op, items, &[])?;

        let total = items.len();
        let name_count = items.non_empty_count();
        let mut delete_count = 0usize;
        let mut done = 0usize;
        let mut touched = Vec::new();

        for (id, path) in items.iter() {
            done += 1;
            if path.as_os_str().is_empty() {
                continue;
            }
            match fs::symlink_metadata(path) {
                Ok(metadata) => {
                    let removal = if metadata.is_dir() {
                        fs::remove_dir_all(path)
                    } else {
                        fs::remove_file(path)
                    };
                    match removal {
                        Ok(()) => {
                            delete_count += 1;
                            self.log_item(id, path, LogEntryKind::Delete, "");
                            touched.push(path.to_path_buf());
                        }
                        Err(error) => self.hooks.on_exception("delete", path, &error),
                    }
                }
                // Already gone: considered but not modified.
                Err(_) => {}
            }
            if !progress.on_progress(done, total, Some(path)) {
                break;
            }
        }

        // All-or-nothing index cleanup: rows are removed only when no
        // filesystem deletion failed or was skipped.
        if name_count == 0 || name_count == delete_count {
            if let Err(error) = self.sync.remove_batch(&items.row_ids()) {
                self.hooks.on_exception("delete", Path::new(""), &error);
            }
        }

        let result = BatchResult::new(op, delete_count as i64, total);
        self.finish_batch("delete", op, &result, touched);
        Ok(result)
    }

    /// Write-guard, then ask the deployment's confirm capability, then
    /// delete. Returns `None` when the caller declined.
    pub fn delete_with_confirmation(
        &mut self,
        items: &SelectedFileSet,
        progress: &mut dyn ProgressSink,
    ) -> Result<Option<BatchResult>, EngineError> {
        if let Some(err) = first_write_protected("Delete", items.paths()) {
            return Err(err);
        }
        let mut prompt = format!("Delete {} items?\n", items.non_empty_count());
        for (_, path) in items.iter() {
            if !path.as_os_str().is_empty() {
                prompt.push_str(&path.display().to_string());
                prompt.push('\n');
            }
        }
        if !self.hooks.confirm(&prompt) {
            return Ok(None);
        }
        self.delete(items, progress).map(Some)
    }

    fn move_or_copy(
        &mut self,
        is_move: bool,
        items: &SelectedFileSet,
        destination: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<BatchResult, EngineError> {
        let (op, what) = if is_move {
            (OperationCode::Move, "move")
        } else {
            (OperationCode::Copy, "copy")
        };
        self.begin_batch(what, op, items, &[destination])?;

        if !destination.exists() {
            fs::create_dir_all(destination).map_err(|e| EngineError::io(destination, e))?;
        }

        let total = items.len();
        let mut done = 0usize;
        let mut modify_count = 0i64;
        let mut touched = Vec::new();

        for (id, path) in items.iter() {
            done += 1;
            if path.as_os_str().is_empty() {
                continue;
            }
            let Some(file_name) = path.file_name() else {
                continue;
            };
            let dest = destination.join(file_name);

            if dest.starts_with(path) {
                let error = io::Error::other("cannot move or copy a directory into itself");
                self.hooks.on_exception(what, path, &error);
                continue;
            }

            let was_dir = path.is_dir();
            let outcome = if is_move {
                move_item(path, &dest)
            } else {
                copy_item(path, &dest)
            };

            match outcome {
                Ok(()) => {
                    modify_count += 1;
                    let kind = match (is_move, was_dir) {
                        (true, true) => LogEntryKind::MoveDir,
                        (true, false) => LogEntryKind::MoveFile,
                        (false, _) => LogEntryKind::Copy,
                    };
                    self.log_item(id, path, kind, dest.display().to_string());
                    if is_move {
                        if let Err(error) = self.sync.apply_rename(path, &dest, was_dir) {
                            // Index divergence; the log keeps it repairable.
                            self.hooks.on_exception(what, path, &error);
                        }
                    }
                    touched.push(path.to_path_buf());
                    touched.push(dest);
                }
                Err(error) => self.hooks.on_exception(what, path, &error),
            }

            if !progress.on_progress(done, total, Some(path)) {
                break;
            }
        }

        let result = BatchResult::new(op, modify_count, total);
        self.finish_batch(what, op, &result, touched);
        Ok(result)
    }

    fn rename_item(
        &mut self,
        source: &Path,
        new_name: &str,
        row_id: Option<RowId>,
    ) -> Result<BatchResult, EngineError> {
        let op = OperationCode::Rename;
        let items = SelectedFileSet::from_pairs(vec![(row_id, source.to_path_buf())]);

        if let Some(err) = first_write_protected("Rename", [source]) {
            return Err(err);
        }
        self.admit(op)?;

        let destination = resolve_rename(source, new_name)?;
        self.detect_ignore_marker(&items, &[&destination]);
        self.hooks.on_pre_process("rename", op, &items);
        self.logger.open()?;

        let was_dir = source.is_dir();
        let mut modify_count: i64 = -1;
        let mut touched = Vec::new();

        match fs::rename(source, &destination) {
            Ok(()) => match self.sync.apply_rename(source, &destination, was_dir) {
                Ok(rows) => {
                    modify_count = rows as i64;
                    let kind = if was_dir {
                        LogEntryKind::MoveDir
                    } else {
                        LogEntryKind::Rename
                    };
                    self.log_item(row_id, source, kind, destination.display().to_string());
                    if was_dir {
                        // A whole subtree moved; one subtree-scoped
                        // notification instead of per-path reconciliation.
                        self.sync.reconcile_subtree(&destination);
                    } else {
                        touched.push(source.to_path_buf());
                        touched.push(destination.clone());
                    }
                }
                Err(error) => {
                    // The filesystem and the index must not diverge after a
                    // reported failure: undo the rename.
                    self.hooks.on_exception("rename", source, &error);
                    if let Err(undo_error) = fs::rename(&destination, source) {
                        tracing::error!(
                            target: "mediaflux_ops",
                            source = %source.display(),
                            destination = %destination.display(),
                            error = %undo_error,
                            "rename rollback failed, filesystem and index have diverged"
                        );
                    }
                }
            },
            Err(error) => self.hooks.on_exception("rename", source, &error),
        }

        let result = BatchResult::new(op, modify_count, 1);
        self.finish_batch("rename", op, &result, touched);
        Ok(result)
    }

    /// Shared batch prologue: write guard, scanner admission, ignore-marker
    /// detection, pre-process hook, log session.
    fn begin_batch(
        &mut self,
        what: &str,
        op: OperationCode,
        items: &SelectedFileSet,
        destinations: &[&Path],
    ) -> Result<(), EngineError> {
        // Copy does not modify its sources, so a read-only source is fine.
        if op != OperationCode::Copy {
            if let Some(err) = first_write_protected(&op.to_string(), items.paths()) {
                return Err(err);
            }
        }
        self.admit(op)?;
        self.detect_ignore_marker(items, destinations);
        self.hooks.on_pre_process(what, op, items);
        self.logger.open()
    }

    /// Shared batch epilogue: reconcile touched paths, consume the owed
    /// ignore refresh, post-process hook, close the log session.
    fn finish_batch(
        &mut self,
        what: &str,
        op: OperationCode,
        result: &BatchResult,
        touched: Vec<PathBuf>,
    ) {
        self.logger.close();
        // `touched` is non-empty exactly when an item succeeded on the
        // filesystem; a rename matching zero index rows still reconciles.
        self.sync.reconcile(touched);
        if self.owes_ignore_refresh {
            self.hooks.on_media_ignore_changed();
            self.owes_ignore_refresh = false;
        }
        self.hooks.on_post_process(what, op, result);
    }

    fn admit(&self, op: OperationCode) -> Result<(), EngineError> {
        if op.touches_filesystem() && !self.scanner.can_proceed() {
            return Err(EngineError::ScannerBusy);
        }
        Ok(())
    }

    /// Flag an owed GUI refresh when an ignore marker is among the touched
    /// paths, on either the source or the destination side.
    fn detect_ignore_marker(&mut self, items: &SelectedFileSet, destinations: &[&Path]) {
        let is_marker = |path: &Path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| self.config.is_ignore_marker(n))
        };
        if items.iter().any(|(_, p)| is_marker(p)) || destinations.iter().copied().any(is_marker) {
            self.owes_ignore_refresh = true;
        }
    }

    /// Append one structured entry; a failed append is funneled through the
    /// exception hook without aborting the batch.
    pub(crate) fn log_item(
        &mut self,
        row_id: Option<RowId>,
        path: &Path,
        kind: LogEntryKind,
        payload: impl Into<String>,
    ) {
        let entry = TransactionLogEntry::new(row_id, path, kind, payload);
        if let Err(error) = self.logger.append(&entry) {
            self.hooks.on_exception("log", path, &error);
        }
    }
}

/// Move one item: rename fast path, copy + remove fallback for
/// cross-filesystem moves.
fn move_item(source: &Path, dest: &Path) -> io::Result<()> {
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }
    copy_item(source, dest)?;
    if source.is_dir() {
        fs::remove_dir_all(source)
    } else {
        fs::remove_file(source)
    }
}

/// Copy one item, recursively for directories.
fn copy_item(source: &Path, dest: &Path) -> io::Result<()> {
    if source.is_dir() {
        copy_dir_recursive(source, dest)
    } else {
        fs::copy(source, dest).map(|_| ())
    }
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let dest_path = dest.join(entry.file_name());
        if path.is_dir() {
            copy_dir_recursive(&path, &dest_path)?;
        } else {
            fs::copy(&path, &dest_path)?;
        }
    }
    Ok(())
}
