//! Index synchronization strategies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mediaflux_core::{ChangeScope, IndexError, MediaIndex, RowId};

/// Applies the per-operation index updates after successful filesystem
/// mutations and fires change notifications.
///
/// The synchronizer holds no locks on the index beyond what the index's own
/// primitives provide; the scan-admission gate is the engine's sole
/// concurrency-safety mechanism against the background scanner.
pub struct IndexSynchronizer {
    index: Arc<dyn MediaIndex>,
}

impl IndexSynchronizer {
    /// Wrap an index collaborator.
    pub fn new(index: Arc<dyn MediaIndex>) -> Self {
        Self { index }
    }

    /// Shared handle to the underlying index.
    pub fn index(&self) -> Arc<dyn MediaIndex> {
        self.index.clone()
    }

    /// Rewrite index paths after a rename or move of one entry.
    ///
    /// For a directory, every row under the old prefix is rewritten; the
    /// trailing separator avoids partial-name collisions ("/a/src" must not
    /// capture "/a/srcother"). For a file, exactly that row is rewritten.
    pub fn apply_rename(
        &self,
        old_path: &Path,
        new_path: &Path,
        was_directory: bool,
    ) -> Result<u64, IndexError> {
        if was_directory {
            let old_prefix = with_trailing_separator(old_path);
            let new_prefix = with_trailing_separator(new_path);
            self.index.update_by_path_prefix(&old_prefix, &new_prefix)
        } else {
            self.index.update_by_path(old_path, new_path)
        }
    }

    /// Delete the rows of a fully deleted batch.
    pub fn remove_batch(&self, ids: &[RowId]) -> Result<u64, IndexError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.index.delete_by_ids(ids)
    }

    /// Update one row's geo coordinates.
    pub fn set_geo(&self, path: &Path, latitude: f64, longitude: f64) -> Result<u64, IndexError> {
        self.index.update_geo(path, latitude, longitude)
    }

    /// Ask the index side to reconcile the touched paths with reality, so an
    /// attached view reflects the mutation even before a full rescan runs.
    pub fn reconcile(&self, touched: Vec<PathBuf>) {
        if touched.is_empty() {
            return;
        }
        self.index.notify_change(&ChangeScope::Paths(touched));
    }

    /// Notify that a whole subtree moved.
    pub fn reconcile_subtree(&self, root: &Path) {
        self.index
            .notify_change(&ChangeScope::Subtree(root.to_path_buf()));
    }
}

fn with_trailing_separator(path: &Path) -> String {
    let mut s = path.to_string_lossy().into_owned();
    if !s.ends_with(std::path::MAIN_SEPARATOR) {
        s.push(std::path::MAIN_SEPARATOR);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaflux_core::{ChangeScope, MemoryIndex};

    #[test]
    fn test_apply_rename_directory_uses_prefix() {
        let index = Arc::new(MemoryIndex::new());
        index.insert(1, "/a/src/1.jpg");
        index.insert(2, "/a/srcother/2.jpg");
        let sync = IndexSynchronizer::new(index.clone());

        let affected = sync
            .apply_rename(Path::new("/a/src"), Path::new("/a/dst"), true)
            .unwrap();
        assert_eq!(affected, 1);
        assert_eq!(index.row(1).unwrap().path, PathBuf::from("/a/dst/1.jpg"));
        assert_eq!(
            index.row(2).unwrap().path,
            PathBuf::from("/a/srcother/2.jpg")
        );
    }

    #[test]
    fn test_apply_rename_file_rewrites_one_row() {
        let index = Arc::new(MemoryIndex::new());
        index.insert(1, "/a/old.jpg");
        let sync = IndexSynchronizer::new(index.clone());

        let affected = sync
            .apply_rename(Path::new("/a/old.jpg"), Path::new("/a/new.jpg"), false)
            .unwrap();
        assert_eq!(affected, 1);
        assert_eq!(index.row(1).unwrap().path, PathBuf::from("/a/new.jpg"));
    }

    #[test]
    fn test_remove_batch_empty_is_noop() {
        let index = Arc::new(MemoryIndex::new());
        index.insert(1, "/a/1.jpg");
        let sync = IndexSynchronizer::new(index.clone());
        assert_eq!(sync.remove_batch(&[]).unwrap(), 0);
        assert_eq!(index.rows().len(), 1);
    }

    #[test]
    fn test_reconcile_fires_notification() {
        let index = Arc::new(MemoryIndex::new());
        let sync = IndexSynchronizer::new(index.clone());
        sync.reconcile(vec![PathBuf::from("/a/1.jpg")]);
        sync.reconcile(Vec::new());
        assert_eq!(index.notifications().len(), 1);
    }

    #[test]
    fn test_reconcile_subtree_uses_subtree_scope() {
        let index = Arc::new(MemoryIndex::new());
        let sync = IndexSynchronizer::new(index.clone());
        sync.reconcile_subtree(Path::new("/a/dst"));
        assert_eq!(
            index.notifications(),
            vec![ChangeScope::Subtree(PathBuf::from("/a/dst"))]
        );
    }
}
