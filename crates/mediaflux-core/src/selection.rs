//! Batch target selections.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Stable identifier of a media-index row.
pub type RowId = i64;

/// An ordered collection of batch targets: (index row id, absolute path).
///
/// The row id may be absent for files that have not been indexed yet. An
/// entry with an empty path is degenerate: it is skipped during processing
/// but still counts as a considered candidate. The set is immutable for the
/// duration of one batch operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectedFileSet {
    items: Vec<(Option<RowId>, PathBuf)>,
}

impl SelectedFileSet {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection from (row id, path) pairs.
    pub fn from_pairs(items: Vec<(Option<RowId>, PathBuf)>) -> Self {
        Self { items }
    }

    /// Build a selection of unindexed files.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            items: paths.into_iter().map(|p| (None, p.into())).collect(),
        }
    }

    /// Append one target.
    pub fn push(&mut self, id: Option<RowId>, path: impl Into<PathBuf>) {
        self.items.push((id, path.into()));
    }

    /// Number of candidate entries, degenerate ones included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the selection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of entries with a non-empty path.
    pub fn non_empty_count(&self) -> usize {
        self.items
            .iter()
            .filter(|(_, p)| !p.as_os_str().is_empty())
            .count()
    }

    /// Iterate over (row id, path) pairs in selection order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<RowId>, &Path)> {
        self.items.iter().map(|(id, p)| (*id, p.as_path()))
    }

    /// All paths, in selection order.
    pub fn paths(&self) -> Vec<&Path> {
        self.items.iter().map(|(_, p)| p.as_path()).collect()
    }

    /// All known row ids, in selection order.
    pub fn row_ids(&self) -> Vec<RowId> {
        self.items.iter().filter_map(|(id, _)| *id).collect()
    }

    /// Row id at the given position, if the file is indexed.
    pub fn id_at(&self, index: usize) -> Option<RowId> {
        self.items.get(index).and_then(|(id, _)| *id)
    }

    /// Path at the given position.
    pub fn path_at(&self, index: usize) -> Option<&Path> {
        self.items.get(index).map(|(_, p)| p.as_path())
    }
}

impl FromIterator<(Option<RowId>, PathBuf)> for SelectedFileSet {
    fn from_iter<T: IntoIterator<Item = (Option<RowId>, PathBuf)>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paths_has_no_ids() {
        let set = SelectedFileSet::from_paths(["/a/1.jpg", "/a/2.jpg"]);
        assert_eq!(set.len(), 2);
        assert!(set.row_ids().is_empty());
        assert_eq!(set.path_at(1), Some(Path::new("/a/2.jpg")));
    }

    #[test]
    fn test_non_empty_count_skips_degenerate_entries() {
        let mut set = SelectedFileSet::new();
        set.push(Some(1), "/a/1.jpg");
        set.push(None, "");
        set.push(Some(3), "/a/3.jpg");

        assert_eq!(set.len(), 3);
        assert_eq!(set.non_empty_count(), 2);
        assert_eq!(set.row_ids(), vec![1, 3]);
    }

    #[test]
    fn test_iteration_preserves_order() {
        let set = SelectedFileSet::from_pairs(vec![
            (Some(7), PathBuf::from("/x/b.jpg")),
            (None, PathBuf::from("/x/a.jpg")),
        ]);
        let ids: Vec<_> = set.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![Some(7), None]);
    }
}
