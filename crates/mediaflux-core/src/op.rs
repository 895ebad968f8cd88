//! Operation codes and batch results.

use serde::{Deserialize, Serialize};
use strum::Display;

/// The kind of batch operation being performed.
///
/// `Update` never touches the filesystem; it exists for result-message
/// selection and index-sync strategy, and it bypasses the scanner
/// admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum OperationCode {
    Copy,
    Move,
    Rename,
    Delete,
    Update,
}

impl OperationCode {
    /// Whether this operation mutates the filesystem at all.
    pub fn touches_filesystem(&self) -> bool {
        !matches!(self, Self::Update)
    }

    /// Past-tense verb used in aggregate result messages.
    fn verb(&self) -> &'static str {
        match self {
            Self::Copy => "Copied",
            Self::Move => "Moved",
            Self::Rename => "Renamed",
            Self::Delete => "Deleted",
            Self::Update => "Updated",
        }
    }
}

/// Caller-facing summary of one batch operation.
///
/// `modify_count == -1` is a sentinel meaning "atomic operation aborted,
/// nothing changed" and must never be confused with 0 ("ran, changed
/// nothing").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// The operation that was executed.
    pub op: OperationCode,
    /// Number of items actually changed, or -1 for an aborted atomic rename.
    pub modify_count: i64,
    /// Number of candidate items considered.
    pub item_count: usize,
    /// Aggregate human-readable message.
    pub message: String,
}

impl BatchResult {
    /// Build a result with the aggregate message for the given counts.
    pub fn new(op: OperationCode, modify_count: i64, item_count: usize) -> Self {
        let message = modify_message(op, modify_count, item_count);
        Self {
            op,
            modify_count,
            item_count,
            message,
        }
    }

    /// True if an atomic operation aborted without changing anything.
    pub fn is_aborted(&self) -> bool {
        self.modify_count == -1
    }

    /// True if every considered item was changed.
    pub fn is_complete(&self) -> bool {
        self.modify_count >= 0 && self.modify_count as usize == self.item_count
    }
}

/// Aggregate result message keyed by operation code and counts.
pub fn modify_message(op: OperationCode, modify_count: i64, item_count: usize) -> String {
    if modify_count < 0 {
        return format!("{} aborted, nothing changed", op.verb());
    }
    format!("{} {} of {} items", op.verb(), modify_count, item_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modify_message_per_op() {
        assert_eq!(
            modify_message(OperationCode::Copy, 4, 5),
            "Copied 4 of 5 items"
        );
        assert_eq!(
            modify_message(OperationCode::Delete, 0, 3),
            "Deleted 0 of 3 items"
        );
        assert_eq!(
            modify_message(OperationCode::Rename, -1, 1),
            "Renamed aborted, nothing changed"
        );
    }

    #[test]
    fn test_aborted_sentinel_is_distinct_from_zero() {
        let aborted = BatchResult::new(OperationCode::Rename, -1, 1);
        let no_match = BatchResult::new(OperationCode::Rename, 0, 1);
        assert!(aborted.is_aborted());
        assert!(!no_match.is_aborted());
        assert!(!no_match.is_complete());
    }

    #[test]
    fn test_update_never_touches_filesystem() {
        assert!(!OperationCode::Update.touches_filesystem());
        assert!(OperationCode::Delete.touches_filesystem());
    }
}
