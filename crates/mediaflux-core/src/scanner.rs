//! Scanner collaborator interface.

/// Admission gate against a concurrently running full-tree rescan.
///
/// The gate is advisory: the storage layer does not enforce it, so a caller
/// that bypasses `can_proceed` can still race with the scanner.
pub trait ScannerGate: Send + Sync {
    /// Whether a full-tree rescan is currently registered.
    fn is_active(&self) -> bool;

    /// Whether a destructive operation may start right now.
    ///
    /// Implementations return `true` unconditionally when their
    /// skip-safety-checks switch is set (documented as unsafe), otherwise
    /// `false` while a scan is active.
    fn can_proceed(&self) -> bool;
}

/// Gate that never blocks. Useful for deployments without a background
/// scanner and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScanner;

impl ScannerGate for NoScanner {
    fn is_active(&self) -> bool {
        false
    }

    fn can_proceed(&self) -> bool {
        true
    }
}
