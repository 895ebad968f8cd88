//! Scan registration and the admission gate.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::broadcast;

use mediaflux_core::ScannerGate;

use crate::progress::ScanProgress;

const PROGRESS_CHANNEL_SIZE: usize = 100;

/// State of a registered scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The scan is crawling.
    Running,
    /// The hosting environment paused the scan (backgrounded).
    Paused,
}

/// One full-tree rescan session.
///
/// Sessions are created only through [`ScanRegistry::start_full_scan`] so
/// the singleton invariant holds.
pub struct ScanSession {
    root: PathBuf,
    state: Mutex<SessionState>,
    started: Instant,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl ScanSession {
    fn new(root: PathBuf) -> Self {
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_SIZE);
        Self {
            root,
            state: Mutex::new(SessionState::Running),
            started: Instant::now(),
            progress_tx,
        }
    }

    /// Root path being rescanned.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Pause the scan (hosting environment went to background).
    pub fn pause(&self) {
        *self.state.lock().unwrap() = SessionState::Paused;
    }

    /// Resume the scan if it was paused; no-op otherwise.
    pub fn resume_if_paused(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == SessionState::Paused {
            *state = SessionState::Running;
        }
    }

    /// Subscribe to progress snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Publish a progress snapshot, stamping the elapsed time. Lagging or
    /// absent subscribers are fine.
    pub fn report(&self, mut progress: ScanProgress) {
        progress.elapsed = self.started.elapsed();
        let _ = self.progress_tx.send(progress);
    }
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("root", &self.root)
            .field("state", &self.state())
            .finish()
    }
}

/// Process-wide scan registry: a mutex-guarded singleton slot holding at
/// most one active session.
///
/// Registration is compare-and-set: starting a scan while one is active
/// joins the existing session instead of starting duplicate work. The
/// registry also owns the admission decision for destructive operations;
/// the gate is advisory, and the skip-safety-checks switch bypasses it
/// entirely (dangerous, callers can then race with the scanner).
#[derive(Debug, Default)]
pub struct ScanRegistry {
    slot: Mutex<Option<Arc<ScanSession>>>,
    skip_safety_checks: AtomicBool,
}

impl ScanRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a full scan of `root`, or join the already-running session.
    ///
    /// Returns the session and whether this call started it (`true`) or
    /// attached to an existing one (`false`).
    pub fn start_full_scan(&self, root: impl Into<PathBuf>) -> (Arc<ScanSession>, bool) {
        let mut slot = self.slot.lock().unwrap();
        if let Some(existing) = slot.as_ref() {
            existing.resume_if_paused();
            tracing::debug!(
                target: "mediaflux_scan",
                root = %existing.root().display(),
                "joining already-running scan"
            );
            return (existing.clone(), false);
        }
        let session = Arc::new(ScanSession::new(root.into()));
        *slot = Some(session.clone());
        tracing::info!(target: "mediaflux_scan", root = %session.root().display(), "scan registered");
        (session, true)
    }

    /// Clear the slot when the given session completes or is cancelled.
    /// A stale handle from an earlier session leaves the slot untouched.
    pub fn complete(&self, session: &Arc<ScanSession>) {
        let mut slot = self.slot.lock().unwrap();
        if slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, session)) {
            *slot = None;
            tracing::info!(target: "mediaflux_scan", root = %session.root().display(), "scan completed");
        }
    }

    /// The currently registered session, if any.
    pub fn busy_scanner(&self) -> Option<Arc<ScanSession>> {
        self.slot.lock().unwrap().clone()
    }

    /// Disable the admission check. Documented as unsafe: mutations can
    /// then race with a running rescan over the same subtree.
    pub fn set_skip_safety_checks(&self, skip: bool) {
        self.skip_safety_checks.store(skip, Ordering::SeqCst);
    }
}

impl ScannerGate for ScanRegistry {
    fn is_active(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }

    fn can_proceed(&self) -> bool {
        if self.skip_safety_checks.load(Ordering::SeqCst) {
            return true;
        }
        !self.is_active()
    }
}
