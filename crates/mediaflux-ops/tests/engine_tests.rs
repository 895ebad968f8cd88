use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use mediaflux_core::{
    BatchResult, ChangeScope, EngineConfig, EngineError, LogEntryKind, MemoryIndex, NoScanner,
    OperationCode, SelectedFileSet,
};
use mediaflux_ops::{
    EngineHooks, MutationEngine, SilentProgress, read_log, sidecar_path, structured_entries,
};
use mediaflux_scan::ScanRegistry;
use tempfile::TempDir;

fn engine_in(dir: &TempDir) -> (Arc<MemoryIndex>, MutationEngine) {
    let index = Arc::new(MemoryIndex::new());
    let config = EngineConfig::new(dir.path().join("tx.log"));
    let engine = MutationEngine::new(config, index.clone(), Arc::new(NoScanner));
    (index, engine)
}

fn touch(path: &Path) {
    fs::write(path, b"data").unwrap();
}

fn selection(index: &MemoryIndex, paths: &[PathBuf]) -> SelectedFileSet {
    let rows = index.rows();
    paths
        .iter()
        .map(|p| {
            let id = rows.iter().find(|r| &r.path == p).map(|r| r.id);
            (id, p.clone())
        })
        .collect()
}

#[test]
fn test_batch_delete_counts_and_log_order() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let mut paths = Vec::new();
    for i in 0..5 {
        let path = dir.path().join(format!("{i}.jpg"));
        touch(&path);
        index.insert(i, &path);
        paths.push(path);
    }

    let items = selection(&index, &paths);
    let result = engine.delete(&items, &mut SilentProgress).unwrap();

    assert_eq!(result.item_count, 5);
    assert_eq!(result.modify_count, 5);
    assert!(result.modify_count <= result.item_count as i64);
    assert_eq!(result.message, "Deleted 5 of 5 items");
    for path in &paths {
        assert!(!path.exists());
    }

    // Exactly five structured entries, in item order.
    let entries = read_log(&dir.path().join("tx.log")).unwrap();
    let structured = structured_entries(&entries);
    assert_eq!(structured.len(), 5);
    let logged: Vec<_> = structured.iter().map(|e| e.path.clone()).collect();
    assert_eq!(logged, paths);
    assert!(structured.iter().all(|e| e.kind == LogEntryKind::Delete));

    // Full success: index rows cleaned up.
    assert!(index.rows().is_empty());
}

#[test]
fn test_delete_with_missing_file_leaves_index_alone() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let mut paths = Vec::new();
    for i in 0..5 {
        let path = dir.path().join(format!("{i}.jpg"));
        if i != 2 {
            touch(&path);
        }
        index.insert(i, &path);
        paths.push(path);
    }

    let items = selection(&index, &paths);
    let result = engine.delete(&items, &mut SilentProgress).unwrap();

    assert_eq!(result.item_count, 5);
    assert_eq!(result.modify_count, 4);

    // 4 != 5: no partial cleanup, all five rows stay.
    assert_eq!(index.rows().len(), 5);
}

#[test]
fn test_delete_cancellation_keeps_completed_items() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let mut paths = Vec::new();
    for i in 0..4 {
        let path = dir.path().join(format!("{i}.jpg"));
        touch(&path);
        index.insert(i, &path);
        paths.push(path);
    }

    let items = selection(&index, &paths);
    let mut cancel_after_two =
        |done: usize, _total: usize, _current: Option<&Path>| done < 2;
    let result = engine.delete(&items, &mut cancel_after_two).unwrap();

    // Two deletions happened and stay; the rest were abandoned.
    assert_eq!(result.modify_count, 2);
    assert!(!paths[0].exists());
    assert!(!paths[1].exists());
    assert!(paths[2].exists());
    assert!(paths[3].exists());

    // Partial batch: index rows untouched.
    assert_eq!(index.rows().len(), 4);
}

#[test]
fn test_write_protection_short_circuits_before_any_mutation() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let a = dir.path().join("a.jpg");
    let b = dir.path().join("b.jpg");
    touch(&a);
    touch(&b);
    index.insert(1, &a);
    index.insert(2, &b);

    let mut permissions = fs::metadata(&b).unwrap().permissions();
    permissions.set_readonly(true);
    fs::set_permissions(&b, permissions).unwrap();

    let items = selection(&index, &[a.clone(), b.clone()]);
    let err = engine.delete(&items, &mut SilentProgress).unwrap_err();
    assert!(matches!(err, EngineError::WriteProtected { .. }));

    // Zero filesystem mutations and no log for the batch.
    assert!(a.exists());
    assert!(b.exists());
    assert!(!dir.path().join("tx.log").exists() || read_log(&dir.path().join("tx.log")).unwrap().is_empty());
    assert_eq!(index.rows().len(), 2);

    let mut permissions = fs::metadata(&b).unwrap().permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);
    fs::set_permissions(&b, permissions).unwrap();
}

#[test]
fn test_rename_directory_rewrites_prefixed_rows() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let src = dir.path().join("src");
    fs::create_dir(&src).unwrap();
    for i in 0..3 {
        let path = src.join(format!("{i}.jpg"));
        touch(&path);
        index.insert(i, &path);
    }

    let result = engine.rename(&src, "dst").unwrap();
    assert_eq!(result.modify_count, 3);
    assert_eq!(result.item_count, 1);

    let dst = dir.path().join("dst");
    assert!(!src.exists());
    assert!(dst.is_dir());
    for row in index.rows() {
        assert!(row.path.starts_with(&dst));
    }

    // Exactly one MoveDir entry for the whole directory rename.
    let entries = read_log(&dir.path().join("tx.log")).unwrap();
    let structured = structured_entries(&entries);
    assert_eq!(structured.len(), 1);
    assert_eq!(structured[0].kind, LogEntryKind::MoveDir);
    assert_eq!(structured[0].payload, dst.display().to_string());

    // The whole subtree moved: one subtree-scoped change notification.
    assert_eq!(index.notifications(), vec![ChangeScope::Subtree(dst)]);
}

#[test]
fn test_rename_file_with_relative_escape() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let a = dir.path().join("a");
    fs::create_dir(&a).unwrap();
    let old = a.join("old.jpg");
    touch(&old);
    index.insert(1, &old);

    let result = engine.rename(&old, "../b/new.jpg").unwrap();
    assert_eq!(result.modify_count, 1);

    let new = dir.path().join("b/new.jpg");
    assert!(new.exists());
    assert_eq!(index.row(1).unwrap().path, new);

    let entries = read_log(&dir.path().join("tx.log")).unwrap();
    assert_eq!(structured_entries(&entries)[0].kind, LogEntryKind::Rename);
}

#[test]
fn test_rename_rollback_on_index_failure() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let old = dir.path().join("old.jpg");
    touch(&old);
    index.insert(1, &old);
    index.set_fail_writes(true);

    let result = engine.rename(&old, "new.jpg").unwrap();

    // The sentinel, not zero: the rename itself was undone.
    assert_eq!(result.modify_count, -1);
    assert!(result.is_aborted());
    assert!(old.exists());
    assert!(!dir.path().join("new.jpg").exists());

    // No structured log entry for an aborted rename.
    let entries = read_log(&dir.path().join("tx.log")).unwrap();
    assert!(structured_entries(&entries).is_empty());
}

#[test]
fn test_rename_zero_matches_is_not_aborted() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let old = dir.path().join("old.jpg");
    touch(&old);

    // File is not indexed: the rename happens, zero rows match.
    let result = engine.rename(&old, "new.jpg").unwrap();
    assert_eq!(result.modify_count, 0);
    assert!(!result.is_aborted());
    let new = dir.path().join("new.jpg");
    assert!(new.exists());

    // The filesystem changed, so attached views still get a change
    // notification even though no index row matched.
    assert_eq!(
        index.notifications(),
        vec![ChangeScope::Paths(vec![old, new])]
    );
}

#[test]
fn test_rename_resolution_failure_mutates_nothing() {
    let dir = TempDir::new().unwrap();
    let (_, mut engine) = engine_in(&dir);

    let old = dir.path().join("old.jpg");
    touch(&old);

    let err = engine.rename(&old, "").unwrap_err();
    assert!(matches!(err, EngineError::PathResolution { .. }));
    assert!(old.exists());
}

#[test]
fn test_move_batch_updates_index_per_item() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let a = dir.path().join("a.jpg");
    let b = dir.path().join("b.jpg");
    touch(&a);
    touch(&b);
    index.insert(1, &a);
    index.insert(2, &b);

    let dest = dir.path().join("album");
    let items = selection(&index, &[a.clone(), b.clone()]);
    let result = engine.move_to(&items, &dest, &mut SilentProgress).unwrap();

    assert_eq!(result.modify_count, 2);
    assert_eq!(result.message, "Moved 2 of 2 items");
    assert!(dest.join("a.jpg").exists());
    assert_eq!(index.row(1).unwrap().path, dest.join("a.jpg"));
    assert_eq!(index.row(2).unwrap().path, dest.join("b.jpg"));

    let entries = read_log(&dir.path().join("tx.log")).unwrap();
    let kinds: Vec<_> = structured_entries(&entries)
        .iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(kinds, vec![LogEntryKind::MoveFile, LogEntryKind::MoveFile]);
}

#[test]
fn test_copy_batch_leaves_sources_and_index() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let a = dir.path().join("a.jpg");
    touch(&a);
    index.insert(1, &a);

    let dest = dir.path().join("backup");
    let items = selection(&index, &[a.clone()]);
    let result = engine.copy(&items, &dest, &mut SilentProgress).unwrap();

    assert_eq!(result.modify_count, 1);
    assert!(a.exists());
    assert!(dest.join("a.jpg").exists());
    // Copy does not move index rows.
    assert_eq!(index.row(1).unwrap().path, a);

    let entries = read_log(&dir.path().join("tx.log")).unwrap();
    assert_eq!(structured_entries(&entries)[0].kind, LogEntryKind::Copy);
}

#[test]
fn test_per_item_failure_skips_and_continues() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let a = dir.path().join("a.jpg");
    let missing = dir.path().join("missing.jpg");
    let c = dir.path().join("c.jpg");
    touch(&a);
    touch(&c);
    index.insert(1, &a);
    index.insert(3, &c);

    let dest = dir.path().join("album");
    let items = SelectedFileSet::from_pairs(vec![
        (Some(1), a.clone()),
        (None, missing.clone()),
        (Some(3), c.clone()),
    ]);
    let result = engine.move_to(&items, &dest, &mut SilentProgress).unwrap();

    // The missing item is a per-item failure, not a batch abort.
    assert_eq!(result.item_count, 3);
    assert_eq!(result.modify_count, 2);
    assert!(dest.join("a.jpg").exists());
    assert!(dest.join("c.jpg").exists());
}

#[test]
fn test_scanner_busy_blocks_destructive_ops() {
    let dir = TempDir::new().unwrap();
    let index = Arc::new(MemoryIndex::new());
    let registry = Arc::new(ScanRegistry::new());
    let config = EngineConfig::new(dir.path().join("tx.log"));
    let mut engine = MutationEngine::new(config, index.clone(), registry.clone());

    let a = dir.path().join("a.jpg");
    touch(&a);
    let items = SelectedFileSet::from_paths([a.to_str().unwrap()]);

    let (session, _) = registry.start_full_scan(dir.path());
    let err = engine.delete(&items, &mut SilentProgress).unwrap_err();
    assert!(matches!(err, EngineError::ScannerBusy));
    assert!(a.exists());

    // The documented-unsafe override admits the caller anyway.
    registry.set_skip_safety_checks(true);
    let result = engine.delete(&items, &mut SilentProgress).unwrap();
    assert_eq!(result.modify_count, 1);
    registry.complete(&session);
}

#[test]
fn test_geo_tagging_two_files() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let a = dir.path().join("a.jpg");
    let b = dir.path().join("b.jpg");
    touch(&a);
    touch(&b);
    index.insert(1, &a);
    index.insert(2, &b);

    let items = selection(&index, &[a.clone(), b.clone()]);
    let updated = engine
        .set_geo(52.5, 13.4, &items, &mut SilentProgress)
        .unwrap();
    assert_eq!(updated, 2);

    // Sidecar metadata written for both files.
    assert!(sidecar_path(&a).exists());
    assert!(sidecar_path(&b).exists());

    // Index rows carry the coordinates.
    let row = index.row(1).unwrap();
    assert_eq!(row.latitude, Some(52.5));
    assert_eq!(row.longitude, Some(13.4));

    // Two GPS entries with the stable payload format.
    let entries = read_log(&dir.path().join("tx.log")).unwrap();
    let structured = structured_entries(&entries);
    assert_eq!(structured.len(), 2);
    for entry in &structured {
        assert_eq!(entry.kind, LogEntryKind::Gps);
        assert_eq!(entry.payload, "52.500000 13.400000");
    }
}

#[test]
fn test_geo_tagging_rejects_non_finite_and_empty() {
    let dir = TempDir::new().unwrap();
    let (_, mut engine) = engine_in(&dir);

    let items = SelectedFileSet::from_paths(["/a/1.jpg"]);
    assert_eq!(
        engine
            .set_geo(f64::NAN, 13.4, &items, &mut SilentProgress)
            .unwrap(),
        0
    );
    assert_eq!(
        engine
            .set_geo(52.5, 13.4, &SelectedFileSet::new(), &mut SilentProgress)
            .unwrap(),
        0
    );
}

#[test]
fn test_geo_tagging_cancellation_skips_remaining() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let mut paths = Vec::new();
    for i in 0..3 {
        let path = dir.path().join(format!("{i}.jpg"));
        touch(&path);
        index.insert(i, &path);
        paths.push(path);
    }

    let items = selection(&index, &paths);
    // Tick every item; cancel once one item is done.
    let mut cancel_after_one = |done: usize, _: usize, _: Option<&Path>| done < 1;
    let updated = engine
        .set_geo_every(52.5, 13.4, &items, 1, &mut cancel_after_one)
        .unwrap();

    assert_eq!(updated, 1);
    assert!(sidecar_path(&paths[0]).exists());
    assert!(!sidecar_path(&paths[1]).exists());
    assert!(!sidecar_path(&paths[2]).exists());
}

#[test]
fn test_geo_progress_uses_configured_tick() {
    let dir = TempDir::new().unwrap();
    let index = Arc::new(MemoryIndex::new());
    let config = EngineConfig::builder()
        .log_path(dir.path().join("tx.log"))
        .items_per_progress(2usize)
        .build()
        .unwrap();
    let mut engine = MutationEngine::new(config, index.clone(), Arc::new(NoScanner));

    let mut paths = Vec::new();
    for i in 0..4 {
        let path = dir.path().join(format!("{i}.jpg"));
        touch(&path);
        paths.push(path);
    }
    let items = SelectedFileSet::from_paths(paths.clone());

    let mut ticks = Vec::new();
    let mut sink = |done: usize, total: usize, _: Option<&Path>| {
        ticks.push((done, total));
        true
    };
    engine.set_geo(52.5, 13.4, &items, &mut sink).unwrap();

    // Every second item plus the final report.
    assert_eq!(ticks, vec![(0, 4), (2, 4), (4, 4)]);
}

#[derive(Default)]
struct HookLog {
    prompts: Vec<String>,
    ignore_refreshes: usize,
    results: Vec<BatchResult>,
}

struct RecordingHooks {
    confirmed: bool,
    log: Arc<Mutex<HookLog>>,
}

impl RecordingHooks {
    fn new(confirmed: bool) -> (Self, Arc<Mutex<HookLog>>) {
        let log = Arc::new(Mutex::new(HookLog::default()));
        (
            Self {
                confirmed,
                log: log.clone(),
            },
            log,
        )
    }
}

impl EngineHooks for RecordingHooks {
    fn on_post_process(&mut self, _what: &str, _op: OperationCode, result: &BatchResult) {
        self.log.lock().unwrap().results.push(result.clone());
    }

    fn on_media_ignore_changed(&mut self) {
        self.log.lock().unwrap().ignore_refreshes += 1;
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.log.lock().unwrap().prompts.push(prompt.to_string());
        self.confirmed
    }
}

#[test]
fn test_declined_confirmation_deletes_nothing() {
    let dir = TempDir::new().unwrap();
    let index = Arc::new(MemoryIndex::new());
    let config = EngineConfig::new(dir.path().join("tx.log"));
    let (hooks, hook_log) = RecordingHooks::new(false);
    let mut engine =
        MutationEngine::new(config, index.clone(), Arc::new(NoScanner)).with_hooks(hooks);

    let a = dir.path().join("a.jpg");
    touch(&a);
    let items = SelectedFileSet::from_paths([a.to_str().unwrap()]);

    let outcome = engine
        .delete_with_confirmation(&items, &mut SilentProgress)
        .unwrap();
    assert!(outcome.is_none());
    assert!(a.exists());

    let log = hook_log.lock().unwrap();
    assert_eq!(log.prompts.len(), 1);
    assert!(log.prompts[0].contains("a.jpg"));
    // The batch never started: no post-process result was recorded.
    assert!(log.results.is_empty());
}

#[test]
fn test_ignore_marker_triggers_refresh_once() {
    let dir = TempDir::new().unwrap();
    let index = Arc::new(MemoryIndex::new());
    let config = EngineConfig::new(dir.path().join("tx.log"));
    let (hooks, hook_log) = RecordingHooks::new(true);
    let mut engine =
        MutationEngine::new(config, index.clone(), Arc::new(NoScanner)).with_hooks(hooks);

    let marker = dir.path().join(".nomedia");
    let photo = dir.path().join("a.jpg");
    touch(&marker);
    touch(&photo);

    // Deleting a batch containing the marker owes a GUI refresh.
    let items = SelectedFileSet::from_paths([marker.to_str().unwrap()]);
    engine.delete(&items, &mut SilentProgress).unwrap();
    assert_eq!(hook_log.lock().unwrap().ignore_refreshes, 1);

    // A later batch without markers does not owe another one.
    let items = SelectedFileSet::from_paths([photo.to_str().unwrap()]);
    engine.delete(&items, &mut SilentProgress).unwrap();
    assert_eq!(hook_log.lock().unwrap().ignore_refreshes, 1);
}

#[test]
fn test_change_notifications_fire_after_successful_batch() {
    let dir = TempDir::new().unwrap();
    let (index, mut engine) = engine_in(&dir);

    let a = dir.path().join("a.jpg");
    touch(&a);
    index.insert(1, &a);

    let items = selection(&index, &[a.clone()]);
    engine.delete(&items, &mut SilentProgress).unwrap();
    assert!(!index.notifications().is_empty());
}

#[test]
fn test_execute_dispatches_update_without_filesystem() {
    let dir = TempDir::new().unwrap();
    let (_, mut engine) = engine_in(&dir);

    let items = SelectedFileSet::from_paths(["/a/1.jpg", "/a/2.jpg"]);
    let result = engine
        .execute(OperationCode::Update, &items, None, &mut SilentProgress)
        .unwrap();
    assert_eq!(result.item_count, 2);
    assert_eq!(result.modify_count, 0);
}
