use std::path::PathBuf;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use super::batch::Batcher;
use super::*;
use crate::testing::Rig;
use crate::utils::path::normalize_path;

fn make_event(paths: Vec<&PathBuf>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().cloned().collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn metadata_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
        notify::event::MetadataKind::WriteTime,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

/// Temp dir with the given files present.
fn make_files(names: &[&str]) -> (TempDir, Vec<PathBuf>) {
    let temp = TempDir::new().unwrap();
    let root = normalize_path(temp.path());
    let paths = names
        .iter()
        .map(|name| {
            let path = root.join(name);
            std::fs::write(&path, b"x").unwrap();
            path
        })
        .collect();
    (temp, paths)
}

fn batcher() -> Batcher {
    Batcher::new(Duration::from_millis(DEBOUNCE_MS))
}

#[test]
fn test_batcher_empty() {
    let mut batcher = batcher();
    assert!(!batcher.is_ready());
    assert!(batcher.take_if_ready().is_none());
    assert!(batcher.sleep_duration() >= Duration::from_secs(3600));
}

#[test]
fn test_event_kinds() {
    let (_temp, paths) = make_files(&["a.rs", "b.rs"]);
    let gone = paths[0].with_file_name("c.rs");
    let mut batcher = batcher();

    batcher.add_event(&make_event(vec![&paths[0]], create_kind()));
    batcher.add_event(&make_event(vec![&paths[1]], modify_kind()));
    batcher.add_event(&make_event(vec![&gone], remove_kind()));

    assert_eq!(batcher.changes[&paths[0]], ChangeKind::Created);
    assert_eq!(batcher.changes[&paths[1]], ChangeKind::Modified);
    assert_eq!(batcher.changes[&gone], ChangeKind::Removed);
}

#[test]
fn test_dedup_keeps_first_arrival_order() {
    let (_temp, paths) = make_files(&["one.rfres", "two.rfres", "three.rfres"]);
    let mut batcher = batcher();

    batcher.add_event(&make_event(vec![&paths[1]], modify_kind()));
    batcher.add_event(&make_event(vec![&paths[0], &paths[1]], modify_kind()));
    batcher.add_event(&make_event(vec![&paths[2]], create_kind()));
    batcher.add_event(&make_event(vec![&paths[1]], modify_kind()));

    let batch = batcher.drain();
    let order: Vec<_> = batch.iter().map(|e| &e.path).collect();
    assert_eq!(order, [&paths[1], &paths[0], &paths[2]]);
    assert_eq!(batch[2].kind, ChangeKind::Created);
}

#[test]
fn test_temp_and_metadata_events_ignored() {
    let (_temp, paths) = make_files(&["real.rs", ".real.rs.swp", "real.rs~"]);
    let mut batcher = batcher();

    batcher.add_event(&make_event(vec![&paths[0]], metadata_kind()));
    assert!(batcher.last_event.is_none());

    batcher.add_event(&make_event(vec![&paths[1], &paths[2]], modify_kind()));
    assert!(batcher.changes.is_empty());
    assert!(batcher.last_event.is_none());
}

#[test]
fn test_created_then_removed_is_dropped() {
    let (_temp, paths) = make_files(&["flash.rs"]);
    let mut batcher = batcher();

    batcher.add_event(&make_event(vec![&paths[0]], create_kind()));
    batcher.add_event(&make_event(vec![&paths[0]], remove_kind()));

    assert!(batcher.drain().is_empty());
}

#[test]
fn test_kinds_reconciled_with_filesystem() {
    let (_temp, paths) = make_files(&["saved.rs", "deleted.rs", "ghost.rs"]);
    let mut batcher = batcher();

    // Atomic save: reported removed, but the file is back
    batcher.add_event(&make_event(vec![&paths[0]], remove_kind()));
    // Modified, then deleted before the batch closed
    batcher.add_event(&make_event(vec![&paths[1]], modify_kind()));
    std::fs::remove_file(&paths[1]).unwrap();
    // Created and already gone
    batcher.add_event(&make_event(vec![&paths[2]], create_kind()));
    std::fs::remove_file(&paths[2]).unwrap();

    let batch = batcher.drain();
    assert_eq!(
        batch,
        [
            ChangeEvent::new(ChangeKind::Modified, &paths[0]),
            ChangeEvent::new(ChangeKind::Removed, &paths[1]),
        ]
    );
}

#[test]
fn test_take_waits_for_quiet_window() {
    let (_temp, paths) = make_files(&["lib.rs"]);
    let mut batcher = Batcher::new(Duration::from_millis(20));

    batcher.add_event(&make_event(vec![&paths[0]], modify_kind()));
    assert!(batcher.take_if_ready().is_none());
    assert!(batcher.sleep_duration() <= Duration::from_millis(20));

    std::thread::sleep(Duration::from_millis(30));
    let batch = batcher.take_if_ready().unwrap();
    assert_eq!(batch.len(), 1);
    assert!(batcher.last_event.is_none());
}

#[test]
fn test_watch_loop_stops_on_signal() {
    let temp = TempDir::new().unwrap();
    let (_rig, engine) = Rig::started("v1");

    let watch = WatchLoop::spawn(temp.path(), Duration::from_millis(10), engine).unwrap();
    watch.stop();
}

#[test]
fn test_watch_loop_reloads_on_asset_change() {
    let temp = TempDir::new().unwrap();
    let (rig, engine) = Rig::started("v1");
    // Spare instances in case the write lands in two batches
    rig.push(rig.app("v2"));
    rig.push(rig.app("v2"));

    let watch = WatchLoop::spawn(temp.path(), Duration::from_millis(20), engine).unwrap();
    std::fs::write(temp.path().join("level.rfres"), b"tiles").unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while rig.loads() < 2 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    watch.stop();

    assert!(rig.loads() >= 2, "asset change never reached the engine");
    assert!(!rig.harness.faults().is_active());
    let mut screen = crate::runtime::Screen::new(20, 3);
    assert_eq!(rig.tick(&mut screen), "v2 1");
}

