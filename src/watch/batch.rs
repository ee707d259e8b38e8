use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::{FxHashMap, FxHashSet};

use super::types::{ChangeEvent, ChangeKind};
use crate::debug;
use crate::utils::path::normalize_path;

/// Collects notify events into batches.
///
/// A batch is ready once no event has arrived for the debounce window.
/// Paths are deduplicated; the batch keeps the order in which paths first
/// showed up.
pub(super) struct Batcher {
    debounce: Duration,
    /// Path → ChangeKind
    pub(super) changes: FxHashMap<PathBuf, ChangeKind>,
    /// First-arrival order (may hold paths since discarded)
    order: Vec<PathBuf>,
    pub(super) last_event: Option<Instant>,
}

impl Batcher {
    pub(super) fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            changes: FxHashMap::default(),
            order: Vec::new(),
            last_event: None,
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Remove + Create/Modify → Create/Modify (file was restored)
    /// - Modify + Remove → Remove (file was deleted)
    /// - Create + Remove → dropped (appeared and vanished)
    /// - otherwise the first event wins
    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(modify) => {
                // Metadata-only changes (mtime/atime/chmod) are noise
                if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                    return;
                }
                ChangeKind::Modified
            }
            _ => return,
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }

            let path = normalize_path(path);
            self.last_event = Some(Instant::now());

            let Some(&existing) = self.changes.get(&path) else {
                debug!("watch"; "event {}: {}", kind.label(), path.display());
                self.order.push(path.clone());
                self.changes.insert(path, kind);
                continue;
            };

            match (existing, kind) {
                (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                    self.changes.insert(path, kind);
                }
                (ChangeKind::Modified, ChangeKind::Removed) => {
                    self.changes.insert(path, ChangeKind::Removed);
                }
                (ChangeKind::Created, ChangeKind::Removed) => {
                    debug!("watch"; "discard created+removed: {}", path.display());
                    self.changes.remove(&path);
                }
                _ => {}
            }
        }
    }

    pub(super) fn is_ready(&self) -> bool {
        self.last_event
            .is_some_and(|last| last.elapsed() >= self.debounce)
    }

    /// How long until the pending batch could be ready.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };
        self.debounce
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }

    /// Take the batch if the debounce window has passed.
    pub(super) fn take_if_ready(&mut self) -> Option<Vec<ChangeEvent>> {
        if !self.is_ready() {
            return None;
        }
        self.last_event = None;
        let batch = self.drain();
        (!batch.is_empty()).then_some(batch)
    }

    /// Everything collected so far, in first-arrival order, with kinds
    /// reconciled against the filesystem.
    pub(super) fn drain(&mut self) -> Vec<ChangeEvent> {
        let mut changes = std::mem::take(&mut self.changes);
        let order = std::mem::take(&mut self.order);
        correct_by_existence(&mut changes);

        let mut seen = FxHashSet::default();
        order
            .into_iter()
            .filter(|path| seen.insert(path.clone()))
            .filter_map(|path| {
                let kind = changes.remove(&path)?;
                Some(ChangeEvent { kind, path })
            })
            .collect()
    }
}

/// Reconcile event kinds with actual filesystem state.
///
/// The watcher may report stale events (Created for a file that's already
/// gone, or Removed for a file that still exists after an atomic save).
fn correct_by_existence(changes: &mut FxHashMap<PathBuf, ChangeKind>) {
    changes.retain(|path, kind| {
        let exists = path.exists();
        match *kind {
            ChangeKind::Created if !exists => {
                debug!("watch"; "discard created (gone): {}", path.display());
                false
            }
            ChangeKind::Modified if !exists => {
                *kind = ChangeKind::Removed;
                true
            }
            ChangeKind::Removed if exists => {
                *kind = ChangeKind::Modified;
                true
            }
            _ => true,
        }
    });
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
