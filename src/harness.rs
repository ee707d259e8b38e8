//! Shared harness state.
//!
//! The frame thread and the watch thread meet here: one module slot and the
//! fault machinery. The slot lock is held by the frame thread for a single
//! `update` or `draw`, and by the watch thread only to snapshot, unload and
//! swap. Libraries are never loaded under it.
//!
//! Between unloading the outgoing instance and installing its replacement
//! the harness is swapping, and the frame thread leaves the module alone.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::app::{App, LoadedModule};
use crate::fault::{ErrorReporter, FaultBoundary, FaultState};
use crate::logger::Console;

/// The loaded unit of application code.
pub struct ModuleHandle {
    /// Library the module was loaded from (before shadow copying)
    path: PathBuf,
    module: LoadedModule,
}

impl ModuleHandle {
    pub fn new(path: impl Into<PathBuf>, module: LoadedModule) -> Self {
        Self {
            path: path.into(),
            module,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn app(&self) -> &dyn App {
        self.module.app()
    }

    pub fn app_mut(&mut self) -> &mut dyn App {
        self.module.app_mut()
    }
}

pub struct Harness {
    slot: Mutex<Option<ModuleHandle>>,
    swapping: AtomicBool,
    boundary: FaultBoundary,
}

impl Harness {
    pub fn new(console: Arc<Console>) -> Self {
        let reporter = ErrorReporter::new(console, Arc::new(FaultState::new()));
        Self {
            slot: Mutex::new(None),
            swapping: AtomicBool::new(false),
            boundary: FaultBoundary::new(Arc::new(reporter)),
        }
    }

    pub fn boundary(&self) -> &FaultBoundary {
        &self.boundary
    }

    pub fn reporter(&self) -> &ErrorReporter {
        self.boundary.reporter()
    }

    pub fn faults(&self) -> &FaultState {
        self.boundary.faults()
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Source path of the loaded module.
    pub fn loaded_path(&self) -> Option<PathBuf> {
        self.slot.lock().as_ref().map(|h| h.path().to_path_buf())
    }

    /// Whether a module swap is in progress.
    pub fn is_swapping(&self) -> bool {
        self.swapping.load(Ordering::Acquire)
    }

    /// Mark a swap in progress until the guard drops.
    pub fn begin_swap(&self) -> SwapGuard<'_> {
        self.swapping.store(true, Ordering::Release);
        SwapGuard { harness: self }
    }

    /// Put `handle` in the slot, returning its predecessor.
    ///
    /// The predecessor is handed back rather than dropped so its teardown
    /// runs outside the lock.
    pub fn install(&self, handle: ModuleHandle) -> Option<ModuleHandle> {
        self.slot.lock().replace(handle)
    }

    /// Run `f` on the loaded module, if any, holding the slot.
    pub fn with_module<R>(&self, f: impl FnOnce(&mut ModuleHandle) -> R) -> Option<R> {
        self.slot.lock().as_mut().map(f)
    }
}

/// Ends a swap when dropped, whichever way the reload went.
pub struct SwapGuard<'a> {
    harness: &'a Harness,
}

impl Drop for SwapGuard<'_> {
    fn drop(&mut self) {
        self.harness.swapping.store(false, Ordering::Release);
    }
}
