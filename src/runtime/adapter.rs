//! Runtime Adapter
//!
//! Owns the two runtime entry points the harness must control:
//!
//! - `init` runs the runtime's setup once per process. Reloaded application
//!   code asks for init again every time it is instantiated; those calls are
//!   no-ops. The working directory is restored after setup.
//! - `run` drives the frame loop. Only the harness holds the adapter, so no
//!   application code can start a second loop; a repeated call is ignored.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use parking_lot::Mutex;

use super::{FrameHandler, InitSettings, Runtime};
use crate::{debug, log};

pub struct RuntimeAdapter {
    runtime: Arc<dyn Runtime>,
    initialized: AtomicBool,
    /// Serializes concurrent first calls to `init`
    init_lock: Mutex<()>,
    loop_taken: AtomicBool,
}

impl RuntimeAdapter {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self {
            runtime,
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            loop_taken: AtomicBool::new(false),
        }
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    /// Whether setup has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Run runtime setup if it has not run yet.
    ///
    /// Returns `Ok(true)` when setup ran, `Ok(false)` when it was skipped.
    pub fn init(&self, settings: &InitSettings) -> Result<bool> {
        if self.is_initialized() {
            debug!("runtime"; "init skipped, already initialized");
            return Ok(false);
        }

        let _guard = self.init_lock.lock();
        if self.is_initialized() {
            return Ok(false);
        }

        let cwd = std::env::current_dir().context("failed to read working directory")?;
        // Restore even when setup fails.
        let setup = self.runtime.init(settings);
        let restored = std::env::set_current_dir(&cwd);
        setup.with_context(|| format!("{} runtime init failed", self.runtime.name()))?;
        restored
            .with_context(|| format!("failed to restore working directory {}", cwd.display()))?;

        self.initialized.store(true, Ordering::Release);
        debug!("runtime"; "{} initialized ({}x{} @ {}fps)",
            self.runtime.name(), settings.width, settings.height, settings.fps);
        Ok(true)
    }

    /// Hand the frame loop to `frame`. Blocks until the runtime quits.
    ///
    /// Only the first call drives frames; later calls return immediately.
    pub fn run(&self, frame: &mut dyn FrameHandler) -> Result<()> {
        if self.loop_taken.swap(true, Ordering::AcqRel) {
            log!("runtime"; "frame loop already running, ignoring second run");
            return Ok(());
        }

        self.runtime
            .run(frame)
            .with_context(|| format!("{} runtime frame loop failed", self.runtime.name()))
    }
}
