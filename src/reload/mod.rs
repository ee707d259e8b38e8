//! Reload Module
//!
//! Replaces the running application module when its library or one of its
//! assets changes, without stopping the frame loop.
//!
//! # Reload cycle
//!
//! ```text
//! snapshot -> on_unload -> load -> restore -> init -> swap -> success
//!     \__________\__________\_______\________\__ failure: report, keep old
//! ```
//!
//! # Modules
//!
//! - `build` - Optional build command run when sources change

pub mod build;


use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::app::ModuleLoader;
use crate::fault::{Captured, FaultKind};
use crate::harness::{Harness, ModuleHandle};
use crate::runtime::{InitSettings, RuntimeAdapter};
use crate::utils::path::normalize_path;
use crate::watch::ChangeEvent;
use crate::{debug, log};

pub use build::{BuildError, BuildHook};

/// What a change event led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Not relevant, nothing happened
    Ignored,
    /// New module installed
    Reloaded,
    /// Reload failed; the previous module stays
    Failed(FaultKind),
    /// Build command succeeded
    Rebuilt,
    /// Build command failed
    BuildFailed,
}

/// Drives reloads from change events. Lives on the watch thread.
pub struct ReloadEngine {
    loader: Box<dyn ModuleLoader>,
    harness: Arc<Harness>,
    adapter: Arc<RuntimeAdapter>,
    /// Settings used when the application doesn't provide its own
    defaults: InitSettings,
    /// Extensions (without dots) whose changes always reload
    asset_extensions: FxHashSet<String>,
    build: Option<BuildHook>,
}

impl ReloadEngine {
    pub fn new(
        loader: Box<dyn ModuleLoader>,
        harness: Arc<Harness>,
        adapter: Arc<RuntimeAdapter>,
    ) -> Self {
        let mut asset_extensions = FxHashSet::default();
        asset_extensions.insert(adapter.runtime().resource_extension().to_string());

        Self {
            loader,
            harness,
            adapter,
            defaults: InitSettings::default(),
            asset_extensions,
            build: None,
        }
    }

    /// Additional asset extensions, with or without a leading dot.
    pub fn with_asset_extensions(mut self, extensions: impl IntoIterator<Item = String>) -> Self {
        self.asset_extensions.extend(
            extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty()),
        );
        self
    }

    pub fn with_defaults(mut self, defaults: InitSettings) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_build_hook(mut self, hook: Option<BuildHook>) -> Self {
        self.build = hook;
        self
    }

    /// Load the first module and initialize the runtime with its settings.
    ///
    /// Runs before the frame loop exists, so failures are returned to the
    /// caller instead of being reported as faults.
    pub fn start(&mut self) -> anyhow::Result<()> {
        let module = self.loader.load()?;
        let settings = module.app().settings().unwrap_or_else(|| self.defaults.clone());
        self.adapter.init(&settings)?;

        let path = self.loader.source_path().to_path_buf();
        log!("reload"; "loaded {}", path.display());
        self.harness.install(ModuleHandle::new(path, module));
        Ok(())
    }

    /// Whether a change to `path` should reload the module.
    pub fn is_relevant(&self, path: &Path) -> bool {
        let Some(loaded) = self.harness.loaded_path() else {
            return false;
        };
        let path = normalize_path(path);
        path == loaded || self.is_asset(&path)
    }

    fn is_asset(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.asset_extensions.contains(ext))
    }

    /// Handle one change event.
    pub fn on_change(&mut self, event: &ChangeEvent) -> ReloadOutcome {
        if !self.harness.is_loaded() {
            return ReloadOutcome::Ignored;
        }

        if self.is_relevant(&event.path) {
            debug!("reload"; "{} {}", event.kind.label(), event.path.display());
            return self.reload();
        }

        if let Some(hook) = &self.build
            && hook.matches(&event.path)
        {
            debug!("build"; "{} {}", event.kind.label(), event.path.display());
            return self.rebuild();
        }

        ReloadOutcome::Ignored
    }

    /// Handle a batch of events in order.
    ///
    /// A batch arriving while nothing is loaded is dropped whole.
    pub fn process_batch(&mut self, batch: &[ChangeEvent]) -> Vec<ReloadOutcome> {
        if !self.harness.is_loaded() {
            debug!("watch"; "no module loaded, dropping {} event(s)", batch.len());
            return Vec::new();
        }
        batch.iter().map(|event| self.on_change(event)).collect()
    }

    /// Replace the loaded module with a fresh instance.
    fn reload(&mut self) -> ReloadOutcome {
        let boundary = self.harness.boundary().clone();
        let reporter = Arc::clone(boundary.reporter());
        let harness = Arc::clone(&self.harness);
        let swap = harness.begin_swap();

        // Snapshot and unload the outgoing instance.
        let outgoing = self.harness.with_module(|handle| {
            let app = handle.app_mut();
            boundary.capture(|| {
                let snapshot = app.snapshot();
                app.on_unload()?;
                Ok(snapshot)
            })
        });
        let snapshot = match outgoing {
            None => return ReloadOutcome::Ignored,
            Some(Ok(snapshot)) => snapshot,
            Some(Err(captured)) => {
                reporter.report(FaultKind::Unload, captured);
                return ReloadOutcome::Failed(FaultKind::Unload);
            }
        };

        // Instantiate the replacement outside the slot lock.
        let mut module = match self.loader.load() {
            Ok(module) => module,
            Err(e) => {
                reporter.report(FaultKind::Load, Captured::Load(e));
                return ReloadOutcome::Failed(FaultKind::Load);
            }
        };

        let adapter = &self.adapter;
        let defaults = &self.defaults;
        let prepared = boundary.capture(|| {
            let app = module.app_mut();
            if let Some(bytes) = &snapshot {
                app.restore(bytes)?;
            }
            let settings = app.settings().unwrap_or_else(|| defaults.clone());
            adapter.init(&settings)?;
            Ok(())
        });
        if let Err(captured) = prepared {
            reporter.report(FaultKind::Load, captured);
            return ReloadOutcome::Failed(FaultKind::Load);
        }

        let path = self.loader.source_path().to_path_buf();
        let previous = self.harness.install(ModuleHandle::new(path, module));
        drop(swap);
        drop(previous);

        reporter.success();
        ReloadOutcome::Reloaded
    }

    /// Run the build command for a source change.
    fn rebuild(&mut self) -> ReloadOutcome {
        let Some(hook) = &self.build else {
            return ReloadOutcome::Ignored;
        };

        match hook.run() {
            Ok(()) => {
                log!("build"; "rebuilt, waiting for the library to change");
                ReloadOutcome::Rebuilt
            }
            Err(BuildError::Failed { output, .. }) => {
                self.harness
                    .reporter()
                    .report(FaultKind::Load, Captured::Compile(output));
                ReloadOutcome::BuildFailed
            }
            Err(e) => {
                self.harness
                    .reporter()
                    .report(FaultKind::Load, Captured::Error(e.into()));
                ReloadOutcome::BuildFailed
            }
        }
    }
}
