//! Test fixtures: a scripted module loader and a configurable application.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::app::{App, LoadError, LoadedModule, ModuleLoader};
use crate::driver::FrameDriver;
use crate::harness::Harness;
use crate::logger::Console;
use crate::logger::tests::SharedBuf;
use crate::reload::ReloadEngine;
use crate::runtime::{Canvas, Color, FrameHandler, HeadlessRuntime, InitSettings, RuntimeAdapter};
use crate::watch::{ChangeEvent, ChangeKind};

/// Line of the most recent `panic!` raised by a [`TestApp`].
pub(crate) static PANIC_LINE: AtomicU32 = AtomicU32::new(0);

/// Lines where a [`TestApp`] returns its `draw` and `on_unload` errors.
pub(crate) static DRAW_LINE: AtomicU32 = AtomicU32::new(0);
pub(crate) static UNLOAD_LINE: AtomicU32 = AtomicU32::new(0);

pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

/// How a [`TestApp`] misbehaves.
#[derive(Clone, Default)]
pub(crate) struct Behavior {
    pub panic_on_update: bool,
    /// `update` returns a parse error
    pub fail_update: bool,
    pub fail_draw: bool,
    pub fail_unload: bool,
    pub fail_restore: bool,
    /// Carry the frame counter across reloads
    pub persist: bool,
    pub settings: Option<InitSettings>,
}

pub(crate) struct TestApp {
    label: String,
    frames: u32,
    journal: Journal,
    behavior: Behavior,
}

impl TestApp {
    pub(crate) fn with(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    fn note(&self, what: &str) {
        self.journal.lock().push(format!("{}:{what}", self.label));
    }
}

impl App for TestApp {
    fn settings(&self) -> Option<InitSettings> {
        self.behavior.settings.clone()
    }

    fn update(&mut self) -> anyhow::Result<()> {
        if self.behavior.panic_on_update {
            PANIC_LINE.store(line!() + 1, Ordering::SeqCst);
            panic!("boom");
        }
        if self.behavior.fail_update {
            let _speed: u32 = "fast".parse()?;
        }
        self.frames += 1;
        self.note("update");
        Ok(())
    }

    fn draw(&mut self, canvas: &mut dyn Canvas) -> anyhow::Result<()> {
        canvas.cls(Color::Navy);
        canvas.text(0, 0, &format!("{} {}", self.label, self.frames), Color::White, None);
        if self.behavior.fail_draw {
            DRAW_LINE.store(line!() + 1, Ordering::SeqCst);
            anyhow::bail!("sprite sheet missing");
        }
        self.note("draw");
        Ok(())
    }

    fn on_unload(&mut self) -> anyhow::Result<()> {
        self.note("unload");
        if self.behavior.fail_unload {
            UNLOAD_LINE.store(line!() + 1, Ordering::SeqCst);
            anyhow::bail!("cannot release audio device");
        }
        Ok(())
    }

    fn snapshot(&self) -> Option<Vec<u8>> {
        self.behavior
            .persist
            .then(|| self.frames.to_le_bytes().to_vec())
    }

    fn restore(&mut self, snapshot: &[u8]) -> anyhow::Result<()> {
        if self.behavior.fail_restore {
            anyhow::bail!("snapshot from an incompatible version");
        }
        let bytes: [u8; 4] = snapshot.try_into()?;
        self.frames = u32::from_le_bytes(bytes);
        self.note("restore");
        Ok(())
    }
}

pub(crate) enum Step {
    Load(TestApp),
    Fail(LoadError),
}

/// Hands out queued results instead of loading libraries.
pub(crate) struct ScriptedLoader {
    path: PathBuf,
    steps: Arc<Mutex<VecDeque<Step>>>,
    loads: Arc<AtomicUsize>,
    harness: Arc<Harness>,
    /// Whether the harness was mid-swap at each load
    swapping: Arc<Mutex<Vec<bool>>>,
}

impl ModuleLoader for ScriptedLoader {
    fn source_path(&self) -> &Path {
        &self.path
    }

    fn load(&mut self) -> Result<LoadedModule, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.swapping.lock().push(self.harness.is_swapping());
        match self.steps.lock().pop_front() {
            Some(Step::Load(app)) => Ok(LoadedModule::in_process(Box::new(app))),
            Some(Step::Fail(e)) => Err(e),
            None => Err(LoadError::NotFound {
                name: "script exhausted".into(),
                searched: Vec::new(),
            }),
        }
    }
}

/// A harness wired to a headless runtime and a scripted loader.
pub(crate) struct Rig {
    pub harness: Arc<Harness>,
    pub runtime: Arc<HeadlessRuntime>,
    pub adapter: Arc<RuntimeAdapter>,
    pub console: SharedBuf,
    pub journal: Journal,
    pub module_path: PathBuf,
    steps: Arc<Mutex<VecDeque<Step>>>,
    loads: Arc<AtomicUsize>,
    swapping: Arc<Mutex<Vec<bool>>>,
}

impl Rig {
    /// Rig plus an engine that has not loaded anything yet.
    pub(crate) fn new() -> (Self, ReloadEngine) {
        let console = SharedBuf::default();
        let harness = Arc::new(Harness::new(Arc::new(Console::to_writer(console.clone()))));
        let runtime = Arc::new(HeadlessRuntime::new(None).unpaced());
        let adapter = Arc::new(RuntimeAdapter::new(runtime.clone()));
        let module_path = PathBuf::from("/virtual/game/libgame.so");
        let steps = Arc::new(Mutex::new(VecDeque::new()));
        let loads = Arc::new(AtomicUsize::new(0));
        let swapping = Arc::new(Mutex::new(Vec::new()));

        let loader = ScriptedLoader {
            path: module_path.clone(),
            steps: steps.clone(),
            loads: loads.clone(),
            harness: harness.clone(),
            swapping: swapping.clone(),
        };
        let engine = ReloadEngine::new(Box::new(loader), harness.clone(), adapter.clone());

        let rig = Self {
            harness,
            runtime,
            adapter,
            console,
            journal: Journal::default(),
            module_path,
            steps,
            loads,
            swapping,
        };
        (rig, engine)
    }

    /// Rig whose engine already runs `first`.
    pub(crate) fn started(first: &str) -> (Self, ReloadEngine) {
        let (rig, mut engine) = Self::new();
        rig.push(rig.app(first));
        engine.start().expect("initial load");
        (rig, engine)
    }

    pub(crate) fn app(&self, label: &str) -> TestApp {
        TestApp {
            label: label.to_string(),
            frames: 0,
            journal: self.journal.clone(),
            behavior: Behavior::default(),
        }
    }

    pub(crate) fn push(&self, app: TestApp) {
        self.steps.lock().push_back(Step::Load(app));
    }

    pub(crate) fn push_failure(&self, error: LoadError) {
        self.steps.lock().push_back(Step::Fail(error));
    }

    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Per load, whether the harness was swapping modules.
    pub(crate) fn swap_states(&self) -> Vec<bool> {
        self.swapping.lock().clone()
    }

    pub(crate) fn module_changed(&self) -> ChangeEvent {
        ChangeEvent::new(ChangeKind::Modified, &self.module_path)
    }

    pub(crate) fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    /// Run one frame against the runtime's screen; returns its top row.
    pub(crate) fn tick(&self, screen: &mut crate::runtime::Screen) -> String {
        let mut driver = FrameDriver::new(self.harness.clone());
        driver.update();
        driver.draw(screen);
        screen.row_text(0)
    }
}
