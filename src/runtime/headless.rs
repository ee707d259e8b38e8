//! In-memory runtime.
//!
//! Draws into a [`Screen`] nobody looks at. Useful for CI smoke runs of an
//! application library (`backend = "headless"`, `frames = N`) and for tests.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{FrameHandler, InitSettings, Runtime, RuntimeError, Screen};
use crate::shutdown::is_shutdown;

/// Resource bundle extension shared with the terminal runtime.
pub const RESOURCE_EXTENSION: &str = "rfres";

struct HeadlessState {
    screen: Screen,
    fps: u32,
}

/// Runtime without any output device.
pub struct HeadlessRuntime {
    /// Stop after this many frames (`None` = until shutdown)
    frames: Option<u64>,
    /// Sleep between frames to honour the fps setting
    paced: bool,
    state: Mutex<Option<HeadlessState>>,
    init_count: Mutex<u32>,
    frames_run: Mutex<u64>,
}

impl HeadlessRuntime {
    pub fn new(frames: Option<u64>) -> Self {
        Self {
            frames,
            paced: true,
            state: Mutex::new(None),
            init_count: Mutex::new(0),
            frames_run: Mutex::new(0),
        }
    }

    /// Run frames back to back, ignoring fps.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Copy of the canvas as of the last completed frame.
    pub fn screen(&self) -> Option<Screen> {
        self.state.lock().as_ref().map(|s| s.screen.clone())
    }

    /// How many times `init` actually ran.
    pub fn init_count(&self) -> u32 {
        *self.init_count.lock()
    }

    pub fn frames_run(&self) -> u64 {
        *self.frames_run.lock()
    }
}

impl Runtime for HeadlessRuntime {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn resource_extension(&self) -> &'static str {
        RESOURCE_EXTENSION
    }

    fn init(&self, settings: &InitSettings) -> Result<(), RuntimeError> {
        *self.init_count.lock() += 1;
        *self.state.lock() = Some(HeadlessState {
            screen: Screen::new(settings.width, settings.height),
            fps: settings.fps.max(1),
        });
        Ok(())
    }

    fn run(&self, frame: &mut dyn FrameHandler) -> Result<(), RuntimeError> {
        let fps = match self.state.lock().as_ref() {
            Some(state) => state.fps,
            None => return Err(RuntimeError::NotInitialized("headless")),
        };
        let tick = Duration::from_secs(1) / fps;
        let mut next = Instant::now();

        loop {
            if is_shutdown() || self.frames.is_some_and(|limit| self.frames_run() >= limit) {
                break;
            }

            frame.update();
            if let Some(state) = self.state.lock().as_mut() {
                frame.draw(&mut state.screen);
            }
            *self.frames_run.lock() += 1;

            if self.paced {
                next += tick;
                if let Some(wait) = next.checked_duration_since(Instant::now()) {
                    std::thread::sleep(wait);
                }
            }
        }

        Ok(())
    }
}
