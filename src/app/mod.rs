//! Application Module
//!
//! An application is a `cdylib` that implements [`App`] and exports it with
//! [`export_app!`](crate::export_app). The harness loads it, drives its
//! `update`/`draw` once per frame, and replaces it whenever the library
//! changes on disk.
//!
//! ```ignore
//! use reframe::{App, Canvas, Color};
//!
//! #[derive(Default)]
//! struct Game { t: u32 }
//!
//! impl App for Game {
//!     fn update(&mut self) -> anyhow::Result<()> {
//!         self.t += 1;
//!         Ok(())
//!     }
//!
//!     fn draw(&mut self, canvas: &mut dyn Canvas) -> anyhow::Result<()> {
//!         canvas.cls(Color::Navy);
//!         canvas.text(2, 2, &format!("t = {}", self.t), Color::White, None);
//!         Ok(())
//!     }
//! }
//!
//! reframe::export_app!(Game::default);
//! ```
//!
//! State that should survive a reload is declared explicitly through
//! [`App::snapshot`] and [`App::restore`]; everything else starts fresh.

pub mod loader;

use crate::fault::contain;
use crate::runtime::{Canvas, InitSettings};

pub use loader::{DylibLoader, LoadError, LoadedModule, ModuleLoader, resolve_module};

/// Bumped whenever [`App`] changes shape. Libraries built against another
/// version are refused.
pub const APP_API_VERSION: u32 = 1;

/// Exported symbol returning the library's `APP_API_VERSION`.
pub const API_VERSION_SYMBOL: &[u8] = b"reframe_api_version\0";

/// Exported symbol constructing the application.
pub const CREATE_SYMBOL: &[u8] = b"reframe_create\0";

/// Function types for the exported entry points
pub type ApiVersionFn = unsafe extern "C" fn() -> u32;
pub type CreateFn = unsafe fn() -> Box<dyn App>;

/// A hot-reloadable application.
pub trait App: Send {
    /// Runtime setup requested by this application.
    ///
    /// Asked after every instantiation; only the first answer reaches the
    /// runtime.
    fn settings(&self) -> Option<InitSettings> {
        None
    }

    /// Advance one frame.
    fn update(&mut self) -> anyhow::Result<()>;

    /// Render one frame.
    fn draw(&mut self, canvas: &mut dyn Canvas) -> anyhow::Result<()>;

    /// Release external resources before this instance is replaced.
    fn on_unload(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// State to carry into the next instance.
    fn snapshot(&self) -> Option<Vec<u8>> {
        None
    }

    /// Adopt state produced by the previous instance's `snapshot`.
    fn restore(&mut self, _snapshot: &[u8]) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Runs every call of the wrapped [`App`] with panics caught.
///
/// A library links its own std, and a panic from one std cannot unwind
/// through another. [`export_app!`](crate::export_app) wraps the exported
/// instance in this so panics become [`PanicError`](crate::fault::PanicError)s
/// before they reach the harness.
pub struct Contained<A>(pub A);

impl<A: App> App for Contained<A> {
    fn settings(&self) -> Option<InitSettings> {
        contain(|| Ok(self.0.settings())).ok().flatten()
    }

    fn update(&mut self) -> anyhow::Result<()> {
        contain(|| self.0.update())
    }

    fn draw(&mut self, canvas: &mut dyn Canvas) -> anyhow::Result<()> {
        contain(|| self.0.draw(canvas))
    }

    fn on_unload(&mut self) -> anyhow::Result<()> {
        contain(|| self.0.on_unload())
    }

    fn snapshot(&self) -> Option<Vec<u8>> {
        contain(|| Ok(self.0.snapshot())).ok().flatten()
    }

    fn restore(&mut self, snapshot: &[u8]) -> anyhow::Result<()> {
        contain(|| self.0.restore(snapshot))
    }
}

/// Export an [`App`] constructor from a `cdylib`.
///
/// ```ignore
/// reframe::export_app!(MyGame::new);
/// ```
#[macro_export]
macro_rules! export_app {
    ($ctor:expr) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn reframe_api_version() -> u32 {
            $crate::app::APP_API_VERSION
        }

        #[unsafe(no_mangle)]
        pub fn reframe_create() -> ::std::boxed::Box<dyn $crate::app::App> {
            ::std::boxed::Box::new($crate::app::Contained(($ctor)()))
        }
    };
}
