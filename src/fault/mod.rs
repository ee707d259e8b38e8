//! Fault Isolation
//!
//! Failures in application code never unwind into the frame loop or the
//! watch thread. They are captured at a [`FaultBoundary`], classified and
//! reported by the [`ErrorReporter`], and remembered in [`FaultState`] until
//! a reload succeeds.
//!
//! # Modules
//!
//! - `boundary` - Guarded calls that skip while faulted
//! - `report` - Console trace, success banner, fault bookkeeping
//! - `trace` - Panic capture and line-number extraction

pub mod boundary;
pub mod report;
pub mod trace;

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::runtime::{Canvas, Color};

pub use boundary::FaultBoundary;
pub use report::ErrorReporter;
pub use trace::{Captured, PanicError, PanicSite, capture, contain};

/// Where a fault happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Instantiating a module (load, restore, init, build)
    Load,
    /// Per-frame `update` or `draw`
    Frame,
    /// The outgoing module's `on_unload`
    Unload,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Frame => "frame",
            Self::Unload => "unload",
        })
    }
}

/// Whether the code never ran or failed while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCause {
    Syntax,
    Runtime,
}

/// A classified failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub cause: FaultCause,
    /// `panic`, the error's type, `LoadError` or `CompileError`
    pub type_name: String,
    pub message: String,
    /// Best-effort source line
    pub line: Option<u32>,
    /// Full formatted trace for the console
    pub trace: String,
}

impl Fault {
    /// Second overlay line.
    pub fn summary(&self) -> String {
        match self.line {
            Some(line) => format!("{} at line number {line}", self.type_name),
            None => format!("{} at line number ?", self.type_name),
        }
    }

    /// Paint the error overlay in place of the application's frame.
    pub fn paint(&self, canvas: &mut dyn Canvas) {
        canvas.cls(Color::Black);
        canvas.text(1, 1, "Error", Color::Red, None);
        canvas.text(1, 3, &self.summary(), Color::Red, None);
    }
}

/// The harness-wide error flag.
///
/// Set means the application is faulted and its `update`/`draw` are not
/// called. Readers never block and always see a whole [`Fault`].
#[derive(Default)]
pub struct FaultState {
    current: ArcSwapOption<Fault>,
}

impl FaultState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.current.load().is_some()
    }

    pub fn current(&self) -> Option<Arc<Fault>> {
        self.current.load_full()
    }

    pub fn set(&self, fault: Fault) -> Arc<Fault> {
        let fault = Arc::new(fault);
        self.current.store(Some(Arc::clone(&fault)));
        fault
    }

    /// Clear the fault; returns whether one was set.
    pub fn clear(&self) -> bool {
        self.current.swap(None).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Screen;

    fn sample(line: Option<u32>) -> Fault {
        Fault {
            kind: FaultKind::Frame,
            cause: FaultCause::Runtime,
            type_name: "panic".into(),
            message: "boom".into(),
            line,
            trace: String::new(),
        }
    }

    #[test]
    fn test_fault_state_set_and_clear() {
        let state = FaultState::new();
        assert!(!state.is_active());
        assert!(!state.clear());

        state.set(sample(Some(3)));
        assert!(state.is_active());
        assert_eq!(state.current().unwrap().message, "boom");

        assert!(state.clear());
        assert!(state.current().is_none());
    }

    #[test]
    fn test_overlay_paint() {
        let mut screen = Screen::new(40, 6);
        screen.text(0, 0, "stale frame", Color::White, None);

        sample(Some(12)).paint(&mut screen);

        assert_eq!(screen.row_text(0), "");
        assert_eq!(screen.row_text(1), " Error");
        assert_eq!(screen.row_text(3), " panic at line number 12");
        assert_eq!(screen.cell(1, 1).unwrap().fg, Color::Red);
    }

    #[test]
    fn test_summary_without_line() {
        assert_eq!(sample(None).summary(), "panic at line number ?");
    }
}
