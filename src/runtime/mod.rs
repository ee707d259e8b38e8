//! Runtime Module
//!
//! The fixed-framerate runtime the harness drives, seen through the few
//! capabilities it needs: one-time setup, a blocking frame loop, and a canvas.
//!
//! # Modules
//!
//! - `adapter` - Init guard and harness-owned frame loop
//! - `screen` - Character-cell canvas shared by the bundled runtimes
//! - `terminal` - Crossterm runtime drawing into the terminal
//! - `headless` - In-memory runtime with a bounded frame count

pub mod adapter;
pub mod headless;
pub mod screen;
pub mod terminal;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use adapter::RuntimeAdapter;
pub use headless::HeadlessRuntime;
pub use screen::{Cell, Screen};
pub use terminal::TerminalRuntime;

// =============================================================================
// Drawing surface
// =============================================================================

/// 16-color palette shared by every runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[default]
    Black,
    Navy,
    Purple,
    Green,
    Brown,
    DarkBlue,
    LightBlue,
    White,
    Red,
    Orange,
    Yellow,
    Lime,
    Cyan,
    Gray,
    Pink,
    Peach,
}

impl Color {
    /// Palette index (0-15).
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Color for a palette index, wrapping out-of-range values.
    pub const fn from_index(index: u8) -> Self {
        match index % 16 {
            0 => Self::Black,
            1 => Self::Navy,
            2 => Self::Purple,
            3 => Self::Green,
            4 => Self::Brown,
            5 => Self::DarkBlue,
            6 => Self::LightBlue,
            7 => Self::White,
            8 => Self::Red,
            9 => Self::Orange,
            10 => Self::Yellow,
            11 => Self::Lime,
            12 => Self::Cyan,
            13 => Self::Gray,
            14 => Self::Pink,
            _ => Self::Peach,
        }
    }
}

/// Drawing primitives available to `App::draw`.
///
/// Coordinates are in canvas cells; anything outside the canvas is clipped.
pub trait Canvas {
    fn width(&self) -> u16;
    fn height(&self) -> u16;

    /// Fill the whole canvas with `color`.
    fn cls(&mut self, color: Color);

    /// Set a single cell's background.
    fn pset(&mut self, x: i32, y: i32, color: Color);

    /// Draw text starting at `(x, y)`; `bg: None` keeps existing backgrounds.
    fn text(&mut self, x: i32, y: i32, s: &str, fg: Color, bg: Option<Color>);

    /// Fill a rectangle.
    fn rect(&mut self, x: i32, y: i32, w: u16, h: u16, color: Color) {
        for dy in 0..i32::from(h) {
            for dx in 0..i32::from(w) {
                self.pset(x + dx, y + dy, color);
            }
        }
    }
}

// =============================================================================
// Runtime surface
// =============================================================================

/// One-time runtime setup parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitSettings {
    pub width: u16,
    pub height: u16,
    pub fps: u32,
    pub title: String,
}

impl Default for InitSettings {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            fps: 30,
            title: "reframe".to_string(),
        }
    }
}

/// Per-frame callbacks handed to `Runtime::run`.
pub trait FrameHandler {
    fn update(&mut self);
    fn draw(&mut self, canvas: &mut dyn Canvas);
}

/// Runtime errors
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime `{0}` used before init")]
    NotInitialized(&'static str),

    #[error("terminal error")]
    Terminal(#[from] std::io::Error),
}

/// A fixed-framerate graphics runtime.
pub trait Runtime: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Extension of the runtime's resource bundles (without the dot).
    fn resource_extension(&self) -> &'static str;

    /// Perform setup. Called at most once, through `RuntimeAdapter::init`.
    fn init(&self, settings: &InitSettings) -> Result<(), RuntimeError>;

    /// Drive frames until the runtime quits, calling `update` then `draw`
    /// once per tick.
    fn run(&self, frame: &mut dyn FrameHandler) -> Result<(), RuntimeError>;

    /// First terminal row free for console output.
    fn console_row(&self) -> Option<u16> {
        None
    }
}
