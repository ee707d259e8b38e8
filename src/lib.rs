//! Reframe - a live-reload harness for fixed-framerate applications.
//!
//! The harness owns the runtime's frame loop and runs an application
//! library inside it. When the library (or one of its assets) changes on
//! disk, the running instance is unloaded and a fresh one is loaded in its
//! place without restarting the loop. Errors in application code never
//! take the process down: they are reported to the console, shown as an
//! overlay on the canvas, and cleared by the next successful reload.
//!
//! # Module Structure
//!
//! ```text
//! app/        # App trait, export_app!, library loader
//! fault/      # Fault boundary, classification, error reporter
//! reload/     # Reload engine and build hook
//! runtime/    # Runtime trait, canvas, terminal/headless runtimes, adapter
//! watch/      # Filesystem watch loop and change batching
//! config/     # reframe.toml
//! driver.rs   # Per-frame handler
//! harness.rs  # Module slot shared by the frame loop and the watch loop
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod driver;
pub mod fault;
pub mod harness;
pub mod logger;
pub mod reload;
pub mod runtime;
pub mod shutdown;
pub mod utils;
pub mod watch;

#[cfg(test)]
mod testing;

pub use app::App;
pub use runtime::{Canvas, Color, InitSettings};
