//! Logging utilities with colored output and a positioned console region.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro, only shown in verbose mode
//! - `Console` for the harness console (reload banners and error traces)
//!
//! While a terminal runtime owns the top of the screen, the console is
//! anchored below the canvas so both can share one terminal.
//!
//! # Example
//!
//! ```ignore
//! log!("watch"; "watching {}", root.display());
//! debug!("reload"; "snapshot is {} bytes", bytes.len());
//! ```

use crossterm::{
    cursor, queue,
    terminal::{self, Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::{Arc, LazyLock},
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set from config or `REFRAME_VERBOSE`)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Console shared by `log!` and the error reporter.
pub static CONSOLE: LazyLock<Arc<Console>> = LazyLock::new(|| Arc::new(Console::stdout()));

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown in verbose mode)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);
    CONSOLE.line(&format!("{prefix} {message}"));
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "reload" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Console
// ============================================================================

/// Rows owned by the console when a runtime draws above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    origin: u16,
    cursor: u16,
    /// First row past the terminal
    end: u16,
}

struct ConsoleInner {
    out: Box<dyn Write + Send>,
    region: Option<Region>,
}

/// Terminal console for harness output.
///
/// Every call renders into a buffer first and hands it to the writer with a
/// single `write_all`, so a runtime flushing frames to the same stdout never
/// splits a console line.
pub struct Console {
    inner: Mutex<ConsoleInner>,
}

impl Console {
    /// Console writing to process stdout.
    pub fn stdout() -> Self {
        Self::to_writer(stdout())
    }

    /// Console writing to an arbitrary sink.
    pub fn to_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            inner: Mutex::new(ConsoleInner {
                out: Box::new(out),
                region: None,
            }),
        }
    }

    /// Pin the console to the rows from `row` to the bottom of the terminal.
    pub fn anchor(&self, row: u16) {
        let rows = terminal::size().map_or(u16::MAX, |(_, rows)| rows);
        self.anchor_within(row, rows);
    }

    /// Pin the console to rows `row..end`. Output reaching `end` wraps back
    /// to `row` over a cleared region.
    pub fn anchor_within(&self, row: u16, end: u16) {
        self.inner.lock().region = Some(Region {
            origin: row,
            cursor: row,
            end,
        });
    }

    /// Clear the console display and print `lines` from its top.
    pub fn replace(&self, lines: &[&str]) {
        let mut inner = self.inner.lock();
        let mut buf = Vec::new();

        match inner.region.as_mut() {
            Some(region) => {
                queue!(buf, cursor::MoveTo(0, region.origin), Clear(ClearType::FromCursorDown)).ok();
                region.cursor = region.origin;
            }
            None => {
                queue!(buf, cursor::MoveTo(0, 0), Clear(ClearType::All)).ok();
            }
        }

        for line in lines {
            push_lines(&mut buf, &mut inner.region, line);
        }
        inner.out.write_all(&buf).ok();
        inner.out.flush().ok();
    }

    /// Append a (possibly multi-line) message.
    pub fn line(&self, message: &str) {
        let mut inner = self.inner.lock();
        let mut buf = Vec::new();
        push_lines(&mut buf, &mut inner.region, message);
        inner.out.write_all(&buf).ok();
        inner.out.flush().ok();
    }
}

fn push_lines(buf: &mut Vec<u8>, region: &mut Option<Region>, message: &str) {
    for line in message.lines() {
        if let Some(region) = region.as_mut() {
            if region.cursor >= region.end {
                queue!(buf, cursor::MoveTo(0, region.origin), Clear(ClearType::FromCursorDown)).ok();
                region.cursor = region.origin;
            }
            queue!(buf, cursor::MoveTo(0, region.cursor), Clear(ClearType::CurrentLine)).ok();
            region.cursor = region.cursor.saturating_add(1);
            buf.extend_from_slice(line.as_bytes());
        } else {
            writeln!(buf, "{line}").ok();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
