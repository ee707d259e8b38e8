//! Failure capture and source-location extraction.
//!
//! `capture` runs an operation with panics caught. A process panic hook
//! (installed on first use) records where a guarded panic happened and keeps
//! the default hook from printing over the canvas; unguarded panics still go
//! to the previous hook.
//!
//! Application libraries carry their own copy of std, so a panic must be
//! caught on the library side of the boundary. `contain` does that and turns
//! the panic into an ordinary error ([`PanicError`]) that crosses back safely.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{LazyLock, Once};

use regex::Regex;

use crate::app::LoadError;

// =============================================================================
// Captured failures
// =============================================================================

/// Where and why a panic happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicSite {
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub backtrace: String,
}

impl PanicSite {
    fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        Self {
            message: payload_message(payload),
            file: None,
            line: None,
            column: None,
            backtrace: String::new(),
        }
    }

    fn location(&self) -> String {
        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(col)) => format!("{file}:{line}:{col}"),
            (Some(file), Some(line), None) => format!("{file}:{line}"),
            _ => "unknown location".to_string(),
        }
    }
}

/// A panic converted into an error value.
#[derive(Debug, Clone)]
pub struct PanicError(pub PanicSite);

impl fmt::Display for PanicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panicked at {}:\n{}", self.0.location(), self.0.message)
    }
}

impl std::error::Error for PanicError {}

/// A failure caught at a fault boundary, before classification.
#[derive(Debug)]
pub enum Captured {
    /// Panic unwound out of the operation
    Panic(PanicSite),
    /// Operation returned an error
    Error(anyhow::Error),
    /// Module could not be loaded
    Load(LoadError),
    /// Build command failed; carries compiler output
    Compile(String),
}

// =============================================================================
// Panic capture
// =============================================================================

thread_local! {
    /// Nesting depth of `capture` on this thread
    static GUARDED: Cell<u32> = const { Cell::new(0) };
    /// Last panic recorded by the hook on this thread
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARDED.with(Cell::get) == 0 {
                previous(info);
                return;
            }

            let site = PanicSite {
                message: payload_message(info.payload()),
                file: info.location().map(|l| l.file().to_string()),
                line: info.location().map(|l| l.line()),
                column: info.location().map(|l| l.column()),
                backtrace: Backtrace::force_capture().to_string(),
            };
            LAST_PANIC.with(|last| *last.borrow_mut() = Some(site));
        }));
    });
}

/// Run `op`, catching both returned errors and panics.
pub fn capture<T>(op: impl FnOnce() -> anyhow::Result<T>) -> Result<T, Captured> {
    install_panic_hook();

    GUARDED.with(|g| g.set(g.get() + 1));
    let result = panic::catch_unwind(AssertUnwindSafe(op));
    GUARDED.with(|g| g.set(g.get() - 1));

    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(Captured::Error(error)),
        Err(payload) => {
            let site = LAST_PANIC
                .with(|last| last.borrow_mut().take())
                .unwrap_or_else(|| PanicSite::from_payload(payload.as_ref()));
            Err(Captured::Panic(site))
        }
    }
}

/// Like [`capture`], but reports panics as [`PanicError`].
pub fn contain<T>(op: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
    match capture(op) {
        Ok(value) => Ok(value),
        Err(Captured::Panic(site)) => Err(anyhow::Error::new(PanicError(site))),
        Err(Captured::Error(error)) => Err(error),
        Err(Captured::Load(error)) => Err(error.into()),
        Err(Captured::Compile(output)) => Err(anyhow::anyhow!(output)),
    }
}

fn payload_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// =============================================================================
// Location extraction
// =============================================================================

/// A `file:line` location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub file: String,
    pub line: u32,
}

// ASCII classes only. A pattern that fails to build disables its extraction.
static BACKTRACE_AT: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*at[ \t]+(.+?):([0-9]+)(?::[0-9]+)?[ \t]*$"));

static DIAGNOSTIC_AT: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r"(?m)^[ \t]*-->[ \t]+(.+?):([0-9]+)(?::[0-9]+)?[ \t]*$"));

static DIAGNOSTIC_ERROR: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r"(?m)^error(?:\[[A-Za-z0-9_]+\])?:[ \t]*(.+)$"));

static PANICKED_AT: LazyLock<Option<Regex>> =
    LazyLock::new(|| pattern(r"^panicked at (.+?):([0-9]+)(?::[0-9]+)?:"));

fn pattern(re: &str) -> Option<Regex> {
    Regex::new(re).ok()
}

/// Frames from the toolchain or dependencies are not the application's.
fn is_foreign_frame(file: &str) -> bool {
    let file = file.replace('\\', "/");
    file.starts_with("/rustc/")
        || file.contains("/registry/src/")
        || file.contains("/git/checkouts/")
        || file.contains("/library/std/src/")
        || file.contains("/library/core/src/")
        || file.contains("/library/alloc/src/")
}

/// Innermost application frame of a formatted backtrace.
pub fn innermost_frame(backtrace: &str) -> Option<SourceLine> {
    BACKTRACE_AT
        .as_ref()?
        .captures_iter(backtrace)
        .filter_map(|caps| {
            let file = caps.get(1)?.as_str();
            let line = caps.get(2)?.as_str().parse().ok()?;
            Some(SourceLine {
                file: file.to_string(),
                line,
            })
        })
        .find(|loc| !is_foreign_frame(&loc.file))
}

/// First source location reported by compiler diagnostics.
pub fn diagnostic_location(output: &str) -> Option<SourceLine> {
    let caps = DIAGNOSTIC_AT.as_ref()?.captures(output)?;
    Some(SourceLine {
        file: caps.get(1)?.as_str().to_string(),
        line: caps.get(2)?.as_str().parse().ok()?,
    })
}

/// First `error:` message in compiler diagnostics.
pub fn diagnostic_message(output: &str) -> Option<String> {
    DIAGNOSTIC_ERROR
        .as_ref()?
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Location of a panic that crossed a library boundary as text.
pub fn panicked_location(message: &str) -> Option<SourceLine> {
    let caps = PANICKED_AT.as_ref()?.captures(message)?;
    Some(SourceLine {
        file: caps.get(1)?.as_str().to_string(),
        line: caps.get(2)?.as_str().parse().ok()?,
    })
}

/// Environment variable std reads before capturing error backtraces.
pub const LIB_BACKTRACE_ENV: &str = "RUST_LIB_BACKTRACE";

/// Capture backtraces for returned errors unless the user configured it.
///
/// Errors carry no location otherwise, and std reads the setting once per
/// process (per std copy, so libraries loaded later see it too).
///
/// # Safety
///
/// Modifies the process environment: call before any other thread exists.
pub unsafe fn enable_error_backtraces() {
    let configured = std::env::var_os(LIB_BACKTRACE_ENV).is_some()
        || std::env::var_os("RUST_BACKTRACE").is_some();
    if !configured {
        // SAFETY: the caller guarantees the process is single-threaded.
        unsafe { std::env::set_var(LIB_BACKTRACE_ENV, "1") };
    }
}

/// Formatted backtrace of an error, if one was captured.
pub fn error_backtrace(error: &anyhow::Error) -> Option<String> {
    let backtrace = error.backtrace();
    (backtrace.status() == BacktraceStatus::Captured).then(|| backtrace.to_string())
}

/// Best-effort type name of an error's root cause.
pub fn error_type_name(error: &anyhow::Error) -> String {
    let root = error.root_cause();
    if root.downcast_ref::<PanicError>().is_some() || panicked_location(&root.to_string()).is_some() {
        return "panic".to_string();
    }
    if root.downcast_ref::<std::io::Error>().is_some() {
        return "io::Error".to_string();
    }

    let debug = format!("{root:?}");
    let ident: String = debug
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        "Error".to_string()
    } else {
        ident
    }
}
