//! Error reporting.
//!
//! Turns a [`Captured`] failure into a [`Fault`], writes its trace to the
//! console and raises the fault flag. The success notifier is the only thing
//! that lowers it again.

use std::sync::Arc;

use owo_colors::OwoColorize;

use super::trace::{
    Captured, PanicError, PanicSite, diagnostic_location, diagnostic_message, error_backtrace,
    error_type_name, innermost_frame, panicked_location,
};
use super::{Fault, FaultCause, FaultKind, FaultState};
use crate::logger::Console;

const ERROR_BANNER: &str = "✗ application error, waiting for a fix";
const SUCCESS_BANNER: &str = "✓ reload successful";

/// Reports faults to the console and the shared fault state.
pub struct ErrorReporter {
    console: Arc<Console>,
    faults: Arc<FaultState>,
}

impl ErrorReporter {
    pub fn new(console: Arc<Console>, faults: Arc<FaultState>) -> Self {
        Self { console, faults }
    }

    pub fn faults(&self) -> &Arc<FaultState> {
        &self.faults
    }

    /// Record a failure: console trace, then the fault flag.
    pub fn report(&self, kind: FaultKind, captured: Captured) -> Arc<Fault> {
        let fault = classify(kind, captured);

        let banner = ERROR_BANNER.red().bold().to_string();
        let heading = format!("{}: {}", fault.type_name, fault.message);
        let body = indent(&format!("{heading}\n{}", fault.trace));
        self.console.replace(&[&banner, &body]);

        self.faults.set(fault)
    }

    /// A reload completed: clear the fault and say so.
    pub fn success(&self) {
        self.faults.clear();
        let banner = SUCCESS_BANNER.green().bold().to_string();
        self.console.replace(&[&banner]);
    }
}

/// Classify a captured failure.
pub fn classify(kind: FaultKind, captured: Captured) -> Fault {
    match captured {
        Captured::Panic(site) => from_panic(kind, &site),
        Captured::Error(error) => from_error(kind, &error),
        Captured::Load(error) => {
            let error = anyhow::Error::new(error);
            Fault {
                kind,
                cause: FaultCause::Runtime,
                type_name: "LoadError".into(),
                message: error.to_string(),
                line: None,
                trace: cause_chain(&error),
            }
        }
        Captured::Compile(output) => Fault {
            kind,
            cause: FaultCause::Syntax,
            type_name: "CompileError".into(),
            message: diagnostic_message(&output).unwrap_or_else(|| "build failed".into()),
            line: diagnostic_location(&output).map(|loc| loc.line),
            trace: output,
        },
    }
}

fn from_panic(kind: FaultKind, site: &PanicSite) -> Fault {
    let mut trace = format!("panicked at {}", site_location(site));
    if !site.backtrace.is_empty() {
        trace.push_str("\n\n");
        trace.push_str(&site.backtrace);
    }

    Fault {
        kind,
        cause: FaultCause::Runtime,
        type_name: "panic".into(),
        message: site.message.clone(),
        line: site.line,
        trace,
    }
}

fn from_error(kind: FaultKind, error: &anyhow::Error) -> Fault {
    let root = error.root_cause();

    // Panics contained inside an application library arrive as errors.
    if let Some(PanicError(site)) = root.downcast_ref::<PanicError>() {
        return from_panic(kind, site);
    }

    let backtrace = error_backtrace(error);
    let line = panicked_location(&root.to_string())
        .or_else(|| backtrace.as_deref().and_then(innermost_frame))
        .map(|loc| loc.line);

    let mut trace = cause_chain(error);
    if let Some(backtrace) = backtrace {
        trace.push_str("\n\n");
        trace.push_str(&backtrace);
    }

    Fault {
        kind,
        cause: FaultCause::Runtime,
        type_name: error_type_name(error),
        message: error.to_string(),
        line,
        trace,
    }
}

fn site_location(site: &PanicSite) -> String {
    match (&site.file, site.line) {
        (Some(file), Some(line)) => format!("{file}:{line}"),
        _ => "unknown location".into(),
    }
}

fn cause_chain(error: &anyhow::Error) -> String {
    error
        .chain()
        .skip(1)
        .map(|cause| format!("caused by: {cause}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("\t{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
