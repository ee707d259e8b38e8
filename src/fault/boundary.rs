//! Guarded calls into application code.

use std::sync::Arc;

use super::{Captured, ErrorReporter, FaultKind, FaultState, capture};

/// Runs operations so their failures land in the [`ErrorReporter`].
#[derive(Clone)]
pub struct FaultBoundary {
    reporter: Arc<ErrorReporter>,
}

impl FaultBoundary {
    pub fn new(reporter: Arc<ErrorReporter>) -> Self {
        Self { reporter }
    }

    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }

    pub fn faults(&self) -> &Arc<FaultState> {
        self.reporter.faults()
    }

    /// Run `op` unless faulted.
    ///
    /// Returns `None` when skipped or when `op` failed; a failure is reported
    /// as `kind` and never propagates.
    pub fn guard<T>(&self, kind: FaultKind, op: impl FnOnce() -> anyhow::Result<T>) -> Option<T> {
        if self.faults().is_active() {
            return None;
        }
        self.capture(op)
            .map_err(|captured| self.reporter.report(kind, captured))
            .ok()
    }

    /// Run `op` regardless of fault state, handing failures back.
    pub fn capture<T>(&self, op: impl FnOnce() -> anyhow::Result<T>) -> Result<T, Captured> {
        capture(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::Console;
    use crate::logger::tests::SharedBuf;
    use std::cell::Cell;

    fn boundary() -> FaultBoundary {
        let console = Arc::new(Console::to_writer(SharedBuf::default()));
        FaultBoundary::new(Arc::new(ErrorReporter::new(console, Arc::new(FaultState::new()))))
    }

    #[test]
    fn test_guard_returns_value() {
        let boundary = boundary();
        assert_eq!(boundary.guard(FaultKind::Frame, || Ok(5)), Some(5));
        assert!(!boundary.faults().is_active());
    }

    #[test]
    fn test_guard_contains_panic_and_skips_afterwards() {
        let boundary = boundary();
        let calls = Cell::new(0);

        let first: Option<()> = boundary.guard(FaultKind::Frame, || {
            calls.set(calls.get() + 1);
            panic!("boom")
        });
        assert!(first.is_none());
        assert!(boundary.faults().is_active());

        let second = boundary.guard(FaultKind::Frame, || {
            calls.set(calls.get() + 1);
            Ok(())
        });
        assert!(second.is_none());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_guard_reports_error_kind() {
        let boundary = boundary();
        let out: Option<()> = boundary.guard(FaultKind::Unload, || anyhow::bail!("stuck"));

        assert!(out.is_none());
        let fault = boundary.faults().current().unwrap();
        assert_eq!(fault.kind, FaultKind::Unload);
        assert_eq!(fault.message, "stuck");
    }

    #[test]
    fn test_capture_ignores_fault_state() {
        let boundary = boundary();
        let _: Option<()> = boundary.guard(FaultKind::Frame, || anyhow::bail!("first"));

        assert_eq!(boundary.capture(|| Ok(1)).unwrap(), 1);
    }
}
