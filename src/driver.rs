//! Frame Driver
//!
//! The per-frame handler the harness hands to the runtime. Each tick calls
//! the loaded module's `update` then `draw`, both inside the fault boundary.
//! While faulted the module is left alone and the error overlay is drawn
//! instead. During a module swap the module is skipped as well.

use std::sync::Arc;

use crate::fault::FaultKind;
use crate::harness::Harness;
use crate::runtime::{Canvas, FrameHandler};

pub struct FrameDriver {
    harness: Arc<Harness>,
}

impl FrameDriver {
    pub fn new(harness: Arc<Harness>) -> Self {
        Self { harness }
    }
}

impl FrameHandler for FrameDriver {
    fn update(&mut self) {
        if self.harness.is_swapping() {
            return;
        }
        let boundary = self.harness.boundary();
        self.harness.with_module(|handle| {
            boundary.guard(FaultKind::Frame, || handle.app_mut().update())
        });
    }

    fn draw(&mut self, canvas: &mut dyn Canvas) {
        let boundary = self.harness.boundary();
        if !boundary.faults().is_active() && !self.harness.is_swapping() {
            self.harness.with_module(|handle| {
                boundary.guard(FaultKind::Frame, || handle.app_mut().draw(canvas))
            });
        }

        // Also covers a draw that failed just now.
        if let Some(fault) = boundary.faults().current() {
            fault.paint(canvas);
        }
    }
}
