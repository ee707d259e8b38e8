//! Process shutdown state.
//!
//! Runtimes poll `is_shutdown()` once per tick; the Ctrl+C handler and the
//! terminal runtime's quit keys set it.

use std::sync::atomic::{AtomicBool, Ordering};

/// Shutdown has been requested (Ctrl+C received or quit key pressed)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Setup the global Ctrl+C handler. Call once at program start
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(request_shutdown)
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Ask the frame loop to stop after the current tick
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Check if shutdown has been requested
///
/// Uses Relaxed ordering: worst case is one more frame before stopping
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
