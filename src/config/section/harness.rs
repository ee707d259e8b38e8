//! `[harness]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [harness]
//! verbose = true              # Show debug output (also REFRAME_VERBOSE=1)
//! ```

use serde::{Deserialize, Serialize};

/// General harness settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSection {
    /// Enable verbose (debug) logging.
    pub verbose: bool,
}
