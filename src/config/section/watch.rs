//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! root = "."                       # Directory watched recursively
//! debounce_ms = 50                 # Quiet window closing a batch
//! asset_extensions = ["png", "wav"] # Extra extensions that always reload
//! ```
//!
//! The runtime's own resource extension (`rfres`) always reloads.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::watch::DEBOUNCE_MS;

/// File watching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Watched directory (default: invocation directory).
    pub root: Option<PathBuf>,

    /// Milliseconds without events before a batch is processed.
    pub debounce_ms: u64,

    /// Extensions, besides the runtime's resource bundles, whose changes
    /// always trigger a reload.
    pub asset_extensions: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: None,
            debounce_ms: DEBOUNCE_MS,
            asset_extensions: Vec::new(),
        }
    }
}
