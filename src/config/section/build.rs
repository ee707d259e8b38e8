//! `[build]` section configuration.
//!
//! Optional command that rebuilds the application library when its sources
//! change. Disabled while `command` is empty.
//!
//! # Example
//!
//! ```toml
//! [build]
//! command = ["cargo", "build"]   # Program and arguments
//! sources = ["rs"]               # Extensions that trigger the build
//! ignore = ["target"]            # Directory names never triggering it
//! ```

use serde::{Deserialize, Serialize};

/// Build hook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build command as program + arguments (empty = disabled).
    pub command: Vec<String>,

    /// Source file extensions (without dots).
    pub sources: Vec<String>,

    /// Directory names excluded from triggering builds.
    pub ignore: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            sources: vec!["rs".to_string()],
            ignore: vec!["target".to_string()],
        }
    }
}

impl BuildConfig {
    pub fn is_enabled(&self) -> bool {
        !self.command.is_empty()
    }
}
