//! `[runtime]` section configuration.
//!
//! Defaults handed to the runtime when the application doesn't provide its
//! own settings.
//!
//! # Example
//!
//! ```toml
//! [runtime]
//! backend = "terminal"        # terminal | headless
//! fps = 30                    # Frames per second
//! width = 80                  # Canvas width in cells
//! height = 24                 # Canvas height in cells
//! title = "reframe"           # Window/terminal title
//! frames = 600                # Stop after N frames (headless smoke runs)
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::runtime::{HeadlessRuntime, InitSettings, Runtime, TerminalRuntime};

/// Which runtime drives frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Terminal,
    Headless,
}

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub backend: Backend,
    pub fps: u32,
    pub width: u16,
    pub height: u16,
    pub title: String,

    /// Frame limit (`None` = run until quit).
    pub frames: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let settings = InitSettings::default();
        Self {
            backend: Backend::default(),
            fps: settings.fps,
            width: settings.width,
            height: settings.height,
            title: settings.title,
            frames: None,
        }
    }
}

impl RuntimeConfig {
    /// Settings used when the application declares none.
    pub fn init_settings(&self) -> InitSettings {
        InitSettings {
            width: self.width,
            height: self.height,
            fps: self.fps,
            title: self.title.clone(),
        }
    }

    /// Instantiate the configured runtime.
    pub fn create(&self) -> Arc<dyn Runtime> {
        match self.backend {
            Backend::Terminal => Arc::new(TerminalRuntime::new()),
            Backend::Headless => Arc::new(HeadlessRuntime::new(self.frames)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_runtime_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.runtime.backend, Backend::Terminal);
        assert_eq!(config.runtime.init_settings(), InitSettings::default());
        assert!(config.runtime.frames.is_none());
    }

    #[test]
    fn test_headless_backend() {
        let config = test_parse_config("[runtime]\nbackend = \"headless\"\nframes = 3\nfps = 60");
        assert_eq!(config.runtime.backend, Backend::Headless);
        assert_eq!(config.runtime.init_settings().fps, 60);
        assert_eq!(config.runtime.create().name(), "headless");
    }
}
