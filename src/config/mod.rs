//! Harness configuration from `reframe.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build]
//! │   ├── harness    # [harness]
//! │   ├── module     # [module]
//! │   ├── runtime    # [runtime]
//! │   └── watch      # [watch]
//! ├── error.rs       # ConfigError
//! └── mod.rs         # HarnessConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[harness]` | Verbose output                                   |
//! | `[module]`  | Extra library search paths                       |
//! | `[watch]`   | Watch root, debounce window, asset extensions    |
//! | `[build]`   | Optional rebuild command on source changes       |
//! | `[runtime]` | Backend and default init settings                |
//!
//! The file is optional; every field has a default.

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{Backend, BuildConfig, HarnessSection, ModuleConfig, RuntimeConfig, WatchConfig};

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::log;
use crate::reload::BuildHook;
use crate::runtime::{InitSettings, Runtime};
use crate::utils::path::{normalize_path, resolve_path};

/// Environment variable forcing verbose output.
const VERBOSE_ENV: &str = "REFRAME_VERBOSE";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing reframe.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Invocation directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub harness: HarnessSection,

    #[serde(default)]
    pub module: ModuleConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl HarnessConfig {
    /// Load `config_file` (relative to `root`), falling back to defaults
    /// when it doesn't exist.
    pub fn load(root: &Path, config_file: &Path) -> Result<Self, ConfigError> {
        let root = normalize_path(root);
        let config_path = resolve_path(config_file, &root);

        let mut config = if config_path.is_file() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };

        config.config_path = config_path;
        config.finalize(root);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    /// Resolve paths and apply environment overrides.
    fn finalize(&mut self, root: PathBuf) {
        if let Some(watch_root) = &self.watch.root {
            self.watch.root = Some(resolve_path(watch_root, &root));
        }
        if env_flag(VERBOSE_ENV) {
            self.harness.verbose = true;
        }
        self.root = root;
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let runtime = &self.runtime;
        if runtime.fps == 0 {
            return Err(ConfigError::invalid("runtime.fps", "must be greater than 0"));
        }
        if runtime.width == 0 || runtime.height == 0 {
            return Err(ConfigError::invalid(
                "runtime",
                format!("canvas size {}x{} is empty", runtime.width, runtime.height),
            ));
        }
        if runtime.frames == Some(0) {
            return Err(ConfigError::invalid("runtime.frames", "must be greater than 0"));
        }
        Ok(())
    }

    // ========================================================================
    // derived values
    // ========================================================================

    /// Init settings used when the application declares none.
    pub fn init_settings(&self) -> InitSettings {
        self.runtime.init_settings()
    }

    /// Directory watched for changes.
    pub fn watch_root(&self) -> &Path {
        self.watch.root.as_deref().unwrap_or(&self.root)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }

    /// Build hook, when a build command is configured.
    pub fn build_hook(&self) -> Option<BuildHook> {
        self.build.is_enabled().then(|| {
            BuildHook::new(
                self.build.command.clone(),
                self.watch_root(),
                self.build.sources.iter().cloned(),
                self.build.ignore.clone(),
            )
        })
    }

    pub fn create_runtime(&self) -> Arc<dyn Runtime> {
        self.runtime.create()
    }
}

/// `1`, `true`, `yes` and `on` count as set.
fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// Parse a config snippet, failing on unknown fields.
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> HarnessConfig {
    let (parsed, ignored) = HarnessConfig::parse_with_ignored(extra).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        let result = HarnessConfig::parse_with_ignored("[watch\ndebounce_ms = 10");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[watch]\ndebounce_ms = 10\nfrequency = 3\n[unknown_section]\nfield = 1";
        let (config, ignored) = HarnessConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.watch.debounce_ms, 10);
        assert!(ignored.iter().any(|f| f == "watch.frequency"));
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = HarnessConfig::load(temp.path(), Path::new("reframe.toml")).unwrap();

        assert_eq!(config.root, normalize_path(temp.path()));
        assert_eq!(config.watch_root(), config.root);
        assert_eq!(config.debounce(), Duration::from_millis(50));
        assert!(config.build_hook().is_none());
        assert_eq!(config.init_settings(), InitSettings::default());
    }

    #[test]
    fn test_load_resolves_watch_root() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("game")).unwrap();
        std::fs::write(
            temp.path().join("reframe.toml"),
            "[watch]\nroot = \"game\"\n[build]\ncommand = [\"cargo\", \"build\"]",
        )
        .unwrap();

        let config = HarnessConfig::load(temp.path(), Path::new("reframe.toml")).unwrap();

        assert_eq!(config.watch_root(), config.root.join("game"));
        assert!(config.build_hook().is_some());
    }

    #[test]
    fn test_validation_rejects_zero_fps() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("reframe.toml"), "[runtime]\nfps = 0").unwrap();

        let err = HarnessConfig::load(temp.path(), Path::new("reframe.toml")).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Validation {
                field: "runtime.fps",
                ..
            }
        ));
    }

    #[test]
    fn test_validation_rejects_empty_canvas() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("reframe.toml"), "[runtime]\nwidth = 0").unwrap();

        let err = HarnessConfig::load(temp.path(), Path::new("reframe.toml")).unwrap_err();
        assert!(err.to_string().contains("0x24"));
    }
}
