//! `[module]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [module]
//! search_paths = ["build/lib"]   # Extra directories for module lookup
//! ```
//!
//! Lookup always tries the invocation directory, `target/debug` and
//! `target/release` first.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Module resolution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Extra directories searched for the application library,
    /// relative to the invocation directory.
    pub search_paths: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::config::test_parse_config;

    #[test]
    fn test_module_config() {
        let config = test_parse_config("[module]\nsearch_paths = [\"out\", \"/opt/games\"]");
        assert_eq!(
            config.module.search_paths,
            [PathBuf::from("out"), PathBuf::from("/opt/games")]
        );
        assert!(test_parse_config("").module.search_paths.is_empty());
    }
}
