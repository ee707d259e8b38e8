//! Build hook.
//!
//! Rebuilds the application library when one of its sources changes. The
//! rebuilt library then shows up as an ordinary change event, so the build
//! only has to succeed or report why it didn't.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::OnceLock;

use regex::Regex;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::debug;

/// Build hook errors
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build command is empty")]
    Empty,

    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status})")]
    Failed {
        command: String,
        status: ExitStatus,
        /// Combined stdout and stderr, ANSI stripped
        output: String,
    },
}

/// Runs the configured build command for relevant source changes.
#[derive(Debug, Clone)]
pub struct BuildHook {
    /// Program and arguments, e.g. `["cargo", "build"]`
    command: Vec<String>,
    /// Working directory (the watch root)
    root: PathBuf,
    /// Source extensions without dots
    sources: FxHashSet<String>,
    /// Directory names whose contents never trigger a build
    ignore: Vec<String>,
}

impl BuildHook {
    pub fn new(
        command: Vec<String>,
        root: impl Into<PathBuf>,
        sources: impl IntoIterator<Item = String>,
        ignore: Vec<String>,
    ) -> Self {
        Self {
            command,
            root: root.into(),
            sources: sources.into_iter().collect(),
            ignore,
        }
    }

    /// Whether a change to `path` should trigger the build.
    pub fn matches(&self, path: &Path) -> bool {
        let is_source = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.sources.contains(ext));
        if !is_source {
            return false;
        }

        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        !relative.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|name| self.ignore.iter().any(|i| i == name))
        })
    }

    fn display_command(&self) -> String {
        self.command.join(" ")
    }

    /// Run the build to completion.
    pub fn run(&self) -> Result<(), BuildError> {
        let (program, args) = self.command.split_first().ok_or(BuildError::Empty)?;
        debug!("build"; "running `{}` in {}", self.display_command(), self.root.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.root)
            .env("CARGO_TERM_COLOR", "never")
            .stdin(Stdio::null())
            .output()
            .map_err(|source| BuildError::Spawn {
                command: self.display_command(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }

        let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            text.push('\n');
            text.push_str(&stdout);
        }

        Err(BuildError::Failed {
            command: self.display_command(),
            status: output.status,
            output: strip_ansi(&text).into_owned(),
        })
    }
}

/// Strip ANSI escape codes from string.
fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("static regex"));
    re.replace_all(s, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn hook(root: &Path, command: &[&str]) -> BuildHook {
        BuildHook::new(
            command.iter().map(|s| s.to_string()).collect(),
            root,
            ["rs".to_string()],
            vec!["target".to_string()],
        )
    }

    #[test]
    fn test_matches_sources_outside_ignored_dirs() {
        let hook = hook(Path::new("/work/game"), &["cargo", "build"]);

        assert!(hook.matches(Path::new("/work/game/src/lib.rs")));
        assert!(!hook.matches(Path::new("/work/game/target/debug/build/out.rs")));
        assert!(!hook.matches(Path::new("/work/game/assets/level.rfres")));
        assert!(!hook.matches(Path::new("/work/game/Cargo.toml")));
    }

    #[test]
    fn test_empty_command() {
        let hook = hook(Path::new("/"), &[]);
        assert!(matches!(hook.run(), Err(BuildError::Empty)));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let temp = TempDir::new().unwrap();
        let hook = hook(temp.path(), &["reframe-no-such-build-tool"]);
        assert!(matches!(hook.run(), Err(BuildError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_build_keeps_output() {
        let temp = TempDir::new().unwrap();
        let script = "printf 'error: oops\\n --> src/lib.rs:4:2\\n' >&2; exit 1";
        let hook = hook(temp.path(), &["sh", "-c", script]);

        match hook.run() {
            Err(BuildError::Failed { output, .. }) => {
                assert!(output.contains("src/lib.rs:4:2"));
            }
            other => panic!("expected build failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_build() {
        let temp = TempDir::new().unwrap();
        assert!(hook(temp.path(), &["true"]).run().is_ok());
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31merror\x1b[0m: x"), "error: x");
    }
}
