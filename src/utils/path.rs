//! Path normalization utilities.
//!
//! Change events, the loaded library and configured directories must agree on
//! one spelling of a path before they can be compared:
//! - `normalize_path` - absolute, symlink-resolved form (also for deleted files)
//! - `resolve_path` - relative paths taken from a base directory

use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// For a path that no longer exists, canonicalizes its parent and re-attaches
/// the file name, so a removed file compares equal to its earlier spelling.
/// Falls back to joining with the current directory.
///
/// # Example
/// ```ignore
/// use reframe::utils::path::normalize_path;
/// let abs = normalize_path(Path::new("./target/debug/libsnake.so"));
/// ```
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map_or_else(|_| absolute.clone(), |parent| parent.join(name)),
        _ => absolute,
    }
}

/// Resolve `path` against `base` unless it is already absolute.
#[inline]
pub fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize_path(path);
    }
    normalize_path(&base.join(path))
}
