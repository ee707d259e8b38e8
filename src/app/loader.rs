//! Module loading.
//!
//! Resolves the module name given on the command line to a dynamic library
//! and instantiates the [`App`] it exports.
//!
//! Each load works on a fresh copy of the library in a per-process shadow
//! directory. The platform loader caches libraries by path, so reopening the
//! original file would hand back the old code; a new path per load forces a
//! real load and leaves the build free to overwrite the original.

use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use thiserror::Error;

use super::{API_VERSION_SYMBOL, APP_API_VERSION, ApiVersionFn, App, CREATE_SYMBOL, CreateFn};
use crate::debug;
use crate::utils::path::normalize_path;

// =============================================================================
// Errors
// =============================================================================

/// Module load errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("module `{name}` not found (searched: {})", display_paths(.searched))]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to open library `{0}`")]
    Open(PathBuf, #[source] libloading::Error),

    #[error("library does not export `{symbol}`")]
    Symbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("API version mismatch: library has {found}, harness expects {expected}")]
    ApiVersionMismatch { found: u32, expected: u32 },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Loaded module
// =============================================================================

/// A shadow copy of the library, open for as long as this value lives.
struct ShadowLibrary {
    library: Option<Library>,
    path: PathBuf,
}

impl Drop for ShadowLibrary {
    fn drop(&mut self) {
        // Close before deleting the file it was mapped from.
        drop(self.library.take());
        std::fs::remove_file(&self.path).ok();
    }
}

/// An instantiated application and the code backing it.
pub struct LoadedModule {
    // Field order matters: the instance must drop before its library closes.
    app: Box<dyn App>,
    library: Option<ShadowLibrary>,
}

impl LoadedModule {
    /// Wrap an instance that lives in the harness's own code.
    pub fn in_process(app: Box<dyn App>) -> Self {
        Self { app, library: None }
    }

    pub fn app(&self) -> &dyn App {
        self.app.as_ref()
    }

    pub fn app_mut(&mut self) -> &mut dyn App {
        self.app.as_mut()
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Produces fresh application instances.
pub trait ModuleLoader: Send {
    /// The file whose changes mean the module changed.
    fn source_path(&self) -> &Path;

    /// Instantiate the module from its current contents.
    fn load(&mut self) -> Result<LoadedModule, LoadError>;
}

/// Loads an application `cdylib` with `libloading`.
pub struct DylibLoader {
    path: PathBuf,
    shadow_dir: PathBuf,
    /// Load counter for unique shadow names
    loads: u64,
}

impl DylibLoader {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let shadow_dir = std::env::temp_dir()
            .join("reframe")
            .join(std::process::id().to_string());
        Self::with_shadow_dir(path, shadow_dir)
    }

    pub fn with_shadow_dir(
        path: impl AsRef<Path>,
        shadow_dir: impl Into<PathBuf>,
    ) -> Result<Self, LoadError> {
        let shadow_dir = shadow_dir.into();
        std::fs::create_dir_all(&shadow_dir).map_err(|e| LoadError::Io(shadow_dir.clone(), e))?;

        Ok(Self {
            path: normalize_path(path.as_ref()),
            shadow_dir,
            loads: 0,
        })
    }

    fn shadow_copy(&mut self) -> Result<ShadowLibrary, LoadError> {
        self.loads += 1;
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string());
        let shadow = self.shadow_dir.join(format!("{}_{}", self.loads, file_name));

        std::fs::copy(&self.path, &shadow).map_err(|e| LoadError::Io(self.path.clone(), e))?;
        debug!("reload"; "shadow copy {}", shadow.display());

        Ok(ShadowLibrary {
            library: None,
            path: shadow,
        })
    }
}

impl ModuleLoader for DylibLoader {
    fn source_path(&self) -> &Path {
        &self.path
    }

    fn load(&mut self) -> Result<LoadedModule, LoadError> {
        // Owns the shadow file from here on, so every error path cleans it up.
        let mut shadow = self.shadow_copy()?;

        // SAFETY: the library is an application built for this harness; its
        // initializers are ordinary Rust code.
        let library = unsafe { Library::new(&shadow.path) }
            .map_err(|e| LoadError::Open(shadow.path.clone(), e))?;

        let version = {
            // SAFETY: symbol type matches what `export_app!` generates.
            let api_version: Symbol<ApiVersionFn> = unsafe { library.get(API_VERSION_SYMBOL) }
                .map_err(|source| LoadError::Symbol {
                    symbol: "reframe_api_version",
                    source,
                })?;
            unsafe { api_version() }
        };
        if version != APP_API_VERSION {
            return Err(LoadError::ApiVersionMismatch {
                found: version,
                expected: APP_API_VERSION,
            });
        }

        let app = {
            // SAFETY: symbol type matches what `export_app!` generates.
            let create: Symbol<CreateFn> = unsafe { library.get(CREATE_SYMBOL) }
                .map_err(|source| LoadError::Symbol {
                    symbol: "reframe_create",
                    source,
                })?;
            unsafe { create() }
        };

        shadow.library = Some(library);
        Ok(LoadedModule {
            app,
            library: Some(shadow),
        })
    }
}

impl Drop for DylibLoader {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.shadow_dir).ok();
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Platform file name of a dynamic library.
pub fn library_file_name(stem: &str) -> String {
    if cfg!(windows) {
        format!("{stem}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{stem}.dylib")
    } else {
        format!("lib{stem}.so")
    }
}

/// Resolve a module name to a library path.
///
/// `name` is either a path to an existing file, or a dotted name where the
/// last segment is the library (crate) name and earlier segments are
/// directories: `games.snake` looks for `games/libsnake.so`. Directories are
/// tried in order: `root`, `root/target/debug`, `root/target/release`, then
/// `extra_dirs` (relative ones are taken from `root`).
pub fn resolve_module(name: &str, root: &Path, extra_dirs: &[PathBuf]) -> Result<PathBuf, LoadError> {
    let direct = root.join(name);
    if direct.is_file() {
        return Ok(normalize_path(&direct));
    }

    let mut segments: Vec<&str> = name.split('.').filter(|s| !s.is_empty()).collect();
    let Some(last) = segments.pop() else {
        return Err(LoadError::NotFound {
            name: name.to_string(),
            searched: Vec::new(),
        });
    };
    let file_name = library_file_name(&last.replace('-', "_"));
    let subdir: PathBuf = segments.iter().collect();

    let mut dirs = vec![
        root.to_path_buf(),
        root.join("target").join("debug"),
        root.join("target").join("release"),
    ];
    dirs.extend(extra_dirs.iter().map(|d| root.join(d)));

    let mut searched = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let candidate = dir.join(&subdir).join(&file_name);
        if candidate.is_file() {
            return Ok(normalize_path(&candidate));
        }
        searched.push(candidate);
    }

    Err(LoadError::NotFound {
        name: name.to_string(),
        searched,
    })
}
