//! Configuration section definitions.

mod build;
mod harness;
mod module;
mod runtime;
mod watch;

pub use build::BuildConfig;
pub use harness::HarnessSection;
pub use module::ModuleConfig;
pub use runtime::{Backend, RuntimeConfig};
pub use watch::WatchConfig;
