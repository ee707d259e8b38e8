//! Reframe - live-reload harness for fixed-framerate applications.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use reframe::{
    app::{DylibLoader, resolve_module},
    cli::Cli,
    config::HarnessConfig,
    driver::FrameDriver,
    fault::trace::enable_error_backtraces,
    harness::Harness,
    log,
    logger::{self, CONSOLE},
    reload::ReloadEngine,
    runtime::RuntimeAdapter,
    shutdown::{request_shutdown, setup_shutdown_handler},
    watch::WatchLoop,
};

fn main() -> Result<()> {
    // SAFETY: nothing has spawned a thread yet.
    unsafe { enable_error_backtraces() };

    // Setup global Ctrl+C handler (before any blocking operations)
    setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let cwd = std::env::current_dir().context("Failed to get current working directory")?;
    let config = HarnessConfig::load(&cwd, &cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    logger::set_verbose(cli.verbose || config.harness.verbose);

    let runtime = config.create_runtime();
    let adapter = Arc::new(RuntimeAdapter::new(runtime.clone()));

    let module_path = resolve_module(&cli.module, &config.root, &config.module.search_paths)?;
    let loader = DylibLoader::new(&module_path)?;

    let harness = Arc::new(Harness::new(CONSOLE.clone()));
    let mut engine = ReloadEngine::new(Box::new(loader), harness.clone(), adapter.clone())
        .with_asset_extensions(config.watch.asset_extensions.iter().cloned())
        .with_defaults(config.init_settings())
        .with_build_hook(config.build_hook());

    engine
        .start()
        .with_context(|| format!("failed to start {}", module_path.display()))?;

    if let Some(row) = runtime.console_row() {
        CONSOLE.anchor(row);
    }

    let watch = WatchLoop::spawn(config.watch_root(), config.debounce(), engine)?;

    let result = adapter.run(&mut FrameDriver::new(harness));

    request_shutdown();
    watch.stop();
    log!("reframe"; "stopped");
    result
}
