//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::path::PathBuf;

/// Reframe live-reload harness CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Application module: a library path, or a dotted name like
    /// `games.snake` (directory `games/`, library `snake`)
    #[arg(value_name = "MODULE")]
    pub module: String,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: reframe.toml)
    #[arg(short = 'C', long, default_value = "reframe.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Show debug output
    #[arg(short, long)]
    pub verbose: bool,
}
