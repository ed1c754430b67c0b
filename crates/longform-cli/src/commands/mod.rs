//! CLI subcommand argument definitions for the `longform` binary.

pub mod run;

use clap::Args;

/// Arguments for the `run` subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to a `BatchInput` JSON file; reads stdin if omitted.
    #[arg(short = 'i', long)]
    pub input: Option<std::path::PathBuf>,

    /// Directory articles and the batch report are written into.
    #[arg(short = 'o', long, default_value = "./output")]
    pub output: std::path::PathBuf,
}
