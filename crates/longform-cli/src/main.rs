//! `longform` — thin CLI front end for the long-form content generation
//! pipeline (`longform-core`). Parses arguments, initializes logging, and
//! dispatches to the `run` subcommand; carries no pipeline logic of its own.
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Long-form content generation pipeline orchestrator
#[derive(Parser)]
#[command(name = "longform")]
#[command(version)]
#[command(about = "Turn a batch of keywords into fully formed long-form articles")]
struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run one batch of keywords through the pipeline
    Run(commands::RunArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose/--quiet flags > default (info).
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("longform=debug,longform_core=debug,info")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("longform=info,longform_core=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .compact()
        .init();

    let exit_code = match cli.command {
        Commands::Run(args) => commands::run::execute(args).await?,
    };

    std::process::exit(exit_code);
}
