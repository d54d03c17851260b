//! capbuild - Capacitor build orchestration
//!
//! Command-line entry point: parses arguments, installs logging and runs
//! the pipeline for the selected platform.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use capbuild::commands::BuildCommand;
use capbuild_build_engine::PlatformSelection;
use capbuild_core::VERSION;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PlatformArg {
    Android,
    Ios,
    All,
}

impl From<PlatformArg> for PlatformSelection {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Android => PlatformSelection::Android,
            PlatformArg::Ios => PlatformSelection::Ios,
            PlatformArg::All => PlatformSelection::All,
        }
    }
}

/// Package a Capacitor app into signed Android and iOS binaries
#[derive(Debug, Parser)]
#[command(name = "capbuild", version, about)]
struct Cli {
    /// Platform to process; `all` runs iOS then Android
    #[arg(value_enum)]
    platform: PlatformArg,

    /// Run the build stage after pre-processing
    #[arg(long)]
    build: bool,

    /// Pass --prod to `cap build`
    #[arg(long)]
    prod: bool,

    /// Build configuration file (default: <project-root>/build.config.toml)
    #[arg(long, env = "CAPBUILD_CONFIG")]
    config: Option<PathBuf>,

    /// Capacitor project root
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Debug logging unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    info!("capbuild v{} starting", VERSION);

    let command = BuildCommand {
        platform: cli.platform.into(),
        project_root: cli.project_root,
        config_path: cli.config,
        build: cli.build,
        prod: cli.prod,
    };

    if let Err(e) = command.execute().await {
        error!("{} pipeline failed: {:#}", command.platform, e);
        return Err(e);
    }

    info!("{} pipeline finished", command.platform);
    Ok(())
}
