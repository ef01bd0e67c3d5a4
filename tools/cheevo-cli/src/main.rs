//! Cheevo CLI - achievement formula tooling
//!
//! # Commands
//!
//! - `cheevo compile` - Show the conditions a formula compiles to
//! - `cheevo check` - Lint a formula
//! - `cheevo plan` - Build the RAM-write plan that should unlock a formula
//! - `cheevo verify` - Build plans and replay them against scratch RAM
//!
//! # Usage
//!
//! ```bash
//! cheevo compile "0xH0010=5(3)"
//! cheevo plan "0xH0010>d0xH0010(4)" --json
//! cheevo verify --set achievements.toml --state state.json
//! ```
//!
//! Global options: `--config cheevo.toml` loads compiler/verify settings,
//! `--fps` overrides the seconds shorthand frame rate.

mod check;
mod compile;
mod plan;
mod set;
mod verify;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cheevo_core::Config;
use clap::{Parser, Subcommand};

/// Cheevo CLI - achievement formula tooling
#[derive(Parser)]
#[command(name = "cheevo")]
#[command(about = "Compile, lint, plan and verify achievement formulas")]
#[command(version)]
struct Cli {
    /// Path to a cheevo.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Frames per second for the seconds shorthand (overrides config)
    #[arg(long, global = true)]
    fps: Option<u32>,

    /// Debug logging, including per-token compiler traces
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the conditions a formula compiles to
    Compile(compile::CompileArgs),

    /// Lint a formula
    Check(check::CheckArgs),

    /// Build the RAM-write plan for a formula
    Plan(plan::PlanArgs),

    /// Replay generated plans and confirm each formula unlocks
    Verify(verify::VerifyArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(cli.config.as_deref(), cli.fps)?;
    if cli.verbose {
        config.compiler.trace = true;
    }

    match cli.command {
        Commands::Compile(args) => compile::execute(args, &config),
        Commands::Check(args) => check::execute(args, &config),
        Commands::Plan(args) => plan::execute(args, &config),
        Commands::Verify(args) => verify::execute(args, &config),
    }
}

/// Load the config file (or defaults) and apply command-line overrides.
fn load_config(path: Option<&Path>, fps: Option<u32>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(fps) = fps {
        anyhow::ensure!(fps > 0, "--fps must be greater than zero");
        config.compiler.frames_per_second = fps;
    }
    Ok(config)
}
