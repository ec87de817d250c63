mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nudge::config::NudgeConfig;

#[derive(Parser)]
#[command(name = "nudge", version, about = "Reminder trigger engine")]
struct Cli {
    /// Config file (default: ~/.nudge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the trigger loop until interrupted
    Run,
    /// Show reminders, their next due slot and tracked state
    Status,
    /// Show the most recent firings
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Evaluate a device condition against the current device state
    Check {
        expression: String,
        #[command(flatten)]
        overrides: cli::check::Overrides,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => NudgeConfig::load_from(path)?,
        None => NudgeConfig::load()?,
    };

    // stdout carries delivered reminder messages; logs go to stderr
    let filter = EnvFilter::try_new(&config.engine.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run => cli::run::run(&config).await?,
        Command::Status => cli::status::status(&config)?,
        Command::History { limit } => cli::history::history(&config, limit)?,
        Command::Check {
            expression,
            overrides,
        } => cli::check::check(&config, &expression, &overrides)?,
    }

    Ok(())
}
