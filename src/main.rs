//! Sermo CLI - Speech Emotion Recognition
//!
//! Command-line interface for the Sermo emotion classifier.

use anyhow::Context;
use clap::Parser;
use log::info;
use tracing_subscriber::EnvFilter;

use sermo::cli::commands::{self, Runtime};
use sermo::cli::{Cli, Commands};
use sermo::config::ServiceConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays pure JSON
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Sermo v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServiceConfig::from_env().context("reading SERMO_* environment")?,
    };
    let runtime = Runtime::from_config(config).context("initializing service")?;

    handle_command(&runtime, cli.command)
}

fn handle_command(runtime: &Runtime, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Predict {
            file,
            model,
            no_store,
        } => {
            commands::predict(runtime, &file, model.as_deref(), !no_store)?;
        }
        Commands::Batch { dir, model } => {
            commands::batch(runtime, &dir, model.as_deref())?;
        }
        Commands::Capture {
            model,
            duration,
            keep,
        } => {
            commands::capture(runtime, model.as_deref(), duration, keep)?;
        }
        Commands::Models => commands::list_models(runtime)?,
    }
    Ok(())
}
