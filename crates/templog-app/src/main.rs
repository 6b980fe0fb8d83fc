//! templog - serial temperature datalogger tool
//!
//! Console front-end over the templog core session: port listing and
//! watching, live capture with export, and conversion of saved logs.

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use templog_core::config::Settings;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use commands::LogOptions;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let settings = Settings::load_or_default(&config_path)
        .with_context(|| format!("loading settings from {}", config_path.display()))?;

    match cli.command {
        Command::Ports { probe } => commands::ports(&settings, probe),
        Command::Watch { interval } => commands::watch(&settings, interval).await,
        Command::Log {
            port,
            demo,
            demo_interval_ms,
            baud,
            download,
            count,
            output,
        } => {
            let opts = LogOptions {
                port,
                demo: demo.then(|| Duration::from_millis(demo_interval_ms)),
                baud,
                download,
                count,
                outputs: output,
            };
            commands::log(settings, &config_path, opts).await
        }
        Command::Convert {
            input,
            skip,
            output,
        } => commands::convert(&input, skip, &output),
        Command::Stats { input, skip } => commands::stats(&input, skip),
    }
}
