//! Tusk - container updates done quick
//!
//! A terminal dashboard that lists running Docker containers and replaces
//! the selected ones with fresh containers built from a newly pulled image,
//! carrying their port bindings across.

mod config;
mod core;
mod facts;
mod integrations;
mod ui;
mod update;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::core::app::App;
use crate::integrations::docker::{self, DockerClient};
use crate::integrations::ports::SocketProbe;

#[derive(Parser)]
#[command(name = "tusk")]
#[command(author = "Tusk Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Pull, stop and recreate running Docker containers", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the running containers and their port bindings
    List,

    /// Write a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

fn setup_logging(verbosity: u8) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // The terminal belongs to the dashboard, so logs go to a file
    let log_dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tusk")
        .join("logs");

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "tusk.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

async fn connect(config: &config::Config) -> Result<DockerClient> {
    let client = DockerClient::connect(&config.docker)
        .await
        .context("Failed to create Docker client")?;
    client
        .ping()
        .await
        .context("Docker is not reachable. Is the daemon running?")?;
    Ok(client)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive for the duration of the program
    let _logging_guard = setup_logging(cli.verbose)?;

    let config_path = cli.config.clone().or_else(config::Config::default_path);

    if let Some(Commands::Init { force }) = cli.command {
        let path = config_path.context("No configuration directory available")?;
        return config::init_config(&path, force);
    }

    // An explicit --config must exist; the default location is optional
    let config = match config_path {
        Some(path) if cli.config.is_some() || path.exists() => config::Config::load(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => config::Config::default(),
    };

    let client = connect(&config).await?;

    match cli.command {
        Some(Commands::List) => {
            docker::print_inventory(&client).await?;
        }
        Some(Commands::Init { .. }) => {}
        None => {
            let mut app = App::new(Arc::new(client), Arc::new(SocketProbe), &config)?;
            app.run().await?;
        }
    }

    Ok(())
}
