// crates/cli/src/main.rs
//! rcview binary.
//!
//! Logs in to the daemon, starts the job engine with its status fan-out,
//! then runs one subcommand. Logs go to a rolling file; the terminal shows
//! spinners, notices and results.

mod app;
mod commands;
mod config;
mod progress;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rcview_jobs::BatchKind;

use crate::app::App;
use crate::config::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = rcview_observability::init_tracing(&cli.log_config())?;

    tracing::info!(host = %cli.connection.host, "rcview v{} starting", env!("CARGO_PKG_VERSION"));

    let mut app = App::start(&cli).await?;
    let result = run(&mut app, cli.command).await;
    app.shutdown();

    if let Err(e) = &result {
        tracing::error!(error = %e, "command failed");
    }
    result
}

async fn run(app: &mut App, command: Commands) -> Result<()> {
    match command {
        Commands::Login => commands::login(app).await,
        Commands::Ls { target, sort, desc } => commands::ls(app, &target, sort.into(), desc).await,
        Commands::Cp {
            sources,
            destination,
            show,
        } => commands::batch(app, BatchKind::Copy, &sources, Some(&destination), show).await,
        Commands::Mv {
            sources,
            destination,
            show,
        } => commands::batch(app, BatchKind::Move, &sources, Some(&destination), show).await,
        Commands::Rm { targets } => commands::batch(app, BatchKind::Delete, &targets, None, false).await,
        Commands::Mkdir { target } => commands::mkdir(app, &target).await,
        Commands::Link { target } => commands::link(app, &target).await,
        Commands::About { remote } => commands::about(app, &remote).await,
        Commands::Remotes => commands::remotes(app).await,
        Commands::Mounts { action } => commands::mounts(app, action).await,
        Commands::Config { action } => commands::config(app, action).await,
        Commands::Dashboard { count, interval_ms } => {
            commands::dashboard(app, count, Duration::from_millis(interval_ms.max(100))).await
        }
    }
}
