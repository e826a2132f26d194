// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! liftd: one elevator-bank node process.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lift_core::Config;
use lift_node::Mode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "liftd", about = "Distributed elevator-bank node", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Shared configuration file for every node in the bank.
    #[arg(long, global = true, default_value = "config/local.toml")]
    config: PathBuf,

    /// Process-pair role. The primary spawns its own backup; operators
    /// normally never pass `backup` by hand.
    #[arg(long, global = true, value_enum, default_value_t = Mode::Primary)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Command {
    /// Run an elevator node (cabin, motor, destination scheduler).
    Elevator {
        /// Elevator number, from 0.
        index: usize,
    },
    /// Run a floor-panel node (hall buttons, allocation, monitoring).
    Floor {
        /// Floor number, 0 is the first floor.
        index: usize,
    },
    /// Run the read-only mirror board.
    Mirror,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let node_name = match &cli.command {
        Command::Elevator { index } => format!("elevator_{index}"),
        Command::Floor { index } => format!("floor_{index}"),
        Command::Mirror => "floor_readonly".to_string(),
    };

    let config = Config::load(&cli.config, &node_name)?;

    match cli.command {
        Command::Elevator { .. } => lift_node::elevator::run(config, cli.mode).await?,
        Command::Floor { .. } => lift_node::floor::run(config, cli.mode).await?,
        Command::Mirror => lift_node::floor::run_mirror(config, cli.mode).await?,
    }

    // With process pairs disabled, run() hands control back while the
    // module tasks keep serving; park this task for the process life.
    std::future::pending::<()>().await;
    Ok(())
}
