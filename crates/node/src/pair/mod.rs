// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Primary/backup process pairs.
//!
//! The primary starts the modules, opens a loopback TCP channel, spawns
//! its backup (the same executable with `--mode=backup` appended) and
//! streams an atomic snapshot of every module's state each period; the
//! backup imports each snapshot in a transaction and acknowledges. The
//! first I/O error on the channel means the partner is gone: the
//! primary spawns a fresh backup, the backup promotes itself and spawns
//! one of its own.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lift_core::{Config, ConfigError};
use lift_txn::{Module, TransactionManager};
use lift_wire as wire;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Which half of the pair this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    Primary,
    Backup,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Primary => write!(f, "primary"),
            Mode::Backup => write!(f, "backup"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PairError {
    #[error("cannot open process-pair channel: {0}")]
    Channel(std::io::Error),

    #[error("cannot spawn backup process: {0}")]
    Spawn(std::io::Error),
}

type StateMap = HashMap<String, serde_json::Value>;

pub struct ProcessPair {
    txm: Arc<TransactionManager>,
    modules: Vec<Arc<dyn Module>>,
    enabled: bool,
    addr: SocketAddr,
    period: Duration,
}

impl ProcessPair {
    pub fn new(
        config: &Config,
        txm: Arc<TransactionManager>,
        modules: Vec<Arc<dyn Module>>,
    ) -> Result<Self, ConfigError> {
        let enabled = config.get_int("process_pairs", "enabled")? == 1;
        let addr = config.addr("process_pairs", "")?;
        let period = config.get_duration("process_pairs", "period")?;
        Ok(Self { txm, modules, enabled, addr, period })
    }

    /// Run the pair protocol. Returns only when the mechanism is
    /// disabled in configuration; otherwise the calling task is the
    /// pair loop for the process lifetime.
    pub async fn run(&self, mode: Mode) -> Result<(), PairError> {
        if !self.enabled {
            debug!("process pairs disabled");
            if mode == Mode::Primary {
                self.start_modules().await;
            }
            return Ok(());
        }

        match mode {
            Mode::Primary => {
                info!("switching to primary mode");
                self.start_modules().await;
                self.primary_loop().await
            }
            Mode::Backup => {
                info!("switching to backup mode");
                self.backup_loop().await;

                // The primary is gone: take over and raise a new backup.
                info!("promoting to primary mode");
                self.start_modules().await;
                self.primary_loop().await
            }
        }
    }

    /// Start every module inside one committed transaction.
    async fn start_modules(&self) {
        let tid = self.txm.start().await;
        for module in &self.modules {
            debug!(name = module.name(), "starting module");
            module.start(tid).await;
        }
        self.txm.finish(tid).await;
    }

    /// Primary side: bind before spawning the backup so the channel is
    /// always there to connect to, then stream states until the link
    /// dies, forever replacing dead backups.
    async fn primary_loop(&self) -> Result<(), PairError> {
        let listener = TcpListener::bind(self.addr).await.map_err(PairError::Channel)?;
        info!(addr = %self.addr, "process-pair channel open");

        loop {
            self.spawn_backup()?;

            let stream = match listener.accept().await {
                Ok((stream, peer)) => {
                    info!(%peer, "backup connected");
                    stream
                }
                Err(err) => {
                    error!(%err, "accept failed");
                    continue;
                }
            };

            if let Err(err) = self.stream_states(stream).await {
                error!(%err, "lost the backup");
            }
        }
    }

    /// Ship one atomic snapshot of all module states per period.
    async fn stream_states(&self, mut stream: TcpStream) -> Result<(), wire::ProtocolError> {
        loop {
            let tid = self.txm.start().await;
            let states: StateMap = self
                .modules
                .iter()
                .map(|module| (module.name().to_string(), module.export_state(tid)))
                .collect();
            self.txm.finish(tid).await;

            wire::write_json(&mut stream, &states).await?;
            let _ack: serde_json::Value = wire::read_json(&mut stream).await?;

            tokio::time::sleep(self.period).await;
        }
    }

    /// Backup side: mirror the primary until the stream dies.
    async fn backup_loop(&self) {
        let mut stream = match TcpStream::connect(self.addr).await {
            Ok(stream) => stream,
            Err(err) => {
                error!(%err, "cannot reach primary");
                return;
            }
        };
        info!(addr = %self.addr, "connected to primary");

        loop {
            let states: StateMap = match wire::read_json(&mut stream).await {
                Ok(states) => states,
                Err(err) => {
                    error!(%err, "lost the primary");
                    return;
                }
            };

            let tid = self.txm.start().await;
            for module in &self.modules {
                match states.get(module.name()) {
                    Some(state) => module.import_state(tid, state.clone()),
                    None => warn!(name = module.name(), "snapshot missing module"),
                }
            }
            self.txm.finish(tid).await;

            if let Err(err) = wire::write_json(&mut stream, &true).await {
                error!(%err, "lost the primary");
                return;
            }
        }
    }

    /// Spawn this same program again in backup mode.
    fn spawn_backup(&self) -> Result<(), PairError> {
        let exe = std::env::current_exe().map_err(PairError::Spawn)?;
        let args = respawn_args(std::env::args().skip(1));

        info!("spawning backup process");
        tokio::process::Command::new(exe)
            .args(args)
            .spawn()
            .map(drop)
            .map_err(PairError::Spawn)
    }
}

/// The backup gets our own argument list with the mode forced to backup.
fn respawn_args(args: impl Iterator<Item = String>) -> Vec<String> {
    let mut out = Vec::new();
    let mut args = args.peekable();
    while let Some(arg) = args.next() {
        if arg == "--mode" {
            args.next();
            continue;
        }
        if arg.starts_with("--mode=") {
            continue;
        }
        out.push(arg);
    }
    out.push("--mode=backup".to_string());
    out
}

#[cfg(test)]
#[path = "pair_tests.rs"]
mod tests;
