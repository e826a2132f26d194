// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed datagram RPC between nodes.
//!
//! Every packet is one UDP datagram carrying `{"type", "data"}` JSON;
//! every request gets exactly one reply datagram. Inbound packets are
//! dispatched by type into their own task, each wrapped in a
//! transaction: the handler's reply is only sent as-is if the
//! transaction commits, otherwise the caller sees `false`.

mod handler;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use lift_core::{Config, ConfigError};
use lift_txn::{Module, TransactionManager, TxnId};
use lift_wire as wire;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

pub use handler::PacketHandler;

/// Faults a packet exchange can produce. `send_packet` never panics and
/// never escalates; callers decide whether to retry, reroute or drop.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no reply within timeout")]
    Timeout,

    #[error(transparent)]
    Protocol(#[from] wire::ProtocolError),

    #[error("malformed reply: {0}")]
    Json(#[from] serde_json::Error),
}

type HandlerMap = HashMap<String, Weak<dyn PacketHandler>>;

/// The node's gateway to its peers.
pub struct Network {
    txm: Arc<TransactionManager>,
    port: u16,
    timeout: Duration,
    buffer_size: usize,
    handlers: Arc<Mutex<HandlerMap>>,
    bound: OnceLock<SocketAddr>,
}

impl Network {
    pub fn new(config: &Config, txm: Arc<TransactionManager>) -> Result<Self, ConfigError> {
        let port = u16::try_from(config.get_int("network", "port")?).map_err(|_| {
            ConfigError::BadAddress {
                section: "network".to_string(),
                key: "port".to_string(),
                value: "out of range".to_string(),
            }
        })?;
        let timeout = config.get_duration_or("network", "timeout", Duration::from_millis(500))?;
        let buffer_size =
            usize::try_from(config.get_int_or("network", "buffer_size", 1024)?).unwrap_or(1024);

        Ok(Self {
            txm,
            port,
            timeout,
            buffer_size,
            handlers: Arc::new(Mutex::new(HashMap::new())),
            bound: OnceLock::new(),
        })
    }

    /// Route inbound packets of `kind` to `handler`. The registry keeps a
    /// weak reference; the composition root owns the module.
    pub fn add_packet_handler<H: PacketHandler + 'static>(&self, kind: &str, handler: &Arc<H>) {
        let weak = Arc::downgrade(handler) as Weak<dyn PacketHandler>;
        self.handlers.lock().insert(kind.to_string(), weak);
    }

    /// The server address, once `start` has bound it.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound.get().copied()
    }

    /// Send one packet and wait for the reply.
    ///
    /// A fresh ephemeral socket per call; timeout, socket errors and
    /// malformed replies all come back as `Err`.
    pub async fn send_packet(
        &self,
        addr: SocketAddr,
        kind: &str,
        data: serde_json::Value,
    ) -> Result<serde_json::Value, NetError> {
        debug!(%addr, kind, "sending packet");

        let bytes = wire::encode(&wire::Packet::new(kind, data))?;
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
        socket.send_to(&bytes, addr).await?;

        let mut buf = vec![0u8; self.buffer_size];
        let (len, _) = tokio::time::timeout(self.timeout, socket.recv_from(&mut buf))
            .await
            .map_err(|_| NetError::Timeout)??;

        Ok(serde_json::from_slice(&buf[..len])?)
    }

    async fn serve(
        socket: Arc<UdpSocket>,
        txm: Arc<TransactionManager>,
        handlers: Arc<Mutex<HandlerMap>>,
        buffer_size: usize,
    ) {
        let mut buf = vec![0u8; buffer_size];
        loop {
            let (len, src) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(err) => {
                    error!(%err, "receive failed");
                    continue;
                }
            };

            let packet = match wire::decode(&buf[..len]) {
                Ok(packet) => packet,
                Err(err) => {
                    error!(%src, %err, "malformed packet");
                    continue;
                }
            };

            let handler = handlers.lock().get(&packet.kind).and_then(Weak::upgrade);
            let Some(handler) = handler else {
                warn!(%src, kind = %packet.kind, "unknown packet");
                continue;
            };

            let socket = Arc::clone(&socket);
            let txm = Arc::clone(&txm);
            tokio::spawn(async move {
                let wire::Packet { kind, data } = packet;

                let tid = txm.start().await;
                let mut reply = handler.handle(tid, &kind, src, data).await;
                if !txm.finish(tid).await {
                    reply = serde_json::Value::Bool(false);
                }

                match serde_json::to_vec(&reply) {
                    Ok(bytes) => {
                        if let Err(err) = socket.send_to(&bytes, src).await {
                            error!(%src, %err, "cannot reply");
                        }
                    }
                    Err(err) => error!(%src, %err, "unencodable reply"),
                }
            });
        }
    }
}

#[async_trait]
impl Module for Network {
    fn name(&self) -> &'static str {
        "network"
    }

    /// Bind the server socket (retrying while the address is taken) and
    /// spawn the listener.
    async fn start(&self, _tid: TxnId) {
        let socket = loop {
            match UdpSocket::bind(("0.0.0.0", self.port)).await {
                Ok(socket) => break socket,
                Err(err) => {
                    error!(port = self.port, %err, "cannot bind UDP server, retrying");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        };

        if let Ok(addr) = socket.local_addr() {
            let _ = self.bound.set(addr);
            info!(%addr, "UDP server listening");
        }

        tokio::spawn(Self::serve(
            Arc::new(socket),
            Arc::clone(&self.txm),
            Arc::clone(&self.handlers),
            self.buffer_size,
        ));
    }

    // The gateway has no replicable state.
    fn export_state(&self, _tid: TxnId) -> serde_json::Value {
        serde_json::json!({})
    }

    fn import_state(&self, _tid: TxnId, _state: serde_json::Value) {}
}

#[cfg(test)]
#[path = "net_tests.rs"]
mod tests;
