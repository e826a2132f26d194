// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Datagram packet format.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from packet and frame codecs.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One datagram: a packet type that selects the handler, plus an
/// arbitrary JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
}

impl Packet {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self { kind: kind.into(), data }
    }
}

/// Encode a packet as a JSON datagram body.
pub fn encode(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(packet)?)
}

/// Decode a datagram body into a packet.
pub fn decode(bytes: &[u8]) -> Result<Packet, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
#[path = "packet_tests.rs"]
mod tests;
