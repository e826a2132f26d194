// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol for node-to-node traffic.
//!
//! Two carriers share the JSON payload format:
//! - UDP datagrams between nodes: one `{"type", "data"}` object per
//!   datagram, one reply datagram per request.
//! - The process-pair IPC stream: 4-byte length prefix (big-endian) +
//!   JSON payload per frame.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod framing;
mod packet;
mod types;

pub use framing::{read_json, read_message, write_json, write_message, MAX_FRAME};
pub use packet::{decode, encode, Packet, ProtocolError};
pub use types::{
    ElevRequestAdd, ElevStateGet, ElevStateReply, FloorRequestServed, ELEV_REQUEST_ADD,
    ELEV_STATE_GET, FLOOR_GET_ALL_REQUESTS, FLOOR_REQUEST_SERVED,
};
