//! Wire protocol shared by client and server.
//!
//! All packets travel over a single unreliable UDP socket; the sequence
//! number on [`InputSample`] and the server timestamp on [`ServerState`]
//! are the only ordering mechanisms. Both payloads are small fixed-layout
//! structures serialized with bincode.

use crate::math::Vec2;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One fixed-tick input from the owning client.
///
/// Sequence numbers start at 1 and increase monotonically; they are never
/// reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputSample {
    pub sequence: u32,
    /// Client-local clock at creation, in milliseconds.
    pub timestamp: u64,
    /// Horizontal axis in [-1, 1].
    pub axis: f32,
    /// Edge-triggered jump request.
    pub jump: bool,
}

/// Authoritative per-tick snapshot of one character.
///
/// Sent twice each server tick: targeted at the owning client (as the
/// reconciliation ack) and broadcast to all observers (as an interpolation
/// snapshot). Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServerState {
    /// Sequence number of the last input the server consumed.
    pub last_input_seq: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub grounded: bool,
    /// Server clock at creation, in milliseconds.
    pub server_time: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Input {
        sample: InputSample,
    },
    Disconnect,

    Connected {
        client_id: u32,
    },
    State {
        player_id: u32,
        state: ServerState,
    },
    Disconnected {
        reason: String,
    },
}

/// Current Unix time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
