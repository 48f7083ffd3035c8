//! Control-message *shapes* relevant to the core sync engine (spec §6). The
//! JSON-RPC transport and dispatch that carries these between server and
//! client is a sibling channel out of scope for this crate (spec §1); only
//! the data the client applies on receipt is modeled here, mirroring
//! `original_source/common/message/serverSettings.h`'s field set.

use serde::{Deserialize, Serialize};

/// Sent by the control channel to adjust the client's target latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBuffer {
    pub buffer_ms: i32,
}

/// Sent by the control channel to adjust output gain/mute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetVolume {
    pub volume: u8,
    pub muted: bool,
}

/// The full settings snapshot a server may push to a client, combining
/// `SetBuffer` and `SetVolume` plus an advertised `latency_ms` — mirrors
/// `original_source/common/message/serverSettings.h`'s `bufferMs`/`latency`/
/// `volume`/`muted` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub buffer_ms: i32,
    pub latency_ms: i32,
    pub volume: u8,
    pub muted: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            buffer_ms: 0,
            latency_ms: 0,
            volume: 100,
            muted: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    SetBuffer(SetBuffer),
    SetVolume(SetVolume),
}
