//! Compile-time constants shared between the server and client builds.
//!
//! Both peers must agree on these; a mismatch manifests as audio corruption
//! on the wire (spec §4.1) rather than a negotiated error, since the
//! transport carries no length prefix or handshake.

/// Sample rate, in Hz.
pub const SAMPLE_RATE: u32 = 48_000;
/// Interleaved channel count (stereo).
pub const CHANNELS: u32 = 2;
/// Duration of a single `WireChunk`, in milliseconds.
pub const WIRE_CHUNK_MS: u32 = 50;
/// Duration of a single audio-callback buffer, in milliseconds.
pub const PLAYER_CHUNK_MS: u32 = 10;

/// Number of interleaved i16 samples per millisecond of audio.
pub const SAMPLES_PER_MS: u32 = SAMPLE_RATE * CHANNELS / 1_000;

/// Number of interleaved i16 samples in one `WireChunk` payload.
pub const WIRE_CHUNK_SAMPLES: usize = (SAMPLES_PER_MS * WIRE_CHUNK_MS) as usize;

/// Number of interleaved i16 samples in one player (audio-callback) chunk.
pub const PLAYER_CHUNK_SAMPLES: usize = (SAMPLES_PER_MS * PLAYER_CHUNK_MS) as usize;

/// Encoded size, in bytes, of a single `WireChunk` on the wire.
pub const WIRE_CHUNK_BYTES: usize = 4 + 4 + WIRE_CHUNK_SAMPLES * 2;

/// Default end-to-end playback latency target, in milliseconds.
///
/// `original_source/client.cpp` defaults to 300 ms; `original_source/stream.cpp`'s
/// own constructor default of 500 ms is immediately overwritten by every
/// caller and is not a meaningful default (see DESIGN.md Open Question 1).
pub const DEFAULT_BUFFER_TARGET_MS: i32 = 300;

/// Default TCP port the server listens on for the audio stream.
pub const DEFAULT_AUDIO_PORT: u16 = 1704;
/// Default TCP port reserved for the JSON-RPC control channel (out of scope).
pub const DEFAULT_CONTROL_PORT: u16 = 1705;
