pub mod constants;
pub mod control;
pub mod playback_chunk;
pub mod wire_chunk;

pub use constants::*;
pub use control::{ControlMessage, ServerSettings, SetBuffer, SetVolume};
pub use playback_chunk::PlaybackChunk;
pub use wire_chunk::WireChunk;
