//! The client core (C5): network reader, three-level latency filter, the
//! S0/S2 sync state machine, nearest-neighbour fine-correction resampling,
//! and the cpal output adapter. This is the bulk of the implementation
//! budget (spec §4.5).

pub mod device;
pub mod latency_buffer;
pub mod network;
pub mod output;
pub mod resampler;
pub mod stream_state;
pub mod sync_engine;

pub use device::DeviceManager;
pub use latency_buffer::LatencyBuffer;
pub use network::{reconnect_with_backoff, run_reader};
pub use output::build_output_stream;
pub use stream_state::{BufferTarget, EngineMode, StreamState};
pub use sync_engine::SyncEngine;
