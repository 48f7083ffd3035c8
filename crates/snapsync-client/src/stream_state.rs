//! `StreamState`: the sync engine's single-writer state, owned by the audio
//! callback thread (spec §5 "StreamState is single-writer"). The only field
//! touched from another thread is `buffer_target_ms`, which the control
//! channel updates atomically (spec §6, `SetBuffer`).

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use snapsync_proto::constants::DEFAULT_BUFFER_TARGET_MS;

/// Shared, lock-free handle to the target playback latency. The audio
/// callback reads it every fill; the control-message handler writes it.
#[derive(Clone)]
pub struct BufferTarget(Arc<AtomicI32>);

impl BufferTarget {
    pub fn new(initial_ms: i32) -> Self {
        Self(Arc::new(AtomicI32::new(initial_ms)))
    }

    pub fn get(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, ms: i32) {
        self.0.store(ms, Ordering::Relaxed);
    }
}

impl Default for BufferTarget {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_TARGET_MS)
    }
}

/// The engine's coarse operating mode (spec §4.5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// Normal playback.
    S0,
    /// Big-sleep / catch-up, with a signed remaining correction in ms.
    S2,
}

/// `sleep`, `median_long`, `median_short`, `last_update` (spec §3's
/// `StreamState` fields), plus the mode they encode.
pub struct StreamState {
    pub mode: EngineMode,
    pub sleep: i32,
    pub median_long: i32,
    pub median_short: i32,
    pub last_update: Option<SystemTime>,
}

impl StreamState {
    pub fn new() -> Self {
        Self {
            mode: EngineMode::S0,
            sleep: 0,
            median_long: 0,
            median_short: 0,
            last_update: None,
        }
    }

    pub fn enter_s2(&mut self, sleep: i32) {
        self.mode = EngineMode::S2;
        self.sleep = sleep;
    }

    pub fn return_to_s0(&mut self) {
        self.mode = EngineMode::S0;
        self.sleep = 0;
    }
}

impl Default for StreamState {
    fn default() -> Self {
        Self::new()
    }
}

/// `msBuffer` (spec §4.5.3): the number of PLAYER_CHUNK_MS units one
/// audio-callback output buffer spans, given its frame count.
pub fn ms_buffer(frames_per_buffer: usize) -> i32 {
    use snapsync_proto::constants::SAMPLES_PER_MS;
    ((2 * frames_per_buffer) as i64 / SAMPLES_PER_MS as i64) as i32
}

/// Signed millisecond difference `target - sample`, robust to either side
/// being later (`SystemTime::duration_since` only returns a positive
/// duration or an error).
pub fn signed_diff_ms(target: SystemTime, sample: SystemTime) -> i64 {
    match target.duration_since(sample) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}
