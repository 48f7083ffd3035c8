//! The pacer thread (C3): turns a blocking PCM byte source into a steady
//! stream of `WireChunk`s stamped at exactly `WIRE_CHUNK_MS` apart,
//! independent of scheduling jitter (spec §4.3). This is the shared time
//! reference every client aligns to.

use crate::fanout::SessionSet;
use crate::pcm_source::PcmSource;
use snapsync_foundation::clock::{Clock, SharedClock};
use snapsync_proto::constants::{WIRE_CHUNK_BYTES, WIRE_CHUNK_MS, WIRE_CHUNK_SAMPLES};
use snapsync_proto::WireChunk;
use snapsync_telemetry::{FpsTracker, ServerMetrics};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Runs the pacer loop until `source.read_exact` returns an error (the
/// source closed) or `should_stop` signals shutdown. Intended to be run on
/// a dedicated thread by `snapsync-app`.
pub fn run_pacer<S: PcmSource>(
    mut source: S,
    sessions: Arc<SessionSet>,
    metrics: ServerMetrics,
    clock: SharedClock,
    mut should_stop: impl FnMut() -> bool,
) -> std::io::Result<()> {
    let chunk_period = Duration::from_millis(WIRE_CHUNK_MS as u64);
    let stall_threshold = chunk_period * 2;

    let mut start_epoch = clock.now();
    let mut wall_epoch = clock.wall_now();
    let mut chunks_produced: u32 = 0;
    let mut buf = vec![0u8; WIRE_CHUNK_BYTES - 8];
    let mut chunk_fps_tracker = FpsTracker::new();

    loop {
        if should_stop() {
            return Ok(());
        }

        // 1. Read exactly one chunk's worth of PCM, blocking until available.
        source.read_exact(&mut buf)?;
        let payload = bytes_to_samples(&buf);

        // 2. Stamp with the current pacer epoch, not with wall-clock `now`.
        let stamp = wall_epoch + chunk_period * chunks_produced;
        let chunk = Arc::new(WireChunk::new(stamp, payload));
        metrics.record_chunk_produced();
        if let Some(fps) = chunk_fps_tracker.tick() {
            metrics.update_chunk_fps(fps);
        }

        // 3. Fan out; `broadcast` never blocks.
        sessions.broadcast(&chunk);

        // 4. Advance the epoch by CHUNK_MS, not by elapsed wall-clock time.
        chunks_produced += 1;

        // 5. Sleep to the monotonic deadline; resync on stall.
        let deadline = start_epoch + chunk_period * chunks_produced;
        let now = clock.now();
        if now > deadline + stall_threshold {
            tracing::warn!("pacer stalled, resynchronizing epoch");
            metrics.record_pacer_resync();
            start_epoch = clock.now();
            wall_epoch = clock.wall_now();
            chunks_produced = 0;
            continue;
        }
        if deadline > now {
            clock.sleep(deadline - now);
        }
    }
}

fn bytes_to_samples(buf: &[u8]) -> Vec<i16> {
    buf.chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}
