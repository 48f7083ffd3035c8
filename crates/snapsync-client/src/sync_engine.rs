//! The audio-callback-owned sync engine (C5, spec §4.5). `fill` is called
//! once per output buffer; it must never block indefinitely, allocate, or
//! contend a lock (spec §4.5.1, §5). All allocation happens at
//! construction: the scratch buffer is sized up front to
//! `max_frames_per_buffer + max_correction_samples` (spec §9).

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use snapsync_proto::constants::CHANNELS;
use snapsync_proto::PlaybackChunk;
use snapsync_queue::ChunkQueue;
use snapsync_telemetry::ClientMetrics;

use crate::latency_buffer::LatencyBuffer;
use crate::resampler::{resample_nearest, samples_to_read};
use crate::stream_state::{ms_buffer, signed_diff_ms, BufferTarget, EngineMode, StreamState};

/// Bounded wait on the inbound queue from inside the callback (spec §5: "may
/// do a bounded-time `try_pop` (e.g. ≤ 100 µs)").
const CALLBACK_POP_TIMEOUT: Duration = Duration::from_micros(100);

/// `|age_ms|` threshold for the mini-buffer S2 trigger (spec §4.5.3 step 2).
const MINI_AGE_THRESHOLD_MS: i32 = 50;
/// Floor for the short-buffer S2 trigger (spec §4.5.3 step 1).
const SHORT_S2_FLOOR_MS: i32 = 15;
/// Floor for the short-buffer fine-correction band (spec §4.5.3 step 3),
/// resolved from `original_source/stream.cpp`'s `max(7, msBuffer)` bound —
/// see `DESIGN.md`.
const SHORT_CORRECTION_FLOOR_MS: i32 = 7;

pub struct SyncEngine {
    inbound: Arc<ChunkQueue<PlaybackChunk>>,
    current: Option<PlaybackChunk>,
    buffer_target: BufferTarget,
    state: StreamState,
    mini: LatencyBuffer,
    short: LatencyBuffer,
    long: LatencyBuffer,
    scratch: Vec<i16>,
    metrics: ClientMetrics,
    wall_now: Box<dyn Fn() -> SystemTime + Send>,
}

impl SyncEngine {
    /// `max_frames_per_buffer` and `max_correction_samples` size the
    /// pre-allocated scratch buffer used for fine-correction reads; both are
    /// frame (not sample) counts.
    pub fn new(
        inbound: Arc<ChunkQueue<PlaybackChunk>>,
        buffer_target: BufferTarget,
        metrics: ClientMetrics,
        max_frames_per_buffer: usize,
        max_correction_frames: usize,
    ) -> Self {
        let scratch_len = (max_frames_per_buffer + max_correction_frames) * CHANNELS as usize;
        Self {
            inbound,
            current: None,
            buffer_target,
            state: StreamState::new(),
            mini: LatencyBuffer::mini(),
            short: LatencyBuffer::short(),
            long: LatencyBuffer::long(),
            scratch: vec![0i16; scratch_len],
            metrics,
            wall_now: Box::new(SystemTime::now),
        }
    }

    #[cfg(test)]
    pub fn with_wall_clock(mut self, wall_now: impl Fn() -> SystemTime + Send + 'static) -> Self {
        self.wall_now = Box::new(wall_now);
        self
    }

    pub fn buffer_target_ms(&self) -> i32 {
        self.buffer_target.get()
    }

    #[cfg(test)]
    pub fn mode(&self) -> EngineMode {
        self.state.mode
    }

    /// The one entry point the audio subsystem calls. `output` must be
    /// filled entirely; `dac_time` is seconds from now until the first
    /// sample emitted is heard (spec §4.5.1).
    pub fn fill(&mut self, output: &mut [i16], dac_time: Duration) {
        match self.state.mode {
            EngineMode::S0 => self.fill_s0(output, dac_time),
            EngineMode::S2 => self.fill_s2(output),
        }
    }

    fn fill_s0(&mut self, output: &mut [i16], dac_time: Duration) {
        let target_time = (self.wall_now)() + dac_time;

        if !self.ensure_current_chunk() {
            output.fill(0);
            self.metrics.record_stall();
            return;
        }

        // `time_point` is a peek at the already-fetched current chunk's
        // timestamp; it consumes nothing, so the decision ladder below can
        // run — and commit to a branch — before a single sample is read.
        let sample_time = self.current.as_ref().unwrap().time_point();

        let age_ms =
            (signed_diff_ms(target_time, sample_time) - self.buffer_target_ms() as i64) as i32;
        self.metrics.record_age(age_ms);

        self.mini.push(age_ms);
        self.short.push(age_ms);
        self.long.push(age_ms);

        let now = (self.wall_now)();
        let recompute_medians = match self.state.last_update {
            None => true,
            Some(last) => now.duration_since(last).map(|d| d >= Duration::from_secs(1)).unwrap_or(true),
        };
        if recompute_medians {
            self.state.median_long = self.long.mean();
            self.state.median_short = self.short.mean();
            self.state.last_update = Some(now);
        }

        let frames = output.len() / CHANNELS as usize;
        let buf_span_ms = ms_buffer(frames);

        // Decision ladder (spec §4.5.3); first match wins. Exactly one read
        // of the inbound stream happens below, after the branch is chosen —
        // never one read to decide and a second to act.
        if self.short.full() && self.state.median_short.abs() > SHORT_S2_FLOOR_MS.max(buf_span_ms)
        {
            self.fill_raw(output);
            self.metrics.set_big_sleep(true);
            self.state.enter_s2(self.state.median_short);
            self.clear_latency_buffers();
        } else if self.mini.full()
            && age_ms.abs() > MINI_AGE_THRESHOLD_MS
            && self.mini.mean().abs() > MINI_AGE_THRESHOLD_MS
        {
            self.fill_raw(output);
            self.metrics.set_big_sleep(true);
            self.state.enter_s2(self.mini.mean());
            self.clear_latency_buffers();
        } else if (self.long.full()
            && self.state.median_long.abs() > 1
            && self.state.median_long.abs() <= buf_span_ms)
            || (self.short.full()
                && self.state.median_short.abs() > SHORT_CORRECTION_FLOOR_MS.max(buf_span_ms)
                && self.state.median_short.abs() <= buf_span_ms)
        {
            self.apply_fine_correction(output, self.state.median_short);
            self.metrics.record_correction();
            self.clear_latency_buffers();
        } else {
            self.fill_raw(output);
        }
    }

    fn fill_s2(&mut self, output: &mut [i16]) {
        const PLAYER_CHUNK_MS: i32 = snapsync_proto::constants::PLAYER_CHUNK_MS as i32;

        if self.state.sleep < 0 {
            // Ahead of real time: emit silence, count the sleep down.
            output.fill(0);
            self.state.sleep += PLAYER_CHUNK_MS;
            if self.state.sleep > -PLAYER_CHUNK_MS / 2 {
                self.metrics.set_big_sleep(false);
                self.state.return_to_s0();
            }
            return;
        }

        if self.state.sleep > 0 {
            // Behind real time: drain stale chunks without emitting audio.
            let frames = output.len() / CHANNELS as usize;
            let half_buf = ms_buffer(frames) / 2;
            let target_time = (self.wall_now)();

            loop {
                if !self.ensure_current_chunk() {
                    break;
                }
                let sample_time = self.current.as_ref().unwrap().time_point();
                let age_ms = signed_diff_ms(target_time, sample_time) as i32
                    - self.buffer_target_ms();
                if age_ms < half_buf {
                    break;
                }
                // Discard one player-chunk worth of stale samples.
                let discard = crate::resampler::samples_to_read(frames, 0);
                self.drain_discard(discard);
            }

            self.fill_raw(output);
            self.metrics.set_big_sleep(false);
            self.state.return_to_s0();
            self.clear_latency_buffers();
        }
    }

    fn clear_latency_buffers(&mut self) {
        self.mini.clear();
        self.short.clear();
        self.long.clear();
    }

    /// Applies a resampling correction of `correction_ms` to `output` (spec
    /// §4.5.4), clamped so `|correction| <= msBuffer/2`.
    fn apply_fine_correction(&mut self, output: &mut [i16], correction_ms: i32) {
        let frames = output.len() / CHANNELS as usize;
        let half_buf = ms_buffer(frames) / 2;
        let clamped = correction_ms.clamp(-half_buf, half_buf);

        let to_read = samples_to_read(frames, clamped).min(self.scratch.len());
        let to_read = to_read - (to_read % CHANNELS as usize);

        // Borrow the pre-allocated scratch buffer out of `self` so
        // `fill_raw` (which needs `&mut self`) can still run.
        let mut scratch = std::mem::take(&mut self.scratch);
        self.fill_raw(&mut scratch[..to_read]);
        resample_nearest(&scratch, to_read, output);
        self.scratch = scratch;
    }

    /// Drains (and discards) `count` samples from the inbound stream, for
    /// the S2 catch-up path (spec §4.5.3's "drain... discarding stale
    /// ones"). Reuses the pre-allocated scratch buffer so the callback
    /// never allocates.
    fn drain_discard(&mut self, count: usize) {
        let mut scratch = std::mem::take(&mut self.scratch);
        let mut remaining = count;
        while remaining > 0 {
            if !self.ensure_current_chunk() {
                break;
            }
            let chunk = self.current.as_mut().unwrap();
            let take = remaining.min(scratch.len());
            let n = chunk.read(&mut scratch[..take]);
            if n == 0 {
                break;
            }
            remaining -= n;
        }
        self.scratch = scratch;
    }

    /// Fills `out` by draining across chunk boundaries (spec §4.5.5). Any
    /// shortfall (stall) is filled with silence.
    fn fill_raw(&mut self, out: &mut [i16]) {
        let mut written = 0;
        while written < out.len() {
            if !self.ensure_current_chunk() {
                break;
            }
            let chunk = self.current.as_mut().unwrap();
            let n = chunk.read(&mut out[written..]);
            written += n;
            if n == 0 {
                break;
            }
        }
        for slot in &mut out[written..] {
            *slot = 0;
        }
    }

    /// Ensures `self.current` holds a chunk with samples left to read,
    /// retiring an exhausted one and pulling the next with a short bounded
    /// wait. Returns `false` on stall (the caller must fall back to
    /// silence).
    fn ensure_current_chunk(&mut self) -> bool {
        if let Some(chunk) = &self.current {
            if !chunk.is_end_of_chunk() {
                return true;
            }
        }
        match self.inbound.try_pop(CALLBACK_POP_TIMEOUT) {
            Ok(chunk) => {
                self.current = Some(chunk);
                true
            }
            Err(_) => {
                self.metrics.record_stall();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsync_proto::constants::{PLAYER_CHUNK_SAMPLES, WIRE_CHUNK_MS, WIRE_CHUNK_SAMPLES};
    use snapsync_proto::WireChunk;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    fn epoch_plus_ms(ms: i64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(ms as u64)
    }

    /// Pushes `n` consecutive WireChunks, each stamped exactly `WIRE_CHUNK_MS`
    /// after the previous one, onto a fresh inbound queue.
    fn seeded_queue(n: usize, start_ms: i64) -> Arc<ChunkQueue<PlaybackChunk>> {
        let queue = Arc::new(ChunkQueue::new(n.max(4)));
        for i in 0..n {
            let stamp = epoch_plus_ms(start_ms + i as i64 * WIRE_CHUNK_MS as i64);
            let chunk = Arc::new(WireChunk::new(stamp, vec![7i16; WIRE_CHUNK_SAMPLES]));
            queue.push(PlaybackChunk::new(chunk));
        }
        queue
    }

    fn engine_with_clock(
        queue: Arc<ChunkQueue<PlaybackChunk>>,
        now_ms: Arc<AtomicI64>,
    ) -> SyncEngine {
        SyncEngine::new(
            queue,
            BufferTarget::new(300),
            ClientMetrics::new(),
            PLAYER_CHUNK_SAMPLES / CHANNELS as usize,
            PLAYER_CHUNK_SAMPLES / CHANNELS as usize,
        )
        .with_wall_clock(move || epoch_plus_ms(now_ms.load(Ordering::SeqCst)))
    }

    #[test]
    fn normal_fill_copies_samples_in_order() {
        let queue = seeded_queue(2, 1_000_000);
        let now_ms = Arc::new(AtomicI64::new(1_000_300));
        let mut engine = engine_with_clock(queue, now_ms);

        let mut out = vec![0i16; PLAYER_CHUNK_SAMPLES];
        engine.fill(&mut out, Duration::ZERO);
        assert!(out.iter().all(|&s| s == 7));
    }

    #[test]
    fn age_ms_is_zero_when_target_matches_buffer_target() {
        // target_time = sample_time + buffer_target_ms (300) exactly.
        let queue = seeded_queue(2, 1_000_000);
        let now_ms = Arc::new(AtomicI64::new(1_000_300));
        let metrics = ClientMetrics::new();
        let mut engine = SyncEngine::new(
            queue,
            BufferTarget::new(300),
            metrics.clone(),
            PLAYER_CHUNK_SAMPLES / CHANNELS as usize,
            PLAYER_CHUNK_SAMPLES / CHANNELS as usize,
        )
        .with_wall_clock({
            let now_ms = now_ms.clone();
            move || epoch_plus_ms(now_ms.load(Ordering::SeqCst))
        });

        let mut out = vec![0i16; PLAYER_CHUNK_SAMPLES];
        engine.fill(&mut out, Duration::ZERO);
        assert_eq!(metrics.age_ms.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn empty_queue_emits_silence_and_records_a_stall() {
        let queue: Arc<ChunkQueue<PlaybackChunk>> = Arc::new(ChunkQueue::new(4));
        let metrics = ClientMetrics::new();
        let mut engine = SyncEngine::new(
            queue,
            BufferTarget::new(300),
            metrics.clone(),
            PLAYER_CHUNK_SAMPLES / CHANNELS as usize,
            PLAYER_CHUNK_SAMPLES / CHANNELS as usize,
        );

        let mut out = vec![9i16; PLAYER_CHUNK_SAMPLES];
        engine.fill(&mut out, Duration::ZERO);
        assert!(out.iter().all(|&s| s == 0));
        assert_eq!(metrics.stalls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn sustained_large_age_enters_big_sleep_via_mini_buffer() {
        // 10 calls of 10ms each cover 100ms; seed enough chunks for that
        // plus headroom (3 * 50ms = 150ms).
        let queue = seeded_queue(3, 1_000_000);
        let now_ms = Arc::new(AtomicI64::new(0));
        let metrics = ClientMetrics::new();
        let mut engine = SyncEngine::new(
            queue,
            BufferTarget::new(300),
            metrics.clone(),
            PLAYER_CHUNK_SAMPLES / CHANNELS as usize,
            PLAYER_CHUNK_SAMPLES / CHANNELS as usize,
        )
        .with_wall_clock({
            let now_ms = now_ms.clone();
            move || epoch_plus_ms(now_ms.load(Ordering::SeqCst))
        });

        // Constant age of 100ms: target = chunk_start + k*10ms + 300 + 100.
        const EXTRA_OFFSET_MS: i64 = 100;
        for k in 0..10i64 {
            now_ms.store(1_000_000 + k * 10 + 300 + EXTRA_OFFSET_MS, Ordering::SeqCst);
            let mut out = vec![0i16; PLAYER_CHUNK_SAMPLES];
            engine.fill(&mut out, Duration::ZERO);
        }

        assert_eq!(engine.mode(), EngineMode::S2);
        assert!(metrics.in_big_sleep.load(Ordering::Relaxed));
    }

    #[test]
    fn drain_discard_never_allocates_beyond_the_scratch_buffer() {
        // Smoke-test: draining more than the scratch buffer holds must loop,
        // not panic or grow the buffer.
        let queue = seeded_queue(3, 1_000_000);
        let now_ms = Arc::new(AtomicI64::new(0));
        let mut engine = engine_with_clock(queue, now_ms);
        let scratch_cap = engine.scratch.len();
        engine.drain_discard(scratch_cap * 2);
        // No panic, and the scratch buffer's length is unchanged.
        assert_eq!(engine.scratch.len(), scratch_cap);
    }
}
