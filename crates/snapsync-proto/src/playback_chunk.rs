use crate::constants::{CHANNELS, SAMPLE_RATE};
use crate::wire_chunk::WireChunk;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Client-side view of a `WireChunk` being consumed: the chunk plus a
/// monotonically non-decreasing read cursor `idx` (spec §3).
#[derive(Debug, Clone)]
pub struct PlaybackChunk {
    chunk: Arc<WireChunk>,
    idx: usize,
}

impl PlaybackChunk {
    pub fn new(chunk: Arc<WireChunk>) -> Self {
        Self { chunk, idx: 0 }
    }

    pub fn len(&self) -> usize {
        self.chunk.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunk.payload.is_empty()
    }

    pub fn idx(&self) -> usize {
        self.idx
    }

    /// The target wall-clock moment for the sample currently at `idx`.
    pub fn time_point(&self) -> SystemTime {
        self.time_point_at(self.idx)
    }

    /// The target wall-clock moment for the sample at an arbitrary cursor.
    pub fn time_point_at(&self, idx: usize) -> SystemTime {
        let samples_per_sec = (SAMPLE_RATE * CHANNELS) as u64;
        let offset_us = (idx as u64).saturating_mul(1_000_000) / samples_per_sec;
        self.chunk.timestamp() + Duration::from_micros(offset_us)
    }

    /// True once every sample has been consumed; a retired chunk must be
    /// popped from the inbound queue and replaced before further reads.
    pub fn is_end_of_chunk(&self) -> bool {
        self.idx >= self.len()
    }

    /// Copy up to `out.len()` remaining samples into `out`, advancing `idx`.
    /// Returns the number of samples actually copied.
    pub fn read(&mut self, out: &mut [i16]) -> usize {
        let remaining = self.len() - self.idx;
        let count = remaining.min(out.len());
        out[..count].copy_from_slice(&self.chunk.payload[self.idx..self.idx + count]);
        self.idx += count;
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::WIRE_CHUNK_SAMPLES;
    use std::time::UNIX_EPOCH;

    fn test_chunk() -> Arc<WireChunk> {
        Arc::new(WireChunk::new(
            UNIX_EPOCH + Duration::from_secs(100),
            (0..WIRE_CHUNK_SAMPLES as i16).collect(),
        ))
    }

    #[test]
    fn idx_starts_at_zero_and_is_not_end() {
        let pc = PlaybackChunk::new(test_chunk());
        assert_eq!(pc.idx(), 0);
        assert!(!pc.is_end_of_chunk());
    }

    #[test]
    fn read_advances_idx_monotonically() {
        let mut pc = PlaybackChunk::new(test_chunk());
        let mut buf = vec![0i16; 10];
        let n = pc.read(&mut buf);
        assert_eq!(n, 10);
        assert_eq!(pc.idx(), 10);
        assert_eq!(&buf, &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn retires_exactly_when_fully_consumed() {
        let mut pc = PlaybackChunk::new(test_chunk());
        let mut buf = vec![0i16; WIRE_CHUNK_SAMPLES];
        pc.read(&mut buf);
        assert!(pc.is_end_of_chunk());
    }

    #[test]
    fn time_point_advances_with_cursor() {
        let pc = PlaybackChunk::new(test_chunk());
        let t0 = pc.time_point_at(0);
        let t1 = pc.time_point_at(96); // 96 samples = 1 ms at 48kHz stereo
        assert_eq!(t1.duration_since(t0).unwrap(), Duration::from_millis(1));
    }
}
