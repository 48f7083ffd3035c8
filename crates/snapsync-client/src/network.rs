//! Network reader thread (spec §4.5.1) and the reconnect loop (spec §7:
//! "`ConnectionLost`... reconnect with capped exponential backoff
//! (100 ms → 5 s)").

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use snapsync_foundation::clock::SharedClock;
use snapsync_proto::constants::WIRE_CHUNK_BYTES;
use snapsync_proto::{PlaybackChunk, WireChunk};
use snapsync_queue::ChunkQueue;
use snapsync_telemetry::{ClientMetrics, FpsTracker};

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Reads `WireChunk`s from `source` in a tight loop, wrapping each as a
/// fresh `PlaybackChunk` (`idx = 0`) and pushing it onto the inbound queue
/// (drop-oldest on overflow, via `ChunkQueue`). Returns once the source
/// errors; the caller is expected to close the queue and reconnect (spec
/// §4.5.6: "network thread closes the inbound queue").
pub fn run_reader<R: Read>(
    mut source: R,
    queue: Arc<ChunkQueue<PlaybackChunk>>,
    metrics: ClientMetrics,
) -> io::Error {
    let mut buf = [0u8; WIRE_CHUNK_BYTES];
    let mut chunk_fps_tracker = FpsTracker::new();
    loop {
        if let Err(e) = source.read_exact(&mut buf) {
            queue.close();
            return e;
        }
        match WireChunk::decode(&buf) {
            Ok(chunk) => {
                let dropped = queue.push(PlaybackChunk::new(Arc::new(chunk)));
                if dropped {
                    metrics.record_chunk_dropped();
                }
                if let Some(fps) = chunk_fps_tracker.tick() {
                    metrics.update_chunk_fps(fps);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "malformed frame on audio port, reconnecting");
                queue.close();
                return io::Error::new(io::ErrorKind::InvalidData, e);
            }
        }
    }
}

/// Retries `connect` with a capped exponential backoff, doubling from
/// `INITIAL_BACKOFF` (100 ms) up to `MAX_BACKOFF` (5 s), until it succeeds.
/// There is no attempt limit (spec §7's `ConnectionLost` recovery strategy
/// is `Retry { max_attempts: u32::MAX, .. }`); a caller that wants a bound
/// should wrap this with an external deadline.
pub fn reconnect_with_backoff<T>(
    mut connect: impl FnMut() -> io::Result<T>,
    clock: &SharedClock,
    metrics: &ClientMetrics,
) -> T {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match connect() {
            Ok(value) => return value,
            Err(e) => {
                tracing::warn!(error = %e, backoff_ms = backoff.as_millis(), "connection attempt failed");
                metrics.record_reconnect();
                clock.sleep(backoff);
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsync_foundation::clock::test_clock;
    use snapsync_proto::constants::WIRE_CHUNK_SAMPLES;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_chunk_bytes() -> Vec<u8> {
        WireChunk::new(std::time::SystemTime::now(), vec![0i16; WIRE_CHUNK_SAMPLES]).encode()
    }

    #[test]
    fn reader_pushes_decoded_chunks_until_eof() {
        let mut bytes = Vec::new();
        bytes.extend(test_chunk_bytes());
        bytes.extend(test_chunk_bytes());
        let queue: Arc<ChunkQueue<PlaybackChunk>> = Arc::new(ChunkQueue::new(4));
        let err = run_reader(&bytes[..], queue.clone(), ClientMetrics::new());
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(queue.len(), 2);
        assert!(queue.is_closed());
    }

    #[test]
    fn reader_closes_queue_on_a_short_trailing_read() {
        // A partial record after N full ones surfaces as UnexpectedEof from
        // `read_exact`, not as a decode-level `MalformedFrame` — the fixed
        // read size means `decode` only ever sees exactly-sized buffers.
        let mut bytes = test_chunk_bytes();
        bytes.extend_from_slice(&[0u8; 3]);
        let queue: Arc<ChunkQueue<PlaybackChunk>> = Arc::new(ChunkQueue::new(4));
        let err = run_reader(&bytes[..], queue.clone(), ClientMetrics::new());
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(queue.len(), 1);
        assert!(queue.is_closed());
    }

    #[test]
    fn reconnect_retries_until_success_and_counts_attempts() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let clock = test_clock();
        let metrics = ClientMetrics::new();

        let connect = {
            let attempts = attempts.clone();
            move || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 3 {
                    Err(io::Error::new(io::ErrorKind::ConnectionRefused, "nope"))
                } else {
                    Ok(42)
                }
            }
        };

        let value = reconnect_with_backoff(connect, &clock, &metrics);
        assert_eq!(value, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(metrics.reconnects.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn reconnect_backoff_is_capped_and_does_not_block_the_test() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let clock = test_clock();
        let metrics = ClientMetrics::new();

        let connect = {
            let attempts = attempts.clone();
            move || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 10 {
                    Err(io::Error::new(io::ErrorKind::ConnectionRefused, "nope"))
                } else {
                    Ok(())
                }
            }
        };

        let start = std::time::Instant::now();
        reconnect_with_backoff(connect, &clock, &metrics);
        // 10 retries on a real clock would exceed 30s (capped doubling);
        // on the virtual clock this must be effectively instantaneous.
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
