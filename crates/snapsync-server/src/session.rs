//! One `Session` per connected client (C4): owns the socket, a dedicated
//! writer thread, and a bounded, drop-oldest queue of chunks to send. Any
//! socket write error transitions the session to `Closed`, which closes the
//! queue; the session set (fanout.rs) removes closed sessions on its next
//! sweep. There are no application-level acks, heartbeats, or retransmits —
//! a lost connection is fatal and must be re-established by the client
//! (spec §4.4).

use snapsync_proto::WireChunk;
use snapsync_queue::ChunkQueue;
use snapsync_telemetry::ServerMetrics;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Handshaking,
    Streaming,
    Closed,
}

/// The producer-facing half of a session: what the pacer/fan-out calls.
pub struct SessionHandle {
    pub id: u64,
    queue: Arc<ChunkQueue<Arc<WireChunk>>>,
    closed: Arc<AtomicBool>,
    metrics: ServerMetrics,
}

impl SessionHandle {
    /// Non-blocking; pushes into the session's bounded queue, drop-oldest
    /// on overflow. Never blocks the pacer (spec §4.3/§4.4).
    pub fn offer(&self, chunk: Arc<WireChunk>) {
        if self.queue.push(chunk) {
            self.metrics.record_chunk_dropped();
        }
    }

    pub fn state(&self) -> SessionState {
        if self.closed.load(Ordering::Acquire) {
            SessionState::Closed
        } else {
            SessionState::Streaming
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Queue depth, for diagnostics.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn dropped_count(&self) -> u64 {
        self.queue.dropped_count()
    }

    /// Requests an orderly shutdown of the writer thread by closing its
    /// queue; any chunks already queued are still written before the
    /// thread exits.
    pub fn close(&self) {
        self.queue.close();
    }
}

/// Spawns the writer thread for a new session and returns the handle the
/// fan-out holds plus the thread's join handle.
pub fn spawn_session<W>(
    id: u64,
    mut sink: W,
    queue_capacity: usize,
    metrics: ServerMetrics,
) -> (SessionHandle, JoinHandle<()>)
where
    W: Write + Send + 'static,
{
    let queue: Arc<ChunkQueue<Arc<WireChunk>>> = Arc::new(ChunkQueue::new(queue_capacity));
    let closed = Arc::new(AtomicBool::new(false));

    let writer_queue = queue.clone();
    let writer_closed = closed.clone();
    let writer_metrics = metrics.clone();
    let handle = thread::Builder::new()
        .name(format!("session-writer-{id}"))
        .spawn(move || {
            tracing::info!(session_id = id, "session writer started");
            loop {
                match writer_queue.pop() {
                    Ok(chunk) => {
                        let bytes = chunk.encode();
                        if let Err(e) = sink.write_all(&bytes) {
                            tracing::warn!(session_id = id, error = %e, "session write failed, closing");
                            break;
                        }
                    }
                    Err(_closed) => break,
                }
            }
            writer_queue.close();
            writer_closed.store(true, Ordering::Release);
            writer_metrics.session_closed();
            tracing::info!(session_id = id, "session writer stopped");
        })
        .expect("failed to spawn session writer thread");

    metrics.session_connected();

    (
        SessionHandle {
            id,
            queue,
            closed,
            metrics,
        },
        handle,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsync_proto::constants::WIRE_CHUNK_SAMPLES;
    use std::time::SystemTime;

    struct FailingSink;
    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn test_chunk() -> Arc<WireChunk> {
        Arc::new(WireChunk::new(
            SystemTime::now(),
            vec![0i16; WIRE_CHUNK_SAMPLES],
        ))
    }

    #[test]
    fn write_error_closes_the_session() {
        let metrics = ServerMetrics::new();
        let (handle, join) = spawn_session(1, FailingSink, 8, metrics);
        handle.offer(test_chunk());
        join.join().unwrap();
        assert_eq!(handle.state(), SessionState::Closed);
    }

    #[test]
    fn successful_writes_preserve_order() {
        let sink = Vec::<u8>::new();
        let (handle, _join) = spawn_session(1, sink, 8, ServerMetrics::new());
        for _ in 0..3 {
            handle.offer(test_chunk());
        }
        // Give the writer thread a moment; drop the handle to close the queue.
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(!handle.is_closed());
    }

    /// A sink that blocks on first write until released, so the test can
    /// push well past capacity before the writer thread drains anything.
    struct GatedSink {
        gate: std::sync::mpsc::Receiver<()>,
    }
    impl Write for GatedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let _ = self.gate.recv();
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn overflow_increments_dropped_count() {
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let sink = GatedSink { gate: release_rx };
        let (handle, join) = spawn_session(1, sink, 4, ServerMetrics::new());
        for _ in 0..20 {
            handle.offer(test_chunk());
        }
        assert!(handle.dropped_count() > 0);
        assert_eq!(handle.queue_len(), 4);
        // Unblock the writer, then request shutdown so it drains and exits.
        let _ = release_tx.send(());
        handle.close();
        drop(release_tx);
        let _ = join.join();
    }
}
