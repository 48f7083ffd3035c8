use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared counters for the pacer, fan-out, and session layer (C3/C4).
#[derive(Clone)]
pub struct ServerMetrics {
    pub chunks_produced: Arc<AtomicU64>,
    pub pacer_resyncs: Arc<AtomicU64>,
    pub sessions_connected: Arc<AtomicUsize>,
    pub sessions_closed: Arc<AtomicU64>,
    pub chunks_dropped: Arc<AtomicU64>,
    /// Chunks produced per second, times 10 (one decimal of precision kept
    /// as an integer, matching `coldvox-telemetry::PipelineMetrics`).
    pub chunk_fps: Arc<AtomicU64>,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self {
            chunks_produced: Arc::new(AtomicU64::new(0)),
            pacer_resyncs: Arc::new(AtomicU64::new(0)),
            sessions_connected: Arc::new(AtomicUsize::new(0)),
            sessions_closed: Arc::new(AtomicU64::new(0)),
            chunks_dropped: Arc::new(AtomicU64::new(0)),
            chunk_fps: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_chunk_produced(&self) {
        self.chunks_produced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_chunk_fps(&self, fps: f64) {
        self.chunk_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn record_pacer_resync(&self) {
        self.pacer_resyncs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_connected(&self) {
        self.sessions_connected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        self.sessions_connected.fetch_sub(1, Ordering::Relaxed);
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_chunk_dropped(&self) {
        self.chunks_dropped.fetch_add(1, Ordering::Relaxed);
    }
}
