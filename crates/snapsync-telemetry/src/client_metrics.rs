use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Shared counters/gauges for the client sync engine (C5).
#[derive(Clone)]
pub struct ClientMetrics {
    /// Most recent `age_ms` sample, for dashboards/logging.
    pub age_ms: Arc<AtomicI64>,
    /// True while the engine is in S2 (big-sleep/catch-up).
    pub in_big_sleep: Arc<AtomicBool>,
    pub corrections_applied: Arc<AtomicU64>,
    pub stalls: Arc<AtomicU64>,
    pub reconnects: Arc<AtomicU64>,
    pub chunks_dropped: Arc<AtomicU64>,
    /// Chunks received per second, times 10 (matches
    /// `coldvox-telemetry::PipelineMetrics`'s fixed-point fps fields).
    pub chunk_fps: Arc<AtomicU64>,
}

impl Default for ClientMetrics {
    fn default() -> Self {
        Self {
            age_ms: Arc::new(AtomicI64::new(0)),
            in_big_sleep: Arc::new(AtomicBool::new(false)),
            corrections_applied: Arc::new(AtomicU64::new(0)),
            stalls: Arc::new(AtomicU64::new(0)),
            reconnects: Arc::new(AtomicU64::new(0)),
            chunks_dropped: Arc::new(AtomicU64::new(0)),
            chunk_fps: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_age(&self, age_ms: i32) {
        self.age_ms.store(age_ms as i64, Ordering::Relaxed);
    }

    pub fn set_big_sleep(&self, active: bool) {
        self.in_big_sleep.store(active, Ordering::Relaxed);
    }

    pub fn record_correction(&self) {
        self.corrections_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stall(&self) {
        self.stalls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_chunk_dropped(&self) {
        self.chunks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_chunk_fps(&self, fps: f64) {
        self.chunk_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }
}
