use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one connection, shared between the network context and
/// whoever reports on it.
pub struct ConnectionMetrics {
    name: String,
    units_received: AtomicU64,
    frames_received: AtomicU64,
    bytes_received: AtomicU64,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    payload_errors: AtomicU64,
    unhandled_keys: AtomicU64,
    echoes: AtomicU64,
    samples_ingested: AtomicU64,
}

impl ConnectionMetrics {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units_received: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            payload_errors: AtomicU64::new(0),
            unhandled_keys: AtomicU64::new(0),
            echoes: AtomicU64::new(0),
            samples_ingested: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_unit_received(&self, bytes: usize) {
        self.units_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_payload_error(&self) {
        self.payload_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unhandled_key(&self) {
        self.unhandled_keys.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_echo(&self) {
        self.echoes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_samples(&self, count: usize) {
        self.samples_ingested.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn units_received(&self) -> u64 {
        self.units_received.load(Ordering::Relaxed)
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn payload_errors(&self) -> u64 {
        self.payload_errors.load(Ordering::Relaxed)
    }

    pub fn unhandled_keys(&self) -> u64 {
        self.unhandled_keys.load(Ordering::Relaxed)
    }

    pub fn echoes(&self) -> u64 {
        self.echoes.load(Ordering::Relaxed)
    }

    pub fn samples_ingested(&self) -> u64 {
        self.samples_ingested.load(Ordering::Relaxed)
    }
}
