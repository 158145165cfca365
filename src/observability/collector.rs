use std::collections::HashMap;
use std::sync::Arc;
use super::ConnectionMetrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connection: String,
    pub units_received: u64,
    pub frames_received: u64,
    pub bytes_received: u64,
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub payload_errors: u64,
    pub unhandled_keys: u64,
    pub echoes: u64,
    pub samples_ingested: u64,
}

impl MetricsSnapshot {
    pub fn of(metrics: &ConnectionMetrics) -> Self {
        Self {
            connection: metrics.name().to_string(),
            units_received: metrics.units_received(),
            frames_received: metrics.frames_received(),
            bytes_received: metrics.bytes_received(),
            frames_sent: metrics.frames_sent(),
            bytes_sent: metrics.bytes_sent(),
            payload_errors: metrics.payload_errors(),
            unhandled_keys: metrics.unhandled_keys(),
            echoes: metrics.echoes(),
            samples_ingested: metrics.samples_ingested(),
        }
    }
}

/// Registry of per-connection metrics
#[derive(Clone, Default)]
pub struct MetricsCollector {
    metrics: HashMap<String, Arc<ConnectionMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: HashMap::new(),
        }
    }

    pub fn register(&mut self, metrics: Arc<ConnectionMetrics>) {
        self.metrics.insert(metrics.name().to_string(), metrics);
    }

    pub fn snapshot(&self) -> HashMap<String, MetricsSnapshot> {
        self.metrics
            .iter()
            .map(|(name, metrics)| (name.clone(), MetricsSnapshot::of(metrics)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<ConnectionMetrics>> {
        self.metrics.get(name).cloned()
    }
}
