pub mod metrics;
pub mod collector;
pub mod monitor;

pub use metrics::ConnectionMetrics;
pub use collector::{MetricsCollector, MetricsSnapshot};
pub use monitor::SessionMonitor;
