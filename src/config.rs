use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::codec::DEFAULT_MAX_FRAME_LEN;

/// Channels to plot on a tab before any data arrives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabConfig {
    pub name: String,

    #[serde(default)]
    pub channels: Vec<String>,

    /// Overrides `default_capacity` for this tab
    #[serde(default)]
    pub capacity: Option<usize>,

    #[serde(default)]
    pub shown: bool,
}

/// Client settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket endpoint of the telemetry server
    pub url: String,

    /// Name this client reports under in logs and metrics
    pub name: String,

    /// Ring buffer capacity for new tabs
    pub default_capacity: usize,

    /// Floor for capacity scaling
    pub min_capacity: usize,

    /// Factor applied per capacity step
    pub capacity_scale: f64,

    /// Line length used until a tab reports its width
    pub default_draw_slots: usize,

    /// Upper bound on a tab's line length, whatever width the server reports
    pub max_draw_slots: usize,

    pub render_period_ms: u64,

    /// Minimum gap between frame messages sent upstream; 0 sends every frame
    pub min_tx_period_ms: u64,

    /// Bound of the UI -> network command queue
    pub command_queue: usize,

    /// Notifications kept for the UI before new ones are dropped
    pub notification_queue: usize,

    pub max_frame_len: usize,

    /// Hold incomplete frames for the next delivery unit instead of failing
    pub reassemble_partial_frames: bool,

    pub tabs: Vec<TabConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8001".to_string(),
            name: "telemtab".to_string(),
            default_capacity: 512,
            min_capacity: 16,
            capacity_scale: 1.05,
            default_draw_slots: 512,
            max_draw_slots: 4096,
            render_period_ms: 16,
            min_tx_period_ms: 20,
            command_queue: 256,
            notification_queue: 1024,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            reassemble_partial_frames: true,
            tabs: Vec::new(),
        }
    }
}

impl ClientConfig {
    pub fn from_json(config: Value) -> Result<Self> {
        let config: Self =
            serde_json::from_value(config).context("Failed to parse client config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("Config {} is not valid JSON", path.display()))?;
        Self::from_json(value)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_capacity == 0 {
            return Err(anyhow!("default_capacity must be at least 1"));
        }
        if self.min_capacity == 0 {
            return Err(anyhow!("min_capacity must be at least 1"));
        }
        if !(self.capacity_scale > 1.0) {
            return Err(anyhow!(
                "capacity_scale must be greater than 1, got {}",
                self.capacity_scale
            ));
        }
        if self.max_draw_slots == 0 {
            return Err(anyhow!("max_draw_slots must be at least 1"));
        }
        if self.default_draw_slots > self.max_draw_slots {
            return Err(anyhow!(
                "default_draw_slots ({}) exceeds max_draw_slots ({})",
                self.default_draw_slots,
                self.max_draw_slots
            ));
        }
        if self.render_period_ms == 0 {
            return Err(anyhow!("render_period_ms must be at least 1"));
        }
        if self.command_queue == 0 {
            return Err(anyhow!("command_queue must be at least 1"));
        }
        if self.notification_queue == 0 {
            return Err(anyhow!("notification_queue must be at least 1"));
        }
        for tab in &self.tabs {
            if tab.capacity == Some(0) {
                return Err(anyhow!("Tab '{}' has capacity 0", tab.name));
            }
        }
        Ok(())
    }

    pub fn render_period(&self) -> Duration {
        Duration::from_millis(self.render_period_ms)
    }

    pub fn min_tx_period(&self) -> Duration {
        Duration::from_millis(self.min_tx_period_ms)
    }
}
