//! Typed views of the JSON mappings carried in frames.

use crate::core::RawPoint;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Top-level keys echoed straight back to the peer as acknowledgment
pub const FORWARD_KEYS: [&str; 2] = ["__id__", "loopback"];

pub const UI_KEY: &str = "ui";
pub const PLOT_KEY: &str = "plot";

/// Per-tab payload inside an inbound `ui` message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabUpdate {
    /// Channel name -> `[[value, timestamp], ...]`
    #[serde(default)]
    pub points: BTreeMap<String, Vec<RawPoint>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_message: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log_messages: Vec<String>,

    /// Anything else the server attached for this tab
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TabUpdate {
    /// Log lines from both the single and list forms
    pub fn log_lines(&self) -> Vec<String> {
        self.log_message
            .iter()
            .chain(self.log_messages.iter())
            .cloned()
            .collect()
    }
}

/// Plot-surface control message.
///
/// Every field except `name` is optional; a message may combine several
/// (e.g. a channel toggle and a color).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotMessage {
    /// Tab the message applies to
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Select (`true`) or deselect `channel`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<bool>,

    /// `#RRGGBB` for `channel`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Empty every buffer of the tab
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shown: Option<bool>,
}

impl PlotMessage {
    pub fn for_tab(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn channel_state(tab: impl Into<String>, channel: impl Into<String>, state: bool) -> Self {
        Self {
            channel: Some(channel.into()),
            state: Some(state),
            ..Self::for_tab(tab)
        }
    }
}

/// One top-level entry of an inbound mapping
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Identity / loopback key, answered verbatim
    Echo { key: String, value: Value },
    /// Tab name -> update
    Ui(BTreeMap<String, TabUpdate>),
    Plot(PlotMessage),
    /// Key with no built-in meaning
    Other { key: String, value: Value },
}

impl Inbound {
    /// Interprets one `(key, value)` entry. A built-in key whose value has
    /// the wrong shape is an error; the caller decides whether to drop it.
    pub fn classify(key: String, value: Value) -> Result<Self, serde_json::Error> {
        if FORWARD_KEYS.contains(&key.as_str()) {
            return Ok(Self::Echo { key, value });
        }

        match key.as_str() {
            UI_KEY => Ok(Self::Ui(serde_json::from_value(value)?)),
            PLOT_KEY => Ok(Self::Plot(serde_json::from_value(value)?)),
            _ => Ok(Self::Other { key, value }),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Echo { key, .. } | Self::Other { key, .. } => key,
            Self::Ui(_) => UI_KEY,
            Self::Plot(_) => PLOT_KEY,
        }
    }
}

/// Messages this client sends upstream
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Per-frame liveness / time sync
    Frame { time_ms: f64 },
    /// UI event tagged with the tab it came from
    TabEvent { tab: String, event: Value },
    Raw(Map<String, Value>),
}

impl Outbound {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Frame { time_ms } => json!({ UI_KEY: { "time": time_ms } }),
            Self::TabEvent { tab, event } => json!({ UI_KEY: { "name": tab, "event": event } }),
            Self::Raw(map) => Value::Object(map.clone()),
        }
    }
}
