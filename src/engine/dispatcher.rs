use crate::codec::{encode_into, Decoded, FrameCodec, Inbound, Outbound, PlotMessage, TabUpdate};
use crate::core::samples_from_raw;
use crate::engine::state::ConnectionState;
use crate::engine::tabs::TabRegistry;
use crate::error::{CodecError, SessionError};
use crate::observability::ConnectionMetrics;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Handler for an additional top-level message key.
///
/// Anything written to `response` is sent back to the peer in the same
/// reply frame as the echoed keys.
pub trait MessageHandler: Send {
    fn handle(&mut self, value: Value, response: &mut Map<String, Value>);
}

impl<F> MessageHandler for F
where
    F: FnMut(Value, &mut Map<String, Value>) + Send,
{
    fn handle(&mut self, value: Value, response: &mut Map<String, Value>) {
        self(value, response)
    }
}

/// Log lines a tab received from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabLog {
    pub tab: String,
    pub lines: Vec<String>,
}

/// Result of handling one delivery unit
#[derive(Debug, Default)]
pub struct Routed {
    /// Encoded reply frames, sent as one delivery unit
    pub replies: Vec<u8>,
    pub tab_logs: Vec<TabLog>,
    /// Inbound frames decoded from the unit
    pub frames: usize,
}

impl Routed {
    pub fn has_replies(&self) -> bool {
        !self.replies.is_empty()
    }
}

/// Decodes inbound traffic, answers echo keys and routes everything else to
/// the tabs or a registered handler. Also owns the connection state.
pub struct Dispatcher {
    state: ConnectionState,
    codec: FrameCodec,
    handlers: HashMap<String, Box<dyn MessageHandler>>,
    metrics: Arc<ConnectionMetrics>,
}

impl Dispatcher {
    pub fn new(codec: FrameCodec, metrics: Arc<ConnectionMetrics>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            codec,
            handlers: HashMap::new(),
            metrics,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn metrics(&self) -> &Arc<ConnectionMetrics> {
        &self.metrics
    }

    /// Transition to a new state with validation
    pub fn transition_to(&mut self, next: ConnectionState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(&next) {
            return Err(SessionError::InvalidTransition {
                from: self.state.name(),
                to: next.name(),
            });
        }
        debug!("Connection state {} -> {}", self.state.name(), next.name());
        self.state = next;
        Ok(())
    }

    pub fn begin_connect(&mut self, url: &str) -> Result<(), SessionError> {
        self.transition_to(ConnectionState::Connecting {
            url: url.to_string(),
        })
    }

    /// Transport reported the connection open
    pub fn on_open(&mut self) -> Result<(), SessionError> {
        let url = match &self.state {
            ConnectionState::Connecting { url } => url.clone(),
            other => {
                return Err(SessionError::InvalidTransition {
                    from: other.name(),
                    to: "Connected",
                })
            }
        };
        info!("Connection '{}' ({}) open", self.metrics.name(), url);
        self.transition_to(ConnectionState::Connected { url })
    }

    /// Transport closed or failed. Repeated calls keep the first reason.
    pub fn on_close(&mut self, reason: impl Into<String>) {
        if self.state.is_closed() {
            return;
        }
        let reason = reason.into();
        info!("Connection '{}' closed: {}", self.metrics.name(), reason);
        // Disconnected -> Closed is not a lifecycle edge, but a session that
        // never connected still ends closed.
        self.state = ConnectionState::Closed { reason };
    }

    /// Routes `key` to `handler` instead of reporting it as unhandled.
    /// Built-in keys (`ui`, `plot`, echo keys) cannot be overridden.
    pub fn register_handler(&mut self, key: impl Into<String>, handler: Box<dyn MessageHandler>) {
        self.handlers.insert(key.into(), handler);
    }

    /// Decodes and routes one delivery unit.
    ///
    /// Only framing errors are returned; they are fatal for the session.
    /// Bad payloads are logged, counted and skipped.
    pub fn handle_unit(
        &mut self,
        unit: &[u8],
        tabs: &mut TabRegistry,
    ) -> Result<Routed, SessionError> {
        let mut routed = Routed::default();

        if !self.state.is_connected() {
            warn!(
                "Dropping {} byte(s) received while {}",
                unit.len(),
                self.state.name()
            );
            return Ok(routed);
        }

        self.metrics.record_unit_received(unit.len());
        let frames = self.codec.decode(unit).map_err(SessionError::Framing)?;

        for decoded in frames {
            self.metrics.record_frame_received();
            routed.frames += 1;

            match decoded {
                Decoded::Message(message) => {
                    let response = self.route(message, tabs, &mut routed);
                    if !response.is_empty() {
                        self.push_reply(Value::Object(response), &mut routed);
                    }
                }
                Decoded::Malformed(e) => {
                    self.metrics.record_payload_error();
                    warn!("Dropping frame on '{}': {}", self.metrics.name(), e);
                }
            }
        }

        Ok(routed)
    }

    /// Routes one decoded mapping, returning the response to send back.
    pub fn route(
        &mut self,
        message: Map<String, Value>,
        tabs: &mut TabRegistry,
        routed: &mut Routed,
    ) -> Map<String, Value> {
        let mut response = Map::new();

        for (key, value) in message {
            let inbound = match Inbound::classify(key.clone(), value) {
                Ok(inbound) => inbound,
                Err(e) => {
                    self.metrics.record_payload_error();
                    warn!("Malformed '{}' message: {}", key, e);
                    continue;
                }
            };

            match inbound {
                Inbound::Echo { key, value } => {
                    self.metrics.record_echo();
                    response.insert(key, value);
                }
                Inbound::Ui(updates) => self.handle_ui(updates, tabs, routed),
                Inbound::Plot(plot) => self.handle_plot(&plot, tabs),
                Inbound::Other { key, value } => match self.handlers.get_mut(&key) {
                    Some(handler) => handler.handle(value, &mut response),
                    None => {
                        self.metrics.record_unhandled_key();
                        warn!("(not handled) {}: {}", key, value);
                    }
                },
            }
        }

        response
    }

    /// Fans `ui` points out to the tabs' channel sets.
    pub fn handle_ui(
        &mut self,
        updates: BTreeMap<String, TabUpdate>,
        tabs: &mut TabRegistry,
        routed: &mut Routed,
    ) {
        for (tab, update) in updates {
            for (channel, raw) in &update.points {
                let samples = samples_from_raw(raw);
                if samples.len() != raw.len() {
                    debug!(
                        "Tab '{}' channel '{}': skipped {} non-numeric point(s)",
                        tab,
                        channel,
                        raw.len() - samples.len()
                    );
                }
                if tabs.ingest(&tab, channel, &samples) {
                    self.metrics.record_samples(samples.len());
                }
            }

            let lines = update.log_lines();
            if !lines.is_empty() {
                for line in &lines {
                    info!("({}) {}", tab, line);
                }
                routed.tab_logs.push(TabLog { tab, lines });
            }
        }
    }

    pub fn handle_plot(&mut self, message: &PlotMessage, tabs: &mut TabRegistry) {
        debug!("Plot message for tab '{}'", message.name);
        tabs.apply_plot(message);
    }

    /// Encodes an outbound message as one frame appended to `out`.
    pub fn encode_outbound(&self, message: &Outbound, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let before = out.len();
        encode_into(&message.to_value(), out)?;
        self.metrics.record_frame_sent(out.len() - before);
        Ok(())
    }

    /// Stream ended; reports an incomplete trailing frame.
    pub fn finish(&mut self) -> Result<(), CodecError> {
        self.codec.finish()
    }

    fn push_reply(&self, response: Value, routed: &mut Routed) {
        let before = routed.replies.len();
        match encode_into(&response, &mut routed.replies) {
            Ok(()) => self.metrics.record_frame_sent(routed.replies.len() - before),
            Err(e) => warn!("Failed to encode reply: {}", e),
        }
    }
}
