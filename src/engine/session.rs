use crate::codec::{FrameCodec, Outbound, PlotMessage};
use crate::config::ClientConfig;
use crate::engine::dispatcher::{Dispatcher, MessageHandler, TabLog};
use crate::engine::state::ConnectionState;
use crate::engine::tabs::{TabFrame, TabRegistry};
use crate::error::{CommandError, SessionError};
use crate::observability::{ConnectionMetrics, MetricsCollector, SessionMonitor};
use crate::transport::{Connector, Transport};
use anyhow::Result;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// Requests from the UI side, applied in order by the network context.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Same effect as a `plot` message from the server
    Plot(PlotMessage),
    SetCapacity { tab: String, capacity: usize },
    /// One scroll/zoom step
    ScaleCapacity { tab: String, grow: bool },
    RemoveTab(String),
    /// Forwards a message to the server
    Send(Outbound),
    Shutdown,
}

/// Events from the network context for the UI side.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Connected { url: String },
    TabLog(TabLog),
    CapacityChanged { tab: String, capacity: usize },
    /// A command could not be applied
    Rejected { reason: String },
    /// The connection is gone. The UI should reset itself and reconnect.
    Closed { reason: String },
}

/// Latest drawable state of every tab.
///
/// Written only by the network context on its render tick. Readers never see
/// a tab mid-update.
#[derive(Debug, Clone, Default)]
pub struct PlotSnapshot {
    pub shown: Option<String>,
    pub tabs: BTreeMap<String, Arc<TabFrame>>,
    /// Bumped on every publish
    pub generation: u64,
}

impl PlotSnapshot {
    pub fn shown_frame(&self) -> Option<Arc<TabFrame>> {
        self.shown
            .as_ref()
            .and_then(|name| self.tabs.get(name))
            .cloned()
    }
}

/// How a session that did not fail came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    PeerClosed,
    Shutdown,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => write!(f, "closed by peer"),
            Self::Shutdown => write!(f, "shut down by client"),
        }
    }
}

/// UI-side handle. Every method returns immediately.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConnectionState>,
    snapshots: watch::Receiver<PlotSnapshot>,
    notifications: crossbeam_channel::Receiver<Notification>,
}

impl SessionHandle {
    /// Queues a command without waiting for room.
    pub fn submit(&self, command: Command) -> Result<(), CommandError> {
        self.commands.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => CommandError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => CommandError::SessionEnded,
        })
    }

    pub fn plot(&self, message: PlotMessage) -> Result<(), CommandError> {
        self.submit(Command::Plot(message))
    }

    pub fn set_channel_state(
        &self,
        tab: &str,
        channel: &str,
        selected: bool,
    ) -> Result<(), CommandError> {
        self.plot(PlotMessage::channel_state(tab, channel, selected))
    }

    pub fn set_color(&self, tab: &str, channel: &str, color: &str) -> Result<(), CommandError> {
        let mut message = PlotMessage::for_tab(tab);
        message.channel = Some(channel.to_string());
        message.color = Some(color.to_string());
        self.plot(message)
    }

    pub fn clear(&self, tab: &str) -> Result<(), CommandError> {
        let mut message = PlotMessage::for_tab(tab);
        message.clear = Some(true);
        self.plot(message)
    }

    pub fn resize(&self, tab: &str, width: u32, height: u32) -> Result<(), CommandError> {
        let mut message = PlotMessage::for_tab(tab);
        message.width = Some(width);
        message.height = Some(height);
        self.plot(message)
    }

    pub fn show(&self, tab: &str, shown: bool) -> Result<(), CommandError> {
        let mut message = PlotMessage::for_tab(tab);
        message.shown = Some(shown);
        self.plot(message)
    }

    pub fn set_capacity(&self, tab: &str, capacity: usize) -> Result<(), CommandError> {
        self.submit(Command::SetCapacity {
            tab: tab.to_string(),
            capacity,
        })
    }

    pub fn scale_capacity(&self, tab: &str, grow: bool) -> Result<(), CommandError> {
        self.submit(Command::ScaleCapacity {
            tab: tab.to_string(),
            grow,
        })
    }

    pub fn remove_tab(&self, tab: &str) -> Result<(), CommandError> {
        self.submit(Command::RemoveTab(tab.to_string()))
    }

    /// Sends a raw UI event, tagged with its tab, to the server.
    pub fn send_event(&self, tab: &str, event: Value) -> Result<(), CommandError> {
        self.submit(Command::Send(Outbound::TabEvent {
            tab: tab.to_string(),
            event,
        }))
    }

    /// Tells the server a frame was drawn at `time_ms`.
    pub fn send_frame(&self, time_ms: f64) -> Result<(), CommandError> {
        self.submit(Command::Send(Outbound::Frame { time_ms }))
    }

    pub fn shutdown(&self) -> Result<(), CommandError> {
        self.submit(Command::Shutdown)
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Waits until the connection is open, or fails with the close reason.
    pub async fn wait_connected(&mut self) -> Result<(), SessionError> {
        let state = self
            .state
            .wait_for(|state| state.is_connected() || state.is_closed())
            .await
            .map_err(|_| SessionError::Closed("session dropped".to_string()))?;

        match &*state {
            ConnectionState::Closed { reason } => Err(SessionError::Closed(reason.clone())),
            _ => Ok(()),
        }
    }

    pub fn snapshots(&self) -> watch::Receiver<PlotSnapshot> {
        self.snapshots.clone()
    }

    pub fn notifications(&self) -> &crossbeam_channel::Receiver<Notification> {
        &self.notifications
    }
}

/// The network execution context: owns the connection, the dispatcher and
/// every tab.
pub struct Session {
    config: ClientConfig,
    connector: Box<dyn Connector>,
    dispatcher: Dispatcher,
    tabs: TabRegistry,
    collector: MetricsCollector,
    commands: mpsc::Receiver<Command>,
    state_tx: watch::Sender<ConnectionState>,
    snapshot_tx: watch::Sender<PlotSnapshot>,
    notify_tx: crossbeam_channel::Sender<Notification>,
    /// Session-side end of the notification queue, used to evict the oldest
    /// entry when the UI falls behind
    notify_evict: crossbeam_channel::Receiver<Notification>,
}

/// Builds a session and the handle the UI side talks to it through.
pub fn session(
    config: ClientConfig,
    connector: Box<dyn Connector>,
) -> Result<(Session, SessionHandle)> {
    config.validate()?;
    let tabs = TabRegistry::from_config(&config)?;

    let metrics = Arc::new(ConnectionMetrics::new(config.name.clone()));
    let mut collector = MetricsCollector::new();
    collector.register(metrics.clone());

    let codec = FrameCodec::new(config.max_frame_len, config.reassemble_partial_frames);
    let dispatcher = Dispatcher::new(codec, metrics);

    let (command_tx, command_rx) = mpsc::channel(config.command_queue);
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
    let (snapshot_tx, snapshot_rx) = watch::channel(PlotSnapshot::default());
    let (notify_tx, notify_rx) = crossbeam_channel::bounded(config.notification_queue);

    let session = Session {
        config,
        connector,
        dispatcher,
        tabs,
        collector,
        commands: command_rx,
        state_tx,
        snapshot_tx,
        notify_tx,
        notify_evict: notify_rx.clone(),
    };
    let handle = SessionHandle {
        commands: command_tx,
        state: state_rx,
        snapshots: snapshot_rx,
        notifications: notify_rx,
    };
    Ok((session, handle))
}

impl Session {
    pub fn register_handler(&mut self, key: impl Into<String>, handler: Box<dyn MessageHandler>) {
        self.dispatcher.register_handler(key, handler);
    }

    pub fn monitor(&self) -> SessionMonitor {
        SessionMonitor::new(self.collector.clone())
    }

    /// Connects, then handles traffic, commands and render ticks until the
    /// peer closes, the client shuts down or something fails.
    pub async fn run(mut self) -> Result<SessionEnd, SessionError> {
        let url = self.connector.url().to_string();
        self.dispatcher.begin_connect(&url)?;
        self.publish_state();

        let mut transport = match self.connector.connect().await {
            Ok(transport) => transport,
            Err(e) => {
                let reason = format!("connect to {} failed: {:#}", url, e);
                error!("{}", reason);
                self.close(reason.clone());
                return Err(SessionError::Transport(reason));
            }
        };

        self.dispatcher.on_open()?;
        self.publish_state();
        self.notify(Notification::Connected { url });
        self.publish_frames();

        let mut render_tick = tokio::time::interval(self.config.render_period());
        render_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let result = loop {
            tokio::select! {
                unit = transport.recv() => match unit {
                    Some(Ok(unit)) => {
                        if let Err(e) = self.on_unit(&unit, &mut transport).await {
                            break Err(e);
                        }
                    }
                    Some(Err(e)) => break Err(SessionError::Transport(format!("{:#}", e))),
                    None => {
                        break match self.dispatcher.finish() {
                            Ok(()) => Ok(SessionEnd::PeerClosed),
                            Err(e) => Err(SessionError::Framing(e)),
                        };
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => {
                        if let Err(e) = transport.close().await {
                            debug!("Close on shutdown failed: {:#}", e);
                        }
                        break Ok(SessionEnd::Shutdown);
                    }
                    Some(command) => {
                        if let Err(e) = self.on_command(command, &mut transport).await {
                            break Err(e);
                        }
                    }
                },
                _ = render_tick.tick() => self.publish_frames(),
            }
        };

        self.publish_frames();
        let reason = match &result {
            Ok(end) => end.to_string(),
            Err(e) => {
                error!("Session '{}' failed: {}", self.config.name, e);
                e.to_string()
            }
        };
        self.close(reason);
        result
    }

    async fn on_unit(
        &mut self,
        unit: &[u8],
        transport: &mut Box<dyn Transport>,
    ) -> Result<(), SessionError> {
        let routed = self.dispatcher.handle_unit(unit, &mut self.tabs)?;

        for log in routed.tab_logs {
            self.notify(Notification::TabLog(log));
        }
        if !routed.replies.is_empty() {
            transport
                .send(routed.replies)
                .await
                .map_err(|e| SessionError::Transport(format!("{:#}", e)))?;
        }
        Ok(())
    }

    async fn on_command(
        &mut self,
        command: Command,
        transport: &mut Box<dyn Transport>,
    ) -> Result<(), SessionError> {
        match command {
            Command::Plot(message) => self.dispatcher.handle_plot(&message, &mut self.tabs),
            Command::SetCapacity { tab, capacity } => {
                match self.tabs.set_capacity(&tab, capacity) {
                    Ok(()) => self.notify(Notification::CapacityChanged { tab, capacity }),
                    Err(e) => self.reject(format!("tab '{}': {}", tab, e)),
                }
            }
            Command::ScaleCapacity { tab, grow } => match self.tabs.scale_capacity(&tab, grow) {
                Ok(capacity) => {
                    debug!("Tab '{}' capacity now {}", tab, capacity);
                    self.notify(Notification::CapacityChanged { tab, capacity });
                }
                Err(e) => self.reject(format!("tab '{}': {}", tab, e)),
            },
            Command::RemoveTab(tab) => {
                if self.tabs.remove(&tab) {
                    let shown = self.tabs.shown().map(String::from);
                    self.snapshot_tx.send_modify(|snapshot| {
                        snapshot.tabs.remove(&tab);
                        snapshot.shown = shown;
                        snapshot.generation += 1;
                    });
                }
            }
            Command::Send(message) => {
                let mut unit = Vec::new();
                if let Err(e) = self.dispatcher.encode_outbound(&message, &mut unit) {
                    self.reject(format!("cannot encode outbound message: {}", e));
                    return Ok(());
                }
                transport
                    .send(unit)
                    .await
                    .map_err(|e| SessionError::Transport(format!("{:#}", e)))?;
            }
            Command::Shutdown => {}
        }
        Ok(())
    }

    /// Normalizes changed tabs and publishes them for the render context.
    fn publish_frames(&mut self) {
        let frames = self.tabs.take_dirty_frames();
        let shown = self.tabs.shown().map(String::from);

        self.snapshot_tx.send_if_modified(|snapshot| {
            if frames.is_empty() && snapshot.shown == shown {
                return false;
            }
            for frame in frames {
                snapshot.tabs.insert(frame.tab.clone(), Arc::new(frame));
            }
            snapshot.shown = shown;
            snapshot.generation += 1;
            true
        });
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.dispatcher.state().clone());
    }

    /// Queues a notification without blocking. A full queue loses its oldest
    /// entry so the latest (e.g. `Closed`) always gets through.
    fn notify(&self, notification: Notification) {
        let mut pending = notification;
        loop {
            match self.notify_tx.try_send(pending) {
                Ok(()) => return,
                Err(crossbeam_channel::TrySendError::Full(back)) => {
                    if let Ok(dropped) = self.notify_evict.try_recv() {
                        debug!("Notification queue full, dropped {:?}", dropped);
                    }
                    pending = back;
                }
                Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
                    debug!("No one is listening for notifications");
                    return;
                }
            }
        }
    }

    fn reject(&self, reason: String) {
        warn!("{}", reason);
        self.notify(Notification::Rejected { reason });
    }

    fn close(&mut self, reason: String) {
        self.dispatcher.on_close(reason.clone());
        self.publish_state();
        info!("Session '{}' ended: {}", self.config.name, reason);
        self.notify(Notification::Closed { reason });
    }
}
