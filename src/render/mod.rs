//! Render execution context: draws the latest published snapshot on a fixed
//! period and reports frame times upstream.

pub mod summary;

pub use summary::SummaryRenderer;

use crate::engine::{PlotSnapshot, SessionHandle, TabFrame};
use crate::error::CommandError;
use crate::visualization::PlotLine;
use log::{debug, warn};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Drawing backend. Points arrive already normalized to [-1, 1].
pub trait LineRenderer: Send {
    fn begin_frame(&mut self, frame: &TabFrame);

    fn draw_line(&mut self, line: &PlotLine);

    fn end_frame(&mut self);
}

pub struct RenderLoop<R: LineRenderer> {
    renderer: R,
    snapshots: watch::Receiver<PlotSnapshot>,
    handle: SessionHandle,
    min_tx_period: Duration,
    started: Instant,
    last_tx: Option<Instant>,
    frames_drawn: u64,
}

impl<R: LineRenderer> RenderLoop<R> {
    pub fn new(renderer: R, handle: SessionHandle, min_tx_period: Duration) -> Self {
        Self {
            renderer,
            snapshots: handle.snapshots(),
            handle,
            min_tx_period,
            started: Instant::now(),
            last_tx: None,
            frames_drawn: 0,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Minimum gap between frame messages; zero sends one per frame.
    pub fn set_min_tx_period(&mut self, period: Duration) {
        self.min_tx_period = period;
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Draws the shown tab, if any, and sends a frame message when the
    /// last one is at least `min_tx_period` old. Returns whether a tab was
    /// drawn.
    pub fn render_frame(&mut self, now: Instant) -> bool {
        // Only the Arc is taken under the watch lock
        let frame = self.snapshots.borrow_and_update().shown_frame();

        let drawn = match frame {
            Some(frame) => {
                self.renderer.begin_frame(&frame);
                for line in &frame.lines {
                    self.renderer.draw_line(line);
                }
                self.renderer.end_frame();
                self.frames_drawn += 1;
                true
            }
            None => false,
        };

        self.report_frame(now);
        drawn
    }

    fn report_frame(&mut self, now: Instant) {
        let due = match self.last_tx {
            Some(last) => now.saturating_duration_since(last) >= self.min_tx_period,
            None => true,
        };
        if !due {
            return;
        }

        let time_ms = now.saturating_duration_since(self.started).as_secs_f64() * 1000.0;
        match self.handle.send_frame(time_ms) {
            Ok(()) => self.last_tx = Some(now),
            Err(CommandError::QueueFull) => debug!("Command queue full, skipping frame message"),
            Err(CommandError::SessionEnded) => {}
        }
    }
}

impl<R: LineRenderer + 'static> RenderLoop<R> {
    /// Runs the loop on its own thread, one frame per `period`.
    pub fn spawn(mut self, period: Duration) -> std::io::Result<RenderThread<R>> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("render".to_string())
            .spawn(move || {
                let ticker = crossbeam_channel::tick(period);
                loop {
                    crossbeam_channel::select! {
                        recv(ticker) -> tick => match tick {
                            Ok(now) => {
                                self.render_frame(now);
                            }
                            Err(_) => break,
                        },
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                debug!("Render loop stopped after {} frame(s)", self.frames_drawn);
                self
            })?;

        Ok(RenderThread {
            shutdown: shutdown_tx,
            handle: Some(handle),
        })
    }
}

/// A running render loop. Dropping it stops the loop without joining.
pub struct RenderThread<R: LineRenderer> {
    shutdown: crossbeam_channel::Sender<()>,
    handle: Option<JoinHandle<RenderLoop<R>>>,
}

impl<R: LineRenderer> RenderThread<R> {
    /// Stops the loop and hands it back. `None` if the thread panicked.
    pub fn stop(mut self) -> Option<RenderLoop<R>> {
        let _ = self.shutdown.try_send(());
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(render_loop) => Some(render_loop),
            Err(_) => {
                warn!("Render thread panicked");
                None
            }
        }
    }
}

impl<R: LineRenderer> Drop for RenderThread<R> {
    fn drop(&mut self) {
        let _ = self.shutdown.try_send(());
    }
}
