use anyhow::{anyhow, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use telemtab::config::{ClientConfig, TabConfig};
use telemtab::engine::{session, Notification};
use telemtab::render::{RenderLoop, SummaryRenderer};
use telemtab::transport::WebSocketConnector;

#[derive(Parser)]
#[command(name = "telemtab", version, about = "Real-time telemetry plot client")]
struct Cli {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server URL, overrides the config
    #[arg(long)]
    url: Option<String>,

    /// Channel to plot from the start, as TAB:CHANNEL. Repeatable.
    #[arg(long = "plot", value_name = "TAB:CHANNEL")]
    plots: Vec<String>,

    /// Ring buffer capacity for new tabs
    #[arg(long)]
    capacity: Option<usize>,

    /// Log a frame summary every N drawn frames
    #[arg(long, default_value_t = 120)]
    log_every: u64,

    /// Fail on frames split across delivery units instead of reassembling
    #[arg(long)]
    strict_framing: bool,
}

fn apply_cli(config: &mut ClientConfig, cli: &Cli) -> Result<()> {
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    if let Some(capacity) = cli.capacity {
        config.default_capacity = capacity;
    }
    if cli.strict_framing {
        config.reassemble_partial_frames = false;
    }

    for plot in &cli.plots {
        let (tab, channel) = plot
            .split_once(':')
            .ok_or_else(|| anyhow!("--plot expects TAB:CHANNEL, got '{}'", plot))?;

        match config.tabs.iter_mut().find(|t| t.name == tab) {
            Some(existing) => existing.channels.push(channel.to_string()),
            None => {
                let shown = config.tabs.is_empty();
                config.tabs.push(TabConfig {
                    name: tab.to_string(),
                    channels: vec![channel.to_string()],
                    capacity: None,
                    shown,
                });
            }
        }
    }

    config.validate()
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    apply_cli(&mut config, &cli)?;

    info!("Connecting to {}", config.url);
    let connector = WebSocketConnector::new(config.url.clone());
    let (session, handle) = session(config.clone(), Box::new(connector))?;
    let monitor = session.monitor();

    let render = RenderLoop::new(
        SummaryRenderer::new(cli.log_every),
        handle.clone(),
        config.min_tx_period(),
    )
    .spawn(config.render_period())?;

    // Ends when the session drops its notification sender
    let notifications = handle.notifications().clone();
    let printer = std::thread::spawn(move || {
        for notification in notifications.iter() {
            match notification {
                Notification::Connected { url } => info!("Connected to {}", url),
                Notification::CapacityChanged { tab, capacity } => {
                    info!("Tab '{}' capacity {}", tab, capacity)
                }
                Notification::Rejected { reason } => warn!("Rejected: {}", reason),
                Notification::Closed { reason } => info!("Closed: {}", reason),
                Notification::TabLog(_) => {}
            }
        }
    });

    let mut running = tokio::spawn(session.run());
    let outcome = tokio::select! {
        outcome = &mut running => outcome,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            if let Err(e) = handle.shutdown() {
                warn!("Shutdown request failed: {}", e);
            }
            running.await
        }
    };

    if render.stop().is_none() {
        warn!("Render loop did not stop cleanly");
    }
    if printer.join().is_err() {
        warn!("Notification printer panicked");
    }
    info!("\n{}", monitor.generate_report());

    let end = outcome??;
    info!("Session {}", end);
    Ok(())
}
