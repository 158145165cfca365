use crate::codec::PlotMessage;
use crate::config::ClientConfig;
use crate::core::{Rgba, Sample};
use crate::error::CapacityError;
use crate::visualization::{ChannelSet, PlotLine, SeriesNormalizer, SharedWindow};
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;

/// Drawable state of one tab, as handed to the render context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabFrame {
    pub tab: String,
    pub width: u32,
    pub height: u32,
    pub capacity: usize,
    pub window: Option<SharedWindow>,
    pub lines: Vec<PlotLine>,
}

/// One plotting surface
#[derive(Debug, Clone)]
pub struct PlotTab {
    channels: ChannelSet,
    normalizer: SeriesNormalizer,
    width: u32,
    height: u32,
    dirty: bool,
}

impl PlotTab {
    fn new(channels: ChannelSet, draw_slots: usize) -> Self {
        Self {
            channels,
            normalizer: SeriesNormalizer::new(draw_slots),
            width: 0,
            height: 0,
            dirty: true,
        }
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    pub fn draw_slots(&self) -> usize {
        self.normalizer.draw_slots()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn frame(&self, name: &str) -> TabFrame {
        TabFrame {
            tab: name.to_string(),
            width: self.width,
            height: self.height,
            capacity: self.channels.capacity(),
            window: self.channels.shared_window(),
            lines: self.channels.draw(&self.normalizer),
        }
    }
}

/// Every tab of a session plus which one is on screen.
///
/// Owned by the network context; nothing here is shared across threads.
#[derive(Debug)]
pub struct TabRegistry {
    tabs: BTreeMap<String, PlotTab>,
    shown: Option<String>,
    /// Empty channel set at the default capacity, cloned for new tabs
    template: ChannelSet,
    default_draw_slots: usize,
    max_draw_slots: usize,
    min_capacity: usize,
    capacity_scale: f64,
}

impl TabRegistry {
    pub fn new(config: &ClientConfig) -> Result<Self, CapacityError> {
        Ok(Self {
            tabs: BTreeMap::new(),
            shown: None,
            template: ChannelSet::new(config.default_capacity)?,
            default_draw_slots: config.default_draw_slots,
            max_draw_slots: config.max_draw_slots,
            min_capacity: config.min_capacity,
            capacity_scale: config.capacity_scale,
        })
    }

    /// Registry with the config's initial tab selections applied
    pub fn from_config(config: &ClientConfig) -> Result<Self, CapacityError> {
        let mut registry = Self::new(config)?;

        for tab in &config.tabs {
            let plot = registry.tab_mut(&tab.name);
            if let Some(capacity) = tab.capacity {
                plot.channels.update_capacity(capacity)?;
            }
            for channel in &tab.channels {
                plot.channels.set_selected(channel, true);
            }
            if tab.shown {
                registry.shown = Some(tab.name.clone());
            }
        }

        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&PlotTab> {
        self.tabs.get(name)
    }

    /// Tab by name, created with the default capacity on first use
    pub fn tab_mut(&mut self, name: &str) -> &mut PlotTab {
        let template = &self.template;
        let draw_slots = self.default_draw_slots;

        self.tabs.entry(name.to_string()).or_insert_with(|| {
            debug!("Creating tab '{}' (capacity {})", name, template.capacity());
            PlotTab::new(template.clone(), draw_slots)
        })
    }

    /// Tears a tab down with all of its buffers.
    pub fn remove(&mut self, name: &str) -> bool {
        if self.shown.as_deref() == Some(name) {
            self.shown = None;
        }
        self.tabs.remove(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tabs.keys().map(String::as_str)
    }

    pub fn shown(&self) -> Option<&str> {
        self.shown.as_deref()
    }

    /// Applies a plot control message to its tab.
    ///
    /// A bad color is logged and skipped; the rest of the message still
    /// applies.
    pub fn apply_plot(&mut self, message: &PlotMessage) {
        let tab_name = message.name.as_str();

        if let Some(shown) = message.shown {
            if shown {
                self.shown = Some(tab_name.to_string());
            } else if self.shown.as_deref() == Some(tab_name) {
                self.shown = None;
            }
        }

        let (default_draw_slots, max_draw_slots) = (self.default_draw_slots, self.max_draw_slots);
        let tab = self.tab_mut(tab_name);

        if let Some(width) = message.width {
            tab.width = width;
            let slots = if width > 0 {
                (width as usize).min(max_draw_slots)
            } else {
                default_draw_slots
            };
            if slots < width as usize {
                debug!("Tab '{}' width {} clamped to {} draw slots", tab_name, width, slots);
            }
            tab.normalizer = SeriesNormalizer::new(slots);
        }
        if let Some(height) = message.height {
            tab.height = height;
        }

        if message.clear == Some(true) {
            tab.channels.clear_all();
        }

        if let Some(channel) = &message.channel {
            if let Some(color) = &message.color {
                match Rgba::from_hex(color) {
                    Ok(color) => tab.channels.set_color(channel, color),
                    Err(e) => warn!("Tab '{}' channel '{}': {}", tab_name, channel, e),
                }
            }
            if let Some(state) = message.state {
                tab.channels.set_selected(channel, state);
            }
        } else if message.color.is_some() || message.state.is_some() {
            warn!("Tab '{}': plot message has color/state but no channel", tab_name);
        }

        tab.dirty = true;
    }

    /// Feeds samples to a plotted channel of an existing tab.
    pub fn ingest(&mut self, tab: &str, channel: &str, samples: &[Sample]) -> bool {
        match self.tabs.get_mut(tab) {
            Some(plot) => {
                let ingested = plot.channels.ingest_points(channel, samples);
                plot.dirty |= ingested;
                ingested
            }
            None => false,
        }
    }

    pub fn set_capacity(&mut self, tab: &str, capacity: usize) -> Result<(), CapacityError> {
        let plot = self.tab_mut(tab);
        plot.channels.update_capacity(capacity)?;
        plot.dirty = true;
        Ok(())
    }

    /// One capacity step up or down (scroll / zoom)
    pub fn scale_capacity(&mut self, tab: &str, grow: bool) -> Result<usize, CapacityError> {
        let (scale, minimum) = (self.capacity_scale, self.min_capacity);
        let plot = self.tab_mut(tab);
        let capacity = plot.channels.scale_capacity(grow, scale, minimum)?;
        plot.dirty = true;
        Ok(capacity)
    }

    /// Normalizes every tab changed since the last call.
    pub fn take_dirty_frames(&mut self) -> Vec<TabFrame> {
        self.tabs
            .iter_mut()
            .filter(|(_, plot)| plot.dirty)
            .map(|(name, plot)| {
                plot.dirty = false;
                plot.frame(name)
            })
            .collect()
    }
}
