use super::{RingBuffer, SeriesNormalizer, SharedWindow};
use crate::core::{Rgba, Sample};
use crate::error::CapacityError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// A drawable line for one channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotLine {
    pub channel: String,
    pub color: Rgba,
    /// Normalized `[x, y]` pairs, one per draw slot
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone)]
struct PlottedChannel {
    color: Rgba,
    buffer: RingBuffer,
}

/// Plot state for one tab: which channels are plotted, their colors and
/// their sample history.
///
/// Capacity belongs to the tab and applies to every buffer in it.
#[derive(Debug, Clone)]
pub struct ChannelSet {
    capacity: usize,
    /// Selected channels only; deselecting drops the entry and its history.
    plotted: BTreeMap<String, PlottedChannel>,
    /// Colors set explicitly, kept across deselection.
    colors: HashMap<String, Rgba>,
    window: Option<SharedWindow>,
}

impl ChannelSet {
    pub fn new(capacity: usize) -> Result<Self, CapacityError> {
        if capacity == 0 {
            return Err(CapacityError::Zero);
        }

        Ok(Self {
            capacity,
            plotted: BTreeMap::new(),
            colors: HashMap::new(),
            window: None,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_selected(&self, channel: &str) -> bool {
        self.plotted.contains_key(channel)
    }

    /// Names of plotted channels, sorted
    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.plotted.keys().map(String::as_str)
    }

    pub fn color(&self, channel: &str) -> Option<Rgba> {
        self.plotted
            .get(channel)
            .map(|c| c.color)
            .or_else(|| self.colors.get(channel).copied())
    }

    pub fn buffer(&self, channel: &str) -> Option<&RingBuffer> {
        self.plotted.get(channel).map(|c| &c.buffer)
    }

    /// Union of every plotted channel's timestamp range
    pub fn shared_window(&self) -> Option<SharedWindow> {
        self.window
    }

    /// Selecting creates an empty buffer at the tab's capacity; deselecting
    /// drops it. Repeating the current state changes nothing.
    pub fn set_selected(&mut self, channel: &str, selected: bool) {
        if selected {
            if self.plotted.contains_key(channel) {
                return;
            }
            let color = self
                .colors
                .get(channel)
                .copied()
                .unwrap_or_else(Rgba::pseudo_random);
            let buffer = match RingBuffer::new(self.capacity) {
                Ok(buffer) => buffer,
                // capacity is validated on every path that sets it
                Err(_) => return,
            };
            self.plotted
                .insert(channel.to_string(), PlottedChannel { color, buffer });
        } else if let Some(mut removed) = self.plotted.remove(channel) {
            removed.buffer.reset();
            self.recompute_window();
        }
    }

    /// Stores a color for the channel; a plotted channel switches color and
    /// keeps its history.
    pub fn set_color(&mut self, channel: &str, color: Rgba) {
        self.colors.insert(channel.to_string(), color);
        if let Some(plotted) = self.plotted.get_mut(channel) {
            plotted.color = color;
        }
    }

    /// Feeds samples to a plotted channel. Returns `false` (and does nothing)
    /// when the channel is not selected.
    pub fn ingest_points(&mut self, channel: &str, samples: &[Sample]) -> bool {
        let Some(plotted) = self.plotted.get_mut(channel) else {
            return false;
        };
        plotted.buffer.ingest(samples.iter().copied());
        self.recompute_window();
        true
    }

    pub fn update_capacity(&mut self, capacity: usize) -> Result<(), CapacityError> {
        if capacity == 0 {
            return Err(CapacityError::Zero);
        }

        for plotted in self.plotted.values_mut() {
            plotted.buffer.update_capacity(capacity)?;
        }
        self.capacity = capacity;
        self.recompute_window();
        Ok(())
    }

    /// Grows or shrinks capacity by `scale`, never below `minimum`.
    pub fn scale_capacity(
        &mut self,
        grow: bool,
        scale: f64,
        minimum: usize,
    ) -> Result<usize, CapacityError> {
        let next = scaled_capacity(self.capacity, grow, scale, minimum);
        self.update_capacity(next)?;
        Ok(next)
    }

    /// Empties every buffer; selection and colors stay.
    pub fn clear_all(&mut self) {
        for plotted in self.plotted.values_mut() {
            plotted.buffer.reset();
        }
        self.window = None;
    }

    /// Normalizes every plotted channel against the shared window. Channels
    /// with fewer than two samples are skipped.
    pub fn draw(&self, normalizer: &SeriesNormalizer) -> Vec<PlotLine> {
        let Some(window) = self.window else {
            return Vec::new();
        };

        self.plotted
            .iter()
            .filter_map(|(name, plotted)| {
                normalizer
                    .normalize(&plotted.buffer, window)
                    .map(|points| PlotLine {
                        channel: name.clone(),
                        color: plotted.color,
                        points,
                    })
            })
            .collect()
    }

    fn recompute_window(&mut self) {
        self.window = self
            .plotted
            .values()
            .filter_map(|p| p.buffer.time_range())
            .map(|(oldest, newest)| SharedWindow::new(oldest, newest))
            .reduce(SharedWindow::union);
    }
}

/// `round(max(minimum, capacity * scale^±1))`
pub fn scaled_capacity(capacity: usize, grow: bool, scale: f64, minimum: usize) -> usize {
    let scaled = if grow {
        capacity as f64 * scale
    } else {
        capacity as f64 / scale
    };
    let next = scaled.max(minimum as f64).round() as usize;
    next.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_capacity() {
        assert_eq!(scaled_capacity(512, true, 1.05, 16), 538);
        assert_eq!(scaled_capacity(512, false, 1.05, 16), 488);
        assert_eq!(scaled_capacity(16, false, 1.05, 16), 16);
        assert_eq!(scaled_capacity(1, false, 2.0, 0), 1);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(ChannelSet::new(0).unwrap_err(), CapacityError::Zero);

        let mut set = ChannelSet::new(8).unwrap();
        assert_eq!(set.update_capacity(0), Err(CapacityError::Zero));
        assert_eq!(set.capacity(), 8);
    }
}
