use super::RingBuffer;
use serde::{Deserialize, Serialize};

/// Timestamp range shared by every plotted channel of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SharedWindow {
    pub min: f64,
    pub max: f64,
}

impl SharedWindow {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Smallest window covering both
    pub fn union(self, other: SharedWindow) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Maps `[min, max]` onto `[-1, 1]`, holding every input at `degenerate`
/// when the span is empty or not finite.
#[derive(Debug, Clone, Copy)]
struct AxisMap {
    min: f64,
    slope: Option<f64>,
    degenerate: f64,
}

impl AxisMap {
    fn new(min: f64, max: f64, degenerate: f64) -> Self {
        let span = max - min;
        let slope = if span > 0.0 && span.is_finite() {
            Some(2.0 / span)
        } else {
            None
        };
        Self {
            min,
            slope,
            degenerate,
        }
    }

    fn map(&self, v: f64) -> f64 {
        match self.slope {
            Some(slope) => (v - self.min) * slope - 1.0,
            None => self.degenerate,
        }
    }
}

/// Produces fixed-length drawable lines from ring buffers.
///
/// x comes from the tab's shared window, y from the series' own value range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesNormalizer {
    draw_slots: usize,
}

impl SeriesNormalizer {
    /// x for every sample when the shared window has zero width
    pub const FLAT_X: f64 = -1.0;
    /// y for every sample of a constant-valued series
    pub const FLAT_Y: f64 = 0.0;

    pub fn new(draw_slots: usize) -> Self {
        Self { draw_slots }
    }

    pub fn draw_slots(&self) -> usize {
        self.draw_slots
    }

    /// Returns exactly `draw_slots` points, or `None` when the buffer holds
    /// fewer than two samples (nothing to draw a line through).
    pub fn normalize(&self, buffer: &RingBuffer, window: SharedWindow) -> Option<Vec<[f64; 2]>> {
        let mut out = Vec::with_capacity(self.draw_slots);
        if self.normalize_into(buffer, window, &mut out) {
            Some(out)
        } else {
            None
        }
    }

    /// Like [`SeriesNormalizer::normalize`] but reuses `out`. Returns whether
    /// anything was written.
    pub fn normalize_into(
        &self,
        buffer: &RingBuffer,
        window: SharedWindow,
        out: &mut Vec<[f64; 2]>,
    ) -> bool {
        out.clear();
        if buffer.len() < 2 || self.draw_slots == 0 {
            return false;
        }

        let (min_val, max_val) = buffer
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                (lo.min(s.value), hi.max(s.value))
            });

        let x_axis = AxisMap::new(window.min, window.max, Self::FLAT_X);
        let y_axis = AxisMap::new(min_val, max_val, Self::FLAT_Y);

        // Too many samples for the line: the oldest ones fall off.
        let skip = buffer.len().saturating_sub(self.draw_slots);
        out.extend(
            buffer
                .iter()
                .skip(skip)
                .map(|s| [x_axis.map(s.timestamp), y_axis.map(s.value)]),
        );

        // Repeat the last point so unfilled slots don't draw back to the origin.
        if let Some(&last) = out.last() {
            out.resize(self.draw_slots, last);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Sample;

    #[test]
    fn test_window_union() {
        let a = SharedWindow::new(10.0, 20.0);
        let b = SharedWindow::new(5.0, 15.0);
        assert_eq!(a.union(b), SharedWindow::new(5.0, 20.0));
        assert_eq!(a.span(), 10.0);
    }

    #[test]
    fn test_zero_slots_draws_nothing() {
        let mut buffer = RingBuffer::new(4).unwrap();
        buffer.ingest(vec![Sample::new(0.0, 0.0), Sample::new(1.0, 1.0)]);

        let normalizer = SeriesNormalizer::new(0);
        assert!(normalizer.normalize(&buffer, SharedWindow::new(0.0, 1.0)).is_none());
    }
}
