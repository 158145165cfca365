use super::LineRenderer;
use crate::engine::TabFrame;
use crate::visualization::PlotLine;
use log::info;

/// Headless renderer that logs what it would draw every `log_every` frames.
pub struct SummaryRenderer {
    log_every: u64,
    frames: u64,
    tab: String,
    lines: Vec<String>,
}

impl SummaryRenderer {
    pub fn new(log_every: u64) -> Self {
        Self {
            log_every: log_every.max(1),
            frames: 0,
            tab: String::new(),
            lines: Vec::new(),
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Summary of the most recent frame
    pub fn last_summary(&self) -> String {
        if self.lines.is_empty() {
            format!("[{}] no lines", self.tab)
        } else {
            format!("[{}] {}", self.tab, self.lines.join(", "))
        }
    }
}

impl LineRenderer for SummaryRenderer {
    fn begin_frame(&mut self, frame: &TabFrame) {
        self.tab.clone_from(&frame.tab);
        self.lines.clear();
    }

    fn draw_line(&mut self, line: &PlotLine) {
        let last = line
            .points
            .last()
            .map(|[x, y]| format!("({:.2}, {:.2})", x, y))
            .unwrap_or_else(|| "-".to_string());
        self.lines.push(format!(
            "{} {} {} pts last {}",
            line.channel,
            line.color.to_hex(),
            line.points.len(),
            last
        ));
    }

    fn end_frame(&mut self) {
        self.frames += 1;
        if self.frames % self.log_every == 0 {
            info!("frame {}: {}", self.frames, self.last_summary());
        }
    }
}
