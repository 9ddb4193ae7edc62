//! Keeps the loop window scrolled into view

use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the scroller needs to know about the current window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportInput {
    pub start_pct: f64,
    pub end_pct: f64,
    pub duration_secs: f64,
    pub container_width_px: f64,
}

/// Horizontal scroll controller for a zoomed waveform
///
/// When the waveform is wider than its container (zoomed in), jumps the
/// scroll offset so the loop start sits at the left edge whenever the window
/// changes. Never scrolls during a drag.
#[derive(Debug, Clone, Default)]
pub struct ViewportScroller {
    /// Zoom level; `None` fits the whole duration into the container
    pixels_per_second: Option<f64>,

    offset_px: f64,
    last_input: Option<ViewportInput>,
}

impl ViewportScroller {
    pub fn new(pixels_per_second: Option<f64>) -> Self {
        Self {
            pixels_per_second: pixels_per_second.filter(|pps| pps.is_finite() && *pps > 0.0),
            offset_px: 0.0,
            last_input: None,
        }
    }

    pub fn offset_px(&self) -> f64 {
        self.offset_px
    }

    /// Effective zoom for a duration and container width
    pub fn pixels_per_second(&self, duration_secs: f64, container_width_px: f64) -> f64 {
        self.pixels_per_second
            .unwrap_or(container_width_px / duration_secs)
    }

    /// Recompute the scroll offset
    ///
    /// Returns the new offset when it moved.
    pub fn update(&mut self, input: ViewportInput, dragging: bool) -> Option<f64> {
        if dragging {
            return None;
        }
        if !(input.duration_secs > 0.0 && input.container_width_px > 0.0) {
            return None;
        }

        if self.last_input == Some(input) {
            return None;
        }
        self.last_input = Some(input);

        let pps = self.pixels_per_second(input.duration_secs, input.container_width_px);
        let content_width = input.duration_secs * pps;
        let max_offset = (content_width - input.container_width_px).max(0.0);

        let start_secs = input.start_pct * input.duration_secs / 100.0;
        let offset = (start_secs * pps).clamp(0.0, max_offset);

        if offset == self.offset_px {
            return None;
        }

        debug!("Scrolling viewport to {:.1}px", offset);
        self.offset_px = offset;
        Some(offset)
    }
}
