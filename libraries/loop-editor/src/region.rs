//! Normalised loop region
//!
//! The percentage form is what the host stores and passes back in. It is
//! always recomputed from pixel state, never cached alongside it.

use crate::drag::HandlePositions;
use crate::geometry::ContainerGeometry;
use serde::{Deserialize, Serialize};

/// Loop window in percent of the container (and therefore of duration)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopRegion {
    pub start_pct: f64,
    pub end_pct: f64,
}

impl LoopRegion {
    /// Whole file
    pub const FULL: Self = Self {
        start_pct: 0.0,
        end_pct: 100.0,
    };

    /// Build a region from host input, clamped to [0, 100] and ordered
    pub fn clamped(start_pct: f64, end_pct: f64) -> Self {
        let start = sanitize_pct(start_pct);
        let end = sanitize_pct(end_pct);
        if start <= end {
            Self {
                start_pct: start,
                end_pct: end,
            }
        } else {
            Self {
                start_pct: end,
                end_pct: start,
            }
        }
    }

    /// Width of the window in percent
    pub fn span_pct(&self) -> f64 {
        self.end_pct - self.start_pct
    }

    /// Convert to seconds against a media duration
    pub fn to_seconds(&self, duration_secs: f64) -> LoopBounds {
        let duration = if duration_secs.is_finite() {
            duration_secs.max(0.0)
        } else {
            0.0
        };
        LoopBounds {
            start_secs: self.start_pct * duration / 100.0,
            end_secs: self.end_pct * duration / 100.0,
        }
    }
}

impl Default for LoopRegion {
    fn default() -> Self {
        Self::FULL
    }
}

/// Loop window in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoopBounds {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl LoopBounds {
    /// True when the loop has a non-empty extent
    pub fn is_armed(&self) -> bool {
        self.end_secs > self.start_secs
    }
}

fn sanitize_pct(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Pixel handles to percentages
///
/// Returns `None` when the geometry is not ready (zero width).
pub fn to_percent(handles: &HandlePositions, geometry: &ContainerGeometry) -> Option<LoopRegion> {
    if !geometry.is_ready() {
        return None;
    }
    Some(LoopRegion {
        start_pct: handles.start_px * 100.0 / geometry.width,
        end_pct: handles.end_px * 100.0 / geometry.width,
    })
}

/// Percentages to pixel handles
///
/// Exact inverse of [`to_percent`] for a fixed geometry, up to float
/// rounding. Returns `None` when the geometry is not ready.
pub fn to_pixels(region: &LoopRegion, geometry: &ContainerGeometry) -> Option<HandlePositions> {
    if !geometry.is_ready() {
        return None;
    }
    Some(HandlePositions {
        start_px: region.start_pct * geometry.width / 100.0,
        end_px: region.end_pct * geometry.width / 100.0,
    })
}

/// Convert a single pixel offset to percent
pub fn px_to_pct(position_px: f64, geometry: &ContainerGeometry) -> Option<f64> {
    geometry
        .is_ready()
        .then(|| position_px * 100.0 / geometry.width)
}
