//! Sizing hints and marker placement for the host renderer

use crate::drag::{Handle, HandlePositions};
use crate::error::{EditorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Container sizing hint, as passed by the host (`"100%"`, `"300px"`, `300`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SizeSpec {
    /// Absolute pixels
    Pixels(f64),

    /// Fraction of the parent box, 0-100
    Percent(f64),
}

impl SizeSpec {
    /// Fill the parent
    pub const FULL: Self = SizeSpec::Percent(100.0);

    /// Resolve against the parent's size in pixels
    pub fn resolve(&self, parent_px: f64) -> f64 {
        match *self {
            SizeSpec::Pixels(px) => px,
            SizeSpec::Percent(pct) => parent_px * pct / 100.0,
        }
    }
}

impl Default for SizeSpec {
    fn default() -> Self {
        Self::FULL
    }
}

impl From<f64> for SizeSpec {
    fn from(px: f64) -> Self {
        SizeSpec::Pixels(px)
    }
}

impl FromStr for SizeSpec {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || EditorError::InvalidSizeSpec(s.to_string());

        let (number, make): (&str, fn(f64) -> SizeSpec) =
            if let Some(pct) = trimmed.strip_suffix('%') {
                (pct, SizeSpec::Percent)
            } else if let Some(px) = trimmed.strip_suffix("px") {
                (px, SizeSpec::Pixels)
            } else {
                (trimmed, SizeSpec::Pixels)
            };

        let value: f64 = number.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }
        Ok(make(value))
    }
}

impl fmt::Display for SizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeSpec::Pixels(px) => write!(f, "{}px", px),
            SizeSpec::Percent(pct) => write!(f, "{}%", pct),
        }
    }
}

/// Where to draw one boundary marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerLayout {
    pub handle: Handle,

    /// Left edge within the container
    pub left_px: f64,

    pub width_px: f64,
    pub height_px: f64,

    /// Markers are vertically centred; this is the top edge for a container
    /// of the given height
    pub top_px: f64,
}

/// Lay out both markers for the current handle positions
pub fn marker_layouts(
    positions: &HandlePositions,
    handle_width: f64,
    handle_height: f64,
    container_height: f64,
) -> [MarkerLayout; 2] {
    let top_px = (container_height - handle_height) / 2.0;
    let marker = |handle, left_px| MarkerLayout {
        handle,
        left_px,
        width_px: handle_width,
        height_px: handle_height,
        top_px,
    };
    [
        marker(Handle::Start, positions.start_px),
        marker(Handle::End, positions.end_px),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_size_specs() {
        assert_eq!("100%".parse::<SizeSpec>().unwrap(), SizeSpec::Percent(100.0));
        assert_eq!("300px".parse::<SizeSpec>().unwrap(), SizeSpec::Pixels(300.0));
        assert_eq!(" 42 ".parse::<SizeSpec>().unwrap(), SizeSpec::Pixels(42.0));
        assert_eq!("5 %".parse::<SizeSpec>().unwrap(), SizeSpec::Percent(5.0));
    }

    #[test]
    fn reject_bad_size_specs() {
        assert!("wide".parse::<SizeSpec>().is_err());
        assert!("-3px".parse::<SizeSpec>().is_err());
        assert!("".parse::<SizeSpec>().is_err());
    }

    #[test]
    fn resolve_against_parent() {
        assert_eq!(SizeSpec::Percent(80.0).resolve(500.0), 400.0);
        assert_eq!(SizeSpec::Pixels(120.0).resolve(500.0), 120.0);
        assert_eq!(SizeSpec::default().resolve(640.0), 640.0);
    }

    #[test]
    fn markers_are_vertically_centred() {
        let [start, end] = marker_layouts(&HandlePositions::new(40.0, 200.0), 10.0, 20.0, 60.0);
        assert_eq!(start.handle, Handle::Start);
        assert_eq!(start.left_px, 40.0);
        assert_eq!(start.top_px, 20.0);
        assert_eq!(end.left_px, 200.0);
        assert_eq!(end.width_px, 10.0);
    }
}
