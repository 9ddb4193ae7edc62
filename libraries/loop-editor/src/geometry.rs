//! Container geometry tracking
//!
//! Holds the last committed layout box of the host container. All position
//! math reads from here; a zero width means "not laid out yet".

use serde::{Deserialize, Serialize};

/// Pixel bounds of the host container
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ContainerGeometry {
    /// Left edge in client coordinates
    pub left: f64,

    /// Width in pixels
    pub width: f64,
}

impl ContainerGeometry {
    /// Zero-width geometry returned before the container is attached
    pub const DETACHED: Self = Self {
        left: 0.0,
        width: 0.0,
    };

    pub fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }

    /// Whether position math may run against this geometry
    pub fn is_ready(&self) -> bool {
        self.width.is_finite() && self.width > 0.0
    }

    /// Whether two handles of `handle_width` fit side by side
    pub fn fits_handles(&self, handle_width: f64) -> bool {
        self.is_ready() && self.width >= handle_width * 2.0
    }

    /// Convert a client-space x coordinate to a container offset
    pub fn to_local(&self, client_x: f64) -> f64 {
        client_x - self.left
    }

    /// Rightmost valid left edge for a handle
    pub fn max_handle_offset(&self, handle_width: f64) -> f64 {
        self.width - handle_width
    }
}

/// Tracks the committed layout of the host container
///
/// The host calls [`GeometryTracker::commit`] from its layout/resize
/// notifications. [`GeometryTracker::measure`] never fails: before the first
/// commit (or after [`GeometryTracker::detach`]) it returns a zero-width box.
#[derive(Debug, Clone, Default)]
pub struct GeometryTracker {
    committed: Option<ContainerGeometry>,
    revision: u64,
}

impl GeometryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last committed layout box, or zero width when detached
    pub fn measure(&self) -> ContainerGeometry {
        self.committed.unwrap_or(ContainerGeometry::DETACHED)
    }

    /// Record a new layout box
    ///
    /// Returns true if the geometry actually changed.
    pub fn commit(&mut self, geometry: ContainerGeometry) -> bool {
        let sanitized = ContainerGeometry {
            left: if geometry.left.is_finite() {
                geometry.left
            } else {
                0.0
            },
            width: if geometry.width.is_finite() {
                geometry.width.max(0.0)
            } else {
                0.0
            },
        };

        if self.committed == Some(sanitized) {
            return false;
        }

        self.committed = Some(sanitized);
        self.revision += 1;
        true
    }

    /// Container was removed from the layout tree
    pub fn detach(&mut self) {
        if self.committed.take().is_some() {
            self.revision += 1;
        }
    }

    pub fn is_attached(&self) -> bool {
        self.committed.is_some()
    }

    /// Monotonic counter bumped on every change
    pub fn revision(&self) -> u64 {
        self.revision
    }
}
