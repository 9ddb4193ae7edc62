//! Drag constraint controller
//!
//! Owns the two loop handles in pixel space and turns pointer gestures into
//! position updates that never cross and never leave the container.
//!
//! Invariants, for every reachable state on a geometry that fits both
//! handles:
//! - `0 <= start_px`
//! - `start_px + handle_width <= end_px`
//! - `end_px <= container_width - handle_width`

use crate::geometry::ContainerGeometry;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which loop boundary a handle represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handle {
    Start,
    End,
}

/// Drag session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DragState {
    /// No pointer held
    #[default]
    Idle,

    /// Start handle follows the pointer
    DraggingStart,

    /// End handle follows the pointer
    DraggingEnd,
}

impl DragState {
    /// Handle being dragged, if any
    pub fn handle(self) -> Option<Handle> {
        match self {
            DragState::Idle => None,
            DragState::DraggingStart => Some(Handle::Start),
            DragState::DraggingEnd => Some(Handle::End),
        }
    }
}

/// Handle offsets within the container, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HandlePositions {
    pub start_px: f64,
    pub end_px: f64,
}

impl HandlePositions {
    pub fn new(start_px: f64, end_px: f64) -> Self {
        Self { start_px, end_px }
    }

    /// Check the ordering and bounds invariants against a geometry
    pub fn is_valid(&self, geometry: &ContainerGeometry, handle_width: f64) -> bool {
        self.start_px >= 0.0
            && self.start_px + handle_width <= self.end_px
            && self.end_px <= geometry.max_handle_offset(handle_width)
    }

    /// Bring both handles back inside the valid region
    ///
    /// Already-valid positions are returned unchanged. Geometries too
    /// narrow for two handles are left alone (the control stays inert).
    pub fn constrained(self, geometry: &ContainerGeometry, handle_width: f64) -> Self {
        if !geometry.fits_handles(handle_width) {
            return self;
        }

        let end_px = self
            .end_px
            .min(geometry.max_handle_offset(handle_width))
            .max(handle_width);
        let start_px = self.start_px.min(end_px - handle_width).max(0.0);

        Self { start_px, end_px }
    }
}

/// A single reported position change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandleMove {
    pub handle: Handle,
    pub position_px: f64,
}

/// Result of a pointer-down that grabbed a handle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragBegin {
    /// Handle now following the pointer
    pub handle: Handle,

    /// Position change caused by snapping the handle to the pointer
    pub moved: Option<HandleMove>,
}

/// Resolves pointer gestures into constrained handle positions
#[derive(Debug, Clone)]
pub struct DragConstraintController {
    positions: HandlePositions,
    state: DragState,
    handle_width: f64,
}

impl DragConstraintController {
    /// Create a controller with both handles at the origin
    pub fn new(handle_width: f64) -> Self {
        Self {
            positions: HandlePositions::default(),
            state: DragState::Idle,
            handle_width: handle_width.max(0.0),
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        self.state != DragState::Idle
    }

    pub fn positions(&self) -> HandlePositions {
        self.positions
    }

    pub fn handle_width(&self) -> f64 {
        self.handle_width
    }

    /// Pointer pressed at container offset `x`
    ///
    /// Picks the nearer handle (start wins ties), snaps it to the pointer and
    /// enters the matching drag state. Ignored while a drag is already in
    /// progress or when the geometry is not ready.
    pub fn pointer_down(&mut self, x: f64, geometry: &ContainerGeometry) -> Option<DragBegin> {
        if self.is_dragging() {
            debug!("Ignoring second pointer-down during {:?}", self.state);
            return None;
        }
        if !geometry.fits_handles(self.handle_width) || !x.is_finite() {
            return None;
        }

        let distance_to_start = (x - self.positions.start_px).abs();
        let distance_to_end = (x - self.positions.end_px).abs();

        let handle = if distance_to_start <= distance_to_end {
            Handle::Start
        } else {
            Handle::End
        };

        self.state = match handle {
            Handle::Start => DragState::DraggingStart,
            Handle::End => DragState::DraggingEnd,
        };

        debug!("Drag started on {:?} at {:.1}px", handle, x);

        let moved = self.move_handle(handle, x, geometry);
        Some(DragBegin { handle, moved })
    }

    /// Pointer moved to container offset `x`
    ///
    /// Returns the change, if the dragged handle actually moved.
    pub fn pointer_move(&mut self, x: f64, geometry: &ContainerGeometry) -> Option<HandleMove> {
        let handle = self.state.handle()?;
        if !geometry.fits_handles(self.handle_width) || !x.is_finite() {
            return None;
        }
        self.move_handle(handle, x, geometry)
    }

    /// Pointer released anywhere
    ///
    /// Always returns to `Idle`. Reports the final position of the dragged
    /// handle so the host gets a committed value even if no move happened.
    pub fn pointer_up(&mut self) -> Option<HandleMove> {
        let handle = self.state.handle()?;
        self.state = DragState::Idle;

        let position_px = match handle {
            Handle::Start => self.positions.start_px,
            Handle::End => self.positions.end_px,
        };

        debug!("Drag ended on {:?} at {:.1}px", handle, position_px);
        Some(HandleMove {
            handle,
            position_px,
        })
    }

    /// Drop any drag session without reporting
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    /// Replace positions with host-supplied initial values
    ///
    /// Ignored while dragging so an in-flight gesture is never interrupted.
    pub fn reinitialize(
        &mut self,
        positions: HandlePositions,
        geometry: &ContainerGeometry,
    ) -> Vec<HandleMove> {
        if self.is_dragging() {
            debug!("Deferring to active drag, initial positions ignored");
            return Vec::new();
        }

        let next = positions.constrained(geometry, self.handle_width);
        self.replace(next)
    }

    /// Re-clamp after a layout or resize notification
    ///
    /// Runs even mid-drag: a shrinking container must never leave the end
    /// handle outside the new bounds.
    pub fn on_geometry_changed(&mut self, geometry: &ContainerGeometry) -> Vec<HandleMove> {
        let next = self.positions.constrained(geometry, self.handle_width);
        let moves = self.replace(next);
        if !moves.is_empty() {
            debug!(
                "Re-clamped handles to {:.1}..{:.1}px for width {:.1}",
                next.start_px, next.end_px, geometry.width
            );
        }
        moves
    }

    fn move_handle(
        &mut self,
        handle: Handle,
        x: f64,
        geometry: &ContainerGeometry,
    ) -> Option<HandleMove> {
        let hw = self.handle_width;
        let current = self.positions.constrained(geometry, hw);

        let position_px = match handle {
            Handle::Start => x.min(current.end_px - hw).max(0.0),
            Handle::End => x
                .max(current.start_px + hw)
                .min(geometry.max_handle_offset(hw)),
        };

        let next = match handle {
            Handle::Start => HandlePositions {
                start_px: position_px,
                ..current
            },
            Handle::End => HandlePositions {
                end_px: position_px,
                ..current
            },
        };

        let moves = self.replace(next);
        moves.into_iter().find(|m| m.handle == handle)
    }

    fn replace(&mut self, next: HandlePositions) -> Vec<HandleMove> {
        let mut moves = Vec::with_capacity(2);
        if next.start_px != self.positions.start_px {
            moves.push(HandleMove {
                handle: Handle::Start,
                position_px: next.start_px,
            });
        }
        if next.end_px != self.positions.end_px {
            moves.push(HandleMove {
                handle: Handle::End,
                position_px: next.end_px,
            });
        }
        self.positions = next;
        moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HW: f64 = 10.0;

    fn geometry(width: f64) -> ContainerGeometry {
        ContainerGeometry::new(0.0, width)
    }

    fn controller_at(start: f64, end: f64, width: f64) -> DragConstraintController {
        let mut controller = DragConstraintController::new(HW);
        controller.reinitialize(HandlePositions::new(start, end), &geometry(width));
        controller
    }

    #[test]
    fn nearer_handle_is_grabbed() {
        let g = geometry(300.0);
        let mut controller = controller_at(50.0, 250.0, 300.0);

        let begin = controller.pointer_down(230.0, &g).unwrap();
        assert_eq!(begin.handle, Handle::End);
        assert_eq!(controller.state(), DragState::DraggingEnd);
        assert_eq!(controller.positions().end_px, 230.0);
    }

    #[test]
    fn tie_prefers_start_handle() {
        let g = geometry(300.0);
        let mut controller = controller_at(100.0, 200.0, 300.0);

        let begin = controller.pointer_down(150.0, &g).unwrap();
        assert_eq!(begin.handle, Handle::Start);
        assert_eq!(controller.state(), DragState::DraggingStart);
    }

    #[test]
    fn start_cannot_cross_end() {
        let g = geometry(300.0);
        let mut controller = controller_at(100.0, 110.0, 300.0);

        controller.pointer_down(100.0, &g).unwrap();
        let moved = controller.pointer_move(250.0, &g);

        // Already pinned at end - handle_width, so nothing moves
        assert!(moved.is_none());
        assert_eq!(controller.positions().start_px, 100.0);
        assert_eq!(controller.positions().end_px, 110.0);
    }

    #[test]
    fn end_clamps_to_container_and_start() {
        let g = geometry(300.0);
        let mut controller = controller_at(50.0, 200.0, 300.0);

        controller.pointer_down(200.0, &g).unwrap();
        controller.pointer_move(1000.0, &g);
        assert_eq!(controller.positions().end_px, 290.0);

        controller.pointer_move(-40.0, &g);
        assert_eq!(controller.positions().end_px, 60.0);
    }

    #[test]
    fn start_clamps_to_zero() {
        let g = geometry(300.0);
        let mut controller = controller_at(50.0, 200.0, 300.0);

        controller.pointer_down(40.0, &g).unwrap();
        let moved = controller.pointer_move(-25.0, &g).unwrap();
        assert_eq!(moved.position_px, 0.0);
    }

    #[test]
    fn second_pointer_down_is_ignored() {
        let g = geometry(300.0);
        let mut controller = controller_at(50.0, 250.0, 300.0);

        controller.pointer_down(60.0, &g).unwrap();
        assert!(controller.pointer_down(240.0, &g).is_none());
        assert_eq!(controller.state(), DragState::DraggingStart);
        assert_eq!(controller.positions().end_px, 250.0);
    }

    #[test]
    fn pointer_up_always_idles_and_reports() {
        let g = geometry(300.0);
        let mut controller = controller_at(50.0, 250.0, 300.0);

        controller.pointer_down(80.0, &g).unwrap();
        let committed = controller.pointer_up().unwrap();
        assert_eq!(committed.handle, Handle::Start);
        assert_eq!(committed.position_px, 80.0);
        assert_eq!(controller.state(), DragState::Idle);

        assert!(controller.pointer_up().is_none());
        assert!(controller.pointer_move(120.0, &g).is_none());
    }

    #[test]
    fn reinitialize_is_ignored_mid_drag() {
        let g = geometry(300.0);
        let mut controller = controller_at(50.0, 250.0, 300.0);

        controller.pointer_down(60.0, &g).unwrap();
        let moves = controller.reinitialize(HandlePositions::new(0.0, 100.0), &g);
        assert!(moves.is_empty());
        assert_eq!(controller.positions().end_px, 250.0);

        controller.pointer_up();
        let moves = controller.reinitialize(HandlePositions::new(0.0, 100.0), &g);
        assert_eq!(moves.len(), 2);
        assert_eq!(controller.positions(), HandlePositions::new(0.0, 100.0));
    }

    #[test]
    fn shrinking_container_reclamps_end() {
        let mut controller = controller_at(50.0, 250.0, 300.0);

        let moves = controller.on_geometry_changed(&geometry(200.0));
        assert_eq!(
            moves,
            vec![HandleMove {
                handle: Handle::End,
                position_px: 190.0
            }]
        );
        assert_eq!(controller.positions().start_px, 50.0);
    }

    #[test]
    fn shrinking_past_start_drags_start_along() {
        let mut controller = controller_at(180.0, 250.0, 300.0);

        controller.on_geometry_changed(&geometry(150.0));
        let positions = controller.positions();
        assert_eq!(positions.end_px, 140.0);
        assert_eq!(positions.start_px, 130.0);
        assert!(positions.is_valid(&geometry(150.0), HW));
    }

    #[test]
    fn not_ready_geometry_keeps_control_inert() {
        let mut controller = controller_at(50.0, 250.0, 300.0);

        assert!(controller
            .pointer_down(60.0, &ContainerGeometry::DETACHED)
            .is_none());
        assert_eq!(controller.state(), DragState::Idle);
        assert!(controller
            .on_geometry_changed(&ContainerGeometry::DETACHED)
            .is_empty());
    }

    #[test]
    fn clamping_valid_positions_is_noop() {
        let g = geometry(300.0);
        let positions = HandlePositions::new(20.0, 180.0);
        assert!(positions.is_valid(&g, HW));
        assert_eq!(positions.constrained(&g, HW), positions);
    }
}
