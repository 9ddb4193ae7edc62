//! Global pointer capture
//!
//! While a handle is dragged the host must route document-level pointer
//! move/up events to the editor, so dragging continues when the pointer
//! leaves the container. The editor acquires capture on pointer-down and
//! releases it on pointer-up, teardown, and drop.

/// Host hook for document-level pointer listeners
pub trait PointerCapture {
    /// Start routing global pointer-move/up to the editor
    fn capture(&mut self);

    /// Stop routing; must be safe to call when nothing is captured
    fn release(&mut self);
}

/// Capture for hosts that already deliver every pointer event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPointerCapture;

impl PointerCapture for NoPointerCapture {
    fn capture(&mut self) {}

    fn release(&mut self) {}
}

/// Tracks whether capture is currently held
///
/// Guarantees `release` is called exactly once per `capture`.
#[derive(Debug, Default)]
pub(crate) struct CaptureState {
    held: bool,
}

impl CaptureState {
    pub(crate) fn acquire(&mut self, capture: &mut dyn PointerCapture) {
        if !self.held {
            capture.capture();
            self.held = true;
        }
    }

    pub(crate) fn release(&mut self, capture: &mut dyn PointerCapture) {
        if self.held {
            capture.release();
            self.held = false;
        }
    }

    pub(crate) fn is_held(&self) -> bool {
        self.held
    }
}
