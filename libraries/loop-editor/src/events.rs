//! Editor Events
//!
//! Event-based communication for UI synchronization.
//! Events are queued at key points:
//! - Handle position changes (live during drag, committed on release)
//! - Transport changes (play/pause/stop, loop wraps)
//! - Speed and viewport changes
//! - Engine readiness changes

use crate::drag::Handle;
use crate::types::EngineStatus;
use serde::{Deserialize, Serialize};

/// Events emitted by the editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditorEvent {
    /// Loop start moved
    StartChanged {
        /// New position, percent of container
        pct: f64,
    },

    /// Loop end moved
    EndChanged {
        /// New position, percent of container
        pct: f64,
    },

    /// A handle was grabbed
    DragStarted { handle: Handle },

    /// The grabbed handle was released
    DragEnded { handle: Handle },

    /// Playing flag flipped
    PlaybackStateChanged {
        is_playing: bool,
        current_time_secs: f64,
    },

    /// Loop armed or disarmed
    LoopToggled { enabled: bool },

    /// Loop end reached, seeked back to start
    Wrapped { from_secs: f64, to_secs: f64 },

    /// Speed knob moved
    SpeedChanged { knob: f64, rate: f64 },

    /// Viewport jumped
    Scrolled { offset_px: f64 },

    /// Engine readiness changed
    EngineStatusChanged { status: EngineStatus },

    /// New file requested from the engine
    FileLoaded { url: String },

    /// Duration known, waveform ready
    Ready { duration_secs: f64 },

    /// Non-fatal engine failure
    Error { message: String },
}

impl EditorEvent {
    /// Whether this event reports a loop boundary move
    pub fn is_position_change(&self) -> bool {
        matches!(
            self,
            EditorEvent::StartChanged { .. } | EditorEvent::EndChanged { .. }
        )
    }
}
