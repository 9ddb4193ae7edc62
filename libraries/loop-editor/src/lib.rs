//! Loop Editor - Loop Region Editing and Playback Sync
//!
//! Platform-agnostic core of an audio sample editor.
//!
//! This crate provides:
//! - Two draggable loop handles with non-crossing, in-bounds constraints
//! - A normalised (0-100%) loop region derived from handle pixels
//! - Loop playback that seeks back to the loop start at the loop end
//! - Exponential speed knob (0.25x - 4.0x, double-activation reset)
//! - Viewport scrolling that keeps the loop window visible
//! - Scoped pointer capture and engine subscriptions
//!
//! # Architecture
//!
//! `loop-editor` is completely platform-agnostic:
//! - No dependency on a UI toolkit
//! - No dependency on an audio backend
//! - Single-threaded and callback driven
//!
//! Platform-specific code (waveform/audio engine, document-level pointer
//! routing) is provided via traits.
//!
//! # Example: Handle Dragging
//!
//! ```rust
//! use loop_editor::{ContainerGeometry, DragConstraintController, HandlePositions};
//!
//! let geometry = ContainerGeometry::new(0.0, 300.0);
//! let mut drag = DragConstraintController::new(10.0);
//! drag.reinitialize(HandlePositions::new(100.0, 110.0), &geometry);
//!
//! // Grab the start handle and try to push it past the end handle
//! drag.pointer_down(100.0, &geometry);
//! drag.pointer_move(250.0, &geometry);
//! drag.pointer_up();
//!
//! assert_eq!(drag.positions().start_px, 100.0);
//! ```
//!
//! # Example: Speed Knob
//!
//! ```rust
//! use loop_editor::{knob_to_rate, SpeedCurveMapper};
//!
//! assert_eq!(knob_to_rate(50.0), 1.0);
//!
//! let mut speed = SpeedCurveMapper::default();
//! speed.set_knob(80.0);
//! speed.reset(); // double-click
//! assert_eq!(speed.rate(), 1.0);
//! ```
//!
//! # Example: Platform Integration
//!
//! ```rust,no_run
//! use loop_editor::{
//!     ContainerGeometry, EditorConfig, EditorProps, EngineEventKind, EngineListener,
//!     EngineResult, ListenerRegistry, LoopEditor, NoPointerCapture, PlaybackEngine,
//!     SeekTarget, SubscriptionId,
//! };
//!
//! // Implement PlaybackEngine for your waveform/audio backend
//! struct MyEngine {
//!     listeners: ListenerRegistry,
//!     // ... platform-specific player
//! }
//!
//! impl PlaybackEngine for MyEngine {
//!     fn load(&mut self, url: &str) -> EngineResult<()> { Ok(()) }
//!     fn play(&mut self) -> EngineResult<()> { Ok(()) }
//!     fn pause(&mut self) -> EngineResult<()> { Ok(()) }
//!     fn stop(&mut self) -> EngineResult<()> { Ok(()) }
//!     fn seek(&mut self, target: SeekTarget) -> EngineResult<()> { Ok(()) }
//!     fn current_time(&self) -> EngineResult<f64> { Ok(0.0) }
//!     fn duration(&self) -> EngineResult<f64> { Ok(0.0) }
//!     fn set_playback_rate(&mut self, rate: f64) -> EngineResult<()> { Ok(()) }
//!     fn subscribe(&mut self, kind: EngineEventKind, listener: EngineListener) -> SubscriptionId {
//!         self.listeners.subscribe(kind, listener)
//!     }
//!     fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
//!         self.listeners.unsubscribe(id)
//!     }
//! }
//!
//! let engine = MyEngine { listeners: ListenerRegistry::new() };
//! let mut editor = LoopEditor::new(
//!     EditorConfig::default(),
//!     Box::new(engine),
//!     Box::new(NoPointerCapture),
//! )?;
//!
//! editor.on_start_position_change(|pct| println!("start {pct:.1}%"));
//! editor.set_props(EditorProps::new("http://localhost:3000/audio/loop.wav"));
//! editor.commit_layout(ContainerGeometry::new(0.0, 800.0));
//!
//! // From the host's event loop
//! editor.pointer_down(120.0);
//! editor.pointer_move(180.0);
//! editor.pointer_up();
//! editor.process_engine_events();
//! # Ok::<(), loop_editor::EditorError>(())
//! ```

mod capture;
mod drag;
mod editor;
mod engine;
mod error;
mod events;
mod geometry;
mod layout;
mod region;
mod speed;
mod sync;
pub mod types;
mod viewport;

// Public exports
pub use capture::{NoPointerCapture, PointerCapture};
pub use drag::{DragBegin, DragConstraintController, DragState, Handle, HandleMove, HandlePositions};
pub use editor::{LoopEditor, PositionCallback};
pub use engine::{
    EngineEvent, EngineEventKind, EngineInbox, EngineListener, EngineSubscriptions,
    ListenerRegistry, PlaybackEngine, SeekTarget, SubscriptionId,
};
pub use error::{EditorError, EngineError, EngineResult, Result};
pub use events::EditorEvent;
pub use geometry::{ContainerGeometry, GeometryTracker};
pub use layout::{marker_layouts, MarkerLayout, SizeSpec};
pub use region::{px_to_pct, to_percent, to_pixels, LoopBounds, LoopRegion};
pub use speed::{knob_to_rate, rate_to_knob, SpeedCurveMapper, DEFAULT_KNOB};
pub use sync::{LoopPlaybackSynchronizer, DEFAULT_LOOP_EPSILON_SECS};
pub use types::{EditorConfig, EditorProps, EngineStatus, PlaybackState};
pub use viewport::{ViewportInput, ViewportScroller};
