//! Loop Audition Library
//!
//! Headless harness around the loop editor: loads an editor configuration,
//! replays scripted gesture and engine sessions against a simulated
//! playback engine, and reports the emitted editor events.
//!
//! This library exposes the core components for testing purposes.

pub mod config;
pub mod engine;
pub mod error;
pub mod script;

// Re-export commonly used types for convenience
pub use crate::config::load_config;
pub use engine::{SimulatedEngine, SimulatorHandle};
pub use error::{AuditionError, Result};
pub use script::{parse_script, Session, Step};
