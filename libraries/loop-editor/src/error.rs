//! Error types for the loop editor

use thiserror::Error;

/// Editor errors
///
/// Only host mistakes surface here. Geometry and engine readiness problems
/// are recovered locally and never reach the caller as errors.
#[derive(Debug, Error)]
pub enum EditorError {
    /// A sizing hint could not be parsed
    #[error("Invalid size spec: {0:?}")]
    InvalidSizeSpec(String),

    /// Configuration value out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Engine rejected a command with a non-recoverable error
    #[error("Playback engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Errors reported across the playback engine boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Command issued before the engine fired `ready`
    #[error("Engine not ready")]
    NotReady,

    /// No media has been loaded
    #[error("No media loaded")]
    NotLoaded,

    /// Argument rejected by the backend
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Backend-specific failure
    #[error("Backend error: {0}")]
    Backend(String),
}

impl EngineError {
    /// Whether the command is worth retrying once the engine becomes ready
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::NotReady | EngineError::NotLoaded)
    }
}

/// Result type for editor operations
pub type Result<T> = std::result::Result<T, EditorError>;

/// Result type for engine calls
pub type EngineResult<T> = std::result::Result<T, EngineError>;
