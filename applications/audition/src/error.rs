/// Audition error types
use loop_editor::EditorError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuditionError>;

#[derive(Debug, Error)]
pub enum AuditionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for AuditionError {
    fn from(err: config::ConfigError) -> Self {
        AuditionError::Config(err.to_string())
    }
}
