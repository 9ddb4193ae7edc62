/// Editor configuration loading
use crate::error::{AuditionError, Result};
use loop_editor::EditorConfig;
use std::path::Path;

/// Environment prefix, e.g. `LOOP_HANDLE_WIDTH=12`
pub const ENV_PREFIX: &str = "LOOP";

/// Load configuration from an optional TOML file and the environment
///
/// Environment variables override the file; unset keys fall back to the
/// editor defaults.
pub fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let mut settings = config::Config::builder();

    if let Some(path) = path {
        if !path.exists() {
            return Err(AuditionError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        settings = settings.add_source(
            config::File::from(path).format(config::FileFormat::Toml),
        );
    }

    // Keys are flat, so only the prefix is split off
    settings = settings.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .try_parsing(true),
    );

    let config: EditorConfig = settings.build()?.try_deserialize()?;
    config.validate()?;

    tracing::debug!("Loaded editor config: {:?}", config);
    Ok(config)
}

/// Render the default configuration as TOML
pub fn default_config_toml() -> Result<String> {
    toml::to_string_pretty(&EditorConfig::default())
        .map_err(|e| AuditionError::Config(e.to_string()))
}
