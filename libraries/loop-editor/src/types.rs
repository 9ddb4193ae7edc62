//! Core types for the loop editor

use crate::error::{EditorError, Result};
use crate::layout::SizeSpec;
use crate::speed::DEFAULT_KNOB;
use serde::{Deserialize, Serialize};

/// Audible playback state as last observed from the engine
///
/// `current_time_secs` is only ever copied from engine ticks; the editor
/// never advances it on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_looping: bool,
    pub current_time_secs: f64,
    pub duration_secs: f64,
    pub playback_rate: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            is_looping: false,
            current_time_secs: 0.0,
            duration_secs: 0.0,
            playback_rate: 1.0,
        }
    }
}

/// Readiness of the playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EngineStatus {
    /// No file requested yet
    #[default]
    Unloaded,

    /// `load` issued, waiting for `ready`
    Loading,

    /// Engine accepted commands
    Ready,

    /// A command was rejected; will retry on the next tick or `ready`
    NotReady,
}

/// Host-supplied inputs for one editor instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorProps {
    /// Media to load into the engine
    pub file_url: String,

    /// Initial loop start, percent
    pub initial_start_pct: f64,

    /// Initial loop end, percent
    pub initial_end_pct: f64,

    /// Container sizing hints
    #[serde(default)]
    pub width: SizeSpec,
    #[serde(default)]
    pub height: SizeSpec,
}

impl EditorProps {
    pub fn new(file_url: impl Into<String>) -> Self {
        Self {
            file_url: file_url.into(),
            initial_start_pct: 0.0,
            initial_end_pct: 100.0,
            width: SizeSpec::FULL,
            height: SizeSpec::Percent(5.0),
        }
    }

    pub fn with_loop(mut self, start_pct: f64, end_pct: f64) -> Self {
        self.initial_start_pct = start_pct;
        self.initial_end_pct = end_pct;
        self
    }
}

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Marker width in pixels; also the minimum gap between handles
    #[serde(default = "default_handle_width")]
    pub handle_width: f64,

    /// Marker height in pixels
    #[serde(default = "default_handle_height")]
    pub handle_height: f64,

    /// Tolerance for loop-end detection, absorbs tick granularity
    #[serde(default = "default_loop_epsilon_secs")]
    pub loop_epsilon_secs: f64,

    /// Speed knob position restored on double-activation
    #[serde(default = "default_speed_knob")]
    pub default_speed_knob: f64,

    /// Loop start used when the host supplies none
    #[serde(default = "default_initial_start_pct")]
    pub initial_start_pct: f64,

    /// Loop end used when the host supplies none
    #[serde(default = "default_initial_end_pct")]
    pub initial_end_pct: f64,

    /// Waveform zoom; `None` fits the whole file into the container
    #[serde(default)]
    pub pixels_per_second: Option<f64>,
}

impl EditorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("handle_width", self.handle_width),
            ("handle_height", self.handle_height),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(EditorError::InvalidConfig(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if !self.loop_epsilon_secs.is_finite() || self.loop_epsilon_secs < 0.0 {
            return Err(EditorError::InvalidConfig(format!(
                "loop_epsilon_secs must be >= 0, got {}",
                self.loop_epsilon_secs
            )));
        }

        if !(0.0..=100.0).contains(&self.default_speed_knob) {
            return Err(EditorError::InvalidConfig(format!(
                "default_speed_knob must be within 0-100, got {}",
                self.default_speed_knob
            )));
        }

        for (name, value) in [
            ("initial_start_pct", self.initial_start_pct),
            ("initial_end_pct", self.initial_end_pct),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(EditorError::InvalidConfig(format!(
                    "{} must be within 0-100, got {}",
                    name, value
                )));
            }
        }
        if self.initial_start_pct >= self.initial_end_pct {
            return Err(EditorError::InvalidConfig(
                "initial_start_pct must be below initial_end_pct".to_string(),
            ));
        }

        if let Some(pps) = self.pixels_per_second {
            if !pps.is_finite() || pps <= 0.0 {
                return Err(EditorError::InvalidConfig(format!(
                    "pixels_per_second must be positive, got {}",
                    pps
                )));
            }
        }

        Ok(())
    }
}

// Default values
fn default_handle_width() -> f64 {
    10.0
}

fn default_handle_height() -> f64 {
    20.0
}

fn default_loop_epsilon_secs() -> f64 {
    0.01
}

fn default_speed_knob() -> f64 {
    DEFAULT_KNOB
}

fn default_initial_start_pct() -> f64 {
    0.0
}

fn default_initial_end_pct() -> f64 {
    100.0
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            handle_width: default_handle_width(),
            handle_height: default_handle_height(),
            loop_epsilon_secs: default_loop_epsilon_secs(),
            default_speed_knob: default_speed_knob(),
            initial_start_pct: default_initial_start_pct(),
            initial_end_pct: default_initial_end_pct(),
            pixels_per_second: None,
        }
    }
}
