//! Playback speed knob with exponential scaling
//!
//! Maps a linear 0-100 knob to a rate multiplier so that equal knob travel
//! gives equal speed ratios. 0 = 0.25x, 50 = 1.0x (default), 100 = 4.0x.

/// Knob position that maps to normal speed
pub const DEFAULT_KNOB: f64 = 50.0;

/// Lowest and highest knob positions
pub const KNOB_MIN: f64 = 0.0;
pub const KNOB_MAX: f64 = 100.0;

/// Convert a knob position to a rate multiplier
///
/// Formula: rate = 4^(round(v)/50 - 1)
/// - 0   → 0.25x
/// - 50  → 1.0x
/// - 100 → 4.0x
pub fn knob_to_rate(value: f64) -> f64 {
    let v = clamp_knob(value).round();
    4.0_f64.powf(v / 50.0 - 1.0)
}

/// Convert a rate multiplier back to a knob position
///
/// Formula: v = 50 * (log4(rate) + 1), clamped to 0-100. Used to restore the
/// knob from a stored rate.
pub fn rate_to_knob(rate: f64) -> f64 {
    if !rate.is_finite() || rate <= 0.0 {
        return DEFAULT_KNOB;
    }
    clamp_knob(50.0 * (rate.log(4.0) + 1.0))
}

fn clamp_knob(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(KNOB_MIN, KNOB_MAX)
    } else {
        DEFAULT_KNOB
    }
}

/// Speed knob state
///
/// Independent of loop state; survives file switches.
#[derive(Debug, Clone)]
pub struct SpeedCurveMapper {
    /// Knob position (0-100)
    knob: f64,

    /// Position restored on double-activation
    default_knob: f64,

    /// Cached rate for the current knob
    rate: f64,
}

impl SpeedCurveMapper {
    /// Create a mapper whose knob starts (and resets) at `default_knob`
    pub fn new(default_knob: f64) -> Self {
        let default_knob = clamp_knob(default_knob);
        Self {
            knob: default_knob,
            default_knob,
            rate: knob_to_rate(default_knob),
        }
    }

    /// Move the knob; returns true if the rate changed
    pub fn set_knob(&mut self, value: f64) -> bool {
        self.knob = clamp_knob(value);
        let rate = knob_to_rate(self.knob);
        let changed = rate != self.rate;
        self.rate = rate;
        changed
    }

    /// Restore the knob from a stored rate multiplier
    pub fn set_rate(&mut self, rate: f64) -> bool {
        self.set_knob(rate_to_knob(rate))
    }

    /// Double-activation: jump back to the default position
    pub fn reset(&mut self) -> bool {
        self.set_knob(self.default_knob)
    }

    pub fn knob(&self) -> f64 {
        self.knob
    }

    pub fn default_knob(&self) -> f64 {
        self.default_knob
    }

    /// Current rate multiplier
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Human-readable rate, e.g. "1.00x"
    pub fn label(&self) -> String {
        format!("{:.2}x", self.rate)
    }
}

impl Default for SpeedCurveMapper {
    fn default() -> Self {
        Self::new(DEFAULT_KNOB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_points() {
        assert_eq!(knob_to_rate(50.0), 1.0);
        assert!((knob_to_rate(0.0) - 0.25).abs() < 1e-12);
        assert!((knob_to_rate(100.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn knob_is_rounded_before_mapping() {
        assert_eq!(knob_to_rate(50.4), knob_to_rate(50.0));
        assert_eq!(knob_to_rate(74.6), knob_to_rate(75.0));
        assert!((knob_to_rate(75.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_knob_is_clamped() {
        assert!((knob_to_rate(-20.0) - 0.25).abs() < 1e-12);
        assert!((knob_to_rate(250.0) - 4.0).abs() < 1e-12);
        assert_eq!(knob_to_rate(f64::NAN), 1.0);
    }

    #[test]
    fn rate_to_knob_inverts() {
        assert!((rate_to_knob(1.0) - 50.0).abs() < 1e-9);
        assert!((rate_to_knob(0.25) - 0.0).abs() < 1e-9);
        assert!((rate_to_knob(4.0) - 100.0).abs() < 1e-9);
        assert!((rate_to_knob(2.0) - 75.0).abs() < 1e-9);
        assert_eq!(rate_to_knob(0.0), DEFAULT_KNOB);
        assert_eq!(rate_to_knob(16.0), 100.0);
    }

    #[test]
    fn double_activation_resets_to_default() {
        let mut speed = SpeedCurveMapper::default();
        speed.set_knob(80.0);
        assert!(speed.rate() > 1.0);

        assert!(speed.reset());
        assert_eq!(speed.knob(), 50.0);
        assert_eq!(speed.rate(), 1.0);
        assert_eq!(speed.label(), "1.00x");

        // Already at default
        assert!(!speed.reset());
    }

    #[test]
    fn restore_from_rate() {
        let mut speed = SpeedCurveMapper::default();
        speed.set_rate(0.5);
        assert!((speed.knob() - 25.0).abs() < 1e-9);
        assert!((speed.rate() - 0.5).abs() < 1e-12);
    }
}
