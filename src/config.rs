#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::transpose::transpose,
    error::{Result, ShiftError},
};

/// Fixed timing and range constants of a pitch shifter.
///
/// `Default` gives the classic tuning: 100 ms grains with 50 ms fades, which
/// makes every grain a pure crossfade with no plateau and no tail.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct ShifterConfig {
    /// Active length of one grain, seconds.
    pub buffer_time: f64,
    /// Length of each fade edge, seconds.
    pub fade_time: f64,
    /// Delay depth for a pitch multiplier of magnitude 1, seconds.
    pub base_delay_time: f64,
    /// Time constant of parameter smoothing, seconds.
    pub smoothing_time_constant: f64,
    /// Distance from construction to the first grain start, seconds.
    pub start_latency: f64,
    /// Capacity of each delay line, seconds. Delay depths are clamped to it.
    pub max_delay_time: f64,
    /// Largest accepted upward multiplier. Defaults to the transpose curve at
    /// +24 semitones.
    pub max_pitch_up: f64,
    /// Largest accepted downward multiplier magnitude. Defaults to the
    /// transpose curve at -24 semitones, an octave down.
    pub max_pitch_down: f64,
}

impl Default for ShifterConfig {
    fn default() -> Self {
        Self {
            buffer_time: 0.1,
            fade_time: 0.05,
            base_delay_time: 0.1,
            smoothing_time_constant: 0.01,
            start_latency: 0.05,
            max_delay_time: 5.0,
            max_pitch_up: transpose(12.0),
            max_pitch_down: -transpose(-12.0),
        }
    }
}

impl ShifterConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = |value: f64| value.is_finite() && value > 0.0;
        let non_negative = |value: f64| value.is_finite() && value >= 0.0;

        if !positive(self.buffer_time)
            || !non_negative(self.fade_time)
            || self.buffer_time - 2.0 * self.fade_time < -1e-12
        {
            return Err(ShiftError::InvalidTiming {
                active_time: self.buffer_time,
                fade_time: self.fade_time,
            });
        }

        let checks = [
            ("base_delay_time", non_negative(self.base_delay_time)),
            (
                "smoothing_time_constant",
                positive(self.smoothing_time_constant),
            ),
            ("start_latency", non_negative(self.start_latency)),
            ("max_delay_time", positive(self.max_delay_time)),
            ("max_pitch_up", positive(self.max_pitch_up)),
            // The down ramp grows the delay by 0.5 * depth per grain; at a
            // full grain per grain the read position stops moving
            (
                "max_pitch_down",
                positive(self.max_pitch_down)
                    && 0.5 * self.base_delay_time * self.max_pitch_down < self.buffer_time,
            ),
        ];
        if let Some((name, _)) = checks.iter().find(|(_, ok)| !ok) {
            return Err(ShiftError::InvalidConfig(format!(
                "{name} out of range"
            )));
        }

        Ok(())
    }
}
