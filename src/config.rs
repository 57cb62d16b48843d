//! Controller configuration parameters
//!
//! All tunable parameters for the kiln controller.  Loaded once at startup
//! through [`ConfigPort`](crate::app::ports::ConfigPort) and handed to each
//! component by value; nothing reads configuration from global state.
//!
//! The JSON form uses the historical `settings.json` key names (`Kp`,
//! `Period`, `CTRating`, ...).  Every key is optional: a missing key keeps
//! its default.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::control::pid::PidSettings;
use crate::drivers::duty_cycle::DutySettings;
use crate::sensors::current::CurrentSettings;

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- PID ---
    /// Proportional gain
    #[serde(rename = "Kp")]
    pub kp: f32,
    /// Integral gain
    #[serde(rename = "Ki")]
    pub ki: f32,
    /// Derivative gain
    #[serde(rename = "Kd")]
    pub kd: f32,
    /// Control period in seconds; also the relay PWM period
    #[serde(rename = "Period")]
    pub period_secs: f32,
    /// Compute the proportional term on measurement instead of error
    #[serde(rename = "ProportionalOnMeasurement", alias = "PoM")]
    pub proportional_on_measurement: bool,

    // --- Relay ---
    /// Shortest ON pulse the relay is allowed to make (seconds)
    #[serde(rename = "MinOnTime")]
    pub min_on_time_secs: f32,
    /// Upper bound on the commanded duty fraction (0, 1]
    #[serde(rename = "MaxDuty")]
    pub max_duty: f32,

    // --- Current transformer ---
    /// Amperes per volt RMS at the burden resistor
    #[serde(rename = "CTRating")]
    pub ct_rating: f32,
    /// Raw sample rate (Hz)
    #[serde(rename = "CTSampleRate")]
    pub ct_sample_rate_hz: f32,
    /// Samples per RMS window
    #[serde(rename = "CTSampleCount")]
    pub ct_sample_count: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // PID
            kp: 0.01,
            ki: 0.001,
            kd: 0.002,
            period_secs: 1.0,
            proportional_on_measurement: false,

            // Relay
            min_on_time_secs: 0.5,
            max_duty: 1.0,

            // Current transformer
            ct_rating: 30.0,
            ct_sample_rate_hz: 1200.0,
            ct_sample_count: 1000,
        }
    }
}

impl ControllerConfig {
    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let gains_ok = [self.kp, self.ki, self.kd]
            .iter()
            .all(|g| g.is_finite() && *g >= 0.0);
        if !gains_ok {
            return Err(ConfigError::ValidationFailed("Kp/Ki/Kd must be finite and >= 0"));
        }
        if !(self.period_secs.is_finite() && self.period_secs > 0.0) {
            return Err(ConfigError::ValidationFailed("Period must be > 0"));
        }
        if !(self.min_on_time_secs.is_finite() && self.min_on_time_secs >= 0.0) {
            return Err(ConfigError::ValidationFailed("MinOnTime must be >= 0"));
        }
        if self.min_on_time_secs > self.period_secs {
            return Err(ConfigError::ValidationFailed("MinOnTime must not exceed Period"));
        }
        if !(self.max_duty > 0.0 && self.max_duty <= 1.0) {
            return Err(ConfigError::ValidationFailed("MaxDuty must be in (0, 1]"));
        }
        if !(self.ct_rating.is_finite() && self.ct_rating >= 0.0) {
            return Err(ConfigError::ValidationFailed("CTRating must be finite and >= 0"));
        }
        if !(self.ct_sample_rate_hz.is_finite() && self.ct_sample_rate_hz > 0.0) {
            return Err(ConfigError::ValidationFailed("CTSampleRate must be > 0"));
        }
        if self.ct_sample_count == 0 {
            return Err(ConfigError::ValidationFailed("CTSampleCount must be > 0"));
        }
        Ok(())
    }

    /// Control period as a `Duration`.
    pub fn period(&self) -> Duration {
        secs(self.period_secs)
    }

    pub fn pid_settings(&self) -> PidSettings {
        PidSettings {
            kp: self.kp,
            ki: self.ki,
            kd: self.kd,
            sample_period_secs: self.period_secs,
            output_min: 0.0,
            output_max: 1.0,
            proportional_on_measurement: self.proportional_on_measurement,
        }
    }

    pub fn duty_settings(&self) -> DutySettings {
        DutySettings {
            period: self.period(),
            min_on_time: secs(self.min_on_time_secs),
            max_duty: self.max_duty,
        }
    }

    pub fn current_settings(&self) -> CurrentSettings {
        CurrentSettings {
            rating: self.ct_rating,
            sample_period: secs(1.0 / self.ct_sample_rate_hz),
            sample_count: self.ct_sample_count,
        }
    }

    /// Hardware watchdog timeout: three control periods plus slack.
    pub fn watchdog_timeout(&self) -> Duration {
        secs((1.0 + self.period_secs) * 3.0)
    }
}

/// Seconds → `Duration`, mapping negative / non-finite input to zero.
pub(crate) fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value).unwrap_or(Duration::ZERO)
}
