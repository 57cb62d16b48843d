//! PID driver for heater duty
//!
//! Proportional-integral-derivative controller producing a duty fraction in
//! `[0, 1]` from the target and measured kiln temperature.
//!
//! - Derivative is taken on measurement, so setpoint steps from a profile
//!   do not kick the output.
//! - The integral is clamped to the output bounds (anti-windup).
//! - With `proportional_on_measurement` the P term accumulates `-Kp·Δinput`
//!   instead of tracking `Kp·error`, which trades rise time for less
//!   overshoot after setpoint changes.
//! - In manual mode `compute` returns the last output unchanged.  Switching
//!   back to auto seeds the integral with the last applied output so the
//!   heater duty does not jump.

/// Gains and bounds, derived from [`ControllerConfig`](crate::config::ControllerConfig).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidSettings {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub sample_period_secs: f32,
    pub output_min: f32,
    pub output_max: f32,
    pub proportional_on_measurement: bool,
}

/// PID driver
#[derive(Debug, Clone)]
pub struct PidDriver {
    settings: PidSettings,
    setpoint: f32,
    auto_mode: bool,
    proportional: f32,
    integral: f32,
    derivative: f32,
    last_input: Option<f32>,
    last_output: Option<f32>,
}

impl PidDriver {
    /// New driver in manual mode with zeroed accumulators.
    pub fn new(settings: PidSettings) -> Self {
        Self {
            settings,
            setpoint: 0.0,
            auto_mode: false,
            proportional: 0.0,
            integral: 0.0,
            derivative: 0.0,
            last_input: None,
            last_output: None,
        }
    }

    pub fn settings(&self) -> &PidSettings {
        &self.settings
    }

    /// Update setpoint
    pub fn set_setpoint(&mut self, setpoint: f32) {
        self.setpoint = setpoint;
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    pub fn is_auto(&self) -> bool {
        self.auto_mode
    }

    /// Enable or disable automatic control.
    ///
    /// On a manual → auto edge the accumulators are cleared and the integral
    /// is seeded from `last_output` (clamped to the output bounds).
    pub fn set_auto_mode(&mut self, enabled: bool, last_output: Option<f32>) {
        if enabled && !self.auto_mode {
            self.reset();
            self.integral = self.clamp(last_output.unwrap_or(0.0));
        }
        self.auto_mode = enabled;
    }

    /// Compute a new output from `measurement`, `dt` seconds after the last call.
    ///
    /// A non-positive `dt` falls back to the configured sample period.
    pub fn compute(&mut self, measurement: f32, dt: f32) -> f32 {
        if !self.auto_mode {
            return self.last_output.unwrap_or(0.0);
        }

        let dt = if dt > 0.0 {
            dt
        } else {
            self.settings.sample_period_secs
        };
        let error = self.setpoint - measurement;
        let d_input = measurement - self.last_input.unwrap_or(measurement);

        // Proportional
        if self.settings.proportional_on_measurement {
            self.proportional -= self.settings.kp * d_input;
        } else {
            self.proportional = self.settings.kp * error;
        }

        // Integral (with anti-windup)
        self.integral = self.clamp(self.integral + self.settings.ki * error * dt);

        // Derivative on measurement
        self.derivative = if dt > 0.0 {
            -self.settings.kd * d_input / dt
        } else {
            0.0
        };

        let output = self.clamp(self.proportional + self.integral + self.derivative);

        self.last_input = Some(measurement);
        self.last_output = Some(output);
        output
    }

    /// Contribution of each term to the last output: `(p, i, d)`.
    pub fn components(&self) -> (f32, f32, f32) {
        (self.proportional, self.integral, self.derivative)
    }

    /// Reset controller state
    pub fn reset(&mut self) {
        self.proportional = 0.0;
        self.integral = 0.0;
        self.derivative = 0.0;
        self.last_input = None;
        self.last_output = None;
    }

    fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.settings.output_min, self.settings.output_max)
    }
}
