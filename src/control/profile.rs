//! Ramp/soak firing profiles.
//!
//! A profile is an ordered list of `(temperature, time)` waypoints.  The
//! target at any runtime is the straight line between the surrounding pair
//! of waypoints, starting from an implicit origin at `(0 s, 0 °)`.
//!
//! Stored as JSON: `{"name": "...", "instructions": [{"temp": 100, "time": 60}, ...]}`.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::app::ports::ProfileError;

/// Upper bound on waypoints per profile.
pub const MAX_WAYPOINTS: usize = 64;

/// One profile point: reach `temperature` (°C) at `time` seconds of runtime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(rename = "temp")]
    pub temperature: f32,
    pub time: f32,
}

impl Waypoint {
    /// Ramp origin prepended ahead of the first waypoint.
    pub const ORIGIN: Self = Self {
        temperature: 0.0,
        time: 0.0,
    };

    pub const fn new(temperature: f32, time: f32) -> Self {
        Self { temperature, time }
    }
}

/// Result of a profile lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setpoint {
    /// Target temperature (°C) for this runtime.
    Target(f32),
    /// Runtime is past the last waypoint; the firing is complete.
    Finished,
}

/// A named, immutable firing schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(rename = "instructions")]
    waypoints: Vec<Waypoint, MAX_WAYPOINTS>,
}

impl Profile {
    /// Build a profile.  Waypoints are expected in ascending time order;
    /// this is not enforced.
    pub fn new(name: impl Into<String>, waypoints: &[Waypoint]) -> Result<Self, ProfileError> {
        let waypoints = Vec::from_slice(waypoints).map_err(|_| ProfileError::Malformed)?;
        Ok(Self {
            name: name.into(),
            waypoints,
        })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ProfileError> {
        serde_json::from_slice(bytes).map_err(|e| {
            log::debug!("profile parse error: {}", e);
            ProfileError::Malformed
        })
    }

    pub fn to_json(&self) -> Result<std::vec::Vec<u8>, ProfileError> {
        serde_json::to_vec(self).map_err(|_| ProfileError::Malformed)
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Runtime (seconds) at which the profile finishes.
    pub fn duration(&self) -> f32 {
        self.waypoints.last().map_or(0.0, |w| w.time)
    }

    /// Target temperature at `runtime` seconds.
    ///
    /// Pure: the same runtime always yields the same answer.
    pub fn get_setpoint(&self, runtime: f32) -> Setpoint {
        let Some(idx) = self.waypoints.iter().position(|w| w.time >= runtime) else {
            return Setpoint::Finished;
        };

        let current = self.waypoints[idx];
        let previous = if idx == 0 {
            Waypoint::ORIGIN
        } else {
            self.waypoints[idx - 1]
        };

        // Zero-length segment: jump straight to the later waypoint.
        if previous.time == current.time {
            return Setpoint::Target(current.temperature);
        }

        let ratio = (runtime - previous.time) / (current.time - previous.time);
        Setpoint::Target(previous.temperature + ratio * (current.temperature - previous.temperature))
    }
}
