//! Outbound telemetry.
//!
//! The [`ControlService`](super::service::ControlService) builds one
//! [`TelemetryRecord`] per tick from the kernel's `info()` snapshot and hands
//! it to the [`TelemetrySink`](super::ports::TelemetrySink) port.  Adapters
//! on the other side decide what to do with it: log it, queue it for a
//! WebSocket push, and so on.
//!
//! Commands that ask for data are answered with a [`Reply`] on the reply
//! channel.

use serde::Serialize;

use crate::config::ControllerConfig;

/// A point-in-time controller snapshot.  A copy, never a live view.
///
/// Serialises to the flat wire form
/// `{"temp", "duty", "target", "running", "runtime", "paused", "current", "p", "i", "d"}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryRecord {
    /// Kiln temperature (°C); `null` while the sensor is faulted.
    pub temp: Option<f32>,
    /// Commanded duty fraction.
    pub duty: f32,
    /// Current target temperature (°C).
    pub target: f32,
    pub running: bool,
    /// Seconds of firing time, excluding pauses.
    pub runtime: f32,
    pub paused: bool,
    /// Heater RMS current (A).
    pub current: f32,
    pub p: f32,
    pub i: f32,
    pub d: f32,
}

impl TelemetryRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Answer to a query or storage command.
///
/// Wire form is a JSON object tagged by `"reply"`, e.g.
/// `{"reply": "profiles", "names": ["bisque", "glaze"]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Reply {
    Profiles { names: Vec<String> },
    ProfileSaved { name: String },
    ProfileDeleted { name: String },
    Settings { config: ControllerConfig },
    /// The named command could not be carried out.
    Failed { command: &'static str, error: String },
}

impl Reply {
    pub fn failed(command: &'static str, error: impl core::fmt::Display) -> Self {
        Self::Failed {
            command,
            error: error.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
