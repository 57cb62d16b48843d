//! Port traits: the hexagonal boundary between control logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlKernel / ControlService (domain)
//! ```
//!
//! Driven adapters (thermocouple, current clamp, watchdog, telemetry sink,
//! storage) implement these traits.  The kernel and service consume them via
//! generics, so the control core never touches hardware directly.
//!
//! The relay output, thermocouple bus and blocking delays use the
//! `embedded-hal` 1.0 traits directly (`OutputPin`, `SpiDevice`, `DelayNs`).

use core::time::Duration;

use crate::app::events::TelemetryRecord;
use crate::config::ControllerConfig;
use crate::control::profile::Profile;
use crate::error::{SensorError, TelemetryError};

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Temperature feedback for the control loop.
pub trait TemperatureSource {
    /// Latest reading in °C, or `None` when the sensor reports a fault.
    ///
    /// Must return within a bounded hardware timeout.
    fn read(&mut self) -> Option<f32>;
}

/// Raw sensed voltage from the current transformer burden resistor.
pub trait CurrentSense {
    fn read_volts(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Platform ports
// ───────────────────────────────────────────────────────────────

/// Hardware watchdog.  Fed once per control tick, unconditionally.
pub trait Watchdog {
    fn feed(&self);
}

/// Monotonic time source.
pub trait Clock {
    /// Time elapsed since boot.  Never goes backwards.
    fn now(&self) -> Duration;
}

// ───────────────────────────────────────────────────────────────
// Telemetry port (driven adapter: domain → transport)
// ───────────────────────────────────────────────────────────────

/// Receives one read-only snapshot per control tick.
///
/// Delivery is best-effort: the service logs and drops any error, it never
/// retries and never waits.
pub trait TelemetrySink {
    fn push(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError>;
}

// ───────────────────────────────────────────────────────────────
// Persistence ports
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST validate before persisting.  Invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

/// Named firing-profile storage.
pub trait ProfileStore {
    fn load(&self, name: &str) -> Result<Profile, ProfileError>;

    fn save(&mut self, name: &str, profile: &Profile) -> Result<(), ProfileError>;

    /// Names of every stored profile, sorted.
    fn list(&self) -> Result<Vec<String>, ProfileError>;

    /// Delete a profile.  Deleting a missing profile is `NotFound`.
    fn delete(&mut self, name: &str) -> Result<(), ProfileError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`ProfileStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileError {
    /// No profile with that name.
    NotFound,
    /// Name is empty or would escape the profile directory.
    InvalidName,
    /// File exists but is not a valid profile document.
    Malformed,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "profile not found"),
            Self::InvalidName => write!(f, "invalid profile name"),
            Self::Malformed => write!(f, "malformed profile"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for ProfileError {}
