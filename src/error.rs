//! Hardware-facing error types for the kiln controller firmware.
//!
//! All variants are `Copy` so they can be logged and passed around the
//! control loop without allocation.
//!
//! Persistence errors (`ConfigError`, `ProfileError`) live beside their port
//! traits in [`crate::app::ports`].

use core::fmt;

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error or timed out.
    AdcReadFailed,
    /// SPI transfer to the thermocouple converter failed.
    BusFault,
    /// Thermocouple is not connected (open circuit).
    OpenCircuit,
    /// Thermocouple is shorted to GND.
    ShortToGround,
    /// Thermocouple is shorted to VCC.
    ShortToVcc,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::BusFault => write!(f, "SPI bus fault"),
            Self::OpenCircuit => write!(f, "thermocouple open circuit"),
            Self::ShortToGround => write!(f, "thermocouple shorted to GND"),
            Self::ShortToVcc => write!(f, "thermocouple shorted to VCC"),
        }
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Relay GPIO write failed.
    RelayWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelayWriteFailed => write!(f, "relay write failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Telemetry errors
// ---------------------------------------------------------------------------

/// Telemetry is best-effort: these are logged and dropped, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryError {
    /// The outbound queue is full; the record was discarded.
    Dropped,
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dropped => write!(f, "record dropped (queue full)"),
        }
    }
}

impl std::error::Error for SensorError {}
impl std::error::Error for ActuatorError {}
impl std::error::Error for TelemetryError {}
