//! Sensor drivers.
//!
//! - [`thermocouple`]: kiln temperature (MAX31855 over SPI), plus host
//!   simulations.
//! - [`current`]: heater current (CT clamp on ADC1, windowed RMS).

pub mod current;
pub mod thermocouple;
