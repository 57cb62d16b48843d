//! GPIO / peripheral pin assignments for the kiln controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Heater relay (SSR or contactor coil driver)
// ---------------------------------------------------------------------------

/// Digital output: HIGH = heating element energised.
pub const RELAY_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Thermocouple converter (MAX31855, SPI2)
// ---------------------------------------------------------------------------

/// SPI clock.
pub const THERMOCOUPLE_SCK_GPIO: i32 = 12;
/// SPI MISO (the MAX31855 is read-only, MOSI is unused).
pub const THERMOCOUPLE_MISO_GPIO: i32 = 13;
/// Chip select, active LOW.
pub const THERMOCOUPLE_CS_GPIO: i32 = 10;
/// SPI clock rate (MAX31855 tops out at 5 MHz).
pub const THERMOCOUPLE_SPI_HZ: u32 = 4_000_000;

// ---------------------------------------------------------------------------
// Current transformer (analog, ADC1)
// ---------------------------------------------------------------------------

/// CT clamp burden-resistor voltage, biased to mid-rail.
/// ADC1 channel 1 (GPIO 2 on ESP32-S3).
pub const CT_ADC_GPIO: i32 = 2;
