//! K-type thermocouple via MAX31855 cold-junction-compensated converter.
//!
//! The converter clocks out one 32-bit frame per chip-select:
//!
//! ```text
//!  31           18 17 16 15          4  3  2   1   0
//!  ┌─────────────┬──┬──┬─────────────┬──┬───┬───┬──┐
//!  │ TC temp 14b │ r│ F│ CJ temp 12b │ r│SCV│SCG│OC│
//!  └─────────────┴──┴──┴─────────────┴──┴───┴───┴──┘
//!   0.25 °C LSB        0.0625 °C LSB
//! ```
//!
//! ## Dual-target design
//!
//! On ESP-IDF: [`Max31855`] over any `embedded-hal` `SpiDevice`.
//! On host/test: [`SimThermocouple`] (settable reading) and
//! [`SimulatedOven`] (first-order thermal model).

use embedded_hal::spi::SpiDevice;
use log::warn;

use crate::app::ports::TemperatureSource;
use crate::error::SensorError;

const FAULT_BIT: u32 = 1 << 16;
const OPEN_CIRCUIT_BIT: u32 = 1 << 0;
const SHORT_GND_BIT: u32 = 1 << 1;
const SHORT_VCC_BIT: u32 = 1 << 2;

const TC_LSB_C: f32 = 0.25;
const CJ_LSB_C: f32 = 0.0625;

/// Decode the thermocouple temperature (°C) from a raw frame.
pub fn decode_frame(frame: u32) -> Result<f32, SensorError> {
    if frame & FAULT_BIT != 0 {
        return Err(if frame & OPEN_CIRCUIT_BIT != 0 {
            SensorError::OpenCircuit
        } else if frame & SHORT_GND_BIT != 0 {
            SensorError::ShortToGround
        } else if frame & SHORT_VCC_BIT != 0 {
            SensorError::ShortToVcc
        } else {
            SensorError::BusFault
        });
    }
    // Arithmetic shift sign-extends the 14-bit field.
    let raw = (frame as i32) >> 18;
    Ok(raw as f32 * TC_LSB_C)
}

/// Decode the cold-junction (board) temperature (°C) from a raw frame.
pub fn decode_cold_junction(frame: u32) -> f32 {
    let raw = ((frame as i32) << 16) >> 20;
    raw as f32 * CJ_LSB_C
}

/// MAX31855 driver.
pub struct Max31855<SPI> {
    spi: SPI,
    cold_junction_c: f32,
}

impl<SPI: SpiDevice> Max31855<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self {
            spi,
            cold_junction_c: 0.0,
        }
    }

    pub fn read_frame(&mut self) -> Result<u32, SensorError> {
        let mut buf = [0u8; 4];
        self.spi.read(&mut buf).map_err(|e| {
            warn!("Thermocouple: SPI read failed ({:?})", e);
            SensorError::BusFault
        })?;
        Ok(u32::from_be_bytes(buf))
    }

    pub fn read_celsius(&mut self) -> Result<f32, SensorError> {
        let frame = self.read_frame()?;
        self.cold_junction_c = decode_cold_junction(frame);
        decode_frame(frame)
    }

    /// Cold-junction temperature from the last successful frame.
    pub fn cold_junction_c(&self) -> f32 {
        self.cold_junction_c
    }
}

impl<SPI: SpiDevice> TemperatureSource for Max31855<SPI> {
    fn read(&mut self) -> Option<f32> {
        match self.read_celsius() {
            Ok(t) => Some(t),
            Err(e) => {
                warn!("Thermocouple: {}", e);
                None
            }
        }
    }
}

// ── Simulation ────────────────────────────────────────────────

/// Thermocouple stand-in whose reading is set from outside.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Default)]
pub struct SimThermocouple {
    reading: std::rc::Rc<core::cell::Cell<Option<f32>>>,
}

#[cfg(not(target_os = "espidf"))]
impl SimThermocouple {
    pub fn new(celsius: f32) -> Self {
        let sim = Self::default();
        sim.set(Some(celsius));
        sim
    }

    /// Set the next reading; `None` simulates a sensor fault.
    pub fn set(&self, reading: Option<f32>) {
        self.reading.set(reading);
    }
}

#[cfg(not(target_os = "espidf"))]
impl TemperatureSource for SimThermocouple {
    fn read(&mut self) -> Option<f32> {
        self.reading.get()
    }
}

/// First-order kiln model: heats at `heat_rate` °C/s while the element is
/// energised and loses heat toward ambient at `loss` per second.  Each
/// `read()` advances the model by one step.
#[cfg(not(target_os = "espidf"))]
pub struct SimulatedOven {
    temperature: f32,
    ambient: f32,
    heat_rate: f32,
    loss: f32,
    step_secs: f32,
    heater: Box<dyn Fn() -> bool>,
}

#[cfg(not(target_os = "espidf"))]
impl SimulatedOven {
    pub fn new(ambient: f32, heat_rate: f32, loss: f32, step_secs: f32, heater: impl Fn() -> bool + 'static) -> Self {
        Self {
            temperature: ambient,
            ambient,
            heat_rate,
            loss,
            step_secs,
            heater: Box::new(heater),
        }
    }

    /// Model driven by the simulated relay output.
    pub fn with_sim_relay(ambient: f32, step_secs: f32) -> Self {
        Self::new(ambient, 2.0, 0.002, step_secs, crate::drivers::relay::sim_relay_level)
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}

#[cfg(not(target_os = "espidf"))]
impl TemperatureSource for SimulatedOven {
    fn read(&mut self) -> Option<f32> {
        let heating = if (self.heater)() { self.heat_rate } else { 0.0 };
        let cooling = self.loss * (self.temperature - self.ambient);
        self.temperature += (heating - cooling) * self.step_secs;
        Some(self.temperature)
    }
}
