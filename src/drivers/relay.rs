//! Heater relay output pin.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives [`RELAY_GPIO`](crate::pins::RELAY_GPIO) through the
//! sys GPIO API (configured by hw_init).  On host/test: writes a static
//! AtomicBool that the simulated oven reads back.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::ActuatorError;

#[cfg(not(target_os = "espidf"))]
static SIM_RELAY_LEVEL: AtomicBool = AtomicBool::new(false);

/// Level last written by a simulated [`RelayPin`].
#[cfg(not(target_os = "espidf"))]
pub fn sim_relay_level() -> bool {
    SIM_RELAY_LEVEL.load(Ordering::Relaxed)
}

impl embedded_hal::digital::Error for ActuatorError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Relay GPIO.  HIGH energises the element.
#[derive(Debug)]
pub struct RelayPin {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    gpio: i32,
}

impl RelayPin {
    pub fn new(gpio: i32) -> Self {
        Self { gpio }
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, high: bool) -> Result<(), ActuatorError> {
        hw_init::gpio_write(self.gpio, high).map_err(|rc| {
            log::warn!("Relay: gpio_set_level({}) rc={}", self.gpio, rc);
            ActuatorError::RelayWriteFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, high: bool) -> Result<(), ActuatorError> {
        SIM_RELAY_LEVEL.store(high, Ordering::Relaxed);
        Ok(())
    }
}

impl ErrorType for RelayPin {
    type Error = ActuatorError;
}

impl OutputPin for RelayPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}
