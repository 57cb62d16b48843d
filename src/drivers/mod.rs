//! Actuator drivers, hardware initialisation, and peripheral helpers.

pub mod duty_cycle;
pub mod hw_init;
pub mod relay;
pub mod watchdog;
