//! Application core: domain logic behind port traits.
//!
//! This module contains the command surface, telemetry records and the
//! control service that paces the kernel.  All interaction with hardware
//! happens through **port traits** defined in [`ports`], keeping this layer
//! fully testable without real peripherals.

pub mod channels;
pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
