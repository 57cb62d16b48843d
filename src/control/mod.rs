//! Closed-loop temperature control: PID, ramp/soak profiles and the
//! firing state machine that ties them to the relay.

pub mod kernel;
pub mod pid;
pub mod profile;
