//! Slow software PWM for the heater relay.
//!
//! The relay (SSR or contactor) switches at most once ON and once OFF per
//! period.  A worker task, independent of the control tick, replays the
//! latest commanded duty every period:
//!
//! ```text
//!  duty 0 / 1     ──────────────────── hold for the whole period
//!  on < min_on    ____________________ treated as OFF
//!  otherwise      ‾‾‾‾‾‾‾‾‾‾‾‾‾‾______ ON duty·period, OFF (1-duty)·period
//! ```
//!
//! ## Safety contract
//!
//! [`DutyCycleActuator::stop`] cancels the worker and drives the relay LOW
//! before returning.  A cancelled worker is never resumed; `start` spawns a
//! fresh one.

use core::cell::{Cell, RefCell};
use core::time::Duration;
use std::rc::Rc;

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::error::ActuatorError;
use crate::runtime::{self, Task, TaskExecutor};

/// Timing limits, derived from [`ControllerConfig`](crate::config::ControllerConfig).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DutySettings {
    /// PWM period.
    pub period: Duration,
    /// Shorter ON pulses are suppressed entirely.
    pub min_on_time: Duration,
    /// Commanded duty is clamped to `[0, max_duty]`.
    pub max_duty: f32,
}

/// What the relay does during one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePlan {
    /// Hold one level for the full period (no switching).
    Hold { energised: bool },
    /// One ON pulse followed by OFF for the remainder.
    Pulse { on: Duration, off: Duration },
}

impl CyclePlan {
    /// Total energised time within the period.
    pub fn on_time(&self, period: Duration) -> Duration {
        match *self {
            Self::Hold { energised: true } => period,
            Self::Hold { energised: false } => Duration::ZERO,
            Self::Pulse { on, .. } => on,
        }
    }
}

/// Plan one period for `duty`.
pub fn plan_cycle(duty: f32, settings: &DutySettings) -> CyclePlan {
    if duty.is_nan() || duty <= 0.0 {
        return CyclePlan::Hold { energised: false };
    }
    if duty >= 1.0 {
        return CyclePlan::Hold { energised: true };
    }

    let on = settings.period.mul_f32(duty);
    if on < settings.min_on_time {
        return CyclePlan::Hold { energised: false };
    }
    CyclePlan::Pulse {
        on,
        off: settings.period.saturating_sub(on),
    }
}

// ── Shared worker state ───────────────────────────────────────

struct RelayShared<P> {
    duty: Cell<f32>,
    energised: Cell<bool>,
    relay: RefCell<P>,
}

impl<P: OutputPin> RelayShared<P> {
    /// Drive the relay.  Failures are logged and contained here.
    fn drive(&self, on: bool) {
        let mut relay = self.relay.borrow_mut();
        let result = if on { relay.set_high() } else { relay.set_low() };
        match result {
            Ok(()) => self.energised.set(on),
            Err(e) => warn!("Relay: {} ({:?})", ActuatorError::RelayWriteFailed, e),
        }
    }
}

async fn run_cycles<P: OutputPin>(shared: Rc<RelayShared<P>>, settings: DutySettings) {
    loop {
        match plan_cycle(shared.duty.get(), &settings) {
            CyclePlan::Hold { energised } => {
                shared.drive(energised);
                runtime::sleep(settings.period).await;
            }
            CyclePlan::Pulse { on, off } => {
                shared.drive(true);
                runtime::sleep(on).await;
                shared.drive(false);
                runtime::sleep(off).await;
            }
        }
    }
}

// ── Actuator ──────────────────────────────────────────────────

/// Time-proportioning relay driver.
pub struct DutyCycleActuator<P> {
    shared: Rc<RelayShared<P>>,
    settings: DutySettings,
    worker: Option<Task<()>>,
}

impl<P: OutputPin + 'static> DutyCycleActuator<P> {
    /// Take ownership of the relay pin and drive it LOW.
    pub fn new(relay: P, settings: DutySettings) -> Self {
        let shared = Rc::new(RelayShared {
            duty: Cell::new(0.0),
            energised: Cell::new(false),
            relay: RefCell::new(relay),
        });
        shared.drive(false);
        Self {
            shared,
            settings,
            worker: None,
        }
    }

    pub fn settings(&self) -> &DutySettings {
        &self.settings
    }

    /// Replace timing limits.  A running worker keeps its old timing until
    /// the next `start`; the duty clamp applies from the next `set_duty`.
    pub fn set_settings(&mut self, settings: DutySettings) {
        self.settings = settings;
    }

    /// Command a duty fraction, clamped into `[0, max_duty]` (NaN → 0).
    pub fn set_duty(&self, duty: f32) {
        let duty = if duty.is_nan() {
            0.0
        } else {
            duty.clamp(0.0, self.settings.max_duty)
        };
        self.shared.duty.set(duty);
    }

    /// Currently commanded duty fraction.
    pub fn duty(&self) -> f32 {
        self.shared.duty.get()
    }

    /// Last level successfully written to the relay.
    pub fn is_energised(&self) -> bool {
        self.shared.energised.get()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawn the PWM worker.  No-op if already running.
    pub fn start(&mut self, executor: &TaskExecutor) {
        if self.worker.is_some() {
            return;
        }
        let task = executor.spawn(run_cycles(self.shared.clone(), self.settings));
        self.worker = Some(task);
        debug!("Relay PWM started (period={:?})", self.settings.period);
    }

    /// Cancel the worker and force the relay OFF.
    pub fn stop(&mut self) {
        if let Some(task) = self.worker.take() {
            drop(task);
            debug!("Relay PWM stopped");
        }
        self.shared.drive(false);
    }
}
