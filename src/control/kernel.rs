//! Control kernel: the firing state machine.
//!
//! ```text
//!            start()             pause()
//!  Stopped ──────────▶ Running ──────────▶ Paused
//!     ▲                 │  ▲                 │
//!     │     stop()      │  └─── resume() ────┘
//!     └─────────────────┴──── stop() ◀───────┘
//! ```
//!
//! One [`tick`](ControlKernel::tick) per control period:
//!
//! 1. read the thermocouple, feed the watchdog (every tick, any state)
//! 2. stopped → nothing else
//! 3. sensor fault → `stop()` in this same tick, before any relay output
//! 4. target from the loaded profile at `runtime()`, or the manual setpoint
//! 5. profile finished → `stop()`
//! 6. PID → duty → relay actuator
//!
//! The tick never awaits, so the relay and current workers can never
//! observe it half-done.
//!
//! Invalid transitions (`start` while running, `resume` while running, ...)
//! are silent no-ops.

use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{error, info};

use crate::app::events::TelemetryRecord;
use crate::app::ports::{Clock, ProfileStore, TemperatureSource, Watchdog};
use crate::config::ControllerConfig;
use crate::control::pid::PidDriver;
use crate::control::profile::{Profile, Setpoint};
use crate::drivers::duty_cycle::DutyCycleActuator;
use crate::runtime::TaskExecutor;
use crate::sensors::current::CurrentReading;

/// Coarse kernel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Not running; sensor read and watchdog fed only.
    Idle,
    /// Closed-loop step applied this duty.
    Regulating { duty: f32 },
    /// Sensor reported a fault; the kernel stopped.
    SensorFault,
    /// The profile ran out of waypoints; the kernel stopped.
    ProfileFinished,
}

/// Mutable controller state.  Only the kernel writes it.
///
/// `paused` implies `running`; `duty` stays within `[0, MaxDuty]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerState {
    /// Last reading, `None` on sensor fault.
    pub temperature: Option<f32>,
    pub duty: f32,
    /// Current target (°C).  The manual setpoint when no profile is loaded.
    pub setpoint: f32,
    pub running: bool,
    pub paused: bool,
    /// Clock reading at start, shifted forward by time spent paused.
    pub cycle_start: Duration,
    pub paused_at: Option<Duration>,
}

impl ControllerState {
    const STOPPED: Self = Self {
        temperature: None,
        duty: 0.0,
        setpoint: 0.0,
        running: false,
        paused: false,
        cycle_start: Duration::ZERO,
        paused_at: None,
    };
}

/// Orchestrates PID, profile, relay actuator and current reading.
pub struct ControlKernel<'e, P, C> {
    executor: &'e TaskExecutor,
    config: ControllerConfig,
    clock: C,
    pid: PidDriver,
    actuator: DutyCycleActuator<P>,
    profile: Option<Profile>,
    current: CurrentReading,
    state: ControllerState,
    /// Clock reading at the last PID update of this firing.
    last_compute: Option<Duration>,
}

impl<'e, P: OutputPin + 'static, C: Clock> ControlKernel<'e, P, C> {
    /// Build a stopped kernel.  The relay is driven LOW immediately.
    pub fn new(
        executor: &'e TaskExecutor,
        config: ControllerConfig,
        relay: P,
        clock: C,
        current: CurrentReading,
    ) -> Self {
        Self {
            executor,
            pid: PidDriver::new(config.pid_settings()),
            actuator: DutyCycleActuator::new(relay, config.duty_settings()),
            config,
            clock,
            profile: None,
            current,
            state: ControllerState::STOPPED,
            last_compute: None,
        }
    }

    // ── Transitions ───────────────────────────────────────────

    pub fn start(&mut self) {
        if self.state.running || self.state.paused {
            return;
        }
        self.actuator.set_settings(self.config.duty_settings());
        self.actuator.start(self.executor);
        self.pid.set_auto_mode(true, Some(self.state.duty));
        self.state.cycle_start = self.clock.now();
        self.state.running = true;
        self.last_compute = None;
        info!(
            "Firing started (target={:.1}, profile={})",
            self.state.setpoint,
            self.profile_name().unwrap_or("none")
        );
    }

    pub fn pause(&mut self) {
        if self.state.paused || !self.state.running {
            return;
        }
        self.state.paused = true;
        self.state.paused_at = Some(self.clock.now());
        info!("Firing paused at runtime {:.1} s", self.runtime());
    }

    pub fn resume(&mut self) {
        let Some(paused_at) = self.state.paused_at.filter(|_| self.state.running) else {
            return;
        };
        let held = self.clock.now().saturating_sub(paused_at);
        self.state.cycle_start += held;
        self.state.paused = false;
        self.state.paused_at = None;
        info!("Firing resumed after {:.1} s pause", held.as_secs_f32());
    }

    /// Force the safe state: relay OFF, duty and setpoint zero, PID manual.
    ///
    /// Repeating it changes nothing.
    pub fn stop(&mut self) {
        let was_running = self.state.running;
        self.state.running = false;
        self.state.paused = false;
        self.state.paused_at = None;
        self.state.setpoint = 0.0;
        self.state.duty = 0.0;
        self.actuator.set_duty(0.0);
        self.actuator.stop();
        self.pid.set_auto_mode(false, None);
        self.last_compute = None;
        if was_running {
            info!("Firing stopped");
        }
    }

    /// `stop()`, then rebuild the PID from the current gains.
    pub fn reset(&mut self) {
        self.stop();
        self.pid = PidDriver::new(self.config.pid_settings());
        info!(
            "Controller reset (Kp={}, Ki={}, Kd={}, PoM={})",
            self.config.kp, self.config.ki, self.config.kd, self.config.proportional_on_measurement
        );
    }

    // ── Tick ──────────────────────────────────────────────────

    pub fn tick(&mut self, sensor: &mut impl TemperatureSource, watchdog: &impl Watchdog) -> TickOutcome {
        self.state.temperature = sensor.read();
        watchdog.feed();

        if !self.state.running {
            return TickOutcome::Idle;
        }

        let Some(temperature) = self.state.temperature else {
            error!("Temperature sensor fault, stopping");
            self.stop();
            return TickOutcome::SensorFault;
        };

        let target = match self.target() {
            Setpoint::Target(t) => t,
            Setpoint::Finished => {
                info!("Profile '{}' finished", self.profile_name().unwrap_or("?"));
                self.stop();
                return TickOutcome::ProfileFinished;
            }
        };

        self.state.setpoint = target;
        self.pid.set_setpoint(target);
        let dt = self.elapsed_since_compute();
        let output = self.pid.compute(temperature, dt);
        self.actuator.set_duty(output);
        self.state.duty = self.actuator.duty();
        TickOutcome::Regulating {
            duty: self.state.duty,
        }
    }

    /// Seconds since the previous PID update.  Zero on the first update of
    /// a firing, which makes the PID fall back to its sample period.
    fn elapsed_since_compute(&mut self) -> f32 {
        let now = self.clock.now();
        let dt = self
            .last_compute
            .map_or(0.0, |last| now.saturating_sub(last).as_secs_f32());
        self.last_compute = Some(now);
        dt
    }

    fn target(&self) -> Setpoint {
        match &self.profile {
            Some(profile) => profile.get_setpoint(self.runtime()),
            None => Setpoint::Target(self.state.setpoint),
        }
    }

    // ── Profile / setpoint ────────────────────────────────────

    /// Load a named profile, or unload with `None`.
    ///
    /// Any load failure is logged and leaves the kernel in manual mode.
    pub fn set_program(&mut self, name: Option<&str>, store: &impl ProfileStore) {
        let Some(name) = name else {
            self.profile = None;
            info!("Profile unloaded, manual setpoint mode");
            return;
        };
        match store.load(name) {
            Ok(profile) => {
                info!(
                    "Profile '{}' loaded ({} waypoints, {:.0} s)",
                    profile.name,
                    profile.waypoints().len(),
                    profile.duration()
                );
                self.profile = Some(profile);
            }
            Err(e) => {
                error!("Error loading profile '{}': {}", name, e);
                self.profile = None;
            }
        }
    }

    /// Install an already-parsed profile.
    pub fn set_profile(&mut self, profile: Option<Profile>) {
        self.profile = profile;
    }

    /// Drop any profile and hold `setpoint`.
    pub fn set_manual_setpoint(&mut self, setpoint: f32) {
        self.profile = None;
        self.state.setpoint = setpoint;
        info!("Setpoint set to {:.1}", setpoint);
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    fn profile_name(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.name.as_str())
    }

    // ── Configuration ─────────────────────────────────────────

    /// Replace configuration.  PID gains apply on the next `reset()`,
    /// relay timing on the next `start()`.  Current sampling settings are
    /// only read at boot.
    pub fn update_config(&mut self, config: ControllerConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ── Queries ───────────────────────────────────────────────

    /// Firing time in seconds, excluding pauses.  Zero when stopped.
    pub fn runtime(&self) -> f32 {
        if !self.state.running {
            return 0.0;
        }
        let end = self.state.paused_at.unwrap_or_else(|| self.clock.now());
        end.saturating_sub(self.state.cycle_start).as_secs_f32()
    }

    pub fn run_state(&self) -> RunState {
        match (self.state.running, self.state.paused) {
            (false, _) => RunState::Stopped,
            (true, false) => RunState::Running,
            (true, true) => RunState::Paused,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn relay_energised(&self) -> bool {
        self.actuator.is_energised()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Snapshot for telemetry.  Never mutates.
    pub fn info(&self) -> TelemetryRecord {
        let (p, i, d) = self.pid.components();
        TelemetryRecord {
            temp: self.state.temperature,
            duty: self.state.duty,
            target: self.state.setpoint,
            running: self.state.running,
            runtime: self.runtime(),
            paused: self.state.paused,
            current: self.current.get(),
            p,
            i,
            d,
        }
    }
}
