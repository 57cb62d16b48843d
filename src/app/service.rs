//! Control service: the periodic loop around the kernel.
//!
//! [`ControlService`] owns the kernel and the per-tick collaborators
//! (thermocouple, watchdog, storage).  All I/O flows through port traits,
//! making the loop testable with mock adapters.
//!
//! ```text
//!  COMMAND_CHANNEL ──▶ ┌────────────────────────┐ ──▶ TelemetrySink
//!                      │     ControlService      │ ──▶ REPLY_CHANNEL
//!  TemperatureSource ─▶│  drain · tick · publish │
//!                      └────────────────────────┘
//!                        pace: sleep the rest of the period,
//!                        or report an overrun and go again
//! ```

use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::control::kernel::{ControlKernel, TickOutcome};
use crate::runtime;

use super::channels::{CommandChannel, ReplyChannel};
use super::commands::Command;
use super::events::Reply;
use super::ports::{Clock, ConfigPort, ProfileStore, TelemetrySink, TemperatureSource, Watchdog};

/// What to do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Sleep for the remainder of the period.
    Wait(Duration),
    /// The step took the whole period (or longer); go again without waiting.
    Overrun(Duration),
}

/// Decide how long to wait after a step that took `elapsed`.
pub fn pace(period: Duration, elapsed: Duration) -> Pacing {
    if elapsed < period {
        Pacing::Wait(period - elapsed)
    } else {
        Pacing::Overrun(elapsed)
    }
}

/// Result of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub outcome: TickOutcome,
    pub elapsed: Duration,
}

// ───────────────────────────────────────────────────────────────
// ControlService
// ───────────────────────────────────────────────────────────────

pub struct ControlService<'e, P, C, T, W, S> {
    kernel: ControlKernel<'e, P, C>,
    sensor: T,
    watchdog: W,
    store: S,
    commands: &'e CommandChannel,
    replies: &'e ReplyChannel,
    overruns: u32,
}

impl<'e, P, C, T, W, S> ControlService<'e, P, C, T, W, S>
where
    P: OutputPin + 'static,
    C: Clock,
    T: TemperatureSource,
    W: Watchdog,
    S: ConfigPort + ProfileStore,
{
    pub fn new(
        kernel: ControlKernel<'e, P, C>,
        sensor: T,
        watchdog: W,
        store: S,
        commands: &'e CommandChannel,
        replies: &'e ReplyChannel,
    ) -> Self {
        Self {
            kernel,
            sensor,
            watchdog,
            store,
            commands,
            replies,
            overruns: 0,
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply one external command.  Never fails; bad input is logged.
    pub fn handle_command(&mut self, cmd: Command) {
        debug!("Command: {:?}", cmd);
        match cmd {
            Command::Start => self.kernel.start(),
            Command::Stop => self.kernel.stop(),
            Command::Pause => self.kernel.pause(),
            Command::Resume => self.kernel.resume(),
            Command::Reset => self.kernel.reset(),
            Command::Setpoint { setpoint } => {
                if !setpoint.is_finite() {
                    warn!("Ignoring non-finite setpoint");
                    return;
                }
                self.kernel.set_manual_setpoint(setpoint);
                self.kernel.start();
            }
            Command::Load { name } => self.kernel.set_program(name.as_deref(), &self.store),
            Command::Configure { config } => {
                if let Err(e) = config.validate() {
                    warn!("Rejected configuration: {}", e);
                    self.reply(Reply::failed("configure", e));
                    return;
                }
                if let Err(e) = ConfigPort::save(&mut self.store, &config) {
                    warn!("Configuration applied but not persisted: {}", e);
                }
                self.kernel.update_config(config);
                info!(
                    "Configuration updated (gains apply on reset, relay timing on start, \
                     current sampling on next boot)"
                );
            }
            Command::ListProfiles => {
                let reply = match self.store.list() {
                    Ok(names) => Reply::Profiles { names },
                    Err(e) => Reply::failed("list_profiles", e),
                };
                self.reply(reply);
            }
            Command::SaveProfile { profile } => {
                let name = profile.name.clone();
                let reply = match ProfileStore::save(&mut self.store, &name, &profile) {
                    Ok(()) => {
                        info!("Saved profile '{}'", name);
                        Reply::ProfileSaved { name }
                    }
                    Err(e) => {
                        warn!("Could not save profile '{}': {}", name, e);
                        Reply::failed("save_profile", e)
                    }
                };
                self.reply(reply);
            }
            Command::DeleteProfile { name } => {
                let reply = match self.store.delete(&name) {
                    Ok(()) => {
                        info!("Deleted profile '{}'", name);
                        Reply::ProfileDeleted { name }
                    }
                    Err(e) => Reply::failed("delete_profile", e),
                };
                self.reply(reply);
            }
            Command::GetSettings => {
                let config = self.kernel.config().clone();
                self.reply(Reply::Settings { config });
            }
        }
    }

    /// Queue a reply.  A full reply channel drops it.
    fn reply(&self, reply: Reply) {
        if self.replies.try_send(reply).is_err() {
            debug!("Reply dropped (queue full)");
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.commands.try_receive() {
            self.handle_command(cmd);
        }
    }

    // ── Per-period orchestration ──────────────────────────────

    /// One loop iteration: drain commands → tick → publish telemetry.
    pub fn step(&mut self, sink: &mut impl TelemetrySink) -> Step {
        let started = self.kernel.clock().now();

        self.drain_commands();
        let outcome = self.kernel.tick(&mut self.sensor, &self.watchdog);

        let record = self.kernel.info();
        if let Err(e) = sink.push(&record) {
            debug!("Telemetry dropped: {}", e);
        }

        Step {
            outcome,
            elapsed: self.kernel.clock().now().saturating_sub(started),
        }
    }

    /// Pace the loop after a step, counting overruns.
    pub fn pace_step(&mut self, elapsed: Duration) -> Pacing {
        let period = self.kernel.config().period();
        let pacing = pace(period, elapsed);
        if let Pacing::Overrun(took) = pacing {
            self.overruns = self.overruns.saturating_add(1);
            warn!(
                "Control loop overrun: {:?} >= period {:?} ({} total)",
                took, period, self.overruns
            );
        }
        pacing
    }

    /// Run the control loop forever.
    pub async fn run(&mut self, sink: &mut impl TelemetrySink) {
        info!("Control loop running (period={:?})", self.kernel.config().period());
        loop {
            let step = self.step(sink);
            match self.pace_step(step.elapsed) {
                Pacing::Wait(rest) => runtime::sleep(rest).await,
                // No wait, but let the relay and current workers run.
                Pacing::Overrun(_) => futures_lite::future::yield_now().await,
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn kernel(&self) -> &ControlKernel<'e, P, C> {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut ControlKernel<'e, P, C> {
        &mut self.kernel
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn overruns(&self) -> u32 {
        self.overruns
    }
}
