//! Integration tests for the ControlService → kernel → telemetry pipeline.
//!
//! These verify that commands arriving on the channel reach the kernel
//! before the tick, that telemetry failures never disturb control, and that
//! the loop paces itself against the control period.

use std::time::Duration;

use kilnctl::adapters::telemetry::ChannelTelemetrySink;
use kilnctl::app::channels::{self, CommandChannel, ReplyChannel, SubmitError, TelemetryChannel};
use kilnctl::app::commands::Command;
use kilnctl::app::events::Reply;
use kilnctl::app::service::{ControlService, Pacing};
use kilnctl::config::ControllerConfig;
use kilnctl::control::kernel::{ControlKernel, RunState, TickOutcome};
use kilnctl::control::profile::{Profile, Waypoint};
use kilnctl::runtime::{self, TaskExecutor};
use kilnctl::sensors::current::CurrentReading;

use crate::mock_hw::{
    CountingWatchdog, ManualClock, MemoryStore, RecordingRelay, RecordingSink, ScriptedSensor,
};

type Service<'e> =
    ControlService<'e, RecordingRelay, ManualClock, ScriptedSensor, CountingWatchdog, MemoryStore>;

struct Rig {
    clock: ManualClock,
    relay: RecordingRelay,
    sensor: ScriptedSensor,
    watchdog: CountingWatchdog,
    replies: ReplyChannel,
}

impl Rig {
    fn new() -> Self {
        Self {
            clock: ManualClock::at(0),
            relay: RecordingRelay::default(),
            sensor: ScriptedSensor::new(20.0),
            watchdog: CountingWatchdog::default(),
            replies: ReplyChannel::new(),
        }
    }

    fn service<'e>(
        &'e self,
        executor: &'e TaskExecutor,
        commands: &'e CommandChannel,
        store: MemoryStore,
    ) -> Service<'e> {
        let kernel = ControlKernel::new(
            executor,
            ControllerConfig::default(),
            self.relay.clone(),
            self.clock.clone(),
            CurrentReading::default(),
        );
        ControlService::new(
            kernel,
            self.sensor.clone(),
            self.watchdog.clone(),
            store,
            commands,
            &self.replies,
        )
    }
}

fn bisque() -> Profile {
    Profile::new("bisque", &[Waypoint::new(100.0, 60.0), Waypoint::new(600.0, 600.0)]).unwrap()
}

// ── Command dispatch ──────────────────────────────────────────

#[test]
fn queued_commands_apply_before_the_tick() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::default());
    let mut sink = RecordingSink::default();

    assert_eq!(channels::submit(&commands, r#"{"command":"setpoint","setpoint":250}"#), Ok(()));
    let step = service.step(&mut sink);

    assert!(matches!(step.outcome, TickOutcome::Regulating { duty } if duty > 0.0));
    assert_eq!(sink.records.len(), 1);
    let rec = sink.records[0];
    assert!(rec.running);
    assert_eq!(rec.target, 250.0);
    assert_eq!(rec.temp, Some(20.0));
    assert!(commands.is_empty());
}

#[test]
fn transition_commands_drive_the_state_machine() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::default());

    service.handle_command(Command::Start);
    assert_eq!(service.kernel().run_state(), RunState::Running);
    service.handle_command(Command::Pause);
    assert_eq!(service.kernel().run_state(), RunState::Paused);
    service.handle_command(Command::Resume);
    assert_eq!(service.kernel().run_state(), RunState::Running);
    service.handle_command(Command::Stop);
    assert_eq!(service.kernel().run_state(), RunState::Stopped);
    service.handle_command(Command::Stop);
    service.handle_command(Command::Reset);
    assert_eq!(service.kernel().run_state(), RunState::Stopped);
    assert_eq!(rig.relay.level(), Some(false));
}

#[test]
fn setpoint_command_unloads_profile_and_ignores_nan() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::with_profile(bisque()));

    service.handle_command(Command::Load {
        name: Some("bisque".into()),
    });
    assert!(service.kernel().profile().is_some());

    service.handle_command(Command::Setpoint { setpoint: f32::NAN });
    assert!(service.kernel().profile().is_some());
    assert_eq!(service.kernel().run_state(), RunState::Stopped);

    service.handle_command(Command::Setpoint { setpoint: 180.0 });
    assert!(service.kernel().profile().is_none());
    assert_eq!(service.kernel().state().setpoint, 180.0);
    assert_eq!(service.kernel().run_state(), RunState::Running);
}

#[test]
fn load_command_degrades_on_missing_profile() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::with_profile(bisque()));

    service.handle_command(Command::Load {
        name: Some("bisque".into()),
    });
    service.handle_command(Command::Load {
        name: Some("nope".into()),
    });
    assert!(service.kernel().profile().is_none());

    service.handle_command(Command::Load {
        name: Some("bisque".into()),
    });
    service.handle_command(Command::Load { name: None });
    assert!(service.kernel().profile().is_none());
}

#[test]
fn configure_validates_then_applies_and_persists() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::default());

    let bad = ControllerConfig {
        period_secs: -1.0,
        ..Default::default()
    };
    service.handle_command(Command::Configure { config: bad });
    assert_eq!(service.store().config_saves, 0);
    assert_eq!(service.kernel().config(), &ControllerConfig::default());

    let good = ControllerConfig {
        period_secs: 2.0,
        kp: 0.05,
        ..Default::default()
    };
    service.handle_command(Command::Configure {
        config: good.clone(),
    });
    assert_eq!(service.store().config_saves, 1);
    assert_eq!(service.store().config.as_ref(), Some(&good));
    assert_eq!(service.kernel().config(), &good);
    assert!(matches!(
        rig.replies.try_receive(),
        Ok(Reply::Failed { command: "configure", .. })
    ));
    assert!(rig.replies.is_empty());
}

#[test]
fn configure_persists_current_sampling_for_next_boot() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::default());

    let config = ControllerConfig {
        ct_rating: 50.0,
        ct_sample_count: 250,
        ..Default::default()
    };
    service.handle_command(Command::Start);
    service.handle_command(Command::Configure {
        config: config.clone(),
    });

    let saved = service.store().config.clone().unwrap();
    assert_eq!(saved.ct_sample_count, 250);
    assert_eq!(saved.ct_rating, 50.0);
    assert_eq!(service.kernel().config(), &config);
    assert_eq!(service.kernel().run_state(), RunState::Running);
}

// ── Profile management ────────────────────────────────────────

#[test]
fn list_profiles_replies_with_stored_names() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::with_profile(bisque()));

    channels::submit(&commands, r#"{"command":"list_profiles"}"#).unwrap();
    service.step(&mut RecordingSink::default());

    assert_eq!(
        rig.replies.try_receive(),
        Ok(Reply::Profiles {
            names: vec!["bisque".into()]
        })
    );
}

#[test]
fn save_profile_stores_under_its_own_name() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::default());

    service.handle_command(Command::SaveProfile { profile: bisque() });
    assert_eq!(
        rig.replies.try_receive(),
        Ok(Reply::ProfileSaved {
            name: "bisque".into()
        })
    );
    assert_eq!(service.store().profiles.get("bisque"), Some(&bisque()));

    service.handle_command(Command::Load {
        name: Some("bisque".into()),
    });
    assert_eq!(service.kernel().profile(), Some(&bisque()));
}

#[test]
fn delete_profile_replies_and_reports_missing() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::with_profile(bisque()));

    service.handle_command(Command::DeleteProfile {
        name: "bisque".into(),
    });
    assert_eq!(
        rig.replies.try_receive(),
        Ok(Reply::ProfileDeleted {
            name: "bisque".into()
        })
    );
    assert!(service.store().profiles.is_empty());

    service.handle_command(Command::DeleteProfile {
        name: "bisque".into(),
    });
    let reply = rig.replies.try_receive();
    assert!(
        matches!(&reply, Ok(Reply::Failed { command: "delete_profile", error }) if error.contains("not found")),
        "{reply:?}"
    );
}

#[test]
fn get_settings_replies_with_active_config() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::default());

    let config = ControllerConfig {
        kp: 0.07,
        ..Default::default()
    };
    service.handle_command(Command::Configure {
        config: config.clone(),
    });
    service.handle_command(Command::GetSettings);
    assert_eq!(rig.replies.try_receive(), Ok(Reply::Settings { config }));
}

#[test]
fn full_reply_channel_drops_replies() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::default());

    for _ in 0..(channels::REPLY_DEPTH + 2) {
        service.handle_command(Command::GetSettings);
    }
    assert_eq!(rig.replies.len(), channels::REPLY_DEPTH);
    assert_eq!(service.kernel().run_state(), RunState::Stopped);
}

#[test]
fn malformed_commands_are_not_queued() {
    let commands = CommandChannel::new();
    assert_eq!(channels::submit(&commands, "{\"command\":\"melt\"}"), Err(SubmitError::Invalid));
    assert!(commands.is_empty());
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn telemetry_failures_never_disturb_control() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::default());
    let mut sink = RecordingSink {
        reject: true,
        ..Default::default()
    };

    service.handle_command(Command::Setpoint { setpoint: 300.0 });
    for _ in 0..3 {
        let step = service.step(&mut sink);
        assert!(matches!(step.outcome, TickOutcome::Regulating { .. }));
    }
    assert_eq!(sink.rejected, 3);
    assert_eq!(rig.watchdog.feeds(), 3);
}

#[test]
fn full_telemetry_channel_drops_records() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let telemetry = TelemetryChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::default());
    let mut sink = ChannelTelemetrySink::new(&telemetry);

    for _ in 0..(channels::TELEMETRY_DEPTH + 3) {
        service.step(&mut sink);
    }
    assert_eq!(telemetry.len(), channels::TELEMETRY_DEPTH);
}

#[test]
fn sensor_fault_is_reported_in_telemetry() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::default());
    let mut sink = RecordingSink::default();

    service.handle_command(Command::Setpoint { setpoint: 300.0 });
    service.step(&mut sink);
    rig.sensor.set(None);
    let step = service.step(&mut sink);

    assert_eq!(step.outcome, TickOutcome::SensorFault);
    let last = sink.records.last().copied().unwrap();
    assert_eq!(last.temp, None);
    assert!(!last.running);
    assert_eq!(last.duty, 0.0);
}

// ── Pacing ────────────────────────────────────────────────────

#[test]
fn pacing_counts_overruns_only() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let mut service = rig.service(&executor, &commands, MemoryStore::default());

    let step = service.step(&mut RecordingSink::default());
    assert_eq!(step.elapsed, Duration::ZERO, "manual clock did not move");
    assert_eq!(service.pace_step(step.elapsed), Pacing::Wait(Duration::from_secs(1)));
    assert_eq!(service.overruns(), 0);

    assert_eq!(
        service.pace_step(Duration::from_millis(1_200)),
        Pacing::Overrun(Duration::from_millis(1_200))
    );
    assert_eq!(service.pace_step(Duration::from_secs(1)), Pacing::Overrun(Duration::from_secs(1)));
    assert_eq!(service.overruns(), 2);
}

#[test]
fn run_loop_ticks_once_per_period() {
    let executor = TaskExecutor::new();
    let commands = CommandChannel::new();
    let rig = Rig::new();
    let kernel = ControlKernel::new(
        &executor,
        ControllerConfig {
            period_secs: 0.02,
            min_on_time_secs: 0.0,
            ..Default::default()
        },
        rig.relay.clone(),
        kilnctl::adapters::time::MonotonicClock::new(),
        CurrentReading::default(),
    );
    let mut service = ControlService::new(
        kernel,
        rig.sensor.clone(),
        rig.watchdog.clone(),
        MemoryStore::default(),
        &commands,
        &rig.replies,
    );
    let mut sink = RecordingSink::default();
    channels::submit(&commands, r#"{"command":"setpoint","setpoint":400}"#).unwrap();

    runtime::run(
        &executor,
        futures_lite::future::or(service.run(&mut sink), runtime::sleep(Duration::from_millis(200))),
    );

    let ticks = sink.records.len();
    assert!((3..=15).contains(&ticks), "expected roughly 10 ticks, got {ticks}");
    assert!(sink.records.iter().all(|r| r.running));
    assert!(rig.relay.ever_high(), "relay worker ran alongside the loop");
}
