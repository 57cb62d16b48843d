//! Inter-task communication channels.
//!
//! Uses `embassy-sync` bounded MPMC channels to bridge transport adapters
//! with the control loop.  Both sides share these static channels without
//! heap allocation.
//!
//! ```text
//! ┌──────────────┐   Command        ┌──────────────┐
//! │  Transport   │─────────────────▶│ Control Loop │
//! │  (web, uart) │◀─────────────────│ (service)    │
//! └──────────────┘  TelemetryRecord └──────────────┘
//!                   Reply
//! ```
//!
//! The control loop only ever uses `try_receive` / `try_send`, so a slow
//! or absent transport never stalls a tick.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use super::commands::Command;
use super::events::{Reply, TelemetryRecord};

/// Channel depth for inbound commands.
pub const COMMAND_DEPTH: usize = 8;

/// Channel depth for outbound telemetry.
pub const TELEMETRY_DEPTH: usize = 4;

/// Channel depth for command replies.
pub const REPLY_DEPTH: usize = 4;

pub type CommandChannel = Channel<CriticalSectionRawMutex, Command, COMMAND_DEPTH>;
pub type TelemetryChannel = Channel<CriticalSectionRawMutex, TelemetryRecord, TELEMETRY_DEPTH>;
pub type ReplyChannel = Channel<CriticalSectionRawMutex, Reply, REPLY_DEPTH>;

/// Inbound command channel: transport → control loop.
pub static COMMAND_CHANNEL: CommandChannel = Channel::new();

/// Outbound telemetry channel: control loop → transport.
pub static TELEMETRY_CHANNEL: TelemetryChannel = Channel::new();

/// Replies to query and storage commands: control loop → transport.
pub static REPLY_CHANNEL: ReplyChannel = Channel::new();

/// Why a raw command was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// Not a valid command document.
    Invalid,
    /// The command queue is full.
    Busy,
}

/// Parse a JSON command and queue it for the control loop.
pub fn submit(channel: &CommandChannel, text: &str) -> Result<(), SubmitError> {
    let cmd = Command::parse(text).ok_or(SubmitError::Invalid)?;
    channel.try_send(cmd).map_err(|_| SubmitError::Busy)
}
