//! Telemetry sink adapters.
//!
//! - [`ChannelTelemetrySink`] queues records on a bounded channel for a
//!   transport task (WebSocket push) to pick up.  Never waits: a full queue
//!   drops the record.
//! - [`LogTelemetrySink`] writes a one-line summary to the serial log.

use log::info;

use crate::app::channels::TelemetryChannel;
use crate::app::events::TelemetryRecord;
use crate::app::ports::TelemetrySink;
use crate::error::TelemetryError;

/// Adapter that queues every record on a [`TelemetryChannel`].
pub struct ChannelTelemetrySink<'c> {
    channel: &'c TelemetryChannel,
}

impl<'c> ChannelTelemetrySink<'c> {
    pub fn new(channel: &'c TelemetryChannel) -> Self {
        Self { channel }
    }
}

impl TelemetrySink for ChannelTelemetrySink<'_> {
    fn push(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        self.channel.try_send(*record).map_err(|_| TelemetryError::Dropped)
    }
}

/// Adapter that logs every record to the serial console.
#[derive(Debug, Default)]
pub struct LogTelemetrySink;

impl LogTelemetrySink {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySink for LogTelemetrySink {
    fn push(&mut self, t: &TelemetryRecord) -> Result<(), TelemetryError> {
        let temp = t.temp.map_or_else(|| "FAULT".to_owned(), |c| format!("{c:.1}\u{00b0}C"));
        info!(
            "TELEM | {} | T={} target={:.1} | duty={:.2} | I={:.2}A | runtime={:.0}s | pid={:.3}/{:.3}/{:.3}",
            match (t.running, t.paused) {
                (false, _) => "STOPPED",
                (true, false) => "RUNNING",
                (true, true) => "PAUSED",
            },
            temp,
            t.target,
            t.duty,
            t.current,
            t.runtime,
            t.p,
            t.i,
            t.d,
        );
        Ok(())
    }
}

/// Fan one record out to two sinks.  Fails if either fails.
pub struct TeeSink<A, B>(pub A, pub B);

impl<A: TelemetrySink, B: TelemetrySink> TelemetrySink for TeeSink<A, B> {
    fn push(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        let a = self.0.push(record);
        let b = self.1.push(record);
        a.and(b)
    }
}
