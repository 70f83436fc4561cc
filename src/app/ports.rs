//! Port traits: the hexagonal boundary between sequencing logic and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (valves, checkpoint file, clock, event sinks, analyzer,
//! time-series sinks) implement these traits.  The
//! [`AppService`](super::service::AppService) and the
//! [`TelemetryReader`](crate::telemetry::TelemetryReader) consume them via
//! generics, so the domain core never touches hardware directly.

use crate::checkpoint::Checkpoint;
use crate::error::{ActuatorError, ConfigError, PersistenceError, TelemetryError};
use crate::sequence::{LogicalState, Port};
use crate::telemetry::TelemetryRecord;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → valves)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command a valve.
pub trait ActuatorPort {
    /// Drive `device` at `port` to `state`.  Returns only after the
    /// hardware accepted the command.
    fn apply(&mut self, device: &str, port: Port, state: &LogicalState) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Checkpoint port (driven adapter: domain ↔ restart point)
// ───────────────────────────────────────────────────────────────

/// Durable restart point.  Written only from the sequencer thread.
pub trait CheckpointPort {
    /// `Ok(None)` means start fresh.
    fn load(&self) -> Result<Option<Checkpoint>, ConfigError>;

    /// Overwrite the checkpoint.  Completes before returning.
    fn save(&mut self, checkpoint: Checkpoint) -> Result<(), PersistenceError>;
}

// ───────────────────────────────────────────────────────────────
// Delay port (driven adapter: domain → wall clock / operator)
// ───────────────────────────────────────────────────────────────

/// Blocking waits between steps.
pub trait DelayPort {
    /// Sleep for `secs` seconds.
    fn sleep(&mut self, secs: f64);

    /// Block until the operator signals a manual advance.
    fn await_advance(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Telemetry ports (background reader)
// ───────────────────────────────────────────────────────────────

/// Source of terminator-framed analyzer messages.
pub trait AnalyzerPort {
    /// Block until one complete frame (terminator stripped) is available.
    fn read_frame(&mut self) -> Result<Vec<u8>, TelemetryError>;

    /// Drop and reopen the underlying connection.
    fn reconnect(&mut self) -> Result<(), TelemetryError>;
}

/// Destination for combined telemetry records.
pub trait TelemetrySink: Send {
    fn name(&self) -> &'static str;

    fn write(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError>;
}
