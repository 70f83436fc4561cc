//! Mock adapters for integration tests.
//!
//! Record every port call so tests can assert on the full command
//! history without touching serial ports or sysfs.

use valvectl::app::events::AppEvent;
use valvectl::app::ports::{ActuatorPort, CheckpointPort, DelayPort, EventSink};
use valvectl::checkpoint::Checkpoint;
use valvectl::error::{ActuatorError, ConfigError, PersistenceError};
use valvectl::sequence::{LogicalState, Port, state_key};

// ── MockValves ────────────────────────────────────────────────

/// Records `key=state` per accepted command.
#[derive(Default)]
pub struct MockValves {
    pub applied: Vec<String>,
    /// Reject the command with this 0-based call number.
    pub fail_at: Option<usize>,
    /// Transient failures to return before accepting anything.
    pub flaky: u32,
    pub calls: usize,
}

#[allow(dead_code)]
impl MockValves {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(call: usize) -> Self {
        Self {
            fail_at: Some(call),
            ..Self::default()
        }
    }
}

impl ActuatorPort for MockValves {
    fn apply(&mut self, device: &str, port: Port, state: &LogicalState) -> Result<(), ActuatorError> {
        if self.flaky > 0 {
            self.flaky -= 1;
            return Err(ActuatorError::NoAck {
                device: device.to_string(),
                reply: vec![0xAA, 0x01, 0x00, 0x00],
            });
        }
        let call = self.calls;
        self.calls += 1;
        if self.fail_at == Some(call) {
            return Err(ActuatorError::NotConnected(device.to_string()));
        }
        self.applied.push(format!("{}={state}", state_key(device, port)));
        Ok(())
    }
}

// ── MemCheckpoint ─────────────────────────────────────────────

#[derive(Default)]
pub struct MemCheckpoint {
    pub current: Option<Checkpoint>,
    pub saved: Vec<Checkpoint>,
    pub fail_saves: bool,
}

#[allow(dead_code)]
impl MemCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(step_index: usize, elapsed_seconds: f64) -> Self {
        Self {
            current: Some(Checkpoint::new(step_index, elapsed_seconds)),
            ..Self::default()
        }
    }
}

impl CheckpointPort for MemCheckpoint {
    fn load(&self) -> Result<Option<Checkpoint>, ConfigError> {
        Ok(self.current)
    }

    fn save(&mut self, checkpoint: Checkpoint) -> Result<(), PersistenceError> {
        if self.fail_saves {
            return Err(PersistenceError::Encode("disk full".into()));
        }
        self.current = Some(checkpoint);
        self.saved.push(checkpoint);
        Ok(())
    }
}

// ── MockClock ─────────────────────────────────────────────────

/// Never sleeps; records requested delays and manual waits.
#[derive(Default)]
pub struct MockClock {
    pub slept: Vec<f64>,
    pub advances: usize,
}

#[allow(dead_code)]
impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DelayPort for MockClock {
    fn sleep(&mut self, secs: f64) {
        self.slept.push(secs);
    }

    fn await_advance(&mut self) {
        self.advances += 1;
    }
}

// ── EventLog ──────────────────────────────────────────────────

#[derive(Default)]
pub struct EventLog {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
