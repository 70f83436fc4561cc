//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::checkpoint::Checkpoint;
use crate::fsm::StateId;

/// Structured events emitted by the sequencer.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The sequencer started (carries the initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// The plan about to run.
    PlanLoaded { steps: usize, total_minutes: f64 },

    /// Resuming from a checkpoint instead of starting fresh.
    Resumed(Checkpoint),

    /// A configured device is disabled and was not set up.
    DeviceSkipped(String),

    /// A device's initial state was applied.
    DeviceInitialised { key: String, state: String },

    /// A step is about to run after `wait_secs`.
    StepScheduled {
        /// 1-based position for progress display.
        number: usize,
        count: usize,
        key: String,
        state: String,
        wait_secs: f64,
    },

    /// A step's command was accepted by the hardware.
    StepApplied { index: usize, key: String, state: String },

    /// A step targets a disabled device and was passed over.
    StepSkipped { index: usize, device: String },

    /// Waiting for the operator before the next step.
    AwaitingAdvance { index: usize },

    /// The last step of a pass ran.
    PassComplete { passes: u64 },

    /// The sequencer stopped.
    Halted,
}
