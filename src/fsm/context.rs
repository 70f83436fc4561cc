//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the "blackboard" the state handlers read from and
//! write to.  Handlers never perform I/O themselves: they post a
//! [`Request`] that the [`AppService`](crate::app::service::AppService)
//! carries out through its ports before the next tick, then report the
//! result back through [`FsmContext::complete_step`] and friends.

use crate::checkpoint::Checkpoint;

// ---------------------------------------------------------------------------
// Run options (fixed for the lifetime of a run)
// ---------------------------------------------------------------------------

/// What this invocation of the sequencer should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Run the timed sequence.
    #[default]
    Sequence,
    /// Apply the initial device states, then stop.
    InitOnly,
    /// Apply a single command, then stop.  The checkpoint is untouched.
    ManualStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub mode: RunMode,
    /// Restart the plan after the last step.
    pub looping: bool,
    /// Wait for the operator instead of sleeping.
    pub manual_advance: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::Sequence,
            looping: true,
            manual_advance: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Position within the current pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cursor {
    /// Index of the next step to execute.
    pub step_index: usize,
    /// Plan-relative seconds already accounted for.
    pub time_passed: f64,
}

// ---------------------------------------------------------------------------
// Requests (written by state handlers; carried out by the service)
// ---------------------------------------------------------------------------

/// Work a state handler asks the service to perform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Request {
    #[default]
    None,
    /// Connect-time initial states of every enabled device.
    ApplyInitialStates,
    /// The operator-supplied single command.
    ApplyManualStep,
    /// Wait `wait_secs` (if positive), then execute step `index`.
    Execute { index: usize, wait_secs: f64 },
    /// Block for the manual-advance signal.
    AwaitAdvance,
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

pub struct FsmContext {
    // -- Plan --
    /// Scheduled time of each step in seconds, in plan order.
    pub offsets_secs: Vec<f64>,
    pub options: RunOptions,

    // -- Progress --
    pub cursor: Cursor,
    /// Checkpoint loaded at startup, consumed when entering `Resuming`.
    pub resume_from: Option<Checkpoint>,
    /// Completed passes over the plan.
    pub passes: u64,

    // -- Handshake with the service --
    pub request: Request,
    pub setup_done: bool,
    pub advance_granted: bool,
}

impl FsmContext {
    pub fn new(offsets_secs: Vec<f64>, options: RunOptions) -> Self {
        Self {
            offsets_secs,
            options,
            cursor: Cursor::default(),
            resume_from: None,
            passes: 0,
            request: Request::None,
            setup_done: false,
            advance_granted: false,
        }
    }

    pub fn plan_len(&self) -> usize {
        self.offsets_secs.len()
    }

    /// Seconds until the step under the cursor is due, if any remains.
    pub fn pending_wait(&self) -> Option<f64> {
        self.offsets_secs
            .get(self.cursor.step_index)
            .map(|offset| offset - self.cursor.time_passed)
    }

    /// Take the pending request, leaving `Request::None`.
    pub fn take_request(&mut self) -> Request {
        core::mem::take(&mut self.request)
    }

    /// Record that the step under the cursor ran after waiting `wait_secs`.
    pub fn complete_step(&mut self, wait_secs: f64) {
        self.cursor.time_passed += wait_secs;
        self.cursor.step_index += 1;
        self.advance_granted = false;
    }

    pub fn complete_setup(&mut self) {
        self.setup_done = true;
    }

    pub fn grant_advance(&mut self) {
        self.advance_granted = true;
    }
}
