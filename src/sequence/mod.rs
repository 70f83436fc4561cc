//! Sequence plan: the ordered list of timed steps for one pass.
//!
//! ```text
//!  "1,sv1,0,1"      ┌─────────────────────────────┐
//!  "2,sv1,0,0"  ──▶ │ parse ─▶ stable sort by     │ ──▶ SequencePlan
//!  "0.5,mpv1,-,50"  │          offset (once)      │     (never re-sorted)
//!                   └─────────────────────────────┘
//! ```
//!
//! Steps sharing an offset keep their relative record order.

pub mod state;
pub mod step;

pub use state::{LogicalState, normalize};
pub use step::{Port, SequenceStep, state_key};

use crate::error::ConfigError;

/// Stable sort by offset.  Idempotent on an already-sorted slice.
pub fn sort_steps(steps: &mut [SequenceStep]) {
    steps.sort_by(|a, b| a.offset_minutes.total_cmp(&b.offset_minutes));
}

/// Immutable, offset-ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequencePlan {
    steps: Vec<SequenceStep>,
}

impl SequencePlan {
    /// Build a plan from steps in record order.  Sorts once.
    pub fn new(mut steps: Vec<SequenceStep>) -> Self {
        sort_steps(&mut steps);
        Self { steps }
    }

    /// Parse `"offset,device,port,state"` records into a sorted plan.
    pub fn from_records<I, S>(records: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let steps = records
            .into_iter()
            .map(|r| SequenceStep::parse(r.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(steps))
    }

    /// Rewrite each step's port through `port_of(device, port)`.  Order
    /// is unchanged.
    pub fn with_ports(mut self, port_of: impl Fn(&str, Port) -> Port) -> Self {
        for step in &mut self.steps {
            step.port = port_of(&step.device, step.port);
        }
        self
    }

    pub fn steps(&self) -> &[SequenceStep] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&SequenceStep> {
        self.steps.get(index)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Length of one pass in minutes (offset of the last step).
    pub fn total_minutes(&self) -> f64 {
        self.steps
            .iter()
            .map(|s| s.offset_minutes)
            .fold(0.0, f64::max)
    }

    /// A plan must have at least one step before it can be run.
    pub fn ensure_runnable(&self) -> Result<(), ConfigError> {
        if self.is_empty() {
            Err(ConfigError::EmptyPlan)
        } else {
            Ok(())
        }
    }
}
