//! Checkpoint: the sequencer's restart point.
//!
//! On disk a checkpoint is a single line `step_index,elapsed_seconds`.
//! `elapsed_seconds` is written with Rust's shortest round-trip float
//! formatting, so a save followed by a load yields the exact same value.

use core::fmt;

use crate::error::ConfigError;

/// Index of the last step executed and the plan-relative time it was
/// scheduled at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    pub step_index: usize,
    pub elapsed_seconds: f64,
}

impl Checkpoint {
    pub fn new(step_index: usize, elapsed_seconds: f64) -> Self {
        Self {
            step_index,
            elapsed_seconds,
        }
    }

    /// Parse `"index,seconds"`.  Surrounding whitespace is ignored.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let corrupt = || ConfigError::CorruptCheckpoint(text.trim().to_string());

        let (index, elapsed) = text.trim().split_once(',').ok_or_else(corrupt)?;
        let step_index = index.trim().parse().map_err(|_| corrupt())?;
        let elapsed_seconds: f64 = elapsed.trim().parse().map_err(|_| corrupt())?;
        if !elapsed_seconds.is_finite() || elapsed_seconds < 0.0 {
            return Err(corrupt());
        }
        Ok(Self::new(step_index, elapsed_seconds))
    }

    /// Reject a checkpoint that points past the end of a plan of
    /// `step_count` steps.  `step_index == step_count` is accepted and
    /// means the pass had completed.
    pub fn check_against(&self, step_count: usize) -> Result<(), ConfigError> {
        if self.step_index > step_count {
            return Err(ConfigError::CheckpointBeyondPlan {
                step_index: self.step_index,
                step_count,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.step_index, self.elapsed_seconds)
    }
}
