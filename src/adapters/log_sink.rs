//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the process logger.  Step progress lines are what an operator watches
//! on the console during a run.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::PlanLoaded {
                steps,
                total_minutes,
            } => {
                info!("PLAN  | {} step(s) over {:.1} minutes", steps, total_minutes);
            }
            AppEvent::Resumed(cp) => {
                info!(
                    "RESUME| from step {} after {:.1}s",
                    cp.step_index + 1,
                    cp.elapsed_seconds
                );
            }
            AppEvent::DeviceSkipped(name) => {
                info!("INIT  | skipping {} (disabled)", name);
            }
            AppEvent::DeviceInitialised { key, state } => {
                info!("INIT  | {} = {}", key, state);
            }
            AppEvent::StepScheduled {
                number,
                count,
                key,
                state,
                wait_secs,
            } => {
                info!(
                    "STEP  | [{}/{}]: Set {} to {} in {:.0} seconds",
                    number, count, key, state, wait_secs
                );
            }
            AppEvent::StepApplied { index, key, state } => {
                info!("STEP  | #{} applied {} = {}", index + 1, key, state);
            }
            AppEvent::StepSkipped { index, device } => {
                warn!("STEP  | #{} skipped, {} is disabled", index + 1, device);
            }
            AppEvent::AwaitingAdvance { index } => {
                info!("PAUSE | waiting for operator before step {}", index + 1);
            }
            AppEvent::PassComplete { passes } => {
                info!("PASS  | sequence complete ({} pass(es))", passes);
            }
            AppEvent::Halted => {
                info!("HALT  | sequencer stopped");
            }
        }
    }
}
