//! Application service: the hexagonal core of the sequencer.
//!
//! [`AppService`] owns the FSM, the plan and the device catalog.  The FSM
//! decides *what* happens next; the service carries each request out
//! through the port traits injected at the call site, so the whole run
//! is testable with mock adapters.
//!
//! ```text
//!  ActuatorPort ◀──┐  ┌────────────────────────┐  ┌──▶ EventSink
//!                  ├──│       AppService       │──┤
//! CheckpointPort ◀─┘  │ FSM · plan · registry  │  └──▶ DelayPort
//!                     └────────────────────────┘
//! ```
//!
//! Per step: compute the wait, sleep (or wait for a manual advance),
//! apply, record the state, save `(index, time_passed + wait)`, advance.
//! The checkpoint is saved after the step ran, so a restart re-runs at
//! most the one step that was in flight.

use std::sync::Arc;

use log::{error, info, warn};

use crate::checkpoint::Checkpoint;
use crate::config::{DeviceCatalog, ResolvedRig, RigConfig};
use crate::error::{ActuatorError, Result};
use crate::fsm::context::{Cursor, FsmContext, Request, RunMode, RunOptions};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::registry::{ESCALATE_AFTER, StateRegistry};
use crate::sequence::{LogicalState, Port, SequencePlan, state_key};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{ActuatorPort, CheckpointPort, DelayPort, EventSink};

// ───────────────────────────────────────────────────────────────
// Settings
// ───────────────────────────────────────────────────────────────

/// Tunables taken from the configuration file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub looping: bool,
    pub manual_advance: bool,
    /// Extra attempts per actuation on transient failures.
    pub actuator_retries: u32,
    /// Pause after setting up each device.
    pub settle_secs: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            looping: true,
            manual_advance: false,
            actuator_retries: 0,
            settle_secs: 0.0,
        }
    }
}

impl Settings {
    pub fn from_config(cfg: &RigConfig) -> Self {
        Self {
            looping: cfg.sequence_loop,
            manual_advance: cfg.manual_mode,
            actuator_retries: cfg.actuator_retries,
            settle_secs: cfg.settle_ms as f64 / 1000.0,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    plan: SequencePlan,
    catalog: DeviceCatalog,
    registry: Arc<StateRegistry>,
    command: AppCommand,
    settings: Settings,
    checkpoint_failures: u32,
    prepared: bool,
}

impl AppService {
    /// Does not start the FSM; call [`run`](Self::run).
    pub fn new(
        rig: ResolvedRig,
        registry: Arc<StateRegistry>,
        command: AppCommand,
        settings: Settings,
    ) -> Self {
        let mode = match command {
            AppCommand::RunSequence => RunMode::Sequence,
            AppCommand::InitOnly => RunMode::InitOnly,
            AppCommand::Manual(_) => RunMode::ManualStep,
        };
        let options = RunOptions {
            mode,
            looping: settings.looping,
            manual_advance: settings.manual_advance,
        };
        let offsets = rig.plan.steps().iter().map(|s| s.offset_secs()).collect();

        Self {
            fsm: Fsm::new(build_state_table(), StateId::Init),
            ctx: FsmContext::new(offsets, options),
            plan: rig.plan,
            catalog: rig.catalog,
            registry,
            command,
            settings,
            checkpoint_failures: 0,
            prepared: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run until the FSM halts.
    ///
    /// Runs [`prepare`](Self::prepare) first unless the caller already
    /// did.  An actuator failure halts the FSM and is returned; the
    /// checkpoint then still names the last step that completed.
    pub fn run(
        &mut self,
        hw: &mut impl ActuatorPort,
        store: &mut impl CheckpointPort,
        clock: &mut impl DelayPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if !self.prepared {
            self.prepare(&*store, sink)?;
        }

        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));

        loop {
            let prev = self.fsm.current_state();
            let passes = self.ctx.passes;
            let state = self.fsm.tick(&mut self.ctx);
            if state != prev {
                sink.emit(&AppEvent::StateChanged { from: prev, to: state });
            }
            if self.ctx.passes != passes {
                sink.emit(&AppEvent::PassComplete {
                    passes: self.ctx.passes,
                });
            }

            let request = self.ctx.take_request();
            if let Err(e) = self.perform(request, hw, store, clock, sink) {
                let prev = self.fsm.current_state();
                self.fsm.force_transition(StateId::Halted, &mut self.ctx);
                if prev != StateId::Halted {
                    sink.emit(&AppEvent::StateChanged {
                        from: prev,
                        to: StateId::Halted,
                    });
                }
                sink.emit(&AppEvent::Halted);
                return Err(e);
            }

            if state.is_terminal() {
                sink.emit(&AppEvent::Halted);
                return Ok(());
            }
        }
    }

    /// Load the checkpoint and check the command against the plan and
    /// the device catalog.  Touches no hardware, so the binary calls it
    /// before connecting any device.
    pub fn prepare(&mut self, store: &impl CheckpointPort, sink: &mut impl EventSink) -> Result<()> {
        match &mut self.command {
            AppCommand::RunSequence => {
                self.plan.ensure_runnable()?;
                sink.emit(&AppEvent::PlanLoaded {
                    steps: self.plan.step_count(),
                    total_minutes: self.plan.total_minutes(),
                });
                if let Some(cp) = store.load()? {
                    cp.check_against(self.plan.step_count())?;
                    sink.emit(&AppEvent::Resumed(cp));
                    self.ctx.resume_from = Some(cp);
                }
            }
            AppCommand::InitOnly => {
                // A run in progress owns the valves.
                self.ctx.resume_from = store.load()?;
            }
            AppCommand::Manual(cmd) => {
                cmd.port = self.catalog.canonical_port(&cmd.device, cmd.port);
                self.catalog.check_command(&cmd.device, cmd.port, &cmd.state)?;
            }
        }
        self.prepared = true;
        Ok(())
    }

    // ── Request handling ──────────────────────────────────────

    fn perform(
        &mut self,
        request: Request,
        hw: &mut impl ActuatorPort,
        store: &mut impl CheckpointPort,
        clock: &mut impl DelayPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match request {
            Request::None => Ok(()),
            Request::ApplyInitialStates => {
                self.apply_initial_states(hw, clock, sink)?;
                self.ctx.complete_setup();
                Ok(())
            }
            Request::ApplyManualStep => self.apply_manual(hw),
            Request::Execute { index, wait_secs } => {
                self.execute_step(index, wait_secs, hw, store, clock, sink)
            }
            Request::AwaitAdvance => {
                sink.emit(&AppEvent::AwaitingAdvance {
                    index: self.ctx.cursor.step_index,
                });
                clock.await_advance();
                self.ctx.grant_advance();
                Ok(())
            }
        }
    }

    fn apply_initial_states(
        &self,
        hw: &mut impl ActuatorPort,
        clock: &mut impl DelayPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        for dev in self.catalog.iter() {
            if !dev.enabled {
                sink.emit(&AppEvent::DeviceSkipped(dev.name.clone()));
                continue;
            }
            info!("Sequencer: setup device {}", dev.name);
            for (port, token, state) in &dev.init {
                self.actuate(hw, &dev.name, *port, state)?;
                sink.emit(&AppEvent::DeviceInitialised {
                    key: state_key(&dev.name, *port),
                    state: token.clone(),
                });
            }
            if self.settings.settle_secs > 0.0 {
                clock.sleep(self.settings.settle_secs);
            }
        }
        Ok(())
    }

    fn apply_manual(&self, hw: &mut impl ActuatorPort) -> Result<()> {
        let AppCommand::Manual(cmd) = &self.command else {
            return Ok(());
        };
        if !self.catalog.is_enabled(&cmd.device) {
            return Err(ActuatorError::NotConnected(cmd.device.clone()).into());
        }
        self.actuate(hw, &cmd.device, cmd.port, &cmd.state)?;
        info!(
            "Sequencer: set {} to {}",
            state_key(&cmd.device, cmd.port),
            cmd.token
        );
        Ok(())
    }

    fn execute_step(
        &mut self,
        index: usize,
        wait_secs: f64,
        hw: &mut impl ActuatorPort,
        store: &mut impl CheckpointPort,
        clock: &mut impl DelayPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let Some(step) = self.plan.get(index) else {
            return Ok(());
        };
        sink.emit(&AppEvent::StepScheduled {
            number: index + 1,
            count: self.plan.step_count(),
            key: step.key(),
            state: step.token.clone(),
            wait_secs,
        });

        if !self.settings.manual_advance && wait_secs > 0.0 {
            clock.sleep(wait_secs);
        }

        if self.catalog.is_enabled(&step.device) {
            self.actuate(hw, &step.device, step.port, &step.state)?;
            sink.emit(&AppEvent::StepApplied {
                index,
                key: step.key(),
                state: step.token.clone(),
            });
        } else {
            sink.emit(&AppEvent::StepSkipped {
                index,
                device: step.device.clone(),
            });
        }

        let checkpoint = Checkpoint::new(index, self.ctx.cursor.time_passed + wait_secs);
        self.save_checkpoint(store, checkpoint);
        self.ctx.complete_step(wait_secs);
        Ok(())
    }

    /// Apply with the configured retry budget, then record the state.
    fn actuate(
        &self,
        hw: &mut impl ActuatorPort,
        device: &str,
        port: Port,
        state: &LogicalState,
    ) -> core::result::Result<(), ActuatorError> {
        let retries = self.settings.actuator_retries;
        let mut attempt = 0;
        loop {
            match hw.apply(device, port, state) {
                Ok(()) => break,
                Err(e) if e.is_transient() && attempt < retries => {
                    attempt += 1;
                    warn!("Sequencer: {e}; retry {attempt}/{retries}");
                }
                Err(e) => return Err(e),
            }
        }

        if let Err(e) = self.registry.set(device, port, state.clone()) {
            // The registry escalates on its own past the threshold.
            if self.registry.consecutive_failures() < ESCALATE_AFTER {
                warn!("Sequencer: state registry not saved: {e}");
            }
        }
        Ok(())
    }

    fn save_checkpoint(&mut self, store: &mut impl CheckpointPort, checkpoint: Checkpoint) {
        match store.save(checkpoint) {
            Ok(()) => self.checkpoint_failures = 0,
            Err(e) => {
                self.checkpoint_failures += 1;
                if self.checkpoint_failures >= ESCALATE_AFTER {
                    error!(
                        "Sequencer: checkpoint not saved ({} consecutive failures): {e}",
                        self.checkpoint_failures
                    );
                } else {
                    warn!("Sequencer: checkpoint not saved: {e}");
                }
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn cursor(&self) -> Cursor {
        self.ctx.cursor
    }

    pub fn passes(&self) -> u64 {
        self.ctx.passes
    }

    pub fn plan(&self) -> &SequencePlan {
        &self.plan
    }

    pub fn registry(&self) -> &Arc<StateRegistry> {
        &self.registry
    }
}
