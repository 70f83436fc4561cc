//! Concrete state handler functions and table builder.
//!
//! Each state is three plain `fn` pointers.  Handlers only look at the
//! context and post [`Request`]s; the service performs the I/O.
//!
//! ```text
//!  INIT ──[fresh]──▶ SETUP ──[done]──▶ RESUMING ──▶ RUNNING ◀───────┐
//!   │ │                │                   ▲        │    │          │
//!   │ └─[checkpoint]───┼───────────────────┘        │ [manual wait] [advance]
//!   │             [init only]                       │    ▼          │
//!   └─[manual step]─▶ HALTED ◀──[end, no loop]──────┘  PAUSED ──────┘
//!
//!  INIT ──[init only + checkpoint]──▶ HALTED (devices untouched)
//!  RUNNING ──[end, loop]──▶ RUNNING (cursor reset to 0 / 0.0)
//! ```

use log::{debug, info};

use super::context::{Cursor, FsmContext, Request, RunMode};
use super::{StateDescriptor, StateId};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once per run.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Init
        StateDescriptor {
            id: StateId::Init,
            name: "Init",
            on_enter: None,
            on_exit: None,
            on_update: init_update,
        },
        // Index 1: Setup
        StateDescriptor {
            id: StateId::Setup,
            name: "Setup",
            on_enter: Some(setup_enter),
            on_exit: None,
            on_update: setup_update,
        },
        // Index 2: Resuming
        StateDescriptor {
            id: StateId::Resuming,
            name: "Resuming",
            on_enter: Some(resuming_enter),
            on_exit: None,
            on_update: resuming_update,
        },
        // Index 3: Running
        StateDescriptor {
            id: StateId::Running,
            name: "Running",
            on_enter: None,
            on_exit: None,
            on_update: running_update,
        },
        // Index 4: PausedForManualAdvance
        StateDescriptor {
            id: StateId::PausedForManualAdvance,
            name: "PausedForManualAdvance",
            on_enter: Some(paused_enter),
            on_exit: None,
            on_update: paused_update,
        },
        // Index 5: Halted
        StateDescriptor {
            id: StateId::Halted,
            name: "Halted",
            on_enter: Some(halted_enter),
            on_exit: None,
            on_update: halted_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  INIT
// ═══════════════════════════════════════════════════════════════════════════

fn init_update(ctx: &mut FsmContext) -> Option<StateId> {
    match ctx.options.mode {
        RunMode::ManualStep => {
            ctx.request = Request::ApplyManualStep;
            Some(StateId::Halted)
        }
        RunMode::InitOnly if ctx.resume_from.is_some() => {
            info!("INIT: checkpoint found, leaving devices as they are");
            Some(StateId::Halted)
        }
        RunMode::InitOnly => Some(StateId::Setup),
        RunMode::Sequence if ctx.resume_from.is_some() => {
            info!("INIT: checkpoint found, skipping device setup");
            Some(StateId::Resuming)
        }
        RunMode::Sequence => Some(StateId::Setup),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  SETUP: initial states of every enabled device
// ═══════════════════════════════════════════════════════════════════════════

fn setup_enter(ctx: &mut FsmContext) {
    ctx.setup_done = false;
    ctx.request = Request::ApplyInitialStates;
}

fn setup_update(ctx: &mut FsmContext) -> Option<StateId> {
    if !ctx.setup_done {
        return None;
    }
    match ctx.options.mode {
        RunMode::InitOnly => Some(StateId::Halted),
        _ => Some(StateId::Resuming),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  RESUMING: position the cursor
// ═══════════════════════════════════════════════════════════════════════════

fn resuming_enter(ctx: &mut FsmContext) {
    ctx.cursor = match ctx.resume_from.take() {
        Some(cp) => {
            info!(
                "RESUMING: at step {} with {}s elapsed",
                cp.step_index, cp.elapsed_seconds
            );
            Cursor {
                step_index: cp.step_index,
                time_passed: cp.elapsed_seconds,
            }
        }
        None => Cursor::default(),
    };
}

fn resuming_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.plan_len() == 0 {
        return Some(StateId::Halted);
    }
    Some(StateId::Running)
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUNNING: one step per tick
// ═══════════════════════════════════════════════════════════════════════════

fn running_update(ctx: &mut FsmContext) -> Option<StateId> {
    let Some(wait_secs) = ctx.pending_wait() else {
        ctx.passes += 1;
        if ctx.options.looping && ctx.plan_len() > 0 {
            info!("RUNNING: pass {} complete, restarting sequence", ctx.passes);
            ctx.cursor = Cursor::default();
            return None;
        }
        return Some(StateId::Halted);
    };

    if ctx.options.manual_advance && wait_secs > 0.0 && !ctx.advance_granted {
        return Some(StateId::PausedForManualAdvance);
    }

    ctx.request = Request::Execute {
        index: ctx.cursor.step_index,
        wait_secs,
    };
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  PAUSED: waiting for the operator
// ═══════════════════════════════════════════════════════════════════════════

fn paused_enter(ctx: &mut FsmContext) {
    debug!("PAUSED: waiting for manual advance before step {}", ctx.cursor.step_index);
    ctx.request = Request::AwaitAdvance;
}

fn paused_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.advance_granted {
        return Some(StateId::Running);
    }
    ctx.request = Request::AwaitAdvance;
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  HALTED: terminal
// ═══════════════════════════════════════════════════════════════════════════

fn halted_enter(ctx: &mut FsmContext) {
    info!(
        "HALTED: after {} pass(es), cursor at step {}",
        ctx.passes, ctx.cursor.step_index
    );
}

fn halted_update(_ctx: &mut FsmContext) -> Option<StateId> {
    None
}
