//! Function-pointer finite state machine for the sequencer.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                    │
//! │  ┌────────────────────────┬──────────┬─────────┬─────────────┐ │
//! │  │ StateId                │ on_enter │ on_exit │ on_update   │ │
//! │  ├────────────────────────┼──────────┼─────────┼─────────────┤ │
//! │  │ Init                   │    -     │    -    │ fn(ctx)->…  │ │
//! │  │ Setup                  │ fn(ctx)  │    -    │ fn(ctx)->…  │ │
//! │  │ Resuming               │ fn(ctx)  │    -    │ fn(ctx)->…  │ │
//! │  │ Running                │    -     │    -    │ fn(ctx)->…  │ │
//! │  │ PausedForManualAdvance │ fn(ctx)  │    -    │ fn(ctx)->…  │ │
//! │  │ Halted                 │ fn(ctx)  │    -    │ fn(ctx)->…  │ │
//! │  └────────────────────────┴──────────┴─────────┴─────────────┘ │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick calls `on_update` for the current state.  `Some(next)`
//! runs `on_exit` of the current state, then `on_enter` of the next.
//! Handlers are pure: they read and write [`FsmContext`] only.

pub mod context;
pub mod states;

use context::FsmContext;
use log::debug;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Must stay in sync with [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Init = 0,
    Setup = 1,
    Resuming = 2,
    Running = 3,
    PausedForManualAdvance = 4,
    Halted = 5,
}

impl StateId {
    pub const COUNT: usize = 6;

    /// Out-of-range indices map to `Halted`.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Init,
            1 => Self::Setup,
            2 => Self::Resuming,
            3 => Self::Running,
            4 => Self::PausedForManualAdvance,
            _ => Self::Halted,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Halted
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

pub type StateActionFn = fn(&mut FsmContext);

/// Returns `Some(next)` to trigger a transition, `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

/// One row in the state table.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run `on_enter` of the starting state.  Call once before `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        debug!("Sequencer: starting in {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Run one `on_update` and any transition it asks for.  Returns the
    /// state the machine is in afterwards.
    pub fn tick(&mut self, ctx: &mut FsmContext) -> StateId {
        if let Some(next) = (self.table[self.current].on_update)(ctx) {
            self.transition(next, ctx);
        }
        self.current_state()
    }

    /// Jump to `next` regardless of what `on_update` would return.  Used
    /// to halt on a fatal actuator error.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;
        debug!(
            "Sequencer: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
