//! Application core: sequencing logic, zero direct I/O.
//!
//! FSM orchestration, plan execution, checkpointing and device setup.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], so this layer runs against mocks in tests.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
