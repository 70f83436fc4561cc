//! valvectl library.
//!
//! Exposes the sequencing core, the drivers and the adapters so the
//! binary and the integration tests share one implementation.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod checkpoint;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod registry;
pub mod sequence;
pub mod telemetry;
