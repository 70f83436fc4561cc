//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a subsystem against
//! mock adapters.  No serial ports or GPIO lines are needed.

mod mock_hw;
mod sequencer_tests;
mod telemetry_tests;
