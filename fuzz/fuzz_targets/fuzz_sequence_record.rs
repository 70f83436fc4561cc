//! Fuzz target: `SequenceStep::parse`
//!
//! Arbitrary record text must either parse into a step with a finite,
//! non-negative offset or be rejected; it must never panic.
//!
//! cargo fuzz run fuzz_sequence_record

#![no_main]

use libfuzzer_sys::fuzz_target;
use valvectl::sequence::{SequencePlan, SequenceStep};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    if let Ok(step) = SequenceStep::parse(text) {
        assert!(step.offset_minutes.is_finite() && step.offset_minutes >= 0.0);
        assert!(!step.device.is_empty());
    }

    // Treat each line as a record of one plan.
    if let Ok(plan) = SequencePlan::from_records(text.lines()) {
        for pair in plan.steps().windows(2) {
            assert!(pair[0].offset_minutes <= pair[1].offset_minutes);
        }
    }
});
