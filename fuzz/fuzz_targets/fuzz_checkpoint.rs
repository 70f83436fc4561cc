//! Fuzz target: `Checkpoint::parse`
//!
//! Whatever is found in the step file, parsing must not panic, and an
//! accepted checkpoint must survive a save/load cycle unchanged.
//!
//! cargo fuzz run fuzz_checkpoint

#![no_main]

use libfuzzer_sys::fuzz_target;
use valvectl::checkpoint::Checkpoint;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    if let Ok(cp) = Checkpoint::parse(text) {
        assert!(cp.elapsed_seconds.is_finite() && cp.elapsed_seconds >= 0.0);
        let again = Checkpoint::parse(&cp.to_string()).unwrap();
        assert_eq!(again, cp);
    }
});
