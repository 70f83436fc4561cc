//! Fuzz target: `FrameDecoder::feed` + `AnalyzerReading::parse`
//!
//! Drives arbitrary byte sequences through the streaming decoder in
//! irregular chunks and parses every frame it yields.  Neither may panic;
//! yielded frames are non-empty, bounded and terminator-free.
//!
//! cargo fuzz run fuzz_analyzer_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use valvectl::telemetry::AnalyzerReading;
use valvectl::telemetry::codec::{FrameDecoder, MAX_FRAME_SIZE};

const ETX: u8 = 0x03;

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new(ETX);

    // First byte picks the chunk size so split frames get exercised.
    let chunk = data.first().map_or(1, |b| usize::from(*b % 16) + 1);
    for piece in data.chunks(chunk) {
        let mut rest = piece;
        while !rest.is_empty() {
            let (used, frame) = decoder.feed(rest);
            assert!(used > 0 && used <= rest.len(), "decoder must make progress");
            if let Some(frame) = frame {
                assert!(!frame.is_empty(), "decoder must not yield empty frames");
                assert!(frame.len() <= MAX_FRAME_SIZE, "frame exceeds MAX_FRAME_SIZE");
                assert!(!frame.contains(&ETX), "terminator leaked into frame");
                let _ = AnalyzerReading::parse(frame);
            }
            rest = &rest[used..];
        }
    }

    decoder.reset();
    let _ = decoder.feed(data);
});
