//! Terminator-delimited frame codec for the analyzer stream.
//!
//! Wire format:
//! ```text
//! ┌──────────────────────────────────────┬────────────┐
//! │ ASCII payload, comma-delimited (N B) │ terminator │
//! │                                      │ (0x03 ETX) │
//! └──────────────────────────────────────┴────────────┘
//! ```
//!
//! The decoder accumulates incoming bytes and yields complete frames.  A
//! single serial read may return part of a frame, or a frame tail plus
//! the start of the next one; [`FrameDecoder::feed`] reports how much of
//! the input it consumed so the caller can feed the rest later.

use heapless::Vec;

/// Longest accepted payload.  Longer runs are dropped up to the next
/// terminator.
pub const MAX_FRAME_SIZE: usize = 512;

enum DecoderState {
    /// Collecting payload bytes.
    Collecting,
    /// Overflowed; skipping to the next terminator.
    Discarding,
    /// A frame was returned; the buffer is cleared on the next feed.
    Complete,
}

/// Streaming frame decoder.
pub struct FrameDecoder {
    terminator: u8,
    state: DecoderState,
    buf: Vec<u8, MAX_FRAME_SIZE>,
}

impl FrameDecoder {
    pub fn new(terminator: u8) -> Self {
        Self {
            terminator,
            state: DecoderState::Collecting,
            buf: Vec::new(),
        }
    }

    /// Feed bytes into the decoder.
    ///
    /// Returns the number of bytes consumed and, when a terminator was
    /// reached, the frame payload without the terminator.  The slice is
    /// valid until the next call to `feed`.  Empty frames are skipped.
    pub fn feed(&mut self, data: &[u8]) -> (usize, Option<&[u8]>) {
        if matches!(self.state, DecoderState::Complete) {
            self.buf.clear();
            self.state = DecoderState::Collecting;
        }

        for (i, &byte) in data.iter().enumerate() {
            if byte == self.terminator {
                match self.state {
                    DecoderState::Collecting if !self.buf.is_empty() => {
                        self.state = DecoderState::Complete;
                        return (i + 1, Some(self.buf.as_slice()));
                    }
                    _ => {
                        self.buf.clear();
                        self.state = DecoderState::Collecting;
                    }
                }
                continue;
            }

            if matches!(self.state, DecoderState::Collecting) && self.buf.push(byte).is_err() {
                self.buf.clear();
                self.state = DecoderState::Discarding;
            }
        }

        (data.len(), None)
    }

    /// Reset decoder state (e.g. after the analyzer is reopened).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = DecoderState::Collecting;
    }
}
