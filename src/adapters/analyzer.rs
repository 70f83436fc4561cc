//! Serial gas-analyzer adapter.
//!
//! Implements [`AnalyzerPort`] over a serial link.  Incoming bytes are
//! split into frames by [`FrameDecoder`]; bytes past the end of a frame
//! are kept for the next call.  A failed link is dropped and reopened on
//! [`reconnect`](AnalyzerPort::reconnect).

use std::io::{self, ErrorKind, Read};
use std::time::Duration;

use log::{info, warn};

use super::serial::open_with_timeout;
use crate::app::ports::AnalyzerPort;
use crate::config::AnalyzerConfig;
use crate::drivers::BoxedLink;
use crate::error::TelemetryError;
use crate::telemetry::codec::FrameDecoder;

const READ_TIMEOUT: Duration = Duration::from_secs(1);
const CHUNK_SIZE: usize = 256;

type Opener = Box<dyn FnMut() -> io::Result<BoxedLink> + Send>;

pub struct SerialAnalyzer {
    open: Opener,
    link: Option<BoxedLink>,
    decoder: FrameDecoder,
    chunk: [u8; CHUNK_SIZE],
    pos: usize,
    len: usize,
}

impl SerialAnalyzer {
    pub fn new(cfg: &AnalyzerConfig) -> Self {
        let path = cfg.port.clone();
        let baud = cfg.baud;
        Self::with_opener(
            cfg.terminator,
            Box::new(move || open_with_timeout(&path, baud, READ_TIMEOUT)),
        )
    }

    /// Build with a custom link opener.  The first open is attempted
    /// immediately; on failure the reader starts disconnected.
    pub fn with_opener(terminator: u8, mut open: Opener) -> Self {
        let link = match open() {
            Ok(link) => {
                info!("Telemetry: analyzer connected");
                Some(link)
            }
            Err(e) => {
                warn!("Telemetry: analyzer open failed: {e}");
                None
            }
        };
        Self {
            open,
            link,
            decoder: FrameDecoder::new(terminator),
            chunk: [0; CHUNK_SIZE],
            pos: 0,
            len: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}

impl AnalyzerPort for SerialAnalyzer {
    fn read_frame(&mut self) -> Result<Vec<u8>, TelemetryError> {
        loop {
            while self.pos < self.len {
                let (used, frame) = self.decoder.feed(&self.chunk[self.pos..self.len]);
                let frame = frame.map(<[u8]>::to_vec);
                self.pos += used;
                if let Some(frame) = frame {
                    return Ok(frame);
                }
            }

            let link = self
                .link
                .as_mut()
                .ok_or_else(|| TelemetryError::Analyzer("not connected".into()))?;
            match link.read(&mut self.chunk) {
                Ok(0) => {
                    self.link = None;
                    return Err(TelemetryError::Analyzer("connection closed".into()));
                }
                Ok(n) => {
                    self.pos = 0;
                    self.len = n;
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {}
                Err(e) => {
                    self.link = None;
                    return Err(TelemetryError::Analyzer(e.to_string()));
                }
            }
        }
    }

    fn reconnect(&mut self) -> Result<(), TelemetryError> {
        self.link = None;
        self.decoder.reset();
        self.pos = 0;
        self.len = 0;
        let link = (self.open)().map_err(|e| TelemetryError::Analyzer(e.to_string()))?;
        info!("Telemetry: analyzer reconnected");
        self.link = Some(link);
        Ok(())
    }
}
