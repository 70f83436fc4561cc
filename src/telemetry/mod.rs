//! Background telemetry reader.
//!
//! ```text
//!  analyzer ──frame──▶ parse ──▶ ┌────────────────────┐ ──▶ time-series sink
//!                                │ reading + registry │
//!  registry ──snapshot()───────▶ │      snapshot      │ ──▶ local data log
//!                                └────────────────────┘
//! ```
//!
//! Runs on its own thread for the life of the process.  Every per-cycle
//! error is logged and the loop carries on; after an analyzer I/O error
//! the connection is reopened.  Nothing here can stop the sequencer.

pub mod codec;
pub mod reading;

pub use reading::{AnalyzerReading, FieldValue, TelemetryRecord};

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::ports::{AnalyzerPort, TelemetrySink};
use crate::error::TelemetryError;
use crate::registry::StateRegistry;

/// Pause before reopening a failed analyzer connection.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

pub struct TelemetryReader<A: AnalyzerPort> {
    analyzer: A,
    registry: Arc<StateRegistry>,
    sinks: Vec<Box<dyn TelemetrySink>>,
}

impl<A: AnalyzerPort> TelemetryReader<A> {
    pub fn new(analyzer: A, registry: Arc<StateRegistry>) -> Self {
        Self {
            analyzer,
            registry,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Read one frame and fan the combined record out to every sink.
    ///
    /// Sink failures are logged here and do not fail the cycle; the
    /// returned error covers the analyzer side only.
    pub fn poll_once(&mut self) -> Result<TelemetryRecord, TelemetryError> {
        let frame = self.analyzer.read_frame()?;
        let reading = AnalyzerReading::parse(&frame)?;
        debug!("Telemetry: H2={} CO={}", reading.h2, reading.co);

        let record = TelemetryRecord {
            reading,
            states: self.registry.snapshot(),
        };
        for sink in &mut self.sinks {
            if let Err(e) = sink.write(&record) {
                warn!("Telemetry: {} write failed: {e}", sink.name());
            }
        }
        Ok(record)
    }

    /// Poll forever.
    pub fn run(&mut self) {
        info!("Telemetry: reader started with {} sink(s)", self.sinks.len());
        loop {
            match self.poll_once() {
                Ok(_) => {}
                Err(e @ TelemetryError::Frame(_)) => warn!("Telemetry: {e}"),
                Err(e) => {
                    warn!("Telemetry: {e}; reopening analyzer");
                    thread::sleep(RECONNECT_BACKOFF);
                    if let Err(e) = self.analyzer.reconnect() {
                        warn!("Telemetry: reconnect failed: {e}");
                    }
                }
            }
        }
    }
}

impl<A: AnalyzerPort + Send + 'static> TelemetryReader<A> {
    /// Move the reader onto a named background thread.
    pub fn spawn(mut self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("telemetry".into())
            .spawn(move || self.run())
    }
}
