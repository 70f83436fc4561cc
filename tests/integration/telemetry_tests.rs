//! Telemetry reader tests: analyzer frames joined with the registry
//! snapshot and fanned out to every sink.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;

use valvectl::adapters::data_log::DataLog;
use valvectl::app::ports::{AnalyzerPort, TelemetrySink};
use valvectl::error::TelemetryError;
use valvectl::registry::StateRegistry;
use valvectl::sequence::{LogicalState, Port};
use valvectl::telemetry::{TelemetryReader, TelemetryRecord};

const FRAME: &[u8] = b"M,2024-03-01,12:00:05,x,y,z,412,a,b,17,tail";

// ── Test doubles ──────────────────────────────────────────────

struct ScriptedAnalyzer {
    frames: VecDeque<Result<Vec<u8>, TelemetryError>>,
}

impl ScriptedAnalyzer {
    fn repeating(frame: &[u8], times: usize) -> Self {
        Self {
            frames: (0..times).map(|_| Ok(frame.to_vec())).collect(),
        }
    }
}

impl AnalyzerPort for ScriptedAnalyzer {
    fn read_frame(&mut self) -> Result<Vec<u8>, TelemetryError> {
        self.frames
            .pop_front()
            .unwrap_or_else(|| Err(TelemetryError::Analyzer("script exhausted".into())))
    }

    fn reconnect(&mut self) -> Result<(), TelemetryError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Collect(Arc<Mutex<Vec<TelemetryRecord>>>);

impl TelemetrySink for Collect {
    fn name(&self) -> &'static str {
        "collect"
    }

    fn write(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        self.0.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct Broken;

impl TelemetrySink for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn write(&mut self, _record: &TelemetryRecord) -> Result<(), TelemetryError> {
        Err(TelemetryError::Sink("connection refused".into()))
    }
}

// ── Tests ─────────────────────────────────────────────────────

#[test]
fn record_carries_reading_and_current_states() {
    let registry = Arc::new(StateRegistry::in_memory());
    registry.set("sv1", Port::index(0), LogicalState::Binary(true)).unwrap();
    let out = Collect::default();

    let mut reader = TelemetryReader::new(ScriptedAnalyzer::repeating(FRAME, 1), Arc::clone(&registry))
        .with_sink(Box::new(out.clone()));
    let rec = reader.poll_once().unwrap();

    assert_eq!(rec.reading.h2, 412);
    assert_eq!(rec.reading.co, 17);
    assert_eq!(rec.states.get("sv1#0"), Some(&LogicalState::Binary(true)));
    assert_eq!(out.0.lock().unwrap().len(), 1);
}

#[test]
fn failing_sink_does_not_starve_the_others() {
    let registry = Arc::new(StateRegistry::in_memory());
    let out = Collect::default();
    let mut reader = TelemetryReader::new(ScriptedAnalyzer::repeating(FRAME, 2), registry)
        .with_sink(Box::new(Broken))
        .with_sink(Box::new(out.clone()));

    reader.poll_once().unwrap();
    reader.poll_once().unwrap();
    assert_eq!(out.0.lock().unwrap().len(), 2);
}

#[test]
fn malformed_frame_is_reported_and_written_nowhere() {
    let registry = Arc::new(StateRegistry::in_memory());
    let out = Collect::default();
    let analyzer = ScriptedAnalyzer {
        frames: VecDeque::from([Ok(b"garbage".to_vec())]),
    };
    let mut reader = TelemetryReader::new(analyzer, registry).with_sink(Box::new(out.clone()));

    assert!(matches!(reader.poll_once(), Err(TelemetryError::Frame(_))));
    assert!(out.0.lock().unwrap().is_empty());
}

#[test]
fn data_log_gets_one_line_per_reading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    let registry = Arc::new(StateRegistry::in_memory());
    registry.set("mpv1", Port::NONE, LogicalState::Setpoint("50".into())).unwrap();
    registry.set("sv1", Port::index(3), LogicalState::Binary(false)).unwrap();

    let mut reader = TelemetryReader::new(ScriptedAnalyzer::repeating(FRAME, 2), registry)
        .with_sink(Box::new(DataLog::new(&path)));
    reader.poll_once().unwrap();
    reader.poll_once().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let line = "2024-03-01,12:00:05,412,17,mpv1#-,50,sv1#3,0";
    assert_eq!(text, format!("{line}\n{line}\n"));
}

#[test]
fn reader_and_sequencer_share_the_registry() {
    let registry = Arc::new(StateRegistry::in_memory());
    registry.set("sv1", Port::index(0), LogicalState::Binary(false)).unwrap();
    registry.set("sv1", Port::index(1), LogicalState::Binary(false)).unwrap();

    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for i in 0..500 {
                let level = i % 2 == 0;
                registry.set("sv1", Port::index(0), LogicalState::Binary(level)).unwrap();
                registry.set("sv1", Port::index(1), LogicalState::Binary(level)).unwrap();
            }
        })
    };

    let out = Collect::default();
    let mut reader = TelemetryReader::new(ScriptedAnalyzer::repeating(FRAME, 200), Arc::clone(&registry))
        .with_sink(Box::new(out.clone()));
    for _ in 0..200 {
        reader.poll_once().unwrap();
    }
    writer.join().unwrap();

    for rec in out.0.lock().unwrap().iter() {
        assert_eq!(rec.states.len(), 2);
    }
}
