//! Analyzer message fields and the combined telemetry record.

use crate::error::TelemetryError;
use crate::registry::Snapshot;
use crate::sequence::LogicalState;

// Fixed field positions in an analyzer message.
const FIELD_DATE: usize = 1;
const FIELD_TIME: usize = 2;
const FIELD_H2: usize = 6;
const FIELD_CO: usize = 9;

/// The fields taken from one analyzer message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerReading {
    pub date: String,
    pub time: String,
    /// Hydrogen concentration as reported.
    pub h2: i64,
    /// Carbon monoxide concentration as reported.
    pub co: i64,
}

impl AnalyzerReading {
    /// Parse a frame payload (terminator already stripped).
    pub fn parse(frame: &[u8]) -> Result<Self, TelemetryError> {
        let text = core::str::from_utf8(frame)
            .map_err(|_| TelemetryError::Frame("not valid UTF-8".into()))?;
        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        if fields.len() <= FIELD_CO {
            return Err(TelemetryError::Frame(format!(
                "expected at least {} fields, got {}",
                FIELD_CO + 1,
                fields.len()
            )));
        }

        let number = |idx: usize, name: &str| {
            fields[idx]
                .parse::<i64>()
                .map_err(|_| TelemetryError::Frame(format!("{name} is not an integer: '{}'", fields[idx])))
        };

        Ok(Self {
            date: fields[FIELD_DATE].to_string(),
            time: fields[FIELD_TIME].to_string(),
            h2: number(FIELD_H2, "h2")?,
            co: number(FIELD_CO, "co")?,
        })
    }
}

/// One analyzer reading joined with the valve states at the time it was
/// read.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    pub reading: AnalyzerReading,
    pub states: Snapshot,
}

impl TelemetryRecord {
    /// Local log line: `date,time,h2,co,key,value,key,value,...`.
    pub fn to_log_line(&self) -> String {
        let r = &self.reading;
        let mut line = format!("{},{},{},{}", r.date, r.time, r.h2, r.co);
        for (key, state) in &self.states {
            line.push(',');
            line.push_str(key);
            line.push(',');
            line.push_str(&state.to_string());
        }
        line
    }

    /// Fields for the time-series sink: `h2`, `co`, then every registry
    /// entry.
    pub fn fields(&self) -> Vec<(String, FieldValue)> {
        let mut fields = vec![
            ("h2".to_string(), FieldValue::Int(self.reading.h2)),
            ("co".to_string(), FieldValue::Int(self.reading.co)),
        ];
        fields.extend(
            self.states
                .iter()
                .map(|(key, state)| (key.clone(), FieldValue::from(state))),
        );
        fields
    }
}

/// Typed field value for the time-series sink.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&LogicalState> for FieldValue {
    fn from(state: &LogicalState) -> Self {
        if let Some(n) = state.as_i64() {
            return Self::Int(n);
        }
        let raw = state.to_string();
        match raw.parse::<f64>() {
            Ok(x) if x.is_finite() => Self::Float(x),
            _ => Self::Text(raw),
        }
    }
}
