//! InfluxDB v1 time-series sink.
//!
//! Posts one line-protocol point per telemetry record to `/write`.  The
//! point carries the `node` tag, the gas readings and every registry
//! entry as a field; the server assigns the timestamp.

use std::fmt::Write as _;
use std::time::Duration;

use crate::app::ports::TelemetrySink;
use crate::config::InfluxConfig;
use crate::error::TelemetryError;
use crate::telemetry::{FieldValue, TelemetryRecord};

const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct InfluxSink {
    agent: ureq::Agent,
    url: String,
    cfg: InfluxConfig,
}

impl InfluxSink {
    pub fn new(cfg: InfluxConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(WRITE_TIMEOUT).build();
        let url = format!("http://{}:{}/write", cfg.address, cfg.port);
        Self { agent, url, cfg }
    }
}

impl TelemetrySink for InfluxSink {
    fn name(&self) -> &'static str {
        "influxdb"
    }

    fn write(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        let body = line_protocol(&self.cfg.measurement, &self.cfg.node, record);
        let mut req = self.agent.post(&self.url).query("db", &self.cfg.database);
        if !self.cfg.username.is_empty() {
            req = req
                .query("u", &self.cfg.username)
                .query("p", &self.cfg.password);
        }
        req.send_string(&body)
            .map(|_| ())
            .map_err(|e| TelemetryError::Sink(e.to_string()))
    }
}

/// Render one record as a line-protocol point.
pub fn line_protocol(measurement: &str, node: &str, record: &TelemetryRecord) -> String {
    let mut line = String::new();
    push_escaped(&mut line, measurement, &[',', ' ']);
    line.push_str(",node=");
    push_escaped(&mut line, node, &[',', ' ', '=']);
    line.push(' ');

    for (i, (key, value)) in record.fields().iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        push_escaped(&mut line, key, &[',', ' ', '=']);
        line.push('=');
        match value {
            FieldValue::Int(n) => {
                let _ = write!(line, "{n}i");
            }
            FieldValue::Float(x) => {
                let _ = write!(line, "{x}");
            }
            FieldValue::Text(s) => {
                line.push('"');
                push_escaped(&mut line, s, &['"', '\\']);
                line.push('"');
            }
        }
    }
    line
}

fn push_escaped(out: &mut String, s: &str, special: &[char]) {
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}
