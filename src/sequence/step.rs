//! A single timed step and its `"offset,device,port,state"` record form.

use core::fmt;

use super::state::{LogicalState, normalize};
use crate::error::ConfigError;

/// Logical port of a device.  Proportional valves have a single address
/// and are usually written with `-` in sequence records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port(pub Option<u16>);

impl Port {
    pub const NONE: Self = Self(None);

    pub fn index(n: u16) -> Self {
        Self(Some(n))
    }

    /// Parse a port field; `-` or an empty field means "no port".
    pub fn parse(field: &str) -> Option<Self> {
        match field.trim() {
            "" | "-" => Some(Self::NONE),
            s => s.parse().ok().map(Self::index),
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(n) => write!(f, "{n}"),
            None => f.write_str("-"),
        }
    }
}

/// Registry key for a device port: `"device#port"`.
pub fn state_key(device: &str, port: Port) -> String {
    format!("{device}#{port}")
}

/// One scheduled actuation at a relative time offset.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceStep {
    /// Minutes since the start of the pass.
    pub offset_minutes: f64,
    /// Device name, resolved against the device catalog at load time.
    pub device: String,
    pub port: Port,
    /// Token as written in the record (kept for progress logging).
    pub token: String,
    /// Normalised state.
    pub state: LogicalState,
}

impl SequenceStep {
    pub fn new(offset_minutes: f64, device: &str, port: Port, token: &str) -> Self {
        Self {
            offset_minutes,
            device: device.to_string(),
            port,
            token: token.trim().to_string(),
            state: normalize(token),
        }
    }

    /// Parse a `"offset,device,port,state"` record.
    pub fn parse(record: &str) -> Result<Self, ConfigError> {
        let malformed = |reason| ConfigError::MalformedStep {
            record: record.to_string(),
            reason,
        };

        let fields: Vec<&str> = record.trim().split(',').map(str::trim).collect();
        let [offset, device, port, token] = fields.as_slice() else {
            return Err(malformed("expected 4 comma-separated fields"));
        };

        let offset_minutes: f64 = offset
            .parse()
            .map_err(|_| malformed("offset is not a number"))?;
        if !offset_minutes.is_finite() || offset_minutes < 0.0 {
            return Err(malformed("offset must be a non-negative number of minutes"));
        }
        if device.is_empty() {
            return Err(malformed("device name is empty"));
        }
        let port = Port::parse(port).ok_or_else(|| malformed("port is not an integer or '-'"))?;
        if token.is_empty() {
            return Err(malformed("state is empty"));
        }

        Ok(Self::new(offset_minutes, device, port, token))
    }

    /// Scheduled time of this step in seconds since the pass started.
    pub fn offset_secs(&self) -> f64 {
        self.offset_minutes * 60.0
    }

    pub fn key(&self) -> String {
        state_key(&self.device, self.port)
    }
}
