//! Unified error types for the valve sequencer.
//!
//! `Error` is what the sequencer returns; both of its categories stop the
//! process.  Persistence and telemetry failures have their own types and
//! are logged where they happen, never propagated:
//!
//! | Type               | Raised by                      | Outcome                |
//! |--------------------|--------------------------------|------------------------|
//! | `ConfigError`      | config load, plan, checkpoint  | exit, before any I/O   |
//! | `ActuatorError`    | valve drivers                  | exit, halts the loop   |
//! | `PersistenceError` | state registry, checkpoint     | logged                 |
//! | `TelemetryError`   | analyzer, time-series sink     | logged, reader goes on |

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Failures that end a sequencer run.
#[derive(Debug)]
pub enum Error {
    /// Configuration, plan or checkpoint is invalid.
    Config(ConfigError),
    /// A valve command failed.
    Actuator(ActuatorError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Unreadable { path: String, reason: String },
    /// The configuration file could not be parsed.
    Parse(String),
    /// A step or command names a device that is not configured.
    UnknownDevice(String),
    /// The device kind could not be determined from `kind` or the name.
    UnknownKind(String),
    /// A relay or GPIO port has no entry in the device mapping.
    UnmappedPort { device: String, port: String },
    /// A relay mapping value is outside the board's addressable range.
    InvalidAddress { device: String, port: u16, address: u32 },
    /// A relay or GPIO device was given a state other than 0/1.
    InvalidState { device: String, state: String },
    /// A `"offset,device,port,state"` record is malformed.
    MalformedStep { record: String, reason: &'static str },
    /// A device is missing a connection parameter it needs.
    MissingParameter { device: String, field: &'static str },
    /// The sequence plan has no steps.
    EmptyPlan,
    /// The checkpoint points past the end of the plan.
    CheckpointBeyondPlan { step_index: usize, step_count: usize },
    /// The checkpoint file exists but does not hold `index,seconds`.
    CorruptCheckpoint(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable { path, reason } => {
                write!(f, "couldn't read configuration file {path}: {reason}")
            }
            Self::Parse(msg) => write!(f, "parse failed: {msg}"),
            Self::UnknownDevice(name) => write!(f, "unknown device: {name}"),
            Self::UnknownKind(name) => write!(
                f,
                "unknown device type: {name} (set `kind` or prefix the name with 'sv', 'gpio' or 'mpv')"
            ),
            Self::UnmappedPort { device, port } => {
                write!(f, "device {device} has no mapping for port {port}")
            }
            Self::InvalidAddress {
                device,
                port,
                address,
            } => write!(
                f,
                "device {device} maps port {port} to relay {address}; relays are numbered 1 to 65536"
            ),
            Self::InvalidState { device, state } => write!(
                f,
                "device {device} only supports state 0 (off) and 1 (on), got {state}"
            ),
            Self::MalformedStep { record, reason } => {
                write!(f, "malformed sequence step '{record}': {reason}")
            }
            Self::MissingParameter { device, field } => {
                write!(f, "device {device} is missing '{field}'")
            }
            Self::EmptyPlan => write!(f, "sequence has no steps"),
            Self::CheckpointBeyondPlan {
                step_index,
                step_count,
            } => write!(
                f,
                "checkpoint step {step_index} is higher than total step count {step_count}"
            ),
            Self::CorruptCheckpoint(content) => {
                write!(f, "checkpoint file is unreadable: '{content}'")
            }
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ActuatorError {
    /// Serial link or sysfs write failed.
    Io { device: String, source: std::io::Error },
    /// The relay board did not acknowledge a command.
    NoAck { device: String, reply: Vec<u8> },
    /// A relay or GPIO device was commanded with a non-binary state.
    InvalidState { device: String, state: String },
    /// The port has no physical address on this device.
    UnmappedPort { device: String, port: String },
    /// The device is configured but not connected (disabled).
    NotConnected(String),
}

impl ActuatorError {
    /// Whether another attempt at the same command could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::NoAck { .. })
    }
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { device, source } => write!(f, "{device}: I/O failed: {source}"),
            Self::NoAck { device, reply } => {
                write!(f, "{device}: command not acknowledged (reply {reply:02X?})")
            }
            Self::InvalidState { device, state } => write!(
                f,
                "{device}: only state 0 (off) and 1 (on) are supported, got {state}"
            ),
            Self::UnmappedPort { device, port } => {
                write!(f, "{device}: port {port} is not mapped")
            }
            Self::NotConnected(device) => write!(f, "{device}: device is not connected"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum PersistenceError {
    /// Writing or renaming the file failed.
    Io { path: String, source: std::io::Error },
    /// The in-memory value could not be encoded.
    Encode(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{path}: {source}"),
            Self::Encode(msg) => write!(f, "encode failed: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Telemetry errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum TelemetryError {
    /// The analyzer port could not be opened or read.
    Analyzer(String),
    /// The analyzer frame did not have the expected fields.
    Frame(String),
    /// The time-series sink rejected or failed the write.
    Sink(String),
    /// The local data log could not be appended.
    DataLog(std::io::Error),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analyzer(msg) => write!(f, "analyzer: {msg}"),
            Self::Frame(msg) => write!(f, "bad frame: {msg}"),
            Self::Sink(msg) => write!(f, "sink: {msg}"),
            Self::DataLog(e) => write!(f, "data log: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
