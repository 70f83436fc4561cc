//! Inbound commands to the application service.
//!
//! These come from the command line and select what a run does.

use crate::error::ConfigError;
use crate::sequence::{LogicalState, Port, normalize};

/// One operator-supplied `"device,port,state"` command.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualCommand {
    pub device: String,
    pub port: Port,
    pub token: String,
    pub state: LogicalState,
}

impl ManualCommand {
    pub fn parse(triple: &str) -> Result<Self, ConfigError> {
        let malformed = |reason| ConfigError::MalformedStep {
            record: triple.to_string(),
            reason,
        };

        let fields: Vec<&str> = triple.trim().split(',').map(str::trim).collect();
        let [device, port, token] = fields.as_slice() else {
            return Err(malformed("expected device,port,state"));
        };
        if device.is_empty() {
            return Err(malformed("device name is empty"));
        }
        let port = Port::parse(port).ok_or_else(|| malformed("port is not an integer or '-'"))?;
        if token.is_empty() {
            return Err(malformed("state is empty"));
        }

        Ok(Self {
            device: device.to_string(),
            port,
            token: token.to_string(),
            state: normalize(token),
        })
    }
}

/// What the sequencer is asked to do.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AppCommand {
    /// Run the timed sequence (the default).
    #[default]
    RunSequence,
    /// Apply initial device states and exit.
    InitOnly,
    /// Apply one command and exit.
    Manual(ManualCommand),
}
