//! Serial proportional valve.
//!
//! The valve takes a single ASCII command `GO<setpoint>\r`.  The setpoint
//! is the normalised state: aliases such as `on`/`off`/`A`/`B` arrive as
//! `0` or `1`, anything else is sent as written.  It does not answer.

use std::io::Write;

use log::debug;

use super::BoxedLink;
use crate::error::ActuatorError;
use crate::sequence::LogicalState;

pub struct ProportionalValve {
    link: BoxedLink,
}

impl ProportionalValve {
    pub fn new(link: BoxedLink) -> Self {
        Self { link }
    }

    pub fn go(&mut self, device: &str, state: &LogicalState) -> Result<(), ActuatorError> {
        let io_err = |source| ActuatorError::Io {
            device: device.to_string(),
            source,
        };
        let cmd = format!("GO{state}\r");
        self.link.write_all(cmd.as_bytes()).map_err(io_err)?;
        self.link.flush().map_err(io_err)?;
        debug!("Proportional: {device} -> {state}");
        Ok(())
    }
}
