//! Valve drivers.
//!
//! Each driver is a dumb actuator: it turns one already-validated command
//! into bytes on a serial link or writes under sysfs.  Which driver serves
//! a device is decided once, when the device catalog is resolved.
//!
//! | Driver         | Hardware                    | States        |
//! |----------------|-----------------------------|---------------|
//! | `relay`        | NCD ProXR relay board (UART)| 0 / 1         |
//! | `gpio`         | sysfs GPIO lines            | 0 / 1         |
//! | `proportional` | serial proportional valve   | raw setpoint  |

pub mod gpio;
pub mod proportional;
pub mod relay;

use std::io::{Read, Write};

use crate::error::ActuatorError;
use crate::sequence::LogicalState;

/// Byte link to a serial device.  Implemented for anything that reads and
/// writes, so real ports and in-memory test links are interchangeable.
pub trait SerialLink: Read + Write + Send {}

impl<T: Read + Write + Send + ?Sized> SerialLink for T {}

/// Owned serial link, held for the process lifetime.
pub type BoxedLink = Box<dyn SerialLink>;

/// One connected device, tagged by kind.
pub enum Valve {
    Relay(relay::RelayBoard),
    Gpio(gpio::GpioBank),
    Proportional(proportional::ProportionalValve),
}

impl Valve {
    /// Drive `address` to `state`.
    ///
    /// Relay and GPIO valves reject anything other than a binary level
    /// before touching the hardware.
    pub fn apply(&mut self, device: &str, address: u32, state: &LogicalState) -> Result<(), ActuatorError> {
        match self {
            Self::Relay(board) => board.set(device, address, binary(device, state)?),
            Self::Gpio(bank) => bank.set(device, address, binary(device, state)?),
            Self::Proportional(valve) => valve.go(device, state),
        }
    }
}

fn binary(device: &str, state: &LogicalState) -> Result<bool, ActuatorError> {
    match state {
        LogicalState::Binary(level) => Ok(*level),
        LogicalState::Setpoint(raw) => Err(ActuatorError::InvalidState {
            device: device.to_string(),
            state: raw.clone(),
        }),
    }
}
