//! Serial port opener shared by the valve and analyzer adapters.
//!
//! All rig devices talk 8N1; only the path and baud rate vary.

use std::io;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::drivers::BoxedLink;

/// Read timeout for command acknowledgements.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(2);

/// Open `path` at `baud`, 8 data bits, no parity, 1 stop bit.
pub fn open_link(path: &str, baud: u32) -> io::Result<BoxedLink> {
    open_with_timeout(path, baud, ACK_TIMEOUT)
}

pub fn open_with_timeout(path: &str, baud: u32, timeout: Duration) -> io::Result<BoxedLink> {
    let port = serialport::new(path, baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(timeout)
        .open()
        .map_err(io::Error::from)?;
    Ok(Box::new(port))
}
