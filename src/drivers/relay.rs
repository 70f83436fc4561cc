//! NCD ProXR relay board driver.
//!
//! Commands travel inside the board's API envelope:
//!
//! ```text
//! ┌──────┬─────┬─────────────────────┬──────────┐
//! │ 0xAA │ len │ payload (len bytes) │ checksum │
//! └──────┴─────┴─────────────────────┴──────────┘
//!   checksum = (0xAA + len + Σ payload) & 0xFF
//! ```
//!
//! Relay on/off by index is payload `[254, 48|47, lsb, msb]` with a
//! zero-based relay index.  Mapping values are relay numbers starting at 1.
//! The board answers every command with `[0xAA, 0x01, 0x55, checksum]`.

use std::io::{Read, Write};

use heapless::Vec;
use log::debug;

use super::BoxedLink;
use crate::error::ActuatorError;

const HEADER: u8 = 0xAA;
const COMMAND: u8 = 254;
const RELAY_ON: u8 = 48;
const RELAY_OFF: u8 = 47;
const ACK: u8 = 0x55;

/// Envelope + 4-byte relay payload.
const FRAME_LEN: usize = 7;
const ACK_LEN: usize = 4;

pub type Frame = Vec<u8, FRAME_LEN>;

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Build the framed on/off command for relay number `relay` (1-based;
/// config validation keeps it within `1..=65536`).
pub fn relay_frame(relay: u32, on: bool) -> Frame {
    let index = relay.saturating_sub(1);
    let payload = [
        COMMAND,
        if on { RELAY_ON } else { RELAY_OFF },
        (index & 0xFF) as u8,
        ((index >> 8) & 0xFF) as u8,
    ];

    let mut frame = Frame::new();
    // Capacity is exactly header + len + payload + checksum.
    let _ = frame.push(HEADER);
    let _ = frame.push(payload.len() as u8);
    let _ = frame.extend_from_slice(&payload);
    let _ = frame.push(checksum(&frame));
    frame
}

/// Whether `reply` is a well-formed acknowledgement.
pub fn is_ack(reply: &[u8]) -> bool {
    reply.len() == ACK_LEN
        && reply[0] == HEADER
        && reply[1] == 1
        && reply[2] == ACK
        && reply[3] == checksum(&reply[..3])
}

/// Relay board on one serial link.
pub struct RelayBoard {
    link: BoxedLink,
}

impl RelayBoard {
    pub fn new(link: BoxedLink) -> Self {
        Self { link }
    }

    /// Energise (`true`) or release relay number `relay`.
    pub fn set(&mut self, device: &str, relay: u32, on: bool) -> Result<(), ActuatorError> {
        let io_err = |source| ActuatorError::Io {
            device: device.to_string(),
            source,
        };

        let frame = relay_frame(relay, on);
        self.link.write_all(&frame).map_err(io_err)?;
        self.link.flush().map_err(io_err)?;

        let mut reply = [0u8; ACK_LEN];
        self.link.read_exact(&mut reply).map_err(io_err)?;
        if !is_ack(&reply) {
            return Err(ActuatorError::NoAck {
                device: device.to_string(),
                reply: reply.to_vec(),
            });
        }

        debug!("Relay: {device} relay {relay} -> {}", if on { "on" } else { "off" });
        Ok(())
    }
}
