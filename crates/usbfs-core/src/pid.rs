//! USB packet identifiers.
//!
//! A PID is a 4-bit code transmitted as `{pid, pid ^ 0b1111}` in an 8-bit PID
//! byte; the complemented copy is the only integrity check a PID carries. The
//! low two bits of the code select the packet category.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The nine packet identifiers a Full-Speed device has to understand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Pid {
    // Tokens
    Setup = 0b1101,
    Out = 0b0001,
    In = 0b1001,
    Sof = 0b0101,
    // Data
    Data0 = 0b0011,
    Data1 = 0b1011,
    // Handshakes
    Ack = 0b0010,
    Nak = 0b1010,
    Stall = 0b1110,
}

/// Packet category, encoded in the low two bits of the PID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PidKind {
    Token,
    Data,
    Handshake,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidPid {
    #[error("unrecognized PID nibble {0:#06b}")]
    Unrecognized(u8),
    #[error("PID byte {0:#04x} fails its complement check")]
    BadCheck(u8),
}

impl Pid {
    pub fn kind(self) -> PidKind {
        match self as u8 & 0b11 {
            0b01 => PidKind::Token,
            0b11 => PidKind::Data,
            _ => PidKind::Handshake,
        }
    }

    pub fn is_token(self) -> bool {
        self.kind() == PidKind::Token
    }

    pub fn is_data(self) -> bool {
        self.kind() == PidKind::Data
    }

    pub fn is_handshake(self) -> bool {
        self.kind() == PidKind::Handshake
    }

    /// The PID byte as it appears on the wire: code in the low nibble, its
    /// complement in the high nibble.
    pub fn byte(self) -> u8 {
        let p = self as u8;
        p | ((p ^ 0b1111) << 4)
    }

    pub fn from_nibble(nibble: u8) -> Result<Pid, InvalidPid> {
        Ok(match nibble & 0b1111 {
            0b1101 => Pid::Setup,
            0b0001 => Pid::Out,
            0b1001 => Pid::In,
            0b0101 => Pid::Sof,
            0b0011 => Pid::Data0,
            0b1011 => Pid::Data1,
            0b0010 => Pid::Ack,
            0b1010 => Pid::Nak,
            0b1110 => Pid::Stall,
            other => return Err(InvalidPid::Unrecognized(other)),
        })
    }

    /// Decode a received PID byte, validating the complement nibble.
    pub fn from_byte(byte: u8) -> Result<Pid, InvalidPid> {
        let low = byte & 0b1111;
        let high = byte >> 4;
        if low ^ high != 0b1111 {
            return Err(InvalidPid::BadCheck(byte));
        }
        Pid::from_nibble(low)
    }
}
