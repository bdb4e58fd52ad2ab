//! Packet header decoding.
//!
//! Clocks bytes out of the receive pipeline through a small state machine:
//! the first byte after sync is the PID (validated against its complement);
//! tokens carry two more bytes holding ADDR, ENDP and a CRC5; data and
//! handshake packets are classified from the PID alone. Data payload bytes do
//! not pass through this capture; they flow to the transaction sequencer
//! directly off the shifter.

use serde::{Deserialize, Serialize};

use crate::crc::Crc5;
use crate::pid::{Pid, PidKind};
use crate::rx::RxStep;

/// What the decoder produced this bit time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderEvent {
    None,
    /// A complete token with a valid CRC5. For SOF the frame number occupies
    /// the `addr`/`endp` fields and is not otherwise interpreted.
    Token { pid: Pid, addr: u8, endp: u8 },
    /// A data PID was seen; payload bytes follow on the byte strobes.
    DataStart { pid: Pid },
    Handshake { pid: Pid },
    /// PID complement mismatch or token CRC5 failure; the packet is
    /// abandoned.
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum HeaderState {
    Idle,
    WaitPid,
    WaitByte0,
    WaitByte1,
    /// Remainder of the packet is not ours to capture.
    Drain,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeaderDecoder {
    state: HeaderState,
    pid: Pid,
    addr: u8,
    endp: u8,
    crc: Crc5,
}

impl HeaderDecoder {
    pub fn new() -> HeaderDecoder {
        HeaderDecoder {
            state: HeaderState::Idle,
            pid: Pid::Nak,
            addr: 0,
            endp: 0,
            crc: Crc5::new(),
        }
    }

    pub fn step(&mut self, rx: &RxStep) -> HeaderEvent {
        if !rx.bit_strobe {
            return HeaderEvent::None;
        }
        if rx.pkt_start {
            self.state = HeaderState::WaitPid;
            return HeaderEvent::None;
        }
        if rx.pkt_end {
            self.state = HeaderState::Idle;
            return HeaderEvent::None;
        }
        let Some(byte) = rx.byte else {
            return HeaderEvent::None;
        };
        match self.state {
            HeaderState::Idle | HeaderState::Drain => HeaderEvent::None,
            HeaderState::WaitPid => match Pid::from_byte(byte) {
                Ok(pid) => {
                    self.pid = pid;
                    match pid.kind() {
                        PidKind::Token => {
                            self.crc.reset();
                            self.state = HeaderState::WaitByte0;
                            HeaderEvent::None
                        }
                        PidKind::Data => {
                            self.state = HeaderState::Drain;
                            HeaderEvent::DataStart { pid }
                        }
                        PidKind::Handshake => {
                            self.state = HeaderState::Drain;
                            HeaderEvent::Handshake { pid }
                        }
                    }
                }
                Err(_) => {
                    self.state = HeaderState::Drain;
                    HeaderEvent::Error
                }
            },
            HeaderState::WaitByte0 => {
                self.addr = byte & 0x7F;
                self.endp = byte >> 7;
                self.crc.push_byte(byte);
                self.state = HeaderState::WaitByte1;
                HeaderEvent::None
            }
            HeaderState::WaitByte1 => {
                self.endp |= (byte & 0x07) << 1;
                self.crc.push_byte(byte);
                self.state = HeaderState::Drain;
                if self.crc.residual_ok() {
                    HeaderEvent::Token {
                        pid: self.pid,
                        addr: self.addr,
                        endp: self.endp,
                    }
                } else {
                    HeaderEvent::Error
                }
            }
        }
    }
}

impl Default for HeaderDecoder {
    fn default() -> HeaderDecoder {
        HeaderDecoder::new()
    }
}
