//! Packet-level transmit sequencing: PID, payload, CRC16.

use serde::{Deserialize, Serialize};

use crate::crc::Crc16;
use crate::line::LineOut;
use crate::pid::{Pid, PidKind};
use crate::tx::pipeline::TxPipeline;

/// Pull interface for outgoing payload bytes (the IN FIFO implements this).
pub trait TxDataSource {
    fn have(&self) -> bool;
    fn peek(&self) -> u8;
    fn advance(&mut self);
}

/// A source with no bytes, for handshake packets.
pub struct NoData;

impl TxDataSource for NoData {
    fn have(&self) -> bool {
        false
    }

    fn peek(&self) -> u8 {
        unreachable!("NoData has no bytes")
    }

    fn advance(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum SendState {
    /// Next byte is the PID.
    Pid,
    /// Streaming payload bytes (data packets only).
    Payload,
    /// Next byte is the high CRC16 byte.
    CrcHigh,
    /// All bytes queued; EOP follows.
    Done,
}

/// Sequences one outgoing packet through the transmit pipeline.
///
/// Handshake packets are a bare PID. Data packets stream payload bytes from
/// a [`TxDataSource`] and append the CRC16 computed on the fly. The device
/// never transmits tokens.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxPacketSend {
    pipeline: TxPipeline,
    state: SendState,
    pid: Pid,
    crc: Crc16,
    crc_high: u8,
}

impl TxPacketSend {
    pub fn new() -> TxPacketSend {
        TxPacketSend {
            pipeline: TxPipeline::new(),
            state: SendState::Done,
            pid: Pid::Nak,
            crc: Crc16::new(),
            crc_high: 0,
        }
    }

    /// Queue a packet. Transmission begins on the next [`step`].
    ///
    /// [`step`]: TxPacketSend::step
    pub fn start(&mut self, pid: Pid) {
        debug_assert!(!self.is_active());
        self.pid = pid;
        self.state = SendState::Pid;
        self.crc.reset();
        self.pipeline.start();
    }

    pub fn is_active(&self) -> bool {
        self.pipeline.is_active()
    }

    /// Advance one bit time, pulling payload bytes from `source` as needed.
    /// Returns the pad drive and a one-shot packet-end flag.
    pub fn step(&mut self, source: &mut dyn TxDataSource) -> (LineOut, bool) {
        let state = &mut self.state;
        let pid = self.pid;
        let crc = &mut self.crc;
        let crc_high = &mut self.crc_high;
        self.pipeline.step(&mut || match *state {
            SendState::Pid => {
                *state = match pid.kind() {
                    PidKind::Data => SendState::Payload,
                    _ => SendState::Done,
                };
                Some(pid.byte())
            }
            SendState::Payload => {
                if source.have() {
                    let byte = source.peek();
                    source.advance();
                    crc.push_byte(byte);
                    Some(byte)
                } else {
                    let checksum = crc.checksum();
                    *crc_high = checksum[1];
                    *state = SendState::CrcHigh;
                    Some(checksum[0])
                }
            }
            SendState::CrcHigh => {
                *state = SendState::Done;
                Some(*crc_high)
            }
            SendState::Done => None,
        })
    }
}

impl Default for TxPacketSend {
    fn default() -> TxPacketSend {
        TxPacketSend::new()
    }
}
