//! OUT endpoint handler (host → device).
//!
//! The host CPU arms an endpoint by writing its number to `OUT_CTRL` with
//! the `enable` bit set; the next OUT packet to that endpoint is accepted
//! into a 66-byte FIFO (64 payload bytes plus the CRC16 trailer, which the
//! CPU discards). A successful receipt disarms the endpoint, latches its
//! number into `OUT_STATUS`, and raises `done`; until that event is
//! acknowledged every further OUT token is NAKed so the buffer cannot be
//! overwritten under the CPU.

use serde::{Deserialize, Serialize};

use crate::device::event::EventFlag;
use crate::device::regs;
use crate::fifo::ByteFifo;

const OUT_FIFO_DEPTH: usize = 66;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutHandler {
    fifo: ByteFifo,
    stalls: u16,
    enables: u16,
    /// Data toggle bitmap; flips on committed transfers. Received toggles
    /// are not policed; the host owns retry discipline.
    dtbs: u16,
    /// Endpoint of the most recent committed OUT packet.
    epno: u8,
    /// Accepting the data stage of the current transaction.
    responding: bool,
    /// Draining stale bytes after a SETUP token.
    draining: bool,
    pub ev_done: EventFlag,
}

impl OutHandler {
    pub fn new() -> OutHandler {
        OutHandler {
            fifo: ByteFifo::new(OUT_FIFO_DEPTH),
            stalls: 0,
            enables: 0,
            dtbs: 0x0001,
            epno: 0,
            responding: false,
            draining: false,
            ev_done: EventFlag::default(),
        }
    }

    // Host register surface.

    /// `OUT_DATA` read: pop one byte (0 when empty).
    pub fn read_data(&mut self) -> u8 {
        self.fifo.pop().unwrap_or(0)
    }

    /// `OUT_CTRL` write.
    pub fn write_ctrl(&mut self, value: u8) {
        if value & regs::CTRL_RESET != 0 {
            self.fifo.clear();
            self.enables = 0;
            self.stalls = 0;
            self.responding = false;
            self.draining = false;
            return;
        }
        let epno = value & regs::CTRL_EPNO_MASK;
        if value & regs::CTRL_ENABLE != 0 {
            self.enables |= 1 << epno;
        } else {
            self.enables &= !(1 << epno);
        }
        if value & regs::CTRL_STALL != 0 {
            self.stalls |= 1 << epno;
        } else {
            self.stalls &= !(1 << epno);
        }
    }

    /// `OUT_STATUS` read.
    pub fn status(&self) -> u8 {
        let mut v = self.epno & regs::STATUS_EPNO_MASK;
        if !self.fifo.is_empty() {
            v |= regs::STATUS_HAVE;
        }
        if self.ev_done.pending {
            v |= regs::STATUS_PEND;
        }
        v
    }

    // Policy inputs for the transaction sequencer.

    pub fn stalled(&self, endp: u8) -> bool {
        self.stalls >> endp & 1 == 1
    }

    /// Willing to accept data: endpoint enabled, no unacknowledged `done`,
    /// and not mid-drain.
    pub fn armed(&self, endp: u8) -> bool {
        self.enables >> endp & 1 == 1 && !self.ev_done.pending && !self.draining
    }

    pub fn dtb(&self, endp: u8) -> bool {
        self.dtbs >> endp & 1 == 1
    }

    // Transaction strobes.

    /// Response poll for an OUT token.
    pub fn on_poll(&mut self, endp: u8) {
        self.responding = self.armed(endp);
    }

    /// One byte of an accepted OUT data stage (payload or CRC trailer).
    pub fn recv_byte(&mut self, byte: u8) {
        if self.responding && !self.fifo.push_pending(byte) {
            tracing::warn!(byte, "OUT FIFO overflow; byte dropped");
        }
    }

    /// ACK sent: expose the packet and disarm the endpoint.
    pub fn on_commit(&mut self, endp: u8) {
        if self.responding {
            self.fifo.commit();
            self.epno = endp;
            self.enables &= !(1 << endp);
            self.dtbs ^= 1 << endp;
            self.ev_done.trigger();
            self.responding = false;
            tracing::trace!(endp, "OUT transfer committed");
        }
    }

    /// The data stage failed (bad CRC16 or line error): drop this packet's
    /// bytes, send nothing, and stay armed for the host's retry.
    pub fn on_abort(&mut self) {
        if self.responding {
            self.fifo.rollback();
            self.responding = false;
        }
    }

    /// A SETUP token was accepted; stale bytes start draining.
    pub fn on_setup_begin(&mut self) {
        if !self.fifo.is_empty() {
            self.draining = true;
        }
    }

    /// A SETUP transaction committed: clear the endpoint's STALL and arm
    /// state and force its toggle for the data stage.
    pub fn on_setup_commit(&mut self, endp: u8) {
        self.stalls &= !(1 << endp);
        self.enables &= !(1 << endp);
        self.dtbs |= 1 << endp;
    }

    /// One bit-domain step: the drain pops a byte per bit until empty.
    pub fn bit_tick(&mut self) {
        if self.draining {
            self.fifo.pop();
            if self.fifo.is_empty() {
                self.draining = false;
            }
        }
    }
}

impl Default for OutHandler {
    fn default() -> OutHandler {
        OutHandler::new()
    }
}
