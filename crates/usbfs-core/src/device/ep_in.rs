//! IN endpoint handler (device → host).
//!
//! The host CPU fills a single 64-byte FIFO and then arms an endpoint by
//! writing its number to `IN_CTRL`. Until armed, IN tokens are NAKed. Once
//! the host controller collects the data and ACKs, the FIFO is emptied, the
//! endpoint's data toggle flips, and a `done` event fires so the CPU can
//! refill, possibly for a different endpoint.

use serde::{Deserialize, Serialize};

use crate::device::event::EventFlag;
use crate::device::regs;
use crate::fifo::ByteFifo;
use crate::tx::TxDataSource;

const IN_FIFO_DEPTH: usize = 64;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InHandler {
    fifo: ByteFifo,
    /// STALL bitmap, one bit per endpoint.
    stalls: u16,
    /// Data toggle bitmap; EP0 starts on DATA1.
    dtbs: u16,
    /// Endpoint the queued FIFO contents are destined for.
    epno: u8,
    /// The host has armed the FIFO for transmission.
    queued: bool,
    /// An IN for the armed endpoint reached the bus during this arm cycle.
    transmitted: bool,
    pub ev_done: EventFlag,
}

impl InHandler {
    pub fn new() -> InHandler {
        InHandler {
            fifo: ByteFifo::new(IN_FIFO_DEPTH),
            stalls: 0,
            dtbs: 0x0001,
            epno: 0,
            queued: false,
            transmitted: false,
            ev_done: EventFlag::default(),
        }
    }

    // Host register surface.

    /// `IN_DATA` write: append one byte.
    pub fn write_data(&mut self, byte: u8) {
        if !self.fifo.push(byte) {
            tracing::warn!(byte, "IN FIFO overflow; byte dropped");
        }
    }

    /// `IN_CTRL` write.
    pub fn write_ctrl(&mut self, value: u8) {
        if value & regs::CTRL_RESET != 0 {
            self.fifo.clear();
            self.queued = false;
            self.transmitted = false;
            self.dtbs = 0x0001;
            return;
        }
        let epno = value & regs::CTRL_EPNO_MASK;
        if value & regs::CTRL_STALL != 0 {
            self.stalls |= 1 << epno;
        } else {
            // Arming also un-stalls the endpoint.
            self.stalls &= !(1 << epno);
            self.epno = epno;
            self.queued = true;
        }
    }

    /// `IN_STATUS` read.
    pub fn status(&self) -> u8 {
        let mut v = 0;
        if !self.queued {
            v |= regs::STATUS_IDLE;
        }
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

    pub fn armed(&self, endp: u8) -> bool {
        self.queued && endp == self.epno
    }

    pub fn dtb(&self, endp: u8) -> bool {
        self.dtbs >> endp & 1 == 1
    }

    // Transaction strobes.

    /// Response poll for an IN token.
    pub fn on_poll(&mut self, endp: u8) {
        if self.armed(endp) {
            self.transmitted = true;
        }
    }

    /// The host ACKed our DATA packet.
    pub fn on_commit(&mut self, endp: u8) {
        if self.queued && self.transmitted && endp == self.epno && !self.stalled(endp) {
            self.queued = false;
            self.transmitted = false;
            self.fifo.clear();
            self.dtbs ^= 1 << self.epno;
            self.ev_done.trigger();
            tracing::trace!(endp, "IN transfer committed");
        }
    }

    /// A SETUP transaction committed: clear the endpoint's STALL and force
    /// its toggle to DATA1 for the data stage.
    pub fn on_setup_commit(&mut self, endp: u8) {
        self.stalls &= !(1 << endp);
        self.dtbs |= 1 << endp;
        self.queued = false;
        self.transmitted = false;
        self.fifo.clear();
    }
}

impl TxDataSource for InHandler {
    fn have(&self) -> bool {
        !self.fifo.is_empty()
    }

    fn peek(&self) -> u8 {
        self.fifo.front().unwrap_or(0)
    }

    fn advance(&mut self) {
        self.fifo.pop();
    }
}

impl Default for InHandler {
    fn default() -> InHandler {
        InHandler::new()
    }
}
