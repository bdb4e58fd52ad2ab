//! SETUP endpoint handler.
//!
//! SETUP packets must always be acknowledged, so they get their own FIFO: a
//! stale, undrained buffer from a previous control transfer is cleared the
//! moment a new SETUP token is accepted. The FIFO holds the 8 payload bytes
//! plus the 2-byte CRC16 trailer; host software discards the trailer.

use serde::{Deserialize, Serialize};

use crate::device::event::EventFlag;
use crate::device::regs;
use crate::fifo::ByteFifo;

const SETUP_FIFO_DEPTH: usize = 10;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SetupHandler {
    fifo: ByteFifo,
    epno: u8,
    is_in: bool,
    have_data_stage: bool,
    /// Index of the next payload byte, for sniffing bmRequestType/wLength.
    byte_index: u8,
    pub ev_ready: EventFlag,
    pub ev_reset: EventFlag,
}

impl SetupHandler {
    pub fn new() -> SetupHandler {
        SetupHandler {
            fifo: ByteFifo::new(SETUP_FIFO_DEPTH),
            epno: 0,
            is_in: false,
            have_data_stage: false,
            byte_index: 0,
            ev_ready: EventFlag::default(),
            ev_reset: EventFlag::default(),
        }
    }

    // Host register surface.

    /// `SETUP_DATA` read: pop the next byte (0 when empty).
    pub fn read_data(&mut self) -> u8 {
        self.fifo.pop().unwrap_or(0)
    }

    /// `SETUP_CTRL` write.
    pub fn write_ctrl(&mut self, value: u8) {
        if value & regs::CTRL_RESET != 0 {
            self.fifo.clear();
            self.ev_ready.pending = false;
        }
    }

    /// `SETUP_STATUS` read.
    pub fn status(&self) -> u8 {
        let mut v = self.epno & regs::STATUS_EPNO_MASK;
        if !self.fifo.is_empty() {
            v |= regs::STATUS_HAVE;
        }
        if self.ev_ready.pending {
            v |= regs::STATUS_PEND;
        }
        if self.is_in {
            v |= regs::STATUS_IS_IN;
        }
        if self.have_data_stage {
            v |= regs::STATUS_DATA;
        }
        v
    }

    // Core side.

    /// A SETUP token was accepted: unconditionally drop any stale contents
    /// and the stale `ready` event.
    pub fn begin(&mut self, endp: u8) {
        self.fifo.clear();
        self.ev_ready.pending = false;
        self.epno = endp;
        self.is_in = false;
        self.have_data_stage = false;
        self.byte_index = 0;
    }

    /// One byte of the SETUP DATA0 stage (payload + CRC16 trailer).
    pub fn recv_byte(&mut self, byte: u8) {
        match self.byte_index {
            0 => self.is_in = byte & 0x80 != 0,
            // wLength lives in bytes 6 and 7; nonzero means a data stage
            // follows.
            6 | 7 => {
                if byte != 0 {
                    self.have_data_stage = true;
                }
            }
            _ => {}
        }
        self.byte_index = self.byte_index.saturating_add(1);
        if !self.fifo.push_pending(byte) {
            tracing::warn!(byte, "SETUP FIFO overflow; byte dropped");
        }
    }

    /// The SETUP transaction was acknowledged; expose the bytes and raise
    /// `ready`.
    pub fn commit(&mut self) {
        self.fifo.commit();
        self.ev_ready.trigger();
    }

    /// The SETUP data stage failed its checks; drop the partial packet.
    pub fn rollback(&mut self) {
        self.fifo.rollback();
    }

    /// Wire-level bus reset observed.
    pub fn usb_reset(&mut self) {
        self.ev_reset.trigger();
    }

    pub fn ev_pending_bits(&self) -> u8 {
        let mut v = 0;
        if self.ev_ready.pending {
            v |= regs::SETUP_EV_READY;
        }
        if self.ev_reset.pending {
            v |= regs::SETUP_EV_RESET;
        }
        v
    }

    pub fn ack_events(&mut self, value: u8) {
        self.ev_ready.ack(value & regs::SETUP_EV_READY != 0);
        self.ev_reset.ack(value & regs::SETUP_EV_RESET != 0);
    }

    pub fn ev_enable_bits(&self) -> u8 {
        let mut v = 0;
        if self.ev_ready.enabled {
            v |= regs::SETUP_EV_READY;
        }
        if self.ev_reset.enabled {
            v |= regs::SETUP_EV_RESET;
        }
        v
    }

    pub fn set_ev_enable(&mut self, value: u8) {
        self.ev_ready.enabled = value & regs::SETUP_EV_READY != 0;
        self.ev_reset.enabled = value & regs::SETUP_EV_RESET != 0;
    }

    pub fn irq(&self) -> bool {
        self.ev_ready.irq() || self.ev_reset.irq()
    }
}

impl Default for SetupHandler {
    fn default() -> SetupHandler {
        SetupHandler::new()
    }
}
