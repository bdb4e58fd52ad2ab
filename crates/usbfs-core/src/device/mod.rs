//! The device controller: pipelines, transaction sequencer, endpoint
//! handlers, and the host register file.

pub mod ep_in;
pub mod ep_out;
pub mod event;
pub mod regs;
pub mod setup;

use serde::{Deserialize, Serialize};

use crate::line::{LineIn, LineOut};
use crate::pid::Pid;
use crate::rx::RxPipeline;
use crate::sm::{HeaderDecoder, TransferInputs, UsbTransfer};
use self::ep_in::InHandler;
use self::ep_out::OutHandler;
use self::setup::SetupHandler;

/// A USB reset is SE0 held for at least 2.5 µs: 30 bit times at 12 MHz.
const RESET_SE0_BITS: u32 = 30;

/// A USB 1.1 Full-Speed device controller with a three-FIFO host interface.
///
/// Drive the wire with [`tick`], one call per 48 MHz tick; access the
/// register file with [`read_reg`]/[`write_reg`] between ticks. The shared
/// interrupt line is [`irq`].
///
/// [`tick`]: UsbDeviceCore::tick
/// [`read_reg`]: UsbDeviceCore::read_reg
/// [`write_reg`]: UsbDeviceCore::write_reg
/// [`irq`]: UsbDeviceCore::irq
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UsbDeviceCore {
    rx: RxPipeline,
    header: HeaderDecoder,
    transfer: UsbTransfer,
    setup: SetupHandler,
    ep_in: InHandler,
    ep_out: OutHandler,
    /// Device address; applied by the sequencer at IDLE.
    address: u8,
    pullup: bool,
    /// Consecutive SE0 bit times, for reset detection.
    se0_bits: u32,
    /// Next-event ordering between the IN and OUT `done` sources.
    in_next: bool,
    out_next: bool,
    /// Pad drive held between bit strobes.
    hold: LineOut,
}

impl UsbDeviceCore {
    pub fn new() -> UsbDeviceCore {
        UsbDeviceCore {
            rx: RxPipeline::new(),
            header: HeaderDecoder::new(),
            transfer: UsbTransfer::new(),
            setup: SetupHandler::new(),
            ep_in: InHandler::new(),
            ep_out: OutHandler::new(),
            address: 0,
            pullup: false,
            se0_bits: 0,
            in_next: false,
            out_next: false,
            hold: LineOut::released(),
        }
    }

    /// Attach or release the 1.5 kΩ D+ pull-up (Full-Speed attach).
    pub fn set_pullup(&mut self, on: bool) {
        self.pullup = on;
    }

    pub fn pullup(&self) -> bool {
        self.pullup
    }

    /// Shared interrupt line: OR of all enabled, pending events.
    pub fn irq(&self) -> bool {
        self.setup.irq() || self.ep_in.ev_done.irq() || self.ep_out.ev_done.irq()
    }

    /// Advance one 48 MHz tick.
    pub fn tick(&mut self, input: LineIn) -> LineOut {
        // Pad mux: while we drive the bus the receiver sees idle J.
        let (d_p, d_n) = if self.hold.oe {
            (true, false)
        } else {
            (input.d_p, input.d_n)
        };
        let step = self.rx.tick(d_p, d_n);
        if !step.bit_strobe {
            return self.hold;
        }

        // Bus reset timer.
        if step.se0 {
            self.se0_bits = self.se0_bits.saturating_add(1);
            if self.se0_bits == RESET_SE0_BITS {
                self.usb_reset();
            }
        } else {
            self.se0_bits = 0;
        }

        let ev = self.header.step(&step);
        let inputs = self.transfer_inputs();
        let (line, events) = self.transfer.step(&step, ev, inputs, &mut self.ep_in);

        let tok = self.transfer.tok();
        let endp = self.transfer.endp();

        if events.start && tok == Pid::Setup {
            self.setup.begin(endp);
            self.ep_out.on_setup_begin();
        }
        if events.poll {
            match tok {
                Pid::In => self.ep_in.on_poll(endp),
                Pid::Out => self.ep_out.on_poll(endp),
                _ => {}
            }
        }
        if let Some(byte) = events.recv_byte {
            match tok {
                Pid::Setup => self.setup.recv_byte(byte),
                Pid::Out => self.ep_out.recv_byte(byte),
                _ => {}
            }
        }
        if events.commit {
            match tok {
                Pid::Setup => {
                    self.setup.commit();
                    self.ep_in.on_setup_commit(endp);
                    self.ep_out.on_setup_commit(endp);
                }
                Pid::In => self.ep_in.on_commit(endp),
                Pid::Out => self.ep_out.on_commit(endp),
                _ => {}
            }
            tracing::trace!(?tok, endp, "transaction committed");
        }
        if events.abort {
            match tok {
                Pid::Setup => self.setup.rollback(),
                Pid::Out => self.ep_out.on_abort(),
                _ => {}
            }
            tracing::trace!(?tok, endp, "transaction aborted");
        }

        self.ep_out.bit_tick();
        self.update_next_ev();
        self.hold = line;
        line
    }

    /// Read one 8-bit register. Data-register reads advance the backing
    /// FIFO.
    pub fn read_reg(&mut self, addr: u16) -> u8 {
        match addr {
            regs::REG_ADDRESS => self.address,
            regs::REG_NEXT_EV => self.next_ev(),
            regs::REG_PULLUP => self.pullup as u8,
            regs::REG_SETUP_DATA => self.setup.read_data(),
            regs::REG_SETUP_STATUS => self.setup.status(),
            regs::REG_SETUP_EV_PENDING => self.setup.ev_pending_bits(),
            regs::REG_SETUP_EV_ENABLE => self.setup.ev_enable_bits(),
            regs::REG_IN_STATUS => self.ep_in.status(),
            regs::REG_IN_EV_PENDING => self.ep_in.ev_done.pending as u8,
            regs::REG_IN_EV_ENABLE => self.ep_in.ev_done.enabled as u8,
            regs::REG_OUT_DATA => self.ep_out.read_data(),
            regs::REG_OUT_STATUS => self.ep_out.status(),
            regs::REG_OUT_EV_PENDING => self.ep_out.ev_done.pending as u8,
            regs::REG_OUT_EV_ENABLE => self.ep_out.ev_done.enabled as u8,
            _ => 0,
        }
    }

    /// Write one 8-bit register.
    pub fn write_reg(&mut self, addr: u16, value: u8) {
        match addr {
            regs::REG_ADDRESS => self.address = value & 0x7F,
            regs::REG_PULLUP => self.pullup = value & 1 == 1,
            regs::REG_SETUP_CTRL => self.setup.write_ctrl(value),
            regs::REG_SETUP_EV_PENDING => self.setup.ack_events(value),
            regs::REG_SETUP_EV_ENABLE => self.setup.set_ev_enable(value),
            regs::REG_IN_DATA => self.ep_in.write_data(value),
            regs::REG_IN_CTRL => self.ep_in.write_ctrl(value),
            regs::REG_IN_EV_PENDING => self.ep_in.ev_done.ack(value & regs::EV_DONE != 0),
            regs::REG_IN_EV_ENABLE => self.ep_in.ev_done.enabled = value & regs::EV_DONE != 0,
            regs::REG_OUT_DATA => {}
            regs::REG_OUT_CTRL => self.ep_out.write_ctrl(value),
            regs::REG_OUT_EV_PENDING => self.ep_out.ev_done.ack(value & regs::EV_DONE != 0),
            regs::REG_OUT_EV_ENABLE => self.ep_out.ev_done.enabled = value & regs::EV_DONE != 0,
            _ => {}
        }
    }

    fn transfer_inputs(&self) -> TransferInputs {
        let endp = self.transfer.endp();
        let (stalled, armed, dtb) = match self.transfer.tok() {
            Pid::In => (
                self.ep_in.stalled(endp),
                self.ep_in.armed(endp),
                self.ep_in.dtb(endp),
            ),
            Pid::Out => (self.ep_out.stalled(endp), self.ep_out.armed(endp), false),
            // SETUP is always accepted; the sequencer overrides anyway.
            _ => (false, true, false),
        };
        TransferInputs {
            device_addr: self.address,
            stalled,
            armed,
            dtb,
        }
    }

    fn usb_reset(&mut self) {
        tracing::debug!("USB bus reset detected");
        self.address = 0;
        self.transfer.reset();
        self.setup.usb_reset();
        self.in_next = false;
        self.out_next = false;
        self.hold = LineOut::released();
    }

    /// Track which of the IN/OUT `done` events became pending first.
    fn update_next_ev(&mut self) {
        let in_pending = self.ep_in.ev_done.pending;
        let out_pending = self.ep_out.ev_done.pending;
        match (in_pending, out_pending) {
            (true, false) => {
                self.in_next = true;
                self.out_next = false;
            }
            (false, true) => {
                self.in_next = false;
                self.out_next = true;
            }
            (false, false) => {
                self.in_next = false;
                self.out_next = false;
            }
            // Both pending: keep the established order.
            (true, true) => {}
        }
    }

    fn next_ev(&self) -> u8 {
        if self.setup.ev_reset.pending {
            regs::NEXT_EV_RESET
        } else if self.in_next {
            regs::NEXT_EV_IN
        } else if self.out_next {
            regs::NEXT_EV_OUT
        } else if self.setup.ev_ready.pending {
            regs::NEXT_EV_SETUP
        } else {
            0
        }
    }
}

impl Default for UsbDeviceCore {
    fn default() -> UsbDeviceCore {
        UsbDeviceCore::new()
    }
}
