#![allow(dead_code)]

//! A minimal USB host for driving the device core bit-by-bit in tests.

use usbfs_core::line::{LineIn, LineState};
use usbfs_core::packet::{
    data_packet, handshake_packet, sof_packet, token_packet, unwrap_packet, wrap_packet,
};
use usbfs_core::pid::Pid;
use usbfs_core::{regs, UsbDeviceCore};

/// How many bit times `expect_packet` waits for the device to answer before
/// declaring a timeout.
const RESPONSE_WINDOW_BITS: usize = 64;

pub struct TestHost {
    pub dev: UsbDeviceCore,
}

impl TestHost {
    /// A connected, event-enabled device at address 0.
    pub fn new() -> TestHost {
        let mut dev = UsbDeviceCore::new();
        dev.set_pullup(true);
        dev.write_reg(regs::REG_SETUP_EV_ENABLE, 0xFF);
        dev.write_reg(regs::REG_IN_EV_ENABLE, 0xFF);
        dev.write_reg(regs::REG_OUT_EV_ENABLE, 0xFF);
        dev.write_reg(regs::REG_SETUP_EV_PENDING, 0xFF);
        dev.write_reg(regs::REG_IN_EV_PENDING, 0xFF);
        dev.write_reg(regs::REG_OUT_EV_PENDING, 0xFF);
        dev.write_reg(regs::REG_ADDRESS, 0);
        let mut host = TestHost { dev };
        host.idle(16);
        host
    }

    pub fn read_reg(&mut self, addr: u16) -> u8 {
        self.dev.read_reg(addr)
    }

    pub fn write_reg(&mut self, addr: u16, value: u8) {
        self.dev.write_reg(addr, value)
    }

    /// Hold the bus idle (J) for `bits` bit times.
    pub fn idle(&mut self, bits: usize) {
        for _ in 0..bits * 4 {
            self.dev.tick(LineIn {
                d_p: true,
                d_n: false,
            });
        }
    }

    fn drive(&mut self, states: &[LineState]) {
        for &s in states {
            let (d_p, d_n) = s.pair();
            for _ in 0..4 {
                let out = self.dev.tick(LineIn { d_p, d_n });
                assert!(!out.oe, "device drove the bus during a host packet");
            }
        }
    }

    /// Put raw packet bytes on the wire (sync/stuffing/EOP added here).
    pub fn send_bytes(&mut self, bytes: &[u8]) {
        self.idle(2);
        self.drive(&wrap_packet(bytes));
    }

    pub fn send_token(&mut self, pid: Pid, addr: u8, endp: u8) {
        self.send_bytes(&token_packet(pid, addr, endp).unwrap());
    }

    pub fn send_sof(&mut self, frame: u16) {
        self.send_bytes(&sof_packet(frame));
    }

    pub fn send_data(&mut self, pid: Pid, data: &[u8]) {
        self.send_bytes(&data_packet(pid, data).unwrap());
    }

    /// A data packet whose CRC16 trailer has one bit flipped.
    pub fn send_data_bad_crc(&mut self, pid: Pid, data: &[u8]) {
        let mut packet = data_packet(pid, data).unwrap();
        let last = packet.len() - 1;
        packet[last] ^= 0x08;
        self.send_bytes(&packet);
    }

    pub fn send_ack(&mut self) {
        self.send_bytes(&handshake_packet(Pid::Ack).unwrap());
    }

    /// Wait for the device to transmit and decode one packet off the line.
    pub fn expect_packet(&mut self) -> Option<Vec<u8>> {
        let idle_in = LineIn {
            d_p: true,
            d_n: false,
        };
        let mut waited = 0;
        loop {
            let out = self.dev.tick(idle_in);
            if out.oe {
                let mut states = vec![out.state()];
                loop {
                    let out = self.dev.tick(idle_in);
                    if !out.oe {
                        break;
                    }
                    states.push(out.state());
                }
                // Each bit is held for four ticks.
                assert_eq!(states.len() % 4, 0, "torn bit in device transmission");
                let sampled: Vec<LineState> = states.chunks(4).map(|c| c[0]).collect();
                return unwrap_packet(&sampled);
            }
            waited += 1;
            if waited > RESPONSE_WINDOW_BITS * 4 {
                return None;
            }
        }
    }

    pub fn expect_ack(&mut self) {
        assert_eq!(
            self.expect_packet().as_deref(),
            Some(&[Pid::Ack.byte()][..]),
            "expected ACK"
        );
    }

    pub fn expect_nak(&mut self) {
        assert_eq!(
            self.expect_packet().as_deref(),
            Some(&[Pid::Nak.byte()][..]),
            "expected NAK"
        );
    }

    pub fn expect_stall(&mut self) {
        assert_eq!(
            self.expect_packet().as_deref(),
            Some(&[Pid::Stall.byte()][..]),
            "expected STALL"
        );
    }

    pub fn expect_data(&mut self, pid: Pid, data: &[u8]) {
        let expected = data_packet(pid, data).unwrap();
        assert_eq!(
            self.expect_packet(),
            Some(expected),
            "expected {pid:?} with {data:02x?}"
        );
    }

    /// The device must stay quiet for a whole response window.
    pub fn expect_silence(&mut self) {
        assert_eq!(self.expect_packet(), None, "expected no response");
    }

    // Transaction-level conveniences.

    /// SETUP + DATA0 to `(addr, 0)`, expecting the unconditional ACK.
    pub fn setup(&mut self, addr: u8, payload: &[u8; 8]) {
        self.send_token(Pid::Setup, addr, 0);
        self.send_data(Pid::Data0, payload);
        self.expect_ack();
    }

    /// Arm `endp` for IN with `data` queued.
    pub fn arm_in(&mut self, endp: u8, data: &[u8]) {
        for &b in data {
            self.write_reg(regs::REG_IN_DATA, b);
        }
        self.write_reg(regs::REG_IN_CTRL, endp & 0x0F);
    }

    /// Arm `endp` for OUT reception.
    pub fn arm_out(&mut self, endp: u8) {
        self.write_reg(regs::REG_OUT_CTRL, regs::CTRL_ENABLE | (endp & 0x0F));
    }

    /// Drain the SETUP FIFO (all ten bytes incl. CRC16) and ack the event.
    pub fn drain_setup(&mut self) -> Vec<u8> {
        let mut data = Vec::new();
        while self.read_reg(regs::REG_SETUP_STATUS) & regs::STATUS_HAVE != 0 {
            data.push(self.read_reg(regs::REG_SETUP_DATA));
            assert!(data.len() <= 10, "SETUP FIFO longer than ten bytes");
        }
        self.write_reg(regs::REG_SETUP_EV_PENDING, 0xFF);
        data
    }

    /// Drain the OUT FIFO (payload + CRC16 trailer) and ack the event.
    pub fn drain_out(&mut self) -> Vec<u8> {
        let mut data = Vec::new();
        while self.read_reg(regs::REG_OUT_STATUS) & regs::STATUS_HAVE != 0 {
            data.push(self.read_reg(regs::REG_OUT_DATA));
            assert!(data.len() <= 66, "OUT FIFO longer than 66 bytes");
        }
        self.write_reg(regs::REG_OUT_EV_PENDING, 0xFF);
        data
    }
}
