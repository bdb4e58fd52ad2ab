//! OUT (host → device) transfer behavior.

mod util;

use usbfs_core::crc::crc16;
use usbfs_core::pid::Pid;
use usbfs_core::regs;
use util::TestHost;

#[test]
fn out_bad_crc_is_silently_dropped_then_retried() {
    let mut host = TestHost::new();
    host.arm_out(1);

    // Corrupted CRC16: no handshake, no FIFO write, no event.
    host.send_token(Pid::Out, 0, 1);
    host.send_data_bad_crc(Pid::Data0, &[1, 2, 3, 4, 5, 6, 7, 8]);
    host.expect_silence();
    assert_eq!(host.read_reg(regs::REG_OUT_EV_PENDING), 0);
    assert_eq!(host.read_reg(regs::REG_OUT_STATUS) & regs::STATUS_HAVE, 0);

    // The endpoint is still armed; the retry with a good CRC succeeds.
    host.send_token(Pid::Out, 0, 1);
    host.send_data(Pid::Data0, &[1, 2, 3, 4, 5, 6, 7, 8]);
    host.expect_ack();
    assert_eq!(host.read_reg(regs::REG_OUT_EV_PENDING), 1);

    let mut expected = vec![1, 2, 3, 4, 5, 6, 7, 8];
    expected.extend_from_slice(&crc16(&expected.clone()));
    assert_eq!(host.drain_out(), expected);
}

#[test]
fn out_to_unarmed_endpoint_naks() {
    let mut host = TestHost::new();
    host.send_token(Pid::Out, 0, 3);
    host.send_data(Pid::Data0, &[0x42]);
    host.expect_nak();
    assert_eq!(host.read_reg(regs::REG_OUT_EV_PENDING), 0);
    assert_eq!(host.read_reg(regs::REG_OUT_STATUS) & regs::STATUS_HAVE, 0);
}

#[test]
fn pending_done_naks_every_endpoint() {
    let mut host = TestHost::new();
    host.arm_out(1);
    host.arm_out(2);

    host.send_token(Pid::Out, 0, 1);
    host.send_data(Pid::Data0, &[0x11]);
    host.expect_ack();
    assert_eq!(host.read_reg(regs::REG_OUT_STATUS) & regs::STATUS_EPNO_MASK, 1);

    // Endpoint 2 is enabled, but the unacknowledged done blocks it.
    host.send_token(Pid::Out, 0, 2);
    host.send_data(Pid::Data0, &[0x22]);
    host.expect_nak();
    // The status latch still reports the committed endpoint.
    assert_eq!(host.read_reg(regs::REG_OUT_STATUS) & regs::STATUS_EPNO_MASK, 1);

    // Drain and acknowledge; endpoint 2 now accepts.
    host.drain_out();
    host.send_token(Pid::Out, 0, 2);
    host.send_data(Pid::Data0, &[0x22]);
    host.expect_ack();
    assert_eq!(host.read_reg(regs::REG_OUT_STATUS) & regs::STATUS_EPNO_MASK, 2);
}

#[test]
fn out_disarms_after_each_packet() {
    let mut host = TestHost::new();
    host.arm_out(1);

    host.send_token(Pid::Out, 0, 1);
    host.send_data(Pid::Data0, &[0xAB]);
    host.expect_ack();
    host.drain_out();

    // One packet per arm: the next OUT NAKs until the CPU re-enables.
    host.send_token(Pid::Out, 0, 1);
    host.send_data(Pid::Data1, &[0xCD]);
    host.expect_nak();

    host.arm_out(1);
    host.send_token(Pid::Out, 0, 1);
    host.send_data(Pid::Data1, &[0xCD]);
    host.expect_ack();
    assert_eq!(host.drain_out()[..1], [0xCD]);
}

#[test]
fn max_size_packet_fills_fifo_with_trailer() {
    let mut host = TestHost::new();
    host.arm_out(0);

    let payload: Vec<u8> = (0..64).collect();
    host.send_token(Pid::Out, 0, 0);
    host.send_data(Pid::Data0, &payload);
    host.expect_ack();

    let drained = host.drain_out();
    assert_eq!(drained.len(), 66);
    assert_eq!(&drained[..64], &payload[..]);
    assert_eq!(&drained[64..], &crc16(&payload));
}

#[test]
fn out_ctrl_reset_clears_fifo() {
    let mut host = TestHost::new();
    host.arm_out(0);
    host.send_token(Pid::Out, 0, 0);
    host.send_data(Pid::Data0, &[9, 9, 9]);
    host.expect_ack();

    host.write_reg(regs::REG_OUT_CTRL, regs::CTRL_RESET);
    assert_eq!(host.read_reg(regs::REG_OUT_STATUS) & regs::STATUS_HAVE, 0);
}
