//! Randomized properties of the wire codec and the receive pipeline.

#![cfg(not(target_arch = "wasm32"))]

use proptest::collection::vec;
use proptest::prelude::*;

use usbfs_core::crc::{crc16, Crc16};
use usbfs_core::packet::{
    bytes_to_bits, data_packet, nrzi_decode, nrzi_encode, stuff_bits, unstuff_bits, wrap_packet,
};
use usbfs_core::pid::Pid;
use usbfs_core::rx::RxPipeline;

/// Bit-reflected CRC-16 reference (poly 0x8005 reflected to 0xA001, seed
/// 0xFFFF, output complemented), transmitted little-endian.
fn crc16_reference(data: &[u8]) -> [u8; 2] {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            crc = if crc & 1 == 1 {
                (crc >> 1) ^ 0xA001
            } else {
                crc >> 1
            };
        }
    }
    let out = !crc;
    [out as u8, (out >> 8) as u8]
}

proptest! {
    #[test]
    fn crc16_matches_reference(data in vec(any::<u8>(), 0..64)) {
        prop_assert_eq!(crc16(&data), crc16_reference(&data));
    }

    #[test]
    fn crc16_appended_stream_leaves_residual(data in vec(any::<u8>(), 0..64)) {
        let trailer = crc16(&data);
        let mut crc = Crc16::new();
        for &b in data.iter().chain(trailer.iter()) {
            crc.push_byte(b);
        }
        prop_assert!(crc.residual_ok());
    }

    #[test]
    fn bit_stuffing_roundtrip(bits in vec(any::<bool>(), 0..1024)) {
        let stuffed = stuff_bits(&bits);
        prop_assert_eq!(unstuff_bits(&stuffed), bits);
        // The stuffed stream never carries seven consecutive 1s.
        let mut ones = 0;
        for &b in &stuffed {
            ones = if b { ones + 1 } else { 0 };
            prop_assert!(ones < 7);
        }
    }

    #[test]
    fn nrzi_roundtrip(bits in vec(any::<bool>(), 0..1024)) {
        prop_assert_eq!(nrzi_decode(&nrzi_encode(&bits)), bits);
    }

    #[test]
    fn rx_pipeline_recovers_any_payload(payload in vec(any::<u8>(), 0..64)) {
        let packet = data_packet(Pid::Data0, &payload).unwrap();
        let mut pipeline = RxPipeline::new();
        let mut bytes = Vec::new();

        // A little bus idle, then the wrapped packet, 4 ticks per bit.
        let mut states = vec![usbfs_core::LineState::J; 8];
        states.extend(wrap_packet(&packet));
        for &s in &states {
            let (d_p, d_n) = s.pair();
            for _ in 0..4 {
                let step = pipeline.tick(d_p, d_n);
                prop_assert!(!step.bitstuff_error);
                if let Some(b) = step.byte {
                    bytes.push(b);
                }
            }
        }
        prop_assert_eq!(bytes, packet);
    }

    #[test]
    fn wire_serialization_roundtrip(bytes in vec(any::<u8>(), 0..64)) {
        let bits = bytes_to_bits(&bytes);
        prop_assert_eq!(bits.len(), bytes.len() * 8);
        prop_assert_eq!(usbfs_core::packet::bits_to_bytes(&bits), bytes);
    }
}
