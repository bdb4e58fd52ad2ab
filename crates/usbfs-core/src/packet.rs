//! Host-side wire codec helpers.
//!
//! Everything a test bench or embedding emulator needs to put well-formed
//! packets on the line and to read the device's transmissions back off it:
//! packet builders (token/data/handshake/SOF), bit serialization, bit
//! stuffing, and NRZI line coding. The device core itself never calls these;
//! its pipelines are bit-serial state machines. These functions are the
//! byte-oriented reference the pipelines are tested against.

use thiserror::Error;

use crate::crc::{crc16, crc5_frame, crc5_token};
use crate::line::LineState;
use crate::pid::Pid;

/// Full-Speed bulk/control packets carry at most 64 payload bytes.
pub const MAX_PACKET: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("payload of {0} bytes exceeds the {MAX_PACKET}-byte full-speed maximum")]
    PayloadTooLong(usize),
    #[error("{0:?} is not valid for this packet type")]
    WrongPid(Pid),
}

/// Token packet: PID, then `{addr[6:0], endp[0]}`, then `{endp[3:1], crc5}`.
pub fn token_packet(pid: Pid, addr: u8, endp: u8) -> Result<[u8; 3], PacketError> {
    if !pid.is_token() || pid == Pid::Sof {
        return Err(PacketError::WrongPid(pid));
    }
    let addr = addr & 0x7F;
    let endp = endp & 0x0F;
    let crc = crc5_token(addr, endp);
    Ok([
        pid.byte(),
        addr | (endp & 1) << 7,
        endp >> 1 | crc << 3,
    ])
}

/// Start-of-frame token carrying an 11-bit frame number.
pub fn sof_packet(frame: u16) -> [u8; 3] {
    let frame = frame & 0x7FF;
    let crc = crc5_frame(frame);
    [
        Pid::Sof.byte(),
        frame as u8,
        (frame >> 8) as u8 | crc << 3,
    ]
}

/// Data packet: PID, payload, CRC16 trailer.
pub fn data_packet(pid: Pid, data: &[u8]) -> Result<Vec<u8>, PacketError> {
    if !pid.is_data() {
        return Err(PacketError::WrongPid(pid));
    }
    if data.len() > MAX_PACKET {
        return Err(PacketError::PayloadTooLong(data.len()));
    }
    let mut packet = Vec::with_capacity(data.len() + 3);
    packet.push(pid.byte());
    packet.extend_from_slice(data);
    packet.extend_from_slice(&crc16(data));
    Ok(packet)
}

/// Handshake packet: a bare PID byte.
pub fn handshake_packet(pid: Pid) -> Result<[u8; 1], PacketError> {
    if !pid.is_handshake() {
        return Err(PacketError::WrongPid(pid));
    }
    Ok([pid.byte()])
}

/// Serialize bytes to wire bit order (LSB first within each byte).
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for i in 0..8 {
            bits.push(byte >> i & 1 == 1);
        }
    }
    bits
}

/// Reassemble wire bits into bytes; trailing bits short of a byte are dropped.
pub fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0, |byte, (i, &bit)| byte | (bit as u8) << i)
        })
        .collect()
}

/// Insert a `0` after every run of six `1`s.
pub fn stuff_bits(bits: &[bool]) -> Vec<bool> {
    let mut out = Vec::with_capacity(bits.len() + bits.len() / 6);
    let mut ones = 0;
    for &bit in bits {
        out.push(bit);
        if bit {
            ones += 1;
            if ones == 6 {
                out.push(false);
                ones = 0;
            }
        } else {
            ones = 0;
        }
    }
    out
}

/// Remove the stuffed `0` after every run of six `1`s.
pub fn unstuff_bits(bits: &[bool]) -> Vec<bool> {
    let mut out = Vec::with_capacity(bits.len());
    let mut ones = 0;
    let mut drop_next = false;
    for &bit in bits {
        if drop_next {
            drop_next = false;
            ones = 0;
            continue;
        }
        out.push(bit);
        if bit {
            ones += 1;
            if ones == 6 {
                drop_next = true;
            }
        } else {
            ones = 0;
        }
    }
    out
}

/// NRZI-encode a bit stream: `0` toggles the line, `1` holds it. The line
/// idles in J, so the leading `0` of sync produces the first K.
pub fn nrzi_encode(bits: &[bool]) -> Vec<LineState> {
    let mut state = LineState::J;
    bits.iter()
        .map(|&bit| {
            if !bit {
                state = match state {
                    LineState::J => LineState::K,
                    LineState::K => LineState::J,
                    other => other,
                };
            }
            state
        })
        .collect()
}

/// NRZI-decode line states back to bits; SE0/SE1 terminate the stream.
pub fn nrzi_decode(states: &[LineState]) -> Vec<bool> {
    let mut last = LineState::J;
    let mut bits = Vec::with_capacity(states.len());
    for &state in states {
        match state {
            LineState::J | LineState::K => {
                bits.push(state == last);
                last = state;
            }
            _ => break,
        }
    }
    bits
}

/// Wrap packet bytes for the wire: sync pattern, bit-stuffed payload, EOP.
///
/// One entry per bit time; feed each entry to the device for four 48 MHz
/// ticks. Stuffing starts counting at the first PID bit, matching the
/// receiver, which only unstuffs inside the packet proper.
pub fn wrap_packet(bytes: &[u8]) -> Vec<LineState> {
    let sync = [false, false, false, false, false, false, false, true];
    let mut states = nrzi_encode(&sync);
    // The NRZI state after sync is K (odd number of zeros); continue from it.
    let mut level = *states.last().expect("sync is non-empty");
    for &bit in &stuff_bits(&bytes_to_bits(bytes)) {
        if !bit {
            level = match level {
                LineState::J => LineState::K,
                _ => LineState::J,
            };
        }
        states.push(level);
    }
    states.push(LineState::Se0);
    states.push(LineState::Se0);
    states.push(LineState::J);
    states
}

/// Strip sync and EOP from a captured line sequence and return the packet
/// bytes, or `None` if no sync was found or a byte was torn.
pub fn unwrap_packet(states: &[LineState]) -> Option<Vec<u8>> {
    let bits_all = nrzi_decode(states);
    // Demodulated sync is a run of 0s followed by a 1; leading idle states
    // decode as 1s and are skipped.
    let first_zero = bits_all.iter().position(|&b| !b)?;
    let one = first_zero + bits_all[first_zero..].iter().position(|&b| b)?;
    let payload = unstuff_bits(&bits_all[one + 1..]);
    if payload.len() % 8 != 0 {
        return None;
    }
    Some(bits_to_bytes(&payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_token_to_address_zero() {
        assert_eq!(
            token_packet(Pid::Setup, 0, 0).unwrap(),
            [0x2D, 0x00, 0x10]
        );
    }

    #[test]
    fn in_token_fields() {
        let [pid, b1, b2] = token_packet(Pid::In, 28, 1).unwrap();
        assert_eq!(pid, 0x69);
        assert_eq!(b1 & 0x7F, 28);
        assert_eq!(b1 >> 7, 1);
        assert_eq!(b2 & 0x07, 0);
        // CRC5 over the two bytes must leave the residual.
        let mut crc = crate::crc::Crc5::new();
        crc.push_byte(b1);
        crc.push_byte(b2);
        assert!(crc.residual_ok());
    }

    #[test]
    fn data_packet_appends_crc() {
        let pkt = data_packet(Pid::Data0, &[0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00])
            .unwrap();
        assert_eq!(pkt[0], 0xC3);
        assert_eq!(&pkt[9..], &[0xDD, 0x94]);
    }

    #[test]
    fn oversize_payload_rejected() {
        let data = [0u8; 65];
        assert_eq!(
            data_packet(Pid::Data0, &data),
            Err(PacketError::PayloadTooLong(65))
        );
    }

    #[test]
    fn token_builder_rejects_non_tokens() {
        assert_eq!(
            token_packet(Pid::Ack, 0, 0),
            Err(PacketError::WrongPid(Pid::Ack))
        );
        assert_eq!(
            token_packet(Pid::Sof, 0, 0),
            Err(PacketError::WrongPid(Pid::Sof))
        );
    }

    #[test]
    fn bit_serialization_is_lsb_first() {
        assert_eq!(
            bytes_to_bits(&[0x01]),
            vec![true, false, false, false, false, false, false, false]
        );
        assert_eq!(bits_to_bytes(&bytes_to_bits(&[0x2D, 0x81])), vec![0x2D, 0x81]);
    }

    #[test]
    fn stuffing_inserts_after_six_ones() {
        let bits = vec![true; 7];
        let stuffed = stuff_bits(&bits);
        assert_eq!(
            stuffed,
            vec![true, true, true, true, true, true, false, true]
        );
        assert_eq!(unstuff_bits(&stuffed), bits);
    }

    #[test]
    fn sync_pattern_on_the_wire() {
        use LineState::{Se0, J, K};
        let states = wrap_packet(&[0xD2]); // bare ACK
        assert_eq!(&states[..8], &[K, J, K, J, K, J, K, K]);
        let n = states.len();
        assert_eq!(&states[n - 3..], &[Se0, Se0, J]);
    }

    #[test]
    fn wrap_unwrap_roundtrip() {
        let pkt = data_packet(Pid::Data1, &[0xFF, 0xFF, 0x00, 0x7E]).unwrap();
        assert_eq!(unwrap_packet(&wrap_packet(&pkt)).unwrap(), pkt);
    }

    #[test]
    fn nrzi_roundtrip() {
        let bits = bytes_to_bits(&[0xA5, 0x00, 0xFF]);
        assert_eq!(nrzi_decode(&nrzi_encode(&bits)), bits);
    }
}
