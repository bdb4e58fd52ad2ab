//! Parallel-to-serial conversion of transmit bytes.

use serde::{Deserialize, Serialize};

/// Byte-in, LSB-first serial-out shifter.
///
/// The loaded byte sits below a sentinel bit; each shift emits the LSB. When
/// only the sentinel remains the byte is exhausted and the producer must load
/// the next byte or end the packet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxShifter {
    reg: u16,
}

impl TxShifter {
    pub fn new() -> TxShifter {
        TxShifter { reg: 1 }
    }

    pub fn load(&mut self, byte: u8) {
        self.reg = 1 << 8 | byte as u16;
    }

    pub fn is_empty(&self) -> bool {
        self.reg == 1
    }

    /// Emit the next bit. Must not be called while empty.
    pub fn shift(&mut self) -> bool {
        debug_assert!(!self.is_empty());
        let bit = self.reg & 1 == 1;
        self.reg >>= 1;
        bit
    }
}

impl Default for TxShifter {
    fn default() -> TxShifter {
        TxShifter::new()
    }
}
