//! The composed transmit pipeline: sync generation, byte serialization, bit
//! stuffing, and NRZI line coding.

use serde::{Deserialize, Serialize};

use crate::line::LineOut;
use crate::tx::bitstuff::TxBitstuffer;
use crate::tx::nrzi::TxNrziEncoder;
use crate::tx::shifter::TxShifter;

/// Sync pattern as a byte: seven `0`s then a `1`, LSB-first on the wire.
const SYNC_BYTE: u8 = 0x80;

/// Serializes a stream of bytes onto the line, one bit per 12 MHz bit time.
///
/// The pipeline prepends the sync byte, stuffs a `0` after every six
/// consecutive `1`s (starting the count at the first PID bit), and hands the
/// resulting bit stream to the NRZI encoder. When the byte source runs dry
/// the EOP sequence follows automatically.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxPipeline {
    shifter: TxShifter,
    bitstuff: TxBitstuffer,
    nrzi: TxNrziEncoder,
    in_sync: bool,
    active: bool,
}

impl TxPipeline {
    pub fn new() -> TxPipeline {
        TxPipeline {
            shifter: TxShifter::new(),
            bitstuff: TxBitstuffer::new(),
            nrzi: TxNrziEncoder::new(),
            in_sync: false,
            active: false,
        }
    }

    /// Begin a packet. The first bit goes out on the next [`step`].
    ///
    /// [`step`]: TxPipeline::step
    pub fn start(&mut self) {
        self.shifter.load(SYNC_BYTE);
        self.bitstuff.reset();
        self.in_sync = true;
        self.active = true;
    }

    /// Still driving the bus (data bits or EOP in progress).
    pub fn is_active(&self) -> bool {
        self.active || !self.nrzi.is_idle()
    }

    /// Advance one bit time. `source` is polled for the next byte whenever
    /// the shifter runs dry; `None` ends the packet. Returns the pad drive
    /// and a one-shot end-of-packet flag once the bus is released.
    pub fn step(&mut self, source: &mut dyn FnMut() -> Option<u8>) -> (LineOut, bool) {
        if !self.active {
            // Drain the EOP states (or stay released while idle).
            return self.nrzi.step(false, true);
        }
        if self.bitstuff.pending() {
            let bit = self.bitstuff.take_stuff_bit();
            return self.nrzi.step(true, bit);
        }
        if self.shifter.is_empty() {
            if self.in_sync {
                self.in_sync = false;
                // Stuffing counts from the first PID bit.
                self.bitstuff.reset();
            }
            match source() {
                Some(byte) => self.shifter.load(byte),
                None => {
                    self.active = false;
                    return self.nrzi.step(false, true);
                }
            }
        }
        let bit = self.shifter.shift();
        if !self.in_sync {
            self.bitstuff.observe(bit);
        }
        self.nrzi.step(true, bit)
    }
}

impl Default for TxPipeline {
    fn default() -> TxPipeline {
        TxPipeline::new()
    }
}
