//! The composed receive pipeline.

use serde::{Deserialize, Serialize};

use crate::rx::bitstuff::RxBitstuffRemover;
use crate::rx::clock::RxClockDataRecovery;
use crate::rx::detect::RxPacketDetect;
use crate::rx::nrzi::RxNrziDecoder;
use crate::rx::shifter::RxShifter;

/// Everything the receive pipeline produced in one 48 MHz tick.
///
/// All fields except `bit_strobe` are qualified by `bit_strobe`; at most one
/// of `pkt_start`/`pkt_end`/`byte` is set per strobe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RxStep {
    /// A line sample was taken this tick: the 12 MHz bit-domain enable.
    pub bit_strobe: bool,
    /// The sampled line was SE0.
    pub se0: bool,
    /// Final bit of sync observed; packet bytes follow.
    pub pkt_start: bool,
    /// EOP observed.
    pub pkt_end: bool,
    /// A completed packet byte, wire order.
    pub byte: Option<u8>,
    /// A missing stuff bit inside the packet.
    pub bitstuff_error: bool,
}

/// wire → clock recovery → NRZI → framing / unstuffing → bytes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RxPipeline {
    cdr: RxClockDataRecovery,
    nrzi: RxNrziDecoder,
    detect: RxPacketDetect,
    bitstuff: RxBitstuffRemover,
    shifter: RxShifter,
}

impl RxPipeline {
    pub fn new() -> RxPipeline {
        RxPipeline::default()
    }

    pub fn pkt_active(&self) -> bool {
        self.detect.pkt_active()
    }

    /// Consume one 48 MHz sample of the differential pair.
    pub fn tick(&mut self, d_p: bool, d_n: bool) -> RxStep {
        let Some(state) = self.cdr.tick(d_p, d_n) else {
            return RxStep::default();
        };
        let bit = self.nrzi.decode(state);
        let framing = self.detect.step(bit.data, bit.se0);

        let mut step = RxStep {
            bit_strobe: true,
            se0: bit.se0,
            pkt_start: framing.pkt_start,
            pkt_end: framing.pkt_end,
            byte: None,
            bitstuff_error: false,
        };

        if framing.pkt_active {
            let unstuffed = self.bitstuff.push(bit.data);
            step.bitstuff_error = unstuffed.error;
            if !unstuffed.stall {
                step.byte = self.shifter.push(unstuffed.data);
            }
        } else {
            // Outside a packet (including the sync itself) both stages stay
            // in reset.
            self.bitstuff.reset();
            self.shifter.reset();
        }
        step
    }
}
