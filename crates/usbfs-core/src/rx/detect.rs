//! Packet framing: sync detection and end-of-packet.

use serde::{Deserialize, Serialize};

/// Framing pulses for one bit time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framing {
    /// One-shot on the final bit of sync.
    pub pkt_start: bool,
    /// High from the bit after sync until SE0.
    pub pkt_active: bool,
    /// One-shot on the SE0 that ends the packet.
    pub pkt_end: bool,
}

/// A clean sync demodulates to seven `0`s, but edge alignment coming out of
/// idle can eat the leading bits; any run of at least this many still counts.
const SYNC_ZEROS_MIN: u8 = 5;

/// Finds the start and end of packets in the decoded bit stream.
///
/// Full-Speed packets begin with the raw sequence `KJKJKJKK`, which
/// demodulates to `00000001` against an idle line of `1`s, so a run of `0`s
/// ending in a `1` marks a packet start. The packet ends at the first SE0 of
/// the EOP. Detection runs in parallel with bit-stuff removal and never sees
/// unstuffed data.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RxPacketDetect {
    zeros: u8,
    active: bool,
}

impl RxPacketDetect {
    pub fn new() -> RxPacketDetect {
        RxPacketDetect::default()
    }

    pub fn pkt_active(&self) -> bool {
        self.active
    }

    /// Consume one decoded bit-time sample.
    pub fn step(&mut self, data: bool, se0: bool) -> Framing {
        if se0 {
            let was_active = self.active;
            self.zeros = 0;
            self.active = false;
            return Framing {
                pkt_start: false,
                pkt_active: false,
                pkt_end: was_active,
            };
        }
        if self.active {
            return Framing {
                pkt_start: false,
                pkt_active: true,
                pkt_end: false,
            };
        }
        if data {
            if self.zeros >= SYNC_ZEROS_MIN {
                // Sync complete on this bit.
                self.active = true;
                self.zeros = 0;
                return Framing {
                    pkt_start: true,
                    pkt_active: false,
                    pkt_end: false,
                };
            }
            self.zeros = 0;
        } else {
            self.zeros = (self.zeros + 1).min(SYNC_ZEROS_MIN);
        }
        Framing::default()
    }
}
