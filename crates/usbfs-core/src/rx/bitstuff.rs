//! Bit-stuff removal on the receive path.

use serde::{Deserialize, Serialize};

/// Outcome of pushing one decoded bit through the unstuffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unstuffed {
    pub data: bool,
    /// The bit was a stuffed `0` and must not reach the shifter.
    pub stall: bool,
    /// Seven consecutive `1`s: the mandatory stuffed `0` was missing. Normal
    /// during idle, fatal inside a packet.
    pub error: bool,
}

/// Drops the `0` the transmitter inserted after every six consecutive `1`s.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RxBitstuffRemover {
    ones: u8,
}

impl RxBitstuffRemover {
    pub fn new() -> RxBitstuffRemover {
        RxBitstuffRemover::default()
    }

    /// Reset at packet boundaries (SE0 / end of packet).
    pub fn reset(&mut self) {
        self.ones = 0;
    }

    pub fn push(&mut self, data: bool) -> Unstuffed {
        if self.ones == 6 {
            // Seventh bit after six 1s: consumed, not emitted.
            self.ones = 0;
            return Unstuffed {
                data,
                stall: true,
                error: data,
            };
        }
        if data {
            self.ones += 1;
        } else {
            self.ones = 0;
        }
        Unstuffed {
            data,
            stall: false,
            error: false,
        }
    }
}
