//! NRZI decoding of recovered line states.

use serde::{Deserialize, Serialize};

use crate::line::LineState;

/// One decoded bit-time sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NrziBit {
    /// `1` = no transition, `0` = J↔K transition.
    pub data: bool,
    /// SE0 side channel, forwarded unmodified.
    pub se0: bool,
}

/// Turns same-state/transition into logical `1`/`0`.
///
/// SE1 never occurs on a healthy bus; it is decoded as a `0` data bit without
/// asserting SE0, and the packet framing downstream discards the noise.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RxNrziDecoder {
    last_k: bool,
}

impl RxNrziDecoder {
    pub fn new() -> RxNrziDecoder {
        RxNrziDecoder::default()
    }

    pub fn decode(&mut self, state: LineState) -> NrziBit {
        match state {
            LineState::J | LineState::K => {
                let k = state == LineState::K;
                let data = k == self.last_k;
                self.last_k = k;
                NrziBit { data, se0: false }
            }
            LineState::Se0 => {
                self.last_k = false;
                NrziBit {
                    data: true,
                    se0: true,
                }
            }
            LineState::Se1 => NrziBit {
                data: false,
                se0: false,
            },
        }
    }
}
