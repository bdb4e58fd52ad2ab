//! Clock/data recovery for the 4× oversampled receive path.

use serde::{Deserialize, Serialize};

use crate::line::LineState;

/// Recovers the 12 MHz bit clock from the raw differential pair.
///
/// The receive path has no differential receiver, so the two single-ended
/// inputs can skew: one line may show the new state while the other still
/// shows the old one. The classifier therefore spends exactly one tick in a
/// transition state after any change before committing to the new line
/// state. The bit-phase counter (mod 4) realigns to the transition, keeping
/// the sample strobe locked to incoming edges instead of free-running.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RxClockDataRecovery {
    /// Committed line state; `None` while in the transition state.
    state: Option<LineState>,
    phase: u8,
}

impl RxClockDataRecovery {
    pub fn new() -> RxClockDataRecovery {
        RxClockDataRecovery {
            state: Some(LineState::J),
            phase: 0,
        }
    }

    /// Consume one 48 MHz sample of the pair. Returns the classified line
    /// state exactly once per bit time, at the center of the bit.
    pub fn tick(&mut self, d_p: bool, d_n: bool) -> Option<LineState> {
        let pair = LineState::from_pair(d_p, d_n);
        match self.state {
            None => {
                // Both lines have had a tick to settle; commit and realign.
                self.state = Some(pair);
                self.phase = 0;
                None
            }
            Some(current) => {
                if pair != current {
                    self.state = None;
                    return None;
                }
                self.phase = (self.phase + 1) & 3;
                if self.phase == 1 {
                    Some(current)
                } else {
                    None
                }
            }
        }
    }
}

impl Default for RxClockDataRecovery {
    fn default() -> RxClockDataRecovery {
        RxClockDataRecovery::new()
    }
}
