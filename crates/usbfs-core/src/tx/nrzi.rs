//! NRZI encoding and end-of-packet generation on the transmit path.

use serde::{Deserialize, Serialize};

use crate::line::{LineOut, LineState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum NrziState {
    Idle,
    DriveJ,
    DriveK,
    /// Second bit time of the EOP SE0.
    Se0Second,
    /// Final J bit time before releasing the bus.
    EopJ,
}

/// Drives the differential pair: a `0` toggles J↔K, a `1` holds the line.
///
/// The bus idles in J, so the first sync bit (a `0`) produces the opening K
/// edge. Dropping output-enable starts the EOP sequence: SE0 for two bit
/// times, J for one, then the pads release.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxNrziEncoder {
    state: NrziState,
}

impl TxNrziEncoder {
    pub fn new() -> TxNrziEncoder {
        TxNrziEncoder {
            state: NrziState::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == NrziState::Idle
    }

    /// Advance one bit time. `oe` asserts for every data bit of the packet;
    /// the first step after it drops begins the EOP. Returns the pad drive
    /// for this bit time, plus `true` once when the bus has been released.
    pub fn step(&mut self, oe: bool, data: bool) -> (LineOut, bool) {
        match self.state {
            NrziState::Idle => {
                if oe {
                    // Idle level is J; encode the first bit from there.
                    self.state = if data {
                        NrziState::DriveJ
                    } else {
                        NrziState::DriveK
                    };
                    (LineOut::driving(self.level()), false)
                } else {
                    (LineOut::released(), false)
                }
            }
            NrziState::DriveJ | NrziState::DriveK => {
                if !oe {
                    self.state = NrziState::Se0Second;
                    (LineOut::driving(LineState::Se0), false)
                } else {
                    if !data {
                        self.state = match self.state {
                            NrziState::DriveJ => NrziState::DriveK,
                            _ => NrziState::DriveJ,
                        };
                    }
                    (LineOut::driving(self.level()), false)
                }
            }
            NrziState::Se0Second => {
                self.state = NrziState::EopJ;
                (LineOut::driving(LineState::Se0), false)
            }
            NrziState::EopJ => {
                self.state = NrziState::Idle;
                (LineOut::driving(LineState::J), true)
            }
        }
    }

    fn level(&self) -> LineState {
        match self.state {
            NrziState::DriveK => LineState::K,
            _ => LineState::J,
        }
    }
}

impl Default for TxNrziEncoder {
    fn default() -> TxNrziEncoder {
        TxNrziEncoder::new()
    }
}
