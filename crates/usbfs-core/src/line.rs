//! Wire-level sample types for the differential D+/D− pair.

use serde::{Deserialize, Serialize};

/// Instantaneous state of the differential pair.
///
/// `J` is the Full-Speed idle state (D+ high). `Se1` (both lines high) is
/// illegal on a USB bus but must be tolerated without corrupting state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineState {
    J,
    K,
    Se0,
    Se1,
}

impl LineState {
    pub fn from_pair(d_p: bool, d_n: bool) -> LineState {
        match (d_p, d_n) {
            (true, false) => LineState::J,
            (false, true) => LineState::K,
            (false, false) => LineState::Se0,
            (true, true) => LineState::Se1,
        }
    }

    /// The `(d_p, d_n)` levels that drive this state onto the bus.
    pub fn pair(self) -> (bool, bool) {
        match self {
            LineState::J => (true, false),
            LineState::K => (false, true),
            LineState::Se0 => (false, false),
            LineState::Se1 => (true, true),
        }
    }

    pub fn is_se0(self) -> bool {
        self == LineState::Se0
    }
}

/// One 48 MHz sample of the bus as seen by the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineIn {
    pub d_p: bool,
    pub d_n: bool,
}

impl LineIn {
    pub fn from_state(state: LineState) -> LineIn {
        let (d_p, d_n) = state.pair();
        LineIn { d_p, d_n }
    }

    pub fn state(self) -> LineState {
        LineState::from_pair(self.d_p, self.d_n)
    }
}

/// One 48 MHz tick of drive from the device. When `oe` is clear the pads must
/// release and the `d_p`/`d_n` values are meaningless.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineOut {
    pub oe: bool,
    pub d_p: bool,
    pub d_n: bool,
}

impl LineOut {
    /// Pads released; the pull-up leaves the bus idling in J.
    pub fn released() -> LineOut {
        LineOut {
            oe: false,
            d_p: true,
            d_n: false,
        }
    }

    pub fn driving(state: LineState) -> LineOut {
        let (d_p, d_n) = state.pair();
        LineOut { oe: true, d_p, d_n }
    }

    /// The line state an observer sees, assuming an idle bus behind the pads.
    pub fn state(self) -> LineState {
        if self.oe {
            LineState::from_pair(self.d_p, self.d_n)
        } else {
            LineState::J
        }
    }
}
