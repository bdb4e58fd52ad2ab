//! Edge-event bookkeeping for the host interface.

use serde::{Deserialize, Serialize};

/// One event source: a sticky `pending` bit set by the core and cleared by
/// the host writing `1`, plus an `enable` bit gating the shared IRQ line.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct EventFlag {
    pub pending: bool,
    pub enabled: bool,
}

impl EventFlag {
    pub fn trigger(&mut self) {
        self.pending = true;
    }

    /// Host write to the pending register: `1` acknowledges.
    pub fn ack(&mut self, write: bool) {
        if write {
            self.pending = false;
        }
    }

    pub fn irq(&self) -> bool {
        self.pending && self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_clears_only_on_one() {
        let mut ev = EventFlag::default();
        ev.trigger();
        ev.ack(false);
        assert!(ev.pending);
        ev.ack(true);
        assert!(!ev.pending);
    }

    #[test]
    fn irq_requires_enable() {
        let mut ev = EventFlag::default();
        ev.trigger();
        assert!(!ev.irq());
        ev.enabled = true;
        assert!(ev.irq());
    }
}
