//! The transaction sequencer.
//!
//! A Mealy machine in the bit domain that ties the receive pipeline, the
//! header decoder and the transmit path together into token → data →
//! handshake exchanges:
//!
//! ```text
//! IDLE ─token─▶ CHECK_TOK ──┬─ SETUP ─▶ WAIT_DATA ─▶ RECV_DATA ─▶ SEND_HAND ─▶ IDLE
//!                           ├─ OUT   ─▶ WAIT_DATA ─▶ RECV_DATA ─▶ SEND_HAND ─▶ IDLE
//!                           ├─ IN    ─▶ SEND_DATA ─▶ WAIT_HAND ─▶ IDLE
//!                           └─ SOF   ─▶ IDLE
//! ```
//!
//! The sequencer owns no endpoint state. Its caller supplies the device
//! address and the per-endpoint stall/arm/toggle policy each bit time and
//! reacts to the strobes this machine raises (`start`, `poll`, `commit`,
//! `abort`, received bytes). A mid-packet line error routes to IDLE with no
//! handshake; the host times out and retries.

use serde::{Deserialize, Serialize};

use crate::crc::Crc16;
use crate::line::LineOut;
use crate::pid::Pid;
use crate::rx::RxStep;
use crate::sm::header::HeaderEvent;
use crate::tx::{TxDataSource, TxPacketSend};

/// Per-bit-time policy inputs, sampled by the sequencer at its `poll` point.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransferInputs {
    /// Current device address (takes effect at IDLE by construction).
    pub device_addr: u8,
    /// Respond STALL to the latched endpoint.
    pub stalled: bool,
    /// The latched endpoint is armed (data queued for IN, buffer ready for
    /// OUT).
    pub armed: bool,
    /// Data toggle for the latched IN endpoint: DATA1 when set.
    pub dtb: bool,
}

/// Strobes raised by one bit time of the sequencer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferEvents {
    /// A token for this device was latched; `tok`/`addr`/`endp` are valid.
    pub start: bool,
    /// The response is being chosen; handlers latch their transaction state.
    pub poll: bool,
    /// A payload byte arrived for an accepted SETUP/OUT data stage.
    pub recv_byte: Option<u8>,
    /// Transaction committed: ACK sent (SETUP/OUT) or ACK received (IN).
    pub commit: bool,
    /// Transaction failed or was refused; no toggle, no FIFO commit.
    pub abort: bool,
    /// Qualifier on `commit`/`abort`: the transaction was a SETUP.
    pub setup: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum TransferState {
    Idle,
    /// Token latched, waiting for the token packet's EOP.
    CheckTok,
    /// Token EOP seen; respond once the line leaves SE0.
    TokenEop,
    WaitData,
    RecvData,
    /// Data EOP seen; the handshake goes out once the line leaves SE0.
    DataEop,
    SendData,
    WaitHand,
    SendHand,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UsbTransfer {
    state: TransferState,
    tok: Pid,
    addr: u8,
    endp: u8,
    /// Chosen response for the current transaction.
    response: Pid,
    crc: Crc16,
    send: TxPacketSend,
}

impl UsbTransfer {
    pub fn new() -> UsbTransfer {
        UsbTransfer {
            state: TransferState::Idle,
            tok: Pid::Sof,
            addr: 0,
            endp: 0,
            response: Pid::Nak,
            crc: Crc16::new(),
            send: TxPacketSend::new(),
        }
    }

    /// Token PID of the transaction in progress.
    pub fn tok(&self) -> Pid {
        self.tok
    }

    /// Address the current token was sent to (always our own).
    pub fn addr(&self) -> u8 {
        self.addr
    }

    pub fn endp(&self) -> u8 {
        self.endp
    }

    pub fn is_idle(&self) -> bool {
        self.state == TransferState::Idle && !self.send.is_active()
    }

    /// Bus reset: abandon anything in flight.
    pub fn reset(&mut self) {
        self.state = TransferState::Idle;
        self.send = TxPacketSend::new();
    }

    /// Advance one bit time.
    pub fn step(
        &mut self,
        rx: &RxStep,
        ev: HeaderEvent,
        inputs: TransferInputs,
        source: &mut dyn TxDataSource,
    ) -> (LineOut, TransferEvents) {
        let mut events = TransferEvents::default();

        // The transmit path runs every bit time; it idles released.
        let (line, tx_end) = self.send.step(source);

        match self.state {
            TransferState::Idle => {
                if let HeaderEvent::Token { pid, addr, endp } = ev {
                    if pid != Pid::Sof && addr == inputs.device_addr {
                        self.tok = pid;
                        self.addr = addr;
                        self.endp = endp;
                        events.start = true;
                        self.state = TransferState::CheckTok;
                    }
                    // SOF and foreign addresses are ignored without
                    // acknowledgement.
                }
            }
            TransferState::CheckTok => {
                if rx.pkt_end {
                    self.state = TransferState::TokenEop;
                }
            }
            TransferState::TokenEop => {
                if !rx.se0 {
                    events.poll = true;
                    self.response = if self.tok == Pid::Setup {
                        // SETUP must always be accepted.
                        Pid::Ack
                    } else if inputs.stalled {
                        Pid::Stall
                    } else if inputs.armed {
                        Pid::Ack
                    } else {
                        Pid::Nak
                    };
                    match self.tok {
                        Pid::Setup | Pid::Out => {
                            self.crc.reset();
                            self.state = TransferState::WaitData;
                        }
                        Pid::In => {
                            if self.response == Pid::Ack {
                                self.send.start(if inputs.dtb {
                                    Pid::Data1
                                } else {
                                    Pid::Data0
                                });
                                self.state = TransferState::SendData;
                            } else {
                                self.send.start(self.response);
                                self.state = TransferState::SendHand;
                            }
                        }
                        _ => self.state = TransferState::Idle,
                    }
                }
            }
            TransferState::WaitData => match ev {
                HeaderEvent::DataStart { .. } => {
                    self.crc.reset();
                    self.state = TransferState::RecvData;
                }
                // Frame markers may interleave the stages; ignore them.
                HeaderEvent::Token { pid: Pid::Sof, .. } => {}
                HeaderEvent::None => {}
                _ => self.abort(&mut events),
            },
            TransferState::RecvData => {
                if rx.bitstuff_error {
                    self.abort(&mut events);
                } else if let Some(byte) = rx.byte {
                    self.crc.push_byte(byte);
                    if self.response == Pid::Ack {
                        events.recv_byte = Some(byte);
                    }
                } else if rx.pkt_end {
                    if self.response == Pid::Ack && !self.crc.residual_ok() {
                        // Bad CRC16: no handshake, roll back; the host will
                        // retry.
                        self.abort(&mut events);
                    } else {
                        self.state = TransferState::DataEop;
                    }
                }
            }
            TransferState::DataEop => {
                if !rx.se0 {
                    self.send.start(self.response);
                    self.state = TransferState::SendHand;
                }
            }
            TransferState::SendData => {
                if tx_end {
                    self.state = TransferState::WaitHand;
                }
            }
            TransferState::WaitHand => match ev {
                HeaderEvent::Handshake { pid: Pid::Ack } => {
                    events.commit = true;
                    self.state = TransferState::Idle;
                }
                HeaderEvent::None => {}
                _ => self.abort(&mut events),
            },
            TransferState::SendHand => {
                if tx_end {
                    events.setup = self.tok == Pid::Setup;
                    if self.response == Pid::Ack {
                        events.commit = true;
                    } else {
                        events.abort = true;
                    }
                    self.state = TransferState::Idle;
                }
            }
        }

        (line, events)
    }

    fn abort(&mut self, events: &mut TransferEvents) {
        events.abort = true;
        events.setup = self.tok == Pid::Setup;
        self.state = TransferState::Idle;
    }
}

impl Default for UsbTransfer {
    fn default() -> UsbTransfer {
        UsbTransfer::new()
    }
}
