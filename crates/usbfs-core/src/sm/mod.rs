//! Protocol state machines: packet header decoding and the transaction
//! sequencer.

pub mod header;
pub mod transfer;

pub use self::header::{HeaderDecoder, HeaderEvent};
pub use self::transfer::{TransferEvents, TransferInputs, UsbTransfer};
