//! Cycle-accurate software model of a USB 1.1 Full-Speed (12 Mbit/s) device
//! controller.
//!
//! The model terminates the USB wire protocol on behalf of a device: it
//! recovers the bit clock from the differential D+/D− pair, decodes NRZI and
//! bit stuffing, validates CRC5/CRC16, sequences token/data/handshake
//! transactions, and presents a small register file with three FIFOs (SETUP,
//! IN, OUT) to a host CPU.
//!
//! The whole core is driven from [`UsbDeviceCore::tick`], one call per 48 MHz
//! tick (4× oversampling of the 12 MHz bit clock). Register accesses happen
//! between ticks through [`UsbDeviceCore::read_reg`] and
//! [`UsbDeviceCore::write_reg`].
//!
//! ```
//! use usbfs_core::{LineIn, UsbDeviceCore};
//!
//! let mut dev = UsbDeviceCore::new();
//! dev.set_pullup(true);
//! // Idle J on the bus.
//! let out = dev.tick(LineIn { d_p: true, d_n: false });
//! assert!(!out.oe);
//! ```

pub mod crc;
pub mod device;
pub mod fifo;
pub mod line;
pub mod packet;
pub mod pid;
pub mod rx;
pub mod sm;
pub mod tx;

pub use self::device::regs;
pub use self::device::UsbDeviceCore;
pub use self::line::{LineIn, LineOut, LineState};
pub use self::pid::{Pid, PidKind};
