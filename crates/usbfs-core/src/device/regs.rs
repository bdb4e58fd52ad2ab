//! Byte register map of the host interface.
//!
//! All fields are 8 bits wide. Reads of `*_DATA` registers advance the
//! backing FIFO; writes of `1` to `*_EV_PENDING` bits acknowledge events.

pub const REG_ADDRESS: u16 = 0x00;
pub const REG_NEXT_EV: u16 = 0x01;
pub const REG_PULLUP: u16 = 0x02;

pub const REG_SETUP_DATA: u16 = 0x04;
pub const REG_SETUP_CTRL: u16 = 0x05;
pub const REG_SETUP_STATUS: u16 = 0x06;
pub const REG_SETUP_EV_PENDING: u16 = 0x07;
pub const REG_SETUP_EV_ENABLE: u16 = 0x08;

pub const REG_IN_DATA: u16 = 0x0C;
pub const REG_IN_CTRL: u16 = 0x0D;
pub const REG_IN_STATUS: u16 = 0x0E;
pub const REG_IN_EV_PENDING: u16 = 0x0F;
pub const REG_IN_EV_ENABLE: u16 = 0x10;

pub const REG_OUT_DATA: u16 = 0x14;
pub const REG_OUT_CTRL: u16 = 0x15;
pub const REG_OUT_STATUS: u16 = 0x16;
pub const REG_OUT_EV_PENDING: u16 = 0x17;
pub const REG_OUT_EV_ENABLE: u16 = 0x18;

// `*_CTRL` fields.
pub const CTRL_EPNO_MASK: u8 = 0x0F;
pub const CTRL_ENABLE: u8 = 1 << 4; // OUT only
pub const CTRL_RESET: u8 = 1 << 5;
pub const CTRL_STALL: u8 = 1 << 6;

// `*_STATUS` fields.
pub const STATUS_EPNO_MASK: u8 = 0x0F;
pub const STATUS_IDLE: u8 = 1 << 0; // IN only
pub const STATUS_HAVE: u8 = 1 << 4;
pub const STATUS_PEND: u8 = 1 << 5;
pub const STATUS_IS_IN: u8 = 1 << 6; // SETUP only
pub const STATUS_DATA: u8 = 1 << 7; // SETUP only

// `SETUP_EV_*` bits.
pub const SETUP_EV_READY: u8 = 1 << 0;
pub const SETUP_EV_RESET: u8 = 1 << 1;

// `IN_EV_*` / `OUT_EV_*` bits.
pub const EV_DONE: u8 = 1 << 0;

// `NEXT_EV` bits; at most one is set at a time.
pub const NEXT_EV_IN: u8 = 1 << 0;
pub const NEXT_EV_OUT: u8 = 1 << 1;
pub const NEXT_EV_SETUP: u8 = 1 << 2;
pub const NEXT_EV_RESET: u8 = 1 << 3;
