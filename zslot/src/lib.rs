//! Zstandard slot-frame codec for fixed-size archive slots
//!
//! Packed game archives store each asset as one zstd frame inside a
//! fixed byte range (a "slot"). Replacing an asset means producing a
//! frame that fits the slot's compressed-size budget and padding it out
//! so the slot is filled exactly. This crate provides the three pieces
//! of that pipeline:
//!
//! - [`SlotCompressor`]: finds a compression level whose output fits a
//!   byte budget.
//! - [`frame`]: zstd frame introspection (magic check, prologue length).
//! - [`assemble_slot`]: serializes a fitted frame into a slot image of
//!   exactly the budgeted length, including the container's padding
//!   marker convention.

pub mod error;
pub mod fit;
pub mod frame;
pub mod slot;

pub use error::{Error, Result};
pub use fit::SlotCompressor;
pub use frame::{frame_header_len, is_zstd_frame, path_is_zstd_frame};
pub use slot::assemble_slot;

/// Zstandard frame magic number (stored little-endian on the wire).
pub const ZSTD_MAGIC: u32 = 0xFD2FB528;
