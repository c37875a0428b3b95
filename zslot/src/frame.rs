//! Zstandard frame introspection
//!
//! Only the fixed frame prologue (magic number plus frame header) is
//! parsed here; the compressed blocks that follow are opaque to the
//! patcher. The prologue length is needed by the slot assembler, which
//! splices the padding run between the prologue and the frame body.

use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::{Error, Result, ZSTD_MAGIC};

/// Skippable-frame magic base; the low nibble is a wildcard.
const SKIPPABLE_MAGIC_BASE: u32 = 0x184D2A50;

/// Minimum bytes needed to read the frame-header descriptor.
const MIN_PROLOGUE: usize = 5;

/// Check whether `data` starts with a zstd frame (standard or skippable).
pub fn is_zstd_frame(data: &[u8]) -> bool {
    if data.len() < 4 {
        return false;
    }
    let magic = LittleEndian::read_u32(&data[..4]);
    magic == ZSTD_MAGIC || (magic & 0xFFFFFFF0) == SKIPPABLE_MAGIC_BASE
}

/// Check whether a file on disk starts with a zstd frame.
///
/// Files shorter than the magic number are simply not frames.
pub fn path_is_zstd_frame(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(is_zstd_frame(&magic)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Byte length of the frame prologue (magic number plus frame header),
/// computed from the frame's own header descriptor.
///
/// The descriptor byte encodes which optional fields follow it: a
/// window descriptor unless the single-segment flag is set, a
/// dictionary ID of 0/1/2/4 bytes, and a frame content size of
/// 0/1/2/4/8 bytes.
pub fn frame_header_len(frame: &[u8]) -> Result<usize> {
    if frame.len() < MIN_PROLOGUE {
        return Err(Error::TruncatedFrame {
            expected: MIN_PROLOGUE,
            actual: frame.len(),
        });
    }

    let magic = LittleEndian::read_u32(&frame[..4]);
    if magic != ZSTD_MAGIC {
        return Err(Error::InvalidMagic(magic));
    }

    let descriptor = frame[4];
    let fcs_flag = descriptor >> 6;
    let single_segment = descriptor & 0x20 != 0;
    let dict_id_flag = descriptor & 0x03;

    let window_len = usize::from(!single_segment);
    let dict_id_len = match dict_id_flag {
        0 => 0,
        1 => 1,
        2 => 2,
        _ => 4,
    };
    // With flag 0 the content size field is only present in
    // single-segment frames, as a single byte.
    let fcs_len = match fcs_flag {
        0 => usize::from(single_segment),
        1 => 2,
        2 => 4,
        _ => 8,
    };

    let header_len = 4 + 1 + window_len + dict_id_len + fcs_len;
    if frame.len() < header_len {
        return Err(Error::TruncatedFrame {
            expected: header_len,
            actual: frame.len(),
        });
    }
    Ok(header_len)
}
