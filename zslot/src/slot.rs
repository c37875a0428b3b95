//! Fixed-size slot image assembly
//!
//! A fitted frame almost never lands exactly on its slot's byte
//! budget. The container convention splices the gap between the frame
//! prologue and the frame body: prologue first, then the filler run,
//! then the rest of the frame. Filler bytes are zero except for marker
//! bytes near the end of the run when the run length is not a multiple
//! of three. The convention is reverse-engineered from the consuming
//! decoder and is reproduced exactly, not corrected; marker positions
//! that would fall outside a very short filler run are skipped.

use crate::frame::frame_header_len;
use crate::{Error, Result};

/// Marker byte placed in filler runs whose length is not a multiple of
/// three.
const PAD_MARKER: u8 = 2;

/// Serialize `frame` into a slot image of exactly `budget` bytes.
///
/// Layout: frame prologue, `budget - frame.len()` filler bytes, frame
/// body. Markers land at filler back-offsets 4 (remainder 1) or 4 and
/// 8 (remainder 2).
///
/// # Errors
///
/// [`Error::BudgetExceeded`] if the frame is longer than the budget,
/// and frame introspection errors if the prologue cannot be parsed.
pub fn assemble_slot(frame: &[u8], budget: usize) -> Result<Vec<u8>> {
    if frame.len() > budget {
        return Err(Error::BudgetExceeded {
            frame_len: frame.len(),
            budget,
        });
    }
    let header_len = frame_header_len(frame)?;
    let padding_len = budget - frame.len();

    let mut filler = vec![0u8; padding_len];
    match padding_len % 3 {
        1 if padding_len >= 4 => filler[padding_len - 4] = PAD_MARKER,
        2 => {
            if padding_len >= 4 {
                filler[padding_len - 4] = PAD_MARKER;
            }
            if padding_len >= 8 {
                filler[padding_len - 8] = PAD_MARKER;
            }
        }
        _ => {}
    }

    let mut image = Vec::with_capacity(budget);
    image.extend_from_slice(&frame[..header_len]);
    image.extend_from_slice(&filler);
    image.extend_from_slice(&frame[header_len..]);

    debug_assert_eq!(image.len(), budget);
    Ok(image)
}
