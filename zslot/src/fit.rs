//! Budget-constrained compression
//!
//! Archive slots keep their original compressed size, so a replacement
//! asset has to compress into the byte budget of the slot it
//! overwrites. The search walks the effort ladder from fast levels
//! upward and returns the first frame that fits.

use tracing::{debug, trace};
use zstd::bulk::Compressor;

use crate::{Error, Result};

/// First level tried by [`SlotCompressor::fit_to_budget`].
const START_LEVEL: i32 = 3;

/// Levels 8..=16 rarely shrink packed game assets enough to matter;
/// the ladder jumps straight from 7 to 17 to bound search time.
const LADDER_SKIP_FROM: i32 = 8;
const LADDER_SKIP_TO: i32 = 17;

/// Reusable compression context configured for minimal frame headers.
///
/// The target container stores content sizes out of band and verifies
/// nothing, so the frame carries neither a content-size field nor a
/// checksum.
pub struct SlotCompressor {
    cctx: Compressor<'static>,
}

impl SlotCompressor {
    /// Create a compressor with the container's frame parameters.
    pub fn new() -> Result<Self> {
        let mut cctx = Compressor::new(START_LEVEL)?;
        cctx.include_contentsize(false)?;
        cctx.include_checksum(false)?;
        Ok(Self { cctx })
    }

    /// Compress `data` into at most `budget` bytes.
    ///
    /// Levels are tried in ladder order (3..=7, then 17 up to the
    /// codec maximum); the first attempt that the codec accepts and
    /// that fits the budget wins. The returned frame is never longer
    /// than `budget`.
    ///
    /// # Errors
    ///
    /// [`Error::NoFit`] when even the maximum level cannot fit.
    pub fn fit_to_budget(&mut self, data: &[u8], budget: usize) -> Result<Vec<u8>> {
        let max_level = *zstd::compression_level_range().end();
        let mut out = vec![0u8; budget];
        let mut level = START_LEVEL;
        loop {
            self.cctx.set_compression_level(level)?;
            match self.cctx.compress_to_buffer(data, &mut out[..]) {
                Ok(written) => {
                    debug!("fit {} bytes into {budget} at level {level}", data.len());
                    out.truncate(written);
                    return Ok(out);
                }
                // Output does not fit at this level (or the codec
                // rejected the input); move up the ladder.
                Err(e) => trace!("level {level} does not fit: {e}"),
            }

            level += 1;
            if level == LADDER_SKIP_FROM {
                level = LADDER_SKIP_TO;
            }
            if level > max_level {
                return Err(Error::NoFit {
                    data_len: data.len(),
                    budget,
                });
            }
        }
    }
}
