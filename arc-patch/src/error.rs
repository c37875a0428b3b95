//! Error types for archive patching operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive not found at {0}")]
    ArchiveNotFound(PathBuf),

    #[error("Replacement is {mod_size} bytes but the slot decompresses to at most {decompressed_size}")]
    OversizeMod {
        mod_size: u64,
        decompressed_size: u64,
    },

    #[error("No slot offset resolvable for {0}")]
    MissingOffset(PathBuf),

    #[error("No backup recorded for offset {0:#x}")]
    NoBackup(u64),

    #[error("Codec error: {0}")]
    Codec(#[from] zslot::Error),
}

impl PatchError {
    /// True when the compressed path gave up because no level fit the
    /// slot budget.
    pub fn is_no_fit(&self) -> bool {
        matches!(self, Self::Codec(zslot::Error::NoFit { .. }))
    }
}

pub type Result<T> = std::result::Result<T, PatchError>;
