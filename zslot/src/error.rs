//! Error types for slot-frame fitting and assembly

use thiserror::Error;

/// Result type for slot codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Slot codec error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error (the zstd bindings surface codec failures this way)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Leading bytes are not a zstd frame
    #[error("Invalid zstd magic: {0:#010x}")]
    InvalidMagic(u32),

    /// Frame shorter than its own header claims
    #[error("Truncated frame: expected at least {expected} bytes, got {actual}")]
    TruncatedFrame { expected: usize, actual: usize },

    /// No compression level produced output within the budget
    #[error("No compression level fits {data_len} bytes into a {budget}-byte budget")]
    NoFit { data_len: usize, budget: usize },

    /// Frame already longer than the slot budget
    #[error("Compressed frame is {frame_len} bytes, slot budget is {budget}")]
    BudgetExceeded { frame_len: usize, budget: usize },
}
