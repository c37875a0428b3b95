//! In-place slot-patch engine for packed game archives
//!
//! Overlays replacement assets onto fixed-size byte slots inside one
//! large packed archive, keeping enough state to reverse every change.
//! A [`PatchSession`] owns the archive handle, the backup ledger, the
//! offset directory and the compression context; [`PatchSession::install`]
//! and [`PatchSession::uninstall`] drive a depth-first walk over a mod
//! source tree and report a per-slot [`SlotStatus`] for every leaf.
//!
//! The engine is single-threaded and synchronous. Within one slot the
//! order is always backup-then-overwrite; across slots operations are
//! independent. Cancellation mid-slot is not supported: if execution
//! halts after a partial write the slot may be left half-updated, with
//! the backup record as the only recovery path.

pub mod archive;
pub mod error;
pub mod ledger;
pub mod offsets;
pub mod session;
pub mod types;

mod walker;

pub use archive::Archive;
pub use error::{PatchError, Result};
pub use ledger::BackupLedger;
pub use offsets::OffsetTable;
pub use session::{NoBoost, PatchSession, PerfBoost, SessionConfig};
pub use types::{PatchReport, SlotEntry, SlotStatus};
