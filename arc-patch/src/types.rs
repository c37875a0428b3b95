//! Core types shared across the patch engine

use std::path::PathBuf;

use crate::error::PatchError;

/// Location and size budgets of one asset slot inside the archive.
///
/// `compressed_size` is the byte budget of the slot itself;
/// `decompressed_size` bounds the replacement content. A slot with
/// `compressed_size == decompressed_size` stores its asset uncompressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEntry {
    pub offset: u64,
    pub compressed_size: u64,
    pub decompressed_size: u64,
}

/// Outcome of one walked leaf entry.
#[derive(Debug)]
pub enum SlotStatus {
    /// Replacement written into the slot.
    Installed { offset: u64 },
    /// Original bytes written back from the ledger record.
    Restored { offset: u64 },
    /// No offset resolvable for the entry; nothing was written.
    Skipped,
    /// Uninstall found no ledger record; the archive was left untouched.
    NoBackup { offset: u64 },
    /// The slot was aborted. Nothing was written unless the failure
    /// happened mid-write.
    Failed {
        offset: Option<u64>,
        error: PatchError,
    },
}

/// Per-entry outcomes of one install or uninstall walk, in visit order.
#[derive(Debug, Default)]
pub struct PatchReport {
    pub outcomes: Vec<(PathBuf, SlotStatus)>,
}

impl PatchReport {
    pub fn record(&mut self, path: impl Into<PathBuf>, status: SlotStatus) {
        self.outcomes.push((path.into(), status));
    }

    pub fn installed(&self) -> usize {
        self.count(|s| matches!(s, SlotStatus::Installed { .. }))
    }

    pub fn restored(&self) -> usize {
        self.count(|s| matches!(s, SlotStatus::Restored { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, SlotStatus::Skipped | SlotStatus::NoBackup { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, SlotStatus::Failed { .. }))
    }

    /// True when every visited leaf installed or restored cleanly.
    pub fn is_clean(&self) -> bool {
        self.skipped() == 0 && self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&SlotStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, s)| pred(s)).count()
    }
}
