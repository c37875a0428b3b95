//! Backup ledger with widen-on-demand coverage
//!
//! One record per patched offset, stored as `0x{offset:x}.backup` in
//! the ledger directory. A record holds the slot's pre-patch bytes and
//! its file length is the record's coverage length. Coverage only ever
//! grows: a larger pending write first puts the recorded bytes back,
//! then re-snapshots the larger range.
//!
//! Known quirk: the widen step reads the tail bytes (between the old
//! and the new coverage length) from the archive as it is *now*. If
//! those bytes were modified since the first snapshot, the widened
//! record keeps the modified bytes, not the true originals.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::archive::Archive;
use crate::error::{PatchError, Result};

/// Directory of per-offset backup records.
pub struct BackupLedger {
    dir: PathBuf,
}

impl BackupLedger {
    /// Open (and create if needed) the ledger directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `offset`.
    pub fn record_path(&self, offset: u64) -> PathBuf {
        self.dir.join(format!("{offset:#x}.backup"))
    }

    /// Coverage length of the record for `offset`, if one exists.
    pub fn coverage(&self, offset: u64) -> Option<u64> {
        fs::metadata(self.record_path(offset)).ok().map(|m| m.len())
    }

    /// Every offset with a live record, in ascending order.
    ///
    /// Files that do not follow the `0x{offset:x}.backup` naming are
    /// ignored.
    pub fn recorded_offsets(&self) -> Result<Vec<u64>> {
        let mut offsets = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(offset) = name.to_str().and_then(record_offset) {
                offsets.push(offset);
            }
        }
        offsets.sort_unstable();
        Ok(offsets)
    }

    /// Make sure a record covering at least `write_len` bytes exists
    /// before the caller overwrites the slot at `offset`.
    pub fn ensure_backup(&self, offset: u64, write_len: u64, archive: &mut Archive) -> Result<()> {
        let record = self.record_path(offset);

        if let Ok(meta) = fs::metadata(&record) {
            if write_len <= meta.len() {
                debug!(
                    "Backup {:?} already covers {} bytes",
                    record.file_name(),
                    meta.len()
                );
                return Ok(());
            }
            // Widen: reinstate the recorded bytes over their recorded
            // length, then snapshot the larger range below.
            let recorded = fs::read(&record)?;
            archive.write_at(offset, &recorded)?;
            info!(
                "Widening backup at {offset:#x} from {} to {write_len} bytes",
                recorded.len()
            );
        }

        let original = archive.read_at(offset, write_len as usize)?;
        fs::write(&record, &original)?;
        debug!("Recorded {write_len}-byte backup for offset {offset:#x}");
        Ok(())
    }

    /// Write the recorded bytes back into the archive and delete the
    /// record.
    ///
    /// # Errors
    ///
    /// [`PatchError::NoBackup`] if no record exists for `offset`; the
    /// archive is left untouched.
    pub fn restore(&self, offset: u64, archive: &mut Archive) -> Result<()> {
        let record = self.record_path(offset);
        if !record.exists() {
            return Err(PatchError::NoBackup(offset));
        }
        let recorded = fs::read(&record)?;
        archive.write_at(offset, &recorded)?;
        fs::remove_file(&record)?;
        info!("Restored {} bytes at offset {offset:#x}", recorded.len());
        Ok(())
    }
}

/// Parse a `0x{offset:x}.backup` record name back into its offset.
fn record_offset(name: &str) -> Option<u64> {
    let digits = name.strip_suffix(".backup")?.strip_prefix("0x")?;
    u64::from_str_radix(digits, 16).ok()
}
