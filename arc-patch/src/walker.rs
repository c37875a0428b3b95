//! Depth-first mod-tree walker and install orchestrator
//!
//! A mod source tree mirrors the archive layout: leaves are either
//! hexadecimal-named files (the slot offset encoded in the name) or
//! named files resolved through the offset directory by their path
//! relative to the walk root. The walk keeps an explicit stack of
//! unvisited directories; every resolved leaf goes through
//! backup-then-overwrite on install, or ledger restore on uninstall.
//! Unresolvable or failing leaves are reported and never stop the
//! walk.

use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{PatchError, Result};
use crate::session::PatchSession;
use crate::types::{PatchReport, SlotEntry, SlotStatus};

/// Direction of one walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkMode {
    Install,
    Uninstall,
}

/// One unvisited directory, paired with the walk root it descends from.
#[derive(Debug)]
pub(crate) struct PendingDir {
    path: PathBuf,
    root: PathBuf,
}

/// LIFO stack of unvisited directories; empties as the walk completes.
#[derive(Debug, Default)]
pub(crate) struct PendingDirs(Vec<PendingDir>);

impl PendingDirs {
    fn push(&mut self, dir: PendingDir) {
        self.0.push(dir);
    }

    fn pop(&mut self) -> Option<PendingDir> {
        self.0.pop()
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PatchSession {
    /// Install every resolvable leaf under the given mod tree roots.
    pub fn install(&mut self, roots: &[PathBuf]) -> Result<PatchReport> {
        self.run(roots, WalkMode::Install)
    }

    /// Restore every resolvable leaf under the given mod tree roots
    /// from its ledger record.
    pub fn uninstall(&mut self, roots: &[PathBuf]) -> Result<PatchReport> {
        self.run(roots, WalkMode::Uninstall)
    }

    /// Restore every slot the ledger has a record for, without needing
    /// the mod trees that produced them.
    pub fn restore_all(&mut self) -> Result<PatchReport> {
        let mut report = PatchReport::default();
        for offset in self.ledger.recorded_offsets()? {
            let record = self.ledger.record_path(offset);
            let status = match self.ledger.restore(offset, &mut self.archive) {
                Ok(()) => SlotStatus::Restored { offset },
                Err(error) => SlotStatus::Failed {
                    offset: Some(offset),
                    error,
                },
            };
            report.record(record, status);
        }
        info!("Restored {} of {} recorded slots", report.restored(), report.outcomes.len());
        Ok(report)
    }

    fn run(&mut self, roots: &[PathBuf], mode: WalkMode) -> Result<PatchReport> {
        let mut report = PatchReport::default();

        self.pending.clear();
        for root in roots {
            self.pending.push(PendingDir {
                path: root.clone(),
                root: root.clone(),
            });
        }

        while let Some(dir) = self.pending.pop() {
            self.visit_dir(&dir, mode, &mut report);
        }
        debug_assert!(self.pending.is_empty());

        info!(
            "Walk finished: {} installed, {} restored, {} skipped, {} failed",
            report.installed(),
            report.restored(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    fn visit_dir(&mut self, dir: &PendingDir, mode: WalkMode, report: &mut PatchReport) {
        debug!("Searching mod dir {:?}", dir.path);

        let entries = match fs::read_dir(&dir.path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to open mod directory {:?}: {e}", dir.path);
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read entry in {:?}: {e}", dir.path);
                    continue;
                }
            };
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

            if is_dir {
                self.pending.push(PendingDir {
                    path,
                    root: dir.root.clone(),
                });
            } else {
                let status = self.visit_leaf(&path, &dir.root, mode);
                report.record(path, status);
            }
        }
    }

    fn visit_leaf(&mut self, path: &Path, root: &Path, mode: WalkMode) -> SlotStatus {
        let (offset, slot) = match self.resolve_leaf(path, root, mode) {
            Ok(resolved) => resolved,
            Err(PatchError::MissingOffset(_)) => {
                warn!("No slot offset resolvable for {:?}, skipping", path);
                return SlotStatus::Skipped;
            }
            Err(error) => return SlotStatus::Failed { offset: None, error },
        };

        match mode {
            WalkMode::Install => match self.install_leaf(path, offset, slot) {
                Ok(()) => {
                    info!("Installed {:?} at offset {offset:#x}", path);
                    SlotStatus::Installed { offset }
                }
                Err(error) => {
                    warn!("Failed to install {:?}: {error}", path);
                    SlotStatus::Failed {
                        offset: Some(offset),
                        error,
                    }
                }
            },
            WalkMode::Uninstall => match self.ledger.restore(offset, &mut self.archive) {
                Ok(()) => {
                    info!("Restored slot at offset {offset:#x}");
                    SlotStatus::Restored { offset }
                }
                Err(PatchError::NoBackup(_)) => {
                    warn!("No backup found for {:?}", path);
                    SlotStatus::NoBackup { offset }
                }
                Err(error) => SlotStatus::Failed {
                    offset: Some(offset),
                    error,
                },
            },
        }
    }

    /// Derive the target offset for a leaf: a hexadecimal filename
    /// decodes directly; otherwise the offset directory is queried with
    /// the archive-relative key built from the walk position. Install
    /// lookups want the full slot record, uninstall only the offset.
    fn resolve_leaf(
        &mut self,
        path: &Path,
        root: &Path,
        mode: WalkMode,
    ) -> Result<(u64, Option<SlotEntry>)> {
        let name = path.file_name().and_then(|n| n.to_str());
        if let Some(offset) = name.and_then(offset_from_name) {
            return Ok((offset, None));
        }

        let missing = || PatchError::MissingOffset(path.to_path_buf());
        let key = archive_relative_key(path, root).ok_or_else(missing)?;
        let table = match self.offsets() {
            Some(table) => table,
            None => return Err(missing()),
        };
        match mode {
            WalkMode::Install => {
                let entry = table.slot(&key).ok_or_else(missing)?;
                Ok((entry.offset, Some(entry)))
            }
            WalkMode::Uninstall => {
                let offset = table.offset_of(&key).ok_or_else(missing)?;
                Ok((offset, None))
            }
        }
    }

    /// Overwrite one slot with a replacement file, taking a backup
    /// first. Compression is used when the slot stores a compressed
    /// frame, the source is not already a frame, and the slot budget is
    /// known; otherwise the source is spliced in raw.
    fn install_leaf(&mut self, path: &Path, offset: u64, slot: Option<SlotEntry>) -> Result<()> {
        let mod_size = fs::metadata(path)?.len();
        let mut image: Option<Vec<u8>> = None;
        let mut write_len = mod_size;

        if let Some(slot) = slot {
            if mod_size > slot.decompressed_size {
                return Err(PatchError::OversizeMod {
                    mod_size,
                    decompressed_size: slot.decompressed_size,
                });
            }
            if slot.compressed_size != 0 {
                write_len = slot.compressed_size;
            }
            if slot.compressed_size != slot.decompressed_size
                && slot.compressed_size != 0
                && !zslot::path_is_zstd_frame(path)?
            {
                let budget = slot.compressed_size as usize;
                debug!("Compressing {:?} into {budget:#x}-byte budget", path);
                let data = fs::read(path)?;
                let frame = self.compressor()?.fit_to_budget(&data, budget)?;
                image = Some(zslot::assemble_slot(&frame, budget)?);
            }
        }

        // A raw splice writes the whole source file, which can run past
        // the slot's compressed budget (a pre-built frame larger than
        // the budget, say). The backup must cover every byte about to
        // be overwritten or restore cannot undo the write.
        if image.is_none() {
            write_len = write_len.max(mod_size);
        }

        self.ledger.ensure_backup(offset, write_len, &mut self.archive)?;

        self.boost.engage();
        let written = match &image {
            Some(image) => self.archive.write_at(offset, image),
            None => self.archive.splice_file(path, offset).map(|_| ()),
        };
        self.boost.release();
        written
    }
}

/// Decode a `0x`-prefixed hexadecimal filename into a slot offset.
///
/// Trailing non-hex characters (an extension, say) are ignored; an
/// empty digit run or a zero value means the name carries no offset.
fn offset_from_name(name: &str) -> Option<u64> {
    let digits = name.strip_prefix("0x")?;
    let end = digits
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value = u64::from_str_radix(&digits[..end], 16).ok()?;
    (value != 0).then_some(value)
}

/// Key for the offset directory: the leaf's path relative to the walk
/// root, with `/` separators.
fn archive_relative_key(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut key = String::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                if !key.is_empty() {
                    key.push('/');
                }
                key.push_str(part.to_str()?);
            }
            _ => return None,
        }
    }
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
