//! Patch session owning every handle one run needs
//!
//! One [`PatchSession`] value is threaded through an entire install or
//! uninstall run: the archive handle, the backup ledger, the lazily
//! parsed offset directory, the lazily created compression context and
//! the pending-directory stack all live here rather than in globals.

use std::path::PathBuf;
use tracing::{debug, warn};

use zslot::SlotCompressor;

use crate::archive::Archive;
use crate::error::Result;
use crate::ledger::BackupLedger;
use crate::offsets::OffsetTable;
use crate::walker::PendingDirs;

/// Filesystem layout a session works against.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The packed archive to patch in place.
    pub archive_path: PathBuf,
    /// Directory holding one `.backup` record per patched offset.
    pub backups_dir: PathBuf,
    /// Textual offset directory. Optional: hex-named leaves resolve
    /// without it.
    pub offsets_path: Option<PathBuf>,
}

/// Hook for hosts that can raise a platform performance mode around an
/// archive write. Purely a throughput knob; correctness never depends
/// on it.
pub trait PerfBoost {
    fn engage(&mut self);
    fn release(&mut self);
}

/// Default hook that does nothing.
#[derive(Debug, Default)]
pub struct NoBoost;

impl PerfBoost for NoBoost {
    fn engage(&mut self) {}
    fn release(&mut self) {}
}

/// State for one install/uninstall run against one archive.
pub struct PatchSession {
    pub(crate) archive: Archive,
    pub(crate) ledger: BackupLedger,
    pub(crate) pending: PendingDirs,
    pub(crate) boost: Box<dyn PerfBoost>,
    offsets_path: Option<PathBuf>,
    offsets: Option<OffsetTable>,
    offsets_attempted: bool,
    compressor: Option<SlotCompressor>,
}

impl PatchSession {
    /// Open the archive and the ledger directory.
    ///
    /// A failure to open the archive is fatal to the whole run.
    pub fn open(config: SessionConfig) -> Result<Self> {
        let archive = Archive::open(&config.archive_path)?;
        let ledger = BackupLedger::open(config.backups_dir)?;
        Ok(Self {
            archive,
            ledger,
            pending: PendingDirs::default(),
            boost: Box::new(NoBoost),
            offsets_path: config.offsets_path,
            offsets: None,
            offsets_attempted: false,
            compressor: None,
        })
    }

    /// Replace the performance hook.
    pub fn with_boost(mut self, boost: Box<dyn PerfBoost>) -> Self {
        self.boost = boost;
        self
    }

    pub fn ledger(&self) -> &BackupLedger {
        &self.ledger
    }

    /// The offset directory, parsed on first use.
    ///
    /// A missing or unparsable database only disables name-based
    /// resolution; hex-named leaves still install.
    pub(crate) fn offsets(&mut self) -> Option<&OffsetTable> {
        if !self.offsets_attempted {
            self.offsets_attempted = true;
            if let Some(path) = self.offsets_path.as_deref() {
                debug!("Parsing offset directory {:?}", path);
                match OffsetTable::load(path) {
                    Ok(table) => self.offsets = Some(table),
                    Err(e) => warn!("Failed to parse offset directory {:?}: {e}", path),
                }
            }
        }
        self.offsets.as_ref()
    }

    /// The compression context, created on first compressed install.
    pub(crate) fn compressor(&mut self) -> Result<&mut SlotCompressor> {
        let compressor = match self.compressor.take() {
            Some(compressor) => compressor,
            None => SlotCompressor::new()?,
        };
        Ok(self.compressor.insert(compressor))
    }
}
