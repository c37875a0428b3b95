//! End-to-end install/uninstall walks against a synthetic archive

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use arc_patch::{PatchSession, SessionConfig, SlotStatus};

const ARCHIVE_LEN: usize = 0x4000;

struct Fixture {
    dir: TempDir,
    original: Vec<u8>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let original: Vec<u8> = (0..ARCHIVE_LEN).map(|i| (i % 251) as u8).collect();
        fs::write(dir.path().join("data.arc"), &original).unwrap();
        Self { dir, original }
    }

    fn archive_path(&self) -> PathBuf {
        self.dir.path().join("data.arc")
    }

    fn archive_bytes(&self) -> Vec<u8> {
        fs::read(self.archive_path()).unwrap()
    }

    fn mods_root(&self) -> PathBuf {
        self.dir.path().join("mods")
    }

    fn write_mod(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.mods_root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn write_offsets(&self, records: &str) {
        fs::write(self.dir.path().join("offsets.txt"), records).unwrap();
    }

    fn session(&self) -> PatchSession {
        let offsets_path = self.dir.path().join("offsets.txt");
        PatchSession::open(SessionConfig {
            archive_path: self.archive_path(),
            backups_dir: self.dir.path().join("backups"),
            offsets_path: offsets_path.exists().then_some(offsets_path),
        })
        .unwrap()
    }
}

/// High-entropy bytes from a fixed-seed LCG; no zstd level shrinks them.
fn noise(len: usize) -> Vec<u8> {
    let mut state = 0x9E3779B97F4A7C15u64;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 33) as u8
        })
        .collect()
}

#[test]
fn raw_install_writes_mod_bytes_exactly() {
    let fx = Fixture::new();
    // Uncompressed slot: compressed and decompressed budgets are equal
    fx.write_offsets("ui/banner.bntx,0x800,0x100,0x100\n");
    let content = vec![0x5Au8; 0x100];
    fx.write_mod("ui/banner.bntx", &content);

    let mut session = fx.session();
    let report = session.install(&[fx.mods_root()]).unwrap();
    assert_eq!(report.installed(), 1);
    assert!(report.is_clean());

    let bytes = fx.archive_bytes();
    assert_eq!(&bytes[0x800..0x900], content.as_slice());
    // Backup covers the slot budget
    assert_eq!(session.ledger().coverage(0x800), Some(0x100));
}

#[test]
fn install_then_uninstall_round_trips() {
    let fx = Fixture::new();
    fx.write_offsets(
        "ui/banner.bntx,0x800,0x100,0x100\n\
         sound/theme.bin,0x1000,0x400,0x2000\n",
    );
    fx.write_mod("ui/banner.bntx", &vec![0x11u8; 0x100]);
    // Compressible payload that must be fitted into the 0x400 budget
    let audio: Vec<u8> = (0..0x2000).map(|i| ((i / 7) % 13) as u8).collect();
    fx.write_mod("sound/theme.bin", &audio);

    let mut session = fx.session();
    let report = session.install(&[fx.mods_root()]).unwrap();
    assert_eq!(report.installed(), 2);
    assert_ne!(fx.archive_bytes(), fx.original);

    let report = session.uninstall(&[fx.mods_root()]).unwrap();
    assert_eq!(report.restored(), 2);
    assert_eq!(fx.archive_bytes(), fx.original);
    assert!(!session.ledger().record_path(0x800).exists());
    assert!(!session.ledger().record_path(0x1000).exists());
}

#[test]
fn compressed_install_touches_only_the_slot() {
    let fx = Fixture::new();
    fx.write_offsets("sound/theme.bin,0x1000,0x400,0x2000\n");
    let audio: Vec<u8> = (0..0x2000).map(|i| ((i / 3) % 17) as u8).collect();
    fx.write_mod("sound/theme.bin", &audio);

    let mut session = fx.session();
    let report = session.install(&[fx.mods_root()]).unwrap();
    assert_eq!(report.installed(), 1);

    let bytes = fx.archive_bytes();
    // Slot rewritten, neighbours untouched
    assert_ne!(&bytes[0x1000..0x1400], &fx.original[0x1000..0x1400]);
    assert_eq!(&bytes[..0x1000], &fx.original[..0x1000]);
    assert_eq!(&bytes[0x1400..], &fx.original[0x1400..]);
    // The slot still opens with a zstd frame prologue
    assert!(zslot::is_zstd_frame(&bytes[0x1000..0x1004]));
    assert_eq!(session.ledger().coverage(0x1000), Some(0x400));
}

#[test]
fn installing_twice_is_idempotent() {
    let fx = Fixture::new();
    fx.write_offsets("sound/theme.bin,0x1000,0x400,0x2000\n");
    let audio: Vec<u8> = (0..0x2000).map(|i| ((i / 5) % 11) as u8).collect();
    fx.write_mod("sound/theme.bin", &audio);

    let mut session = fx.session();
    session.install(&[fx.mods_root()]).unwrap();
    let first = fx.archive_bytes();
    let backup_first = fs::read(session.ledger().record_path(0x1000)).unwrap();

    session.install(&[fx.mods_root()]).unwrap();
    assert_eq!(fx.archive_bytes(), first);
    // No re-widening: the record still holds the original snapshot
    let backup_second = fs::read(session.ledger().record_path(0x1000)).unwrap();
    assert_eq!(backup_second, backup_first);
    assert_eq!(backup_second, &fx.original[0x1000..0x1400]);
}

#[test]
fn source_that_is_already_a_frame_is_spliced_raw() {
    let fx = Fixture::new();
    fx.write_offsets("sound/theme.bin,0x1000,0x400,0x2000\n");
    let frame = zstd::bulk::compress(&vec![3u8; 0x600], 3).unwrap();
    assert!(frame.len() <= 0x400);
    fx.write_mod("sound/theme.bin", &frame);

    let mut session = fx.session();
    let report = session.install(&[fx.mods_root()]).unwrap();
    assert_eq!(report.installed(), 1);

    let bytes = fx.archive_bytes();
    assert_eq!(&bytes[0x1000..0x1000 + frame.len()], frame.as_slice());
}

#[test]
fn frame_wider_than_the_slot_budget_still_round_trips() {
    let fx = Fixture::new();
    fx.write_offsets("sound/theme.bin,0x400,0x40,0x1000\n");
    // An incompressible frame splices raw and overruns the 0x40 budget;
    // the backup has to cover the whole write for restore to undo it.
    let frame = zstd::bulk::compress(&noise(0x200), 3).unwrap();
    assert!(frame.len() > 0x40);
    fx.write_mod("sound/theme.bin", &frame);

    let mut session = fx.session();
    let report = session.install(&[fx.mods_root()]).unwrap();
    assert_eq!(report.installed(), 1);
    assert_eq!(session.ledger().coverage(0x400), Some(frame.len() as u64));

    let bytes = fx.archive_bytes();
    assert_eq!(&bytes[0x400..0x400 + frame.len()], frame.as_slice());

    let report = session.uninstall(&[fx.mods_root()]).unwrap();
    assert_eq!(report.restored(), 1);
    assert_eq!(fx.archive_bytes(), fx.original);
}

#[test]
fn oversize_mod_fails_without_touching_the_archive() {
    let fx = Fixture::new();
    fx.write_offsets("ui/banner.bntx,0x800,0x100,0x100\n");
    fx.write_mod("ui/banner.bntx", &vec![0u8; 0x200]);

    let mut session = fx.session();
    let report = session.install(&[fx.mods_root()]).unwrap();
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.outcomes[0].1,
        SlotStatus::Failed {
            error: arc_patch::PatchError::OversizeMod { .. },
            ..
        }
    ));
    assert_eq!(fx.archive_bytes(), fx.original);
    assert_eq!(session.ledger().coverage(0x800), None);
}

#[test]
fn unfittable_mod_fails_before_any_write() {
    let fx = Fixture::new();
    fx.write_offsets("sound/noise.bin,0x1000,0x40,0x1000\n");
    fx.write_mod("sound/noise.bin", &noise(0x1000));

    let mut session = fx.session();
    let report = session.install(&[fx.mods_root()]).unwrap();
    assert_eq!(report.failed(), 1);
    match &report.outcomes[0].1 {
        SlotStatus::Failed { error, .. } => assert!(error.is_no_fit()),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(fx.archive_bytes(), fx.original);
    assert_eq!(session.ledger().coverage(0x1000), None);
}

#[test]
fn uninstall_without_backup_reports_and_leaves_archive_alone() {
    let fx = Fixture::new();
    fx.write_mod("a/0x800", b"whatever");

    let mut session = fx.session();
    let report = session.uninstall(&[fx.mods_root()]).unwrap();
    assert_eq!(report.restored(), 0);
    assert!(matches!(
        report.outcomes[0].1,
        SlotStatus::NoBackup { offset: 0x800 }
    ));
    assert_eq!(fx.archive_bytes(), fx.original);
}

#[test]
fn unresolvable_leaf_is_skipped_and_walk_continues() {
    let fx = Fixture::new();
    fx.write_mod("a/unknown.bin", b"no db entry");
    fx.write_mod("a/0x800", &[0xCCu8; 8]);

    let mut session = fx.session();
    let report = session.install(&[fx.mods_root()]).unwrap();
    assert_eq!(report.installed(), 1);
    assert_eq!(report.skipped(), 1);

    let bytes = fx.archive_bytes();
    assert_eq!(&bytes[0x800..0x808], &[0xCCu8; 8]);
}

#[test]
fn walk_visits_nested_leaves_depth_first_exactly_once() {
    let fx = Fixture::new();
    fx.write_mod("a/0x100", &[1u8; 4]);
    fx.write_mod("a/b/0x200", &[2u8; 4]);
    fx.write_mod("a/b/c/0x300", &[3u8; 4]);

    let mut session = fx.session();
    let report = session.install(&[fx.mods_root()]).unwrap();
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.installed(), 3);

    let visited: Vec<&Path> = report
        .outcomes
        .iter()
        .map(|(path, _)| path.strip_prefix(fx.mods_root()).unwrap())
        .collect();
    assert_eq!(
        visited,
        [
            Path::new("a/0x100"),
            Path::new("a/b/0x200"),
            Path::new("a/b/c/0x300"),
        ]
    );

    let bytes = fx.archive_bytes();
    assert_eq!(&bytes[0x100..0x104], &[1u8; 4]);
    assert_eq!(&bytes[0x200..0x204], &[2u8; 4]);
    assert_eq!(&bytes[0x300..0x304], &[3u8; 4]);
}

#[test]
fn widening_install_keeps_one_record_with_largest_coverage() {
    let fx = Fixture::new();
    // Two mods targeting the same slot with growing raw sizes
    fx.write_mod("small/0x800", &[0xA1u8; 0x20]);
    fx.write_mod("large/0x800", &[0xB2u8; 0x60]);

    let mut session = fx.session();
    session.install(&[fx.mods_root().join("small")]).unwrap();
    assert_eq!(session.ledger().coverage(0x800), Some(0x20));

    session.install(&[fx.mods_root().join("large")]).unwrap();
    assert_eq!(session.ledger().coverage(0x800), Some(0x60));

    // Restore brings back the true originals: the first install never
    // wrote past its recorded coverage
    let report = session.uninstall(&[fx.mods_root().join("large")]).unwrap();
    assert_eq!(report.restored(), 1);
    assert_eq!(fx.archive_bytes(), fx.original);
}

#[test]
fn restore_all_recovers_every_recorded_slot() {
    let fx = Fixture::new();
    fx.write_mod("a/0x100", &[0xD1u8; 0x20]);
    fx.write_mod("a/b/0x900", &[0xD2u8; 0x40]);

    let mut session = fx.session();
    session.install(&[fx.mods_root()]).unwrap();
    assert_ne!(fx.archive_bytes(), fx.original);

    // No mod trees needed: the ledger alone drives the restore
    let report = session.restore_all().unwrap();
    assert_eq!(report.restored(), 2);
    assert!(report.is_clean());
    assert_eq!(fx.archive_bytes(), fx.original);
    assert!(!session.ledger().record_path(0x100).exists());
    assert!(!session.ledger().record_path(0x900).exists());
}

#[test]
fn restore_all_with_empty_ledger_is_a_no_op() {
    let fx = Fixture::new();
    let mut session = fx.session();
    let report = session.restore_all().unwrap();
    assert!(report.outcomes.is_empty());
    assert_eq!(fx.archive_bytes(), fx.original);
}
