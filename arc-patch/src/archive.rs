//! Offset-addressed access to the packed archive file
//!
//! The archive is one large file holding every packed asset; slot
//! boundaries are never stored in the file itself, so every access
//! takes an absolute byte offset supplied by the caller.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{PatchError, Result};

/// Chunk size for streamed raw copies.
const COPY_CHUNK_SIZE: usize = 0x20000;

/// The packed archive, opened for in-place slot updates.
#[derive(Debug)]
pub struct Archive {
    file: File,
    path: PathBuf,
}

impl Archive {
    /// Open an existing archive read-write.
    ///
    /// Failure here is fatal to the whole run; there is nothing to
    /// patch without the archive.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PatchError::ArchiveNotFound(path.to_path_buf()));
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        debug!("Opened archive {:?}", path);
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read exactly `len` bytes at `offset`.
    pub fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Write `data` into the archive at `offset`.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.file.flush()?;
        debug!("Wrote {} bytes at offset {offset:#x}", data.len());
        Ok(())
    }

    /// Stream a source file into the archive at `offset` in bounded
    /// chunks, stopping at end of source. Returns the bytes copied.
    pub fn splice_file(&mut self, source: &Path, offset: u64) -> Result<u64> {
        let mut src = File::open(source)?;
        self.file.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; COPY_CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let n = src.read(&mut buf)?;
            if n == 0 {
                break;
            }
            self.file.write_all(&buf[..n])?;
            total += n as u64;
        }
        self.file.flush()?;

        debug!("Spliced {total} bytes from {:?} at offset {offset:#x}", source);
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn archive_with(bytes: &[u8]) -> (TempDir, Archive) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.arc");
        std::fs::write(&path, bytes).unwrap();
        let archive = Archive::open(&path).unwrap();
        (dir, archive)
    }

    #[test]
    fn open_missing_archive_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = Archive::open(&dir.path().join("missing.arc")).unwrap_err();
        assert!(matches!(err, PatchError::ArchiveNotFound(_)));
    }

    #[test]
    fn read_write_round_trip() {
        let (_dir, mut archive) = archive_with(&[0u8; 64]);
        archive.write_at(16, b"patched!").unwrap();
        assert_eq!(archive.read_at(16, 8).unwrap(), b"patched!");
        // Neighbouring bytes untouched
        assert_eq!(archive.read_at(0, 16).unwrap(), vec![0u8; 16]);
        assert_eq!(archive.read_at(24, 8).unwrap(), vec![0u8; 8]);
    }

    #[test]
    fn splice_copies_whole_source() {
        let (dir, mut archive) = archive_with(&[0xAAu8; 256]);
        let source = dir.path().join("mod.bin");
        let content: Vec<u8> = (0..100u8).collect();
        std::fs::write(&source, &content).unwrap();

        let copied = archive.splice_file(&source, 32).unwrap();
        assert_eq!(copied, 100);
        assert_eq!(archive.read_at(32, 100).unwrap(), content);
        assert_eq!(archive.read_at(0, 32).unwrap(), vec![0xAAu8; 32]);
    }
}
