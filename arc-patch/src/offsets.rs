//! Offset directory parser
//!
//! External textual database mapping archive-relative asset paths to
//! slot locations and size budgets. One record per line, key first:
//!
//! ```text
//! fighter/mario/model/body/c00/model.numdlb,0x35d8a2b00,0x2f00,0x5a00
//! ```
//!
//! The three numeric fields are offset, compressed size and
//! decompressed size; `0x`-prefixed values parse as hex, bare values as
//! decimal. Unparsable lines are skipped with a warning. The database
//! is consumed read-only through exactly two lookups: [`OffsetTable::slot`]
//! for a full record and [`OffsetTable::offset_of`] for a bare offset.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::SlotEntry;

/// In-memory offset directory.
pub struct OffsetTable {
    entries: HashMap<String, SlotEntry>,
}

impl OffsetTable {
    /// Parse the database file.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut entries = HashMap::new();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match Self::parse_record(line) {
                Some((key, entry)) => {
                    entries.insert(key, entry);
                }
                None => warn!("Skipping unparsable offset record at line {}", lineno + 1),
            }
        }

        debug!("Loaded {} offset records from {:?}", entries.len(), path);
        Ok(Self { entries })
    }

    /// Split from the right so keys may contain commas.
    fn parse_record(line: &str) -> Option<(String, SlotEntry)> {
        let mut fields = line.rsplitn(4, ',');
        let decompressed_size = parse_number(fields.next()?)?;
        let compressed_size = parse_number(fields.next()?)?;
        let offset = parse_number(fields.next()?)?;
        let key = fields.next()?.trim();
        if key.is_empty() {
            return None;
        }
        Some((
            key.to_string(),
            SlotEntry {
                offset,
                compressed_size,
                decompressed_size,
            },
        ))
    }

    /// Full record for an archive-relative path.
    pub fn slot(&self, key: &str) -> Option<SlotEntry> {
        self.entries.get(key).copied()
    }

    /// Bare offset for a leaf key.
    pub fn offset_of(&self, key: &str) -> Option<u64> {
        self.slot(key).map(|entry| entry.offset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_number(field: &str) -> Option<u64> {
    let field = field.trim();
    match field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => field.parse().ok(),
    }
}
