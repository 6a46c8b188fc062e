//! Registry hive base block (regf header).
//!
//! Only the fields needed to reach the key tree are interpreted. A bad
//! checksum, mismatched sequence numbers or an unusual version are logged
//! and otherwise tolerated.

use crate::error::{AnalyzerError, Result};
use crate::utils::{calculate_checksum, filetime_to_datetime, read_u32_le, read_u64_le};
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::warn;

/// Size of the base block in bytes.
pub const BASE_BLOCK_SIZE: usize = 4096;

/// Signature at offset 0 of every hive file.
pub const REGF_SIGNATURE: &[u8; 4] = b"regf";

const CHECKSUM_OFFSET: usize = 0x1FC;

/// Parsed base block.
#[derive(Debug, Clone)]
pub struct BaseBlock {
    /// Primary sequence number.
    pub primary_sequence: u32,
    /// Secondary sequence number.
    pub secondary_sequence: u32,
    /// Last written timestamp (FILETIME).
    pub last_written: u64,
    /// Format major version.
    pub major_version: u32,
    /// Format minor version.
    pub minor_version: u32,
    /// Root key cell offset, relative to the first hbin.
    pub root_cell_offset: u32,
    /// Length of the hive bins data.
    pub hive_length: u32,
    /// Stored header checksum.
    pub checksum: u32,
    /// Whether the stored checksum matches the computed one.
    pub checksum_valid: bool,
}

impl BaseBlock {
    /// Parses the base block from the start of the hive data.
    ///
    /// # Errors
    ///
    /// Fails when the data is shorter than a base block or does not start
    /// with the `regf` signature.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < BASE_BLOCK_SIZE {
            return Err(AnalyzerError::HiveTooSmall {
                size: data.len(),
                minimum: BASE_BLOCK_SIZE,
            });
        }
        if &data[0..4] != REGF_SIGNATURE {
            return Err(AnalyzerError::invalid_signature(REGF_SIGNATURE, &data[0..4]));
        }

        let checksum = read_u32_le(data, CHECKSUM_OFFSET)?;
        let block = BaseBlock {
            primary_sequence: read_u32_le(data, 0x04)?,
            secondary_sequence: read_u32_le(data, 0x08)?,
            last_written: read_u64_le(data, 0x0C)?,
            major_version: read_u32_le(data, 0x14)?,
            minor_version: read_u32_le(data, 0x18)?,
            root_cell_offset: read_u32_le(data, 0x24)?,
            hive_length: read_u32_le(data, 0x28)?,
            checksum,
            checksum_valid: checksum == calculate_checksum(data),
        };

        if !block.checksum_valid {
            warn!(stored = %format!("{:#x}", checksum), "Base block checksum mismatch");
        }
        if !block.is_consistent() {
            warn!(
                primary = block.primary_sequence,
                secondary = block.secondary_sequence,
                "Hive sequence numbers differ; hive was not cleanly flushed"
            );
        }
        if block.major_version != 1 || !(3..=6).contains(&block.minor_version) {
            warn!(
                major = block.major_version,
                minor = block.minor_version,
                "Unexpected hive format version"
            );
        }

        Ok(block)
    }

    /// Returns true when primary and secondary sequence numbers match.
    pub fn is_consistent(&self) -> bool {
        self.primary_sequence == self.secondary_sequence
    }

    /// Header last-written time, if representable.
    pub fn last_written_datetime(&self) -> Option<DateTime<Utc>> {
        filetime_to_datetime(self.last_written).ok()
    }
}

impl fmt::Display for BaseBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "regf {}.{} root={:#x} length={} consistent={}",
            self.major_version,
            self.minor_version,
            self.root_cell_offset,
            self.hive_length,
            self.is_consistent()
        )
    }
}
