//! Read-only access to a registry hive file.
//!
//! [`Hive`] maps the file and resolves cells on demand; [`HiveKey`] and
//! [`HiveValue`] expose the key tree through the [`TreeKey`] and
//! [`RawValue`] traits so the walker can consume it.

use crate::error::{AnalyzerError, Result};
use crate::header::{BaseBlock, BASE_BLOCK_SIZE};
use crate::key::{is_null_offset, KeyRecord};
use crate::subkey_list::SubkeyList;
use crate::tree::{RawValue, TreeKey};
use crate::utils::{cell_offset_to_absolute, filetime_to_datetime, read_i32_le, read_u16_le, read_u32_le};
use crate::value::{ValueRecord, ValueType};
use chrono::{DateTime, Utc};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Largest payload stored in a single cell; bigger ones use a `db` block.
const MAX_DIRECT_DATA_SIZE: u32 = 16344;

/// Nesting limit for `ri` index roots pointing at further index roots.
const MAX_INDEX_ROOT_DEPTH: usize = 8;

/// Separator between key names in a path.
pub const PATH_SEPARATOR: char = '\\';

/// Hive bytes, either mapped from disk or owned.
enum HiveData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl HiveData {
    fn as_slice(&self) -> &[u8] {
        match self {
            HiveData::Mapped(mmap) => mmap,
            HiveData::Owned(data) => data,
        }
    }
}

/// An opened registry hive.
pub struct Hive {
    data: HiveData,
    base_block: BaseBlock,
}

impl Hive {
    /// Opens and maps a hive file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is smaller than a base block, or
    /// does not carry the `regf` signature.
    ///
    /// ```no_run
    /// use hive_report::Hive;
    ///
    /// let hive = Hive::open("NTUSER.DAT").unwrap();
    /// println!("{}", hive.base_block());
    /// ```
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Opening registry hive");
        let file = File::open(&path)?;

        let file_size = file.metadata()?.len() as usize;
        if file_size < BASE_BLOCK_SIZE {
            return Err(AnalyzerError::HiveTooSmall {
                size: file_size,
                minimum: BASE_BLOCK_SIZE,
            });
        }

        // SAFETY: the file is opened read-only, the mapping lives as long as
        // the Hive, and every access goes through bounds-checked slicing.
        let mmap = unsafe { Mmap::map(&file)? };
        debug!(size = mmap.len(), "Memory mapped hive file");

        Self::from_data(HiveData::Mapped(mmap))
    }

    /// Creates a hive from bytes already in memory.
    pub fn from_vec(data: Vec<u8>) -> Result<Self> {
        Self::from_data(HiveData::Owned(data))
    }

    fn from_data(data: HiveData) -> Result<Self> {
        let base_block = BaseBlock::parse(data.as_slice())?;
        debug!("Parsed base block: {}", base_block);
        Ok(Self { data, base_block })
    }

    /// The parsed base block.
    pub fn base_block(&self) -> &BaseBlock {
        &self.base_block
    }

    /// Resolves the root key.
    ///
    /// # Errors
    ///
    /// Fails when the root cell offset does not point at a readable `nk` cell.
    #[instrument(skip(self))]
    pub fn root_key(&self) -> Result<HiveKey<'_>> {
        let offset = self.base_block.root_cell_offset;
        debug!(offset = %format!("{:#x}", offset), "Resolving root key");
        let record = self.key_record(offset)?;
        Ok(HiveKey {
            hive: self,
            offset,
            path: record.name.clone(),
            record: Ok(record),
        })
    }

    fn key_record(&self, offset: u32) -> Result<KeyRecord> {
        KeyRecord::parse(self.read_cell(offset)?, offset)
    }

    /// Returns the data of the cell at `offset` (excluding the size field).
    fn read_cell(&self, offset: u32) -> Result<&[u8]> {
        let data = self.data.as_slice();
        let start = cell_offset_to_absolute(offset)?;

        let size = read_i32_le(data, start)
            .map_err(|_| AnalyzerError::invalid_offset(offset, data.len()))?;
        let cell_size = size.unsigned_abs() as usize;
        if cell_size < 4 {
            return Err(AnalyzerError::invalid_cell_size(size, offset));
        }

        data.get(start + 4..start + cell_size).ok_or_else(|| {
            AnalyzerError::truncated(offset, cell_size, data.len().saturating_sub(start))
        })
    }

    /// Appends the key offsets reachable from a subkey list to `out`.
    fn collect_subkey_offsets(&self, list_offset: u32, depth: usize, out: &mut Vec<u32>) -> Result<()> {
        if is_null_offset(list_offset) {
            return Ok(());
        }
        if depth > MAX_INDEX_ROOT_DEPTH {
            return Err(AnalyzerError::InvalidFormat(format!(
                "Subkey index roots nested deeper than {} at {:#x}",
                MAX_INDEX_ROOT_DEPTH, list_offset
            )));
        }

        match SubkeyList::parse(self.read_cell(list_offset)?, list_offset)? {
            SubkeyList::IndexRoot(lists) => {
                for list in lists {
                    self.collect_subkey_offsets(list, depth + 1, out)?;
                }
            }
            SubkeyList::Leaf(keys) => out.extend(keys),
        }
        Ok(())
    }

    /// Reads the payload described by a value record.
    fn value_data(&self, record: &ValueRecord) -> Result<Vec<u8>> {
        if let Some(inline) = record.inline_data() {
            return Ok(inline);
        }
        if record.data_length == 0 || is_null_offset(record.data_offset) {
            return Ok(Vec::new());
        }

        let cell = self.read_cell(record.data_offset)?;
        if record.data_length > MAX_DIRECT_DATA_SIZE && cell.starts_with(b"db") {
            return self.big_data(cell, record.data_offset, record.data_length);
        }

        let len = (record.data_length as usize).min(cell.len());
        Ok(cell[..len].to_vec())
    }

    /// Reassembles a payload stored as a `db` segment list.
    fn big_data(&self, header: &[u8], offset: u32, length: u32) -> Result<Vec<u8>> {
        let segment_count = read_u16_le(header, 0x02)? as usize;
        let list_offset = read_u32_le(header, 0x04)?;
        debug!(segments = segment_count, length, "Reading big data block");

        let list = self.read_cell(list_offset)?;
        if list.len() < segment_count * 4 {
            return Err(AnalyzerError::truncated(offset, segment_count * 4, list.len()));
        }

        let length = length as usize;
        let mut data = Vec::with_capacity(length);
        for i in 0..segment_count {
            if data.len() >= length {
                break;
            }
            // Segment cells are padded; each carries at most one direct payload
            let segment = self.read_cell(read_u32_le(list, i * 4)?)?;
            let take = segment
                .len()
                .min(MAX_DIRECT_DATA_SIZE as usize)
                .min(length - data.len());
            data.extend_from_slice(&segment[..take]);
        }
        if data.len() < length {
            return Err(AnalyzerError::truncated(offset, length, data.len()));
        }
        Ok(data)
    }
}

/// A key inside an opened [`Hive`].
///
/// A child whose `nk` cell cannot be parsed is still yielded; every
/// accessor of such a key returns the parse error.
pub struct HiveKey<'a> {
    hive: &'a Hive,
    /// Cell offset of the key node.
    pub offset: u32,
    path: String,
    record: std::result::Result<KeyRecord, String>,
}

impl<'a> HiveKey<'a> {
    /// Key name, if the key node could be parsed.
    pub fn name(&self) -> Option<&str> {
        self.record.as_ref().ok().map(|record| record.name.as_str())
    }

    /// The parsed key node, if any.
    pub fn record(&self) -> Option<&KeyRecord> {
        self.record.as_ref().ok()
    }

    fn parsed(&self) -> Result<&KeyRecord> {
        self.record.as_ref().map_err(|e| AnalyzerError::from_source(e.as_str()))
    }

    fn child(&self, offset: u32) -> HiveKey<'a> {
        let record = self.hive.key_record(offset).map_err(|e| {
            debug!(parent = %self.path, offset = %format!("{:#x}", offset), error = %e, "Unreadable key node");
            format!("Key node at {:#x}: {}", offset, e)
        });
        let path = match &record {
            Ok(record) => format!("{}{}{}", self.path, PATH_SEPARATOR, record.name),
            Err(_) => self.path.clone(),
        };
        HiveKey {
            hive: self.hive,
            offset,
            path,
            record,
        }
    }
}

impl<'a> TreeKey for HiveKey<'a> {
    type Value = HiveValue<'a>;

    fn path(&self) -> Result<String> {
        self.parsed()?;
        Ok(self.path.clone())
    }

    fn timestamp(&self) -> Result<DateTime<Utc>> {
        filetime_to_datetime(self.parsed()?.last_written)
    }

    fn values(&self) -> Result<Vec<HiveValue<'a>>> {
        let record = self.parsed()?;
        if !record.has_values() {
            return Ok(Vec::new());
        }

        let list_offset = record.value_list_offset;
        let list = self.hive.read_cell(list_offset)?;
        let count = record.value_count as usize;
        if list.len() < count * 4 {
            return Err(AnalyzerError::truncated(list_offset, count * 4, list.len()));
        }

        (0..count)
            .map(|i| {
                let offset = read_u32_le(list, i * 4)?;
                let record = self
                    .hive
                    .read_cell(offset)
                    .and_then(|cell| ValueRecord::parse(cell, offset))
                    .map_err(|e| format!("Value record at {:#x}: {}", offset, e));
                Ok(HiveValue::new(self.hive, offset, record))
            })
            .collect()
    }

    fn subkeys(&self) -> Result<Vec<HiveKey<'a>>> {
        let record = self.parsed()?;
        if !record.has_subkeys() {
            return Ok(Vec::new());
        }

        let mut offsets = Vec::with_capacity(record.subkey_count as usize);
        self.hive
            .collect_subkey_offsets(record.subkey_list_offset, 0, &mut offsets)?;

        Ok(offsets.into_iter().map(|offset| self.child(offset)).collect())
    }
}

/// A value inside an opened [`Hive`].
///
/// A value whose `vk` cell cannot be parsed keeps its slot in the value
/// list under a synthetic name; its payload read fails with the parse error.
pub struct HiveValue<'a> {
    hive: &'a Hive,
    name: String,
    record: std::result::Result<ValueRecord, String>,
}

impl<'a> HiveValue<'a> {
    fn new(hive: &'a Hive, offset: u32, record: std::result::Result<ValueRecord, String>) -> Self {
        let name = match &record {
            Ok(record) => record.name.clone(),
            Err(_) => format!("(unreadable value {:#x})", offset),
        };
        Self { hive, name, record }
    }
}

impl<'a> RawValue for HiveValue<'a> {
    fn name(&self) -> &str {
        &self.name
    }

    fn value_type(&self) -> ValueType {
        self.record
            .as_ref()
            .map_or(ValueType::None, |record| record.data_type)
    }

    fn data(&self) -> Result<Vec<u8>> {
        match &self.record {
            Ok(record) => self.hive.value_data(record),
            Err(e) => Err(AnalyzerError::from_source(e.as_str())),
        }
    }
}
