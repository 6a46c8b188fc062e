//! Key node (nk) records.

use crate::error::{AnalyzerError, Result};
use crate::utils::{read_ascii_string, read_u16_le, read_u32_le, read_u64_le, read_utf16_string};

/// Size of the fixed part of a key node, up to the name.
const KEY_NODE_FIXED_SIZE: usize = 0x4C;

/// Key name is stored in compressed (one byte per character) form.
const KEY_COMP_NAME: u16 = 0x0020;

/// The fields of an nk cell the walker needs.
#[derive(Debug, Clone)]
pub struct KeyRecord {
    /// Raw flags.
    pub flags: u16,
    /// Last write time (FILETIME).
    pub last_written: u64,
    /// Number of stable subkeys.
    pub subkey_count: u32,
    /// Cell offset of the subkey list.
    pub subkey_list_offset: u32,
    /// Number of values.
    pub value_count: u32,
    /// Cell offset of the value offset list.
    pub value_list_offset: u32,
    /// Key name.
    pub name: String,
}

impl KeyRecord {
    /// Parses a key node from cell data (without the size field).
    pub fn parse(data: &[u8], offset: u32) -> Result<Self> {
        if data.len() < KEY_NODE_FIXED_SIZE {
            return Err(AnalyzerError::truncated(offset, KEY_NODE_FIXED_SIZE, data.len()));
        }
        if &data[0..2] != b"nk" {
            return Err(AnalyzerError::invalid_signature(b"nk", &data[0..2]));
        }

        let flags = read_u16_le(data, 0x02)?;
        let name_length = read_u16_le(data, 0x48)? as usize;
        let name_end = KEY_NODE_FIXED_SIZE + name_length;
        let name_data = data
            .get(KEY_NODE_FIXED_SIZE..name_end)
            .ok_or_else(|| AnalyzerError::truncated(offset, name_end, data.len()))?;

        let name = if flags & KEY_COMP_NAME != 0 {
            read_ascii_string(name_data)
        } else {
            read_utf16_string(name_data, offset)?
        };

        Ok(KeyRecord {
            flags,
            last_written: read_u64_le(data, 0x04)?,
            subkey_count: read_u32_le(data, 0x14)?,
            subkey_list_offset: read_u32_le(data, 0x1C)?,
            value_count: read_u32_le(data, 0x24)?,
            value_list_offset: read_u32_le(data, 0x28)?,
            name,
        })
    }

    /// Returns true if the key has a usable subkey list.
    pub fn has_subkeys(&self) -> bool {
        self.subkey_count > 0 && !is_null_offset(self.subkey_list_offset)
    }

    /// Returns true if the key has a usable value list.
    pub fn has_values(&self) -> bool {
        self.value_count > 0 && !is_null_offset(self.value_list_offset)
    }
}

/// Cell offsets of 0 or 0xFFFFFFFF mean "no cell".
pub(crate) fn is_null_offset(offset: u32) -> bool {
    offset == 0 || offset == u32::MAX
}
