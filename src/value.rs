//! Value (vk) records, REG_* types and the natural string form of payloads.

use crate::error::{AnalyzerError, Result};
use crate::utils::{read_ascii_string, read_u16_le, read_u32_le, read_utf16_string};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::fmt;

/// Size of the fixed part of a vk cell, up to the name.
const VALUE_KEY_FIXED_SIZE: usize = 0x14;

/// High bit of the data length: payload lives in the offset field.
const DATA_INLINE_FLAG: u32 = 0x8000_0000;

/// Value name is stored in compressed form.
const VALUE_COMP_NAME: u16 = 0x0001;

/// Registry value data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// REG_NONE
    None,
    /// REG_SZ
    String,
    /// REG_EXPAND_SZ
    ExpandString,
    /// REG_BINARY
    Binary,
    /// REG_DWORD (little-endian)
    Dword,
    /// REG_DWORD_BIG_ENDIAN
    DwordBigEndian,
    /// REG_LINK
    Link,
    /// REG_MULTI_SZ
    MultiString,
    /// REG_RESOURCE_LIST
    ResourceList,
    /// REG_FULL_RESOURCE_DESCRIPTOR
    FullResourceDescriptor,
    /// REG_RESOURCE_REQUIREMENTS_LIST
    ResourceRequirementsList,
    /// REG_QWORD (little-endian)
    Qword,
    /// Any other raw type value.
    Unknown(u32),
}

impl ValueType {
    /// Maps the on-disk type number to a value type.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => ValueType::None,
            1 => ValueType::String,
            2 => ValueType::ExpandString,
            3 => ValueType::Binary,
            4 => ValueType::Dword,
            5 => ValueType::DwordBigEndian,
            6 => ValueType::Link,
            7 => ValueType::MultiString,
            8 => ValueType::ResourceList,
            9 => ValueType::FullResourceDescriptor,
            10 => ValueType::ResourceRequirementsList,
            11 => ValueType::Qword,
            other => ValueType::Unknown(other),
        }
    }

    /// REG_* name of this type.
    pub fn name(&self) -> String {
        match self {
            ValueType::None => "REG_NONE".to_string(),
            ValueType::String => "REG_SZ".to_string(),
            ValueType::ExpandString => "REG_EXPAND_SZ".to_string(),
            ValueType::Binary => "REG_BINARY".to_string(),
            ValueType::Dword => "REG_DWORD".to_string(),
            ValueType::DwordBigEndian => "REG_DWORD_BIG_ENDIAN".to_string(),
            ValueType::Link => "REG_LINK".to_string(),
            ValueType::MultiString => "REG_MULTI_SZ".to_string(),
            ValueType::ResourceList => "REG_RESOURCE_LIST".to_string(),
            ValueType::FullResourceDescriptor => "REG_FULL_RESOURCE_DESCRIPTOR".to_string(),
            ValueType::ResourceRequirementsList => "REG_RESOURCE_REQUIREMENTS_LIST".to_string(),
            ValueType::Qword => "REG_QWORD".to_string(),
            ValueType::Unknown(value) => format!("REG_UNKNOWN_{:#010x}", value),
        }
    }
}

/// The fields of a vk cell needed to locate and type its payload.
#[derive(Debug, Clone)]
pub struct ValueRecord {
    /// Value name; empty for the default value.
    pub name: String,
    /// Payload length in bytes.
    pub data_length: u32,
    /// Cell offset of the payload, or the payload itself when inline.
    pub data_offset: u32,
    /// Payload type.
    pub data_type: ValueType,
    inline: bool,
}

impl ValueRecord {
    /// Parses a value key from cell data (without the size field).
    pub fn parse(data: &[u8], offset: u32) -> Result<Self> {
        if data.len() < VALUE_KEY_FIXED_SIZE {
            return Err(AnalyzerError::truncated(offset, VALUE_KEY_FIXED_SIZE, data.len()));
        }
        if &data[0..2] != b"vk" {
            return Err(AnalyzerError::invalid_signature(b"vk", &data[0..2]));
        }

        let name_length = read_u16_le(data, 0x02)? as usize;
        let raw_length = read_u32_le(data, 0x04)?;
        let flags = read_u16_le(data, 0x10)?;

        let name_end = VALUE_KEY_FIXED_SIZE + name_length;
        let name_data = data
            .get(VALUE_KEY_FIXED_SIZE..name_end)
            .ok_or_else(|| AnalyzerError::truncated(offset, name_end, data.len()))?;
        let name = if flags & VALUE_COMP_NAME != 0 {
            read_ascii_string(name_data)
        } else {
            read_utf16_string(name_data, offset)?
        };

        Ok(ValueRecord {
            name,
            data_length: raw_length & !DATA_INLINE_FLAG,
            data_offset: read_u32_le(data, 0x08)?,
            data_type: ValueType::from_u32(read_u32_le(data, 0x0C)?),
            inline: raw_length & DATA_INLINE_FLAG != 0,
        })
    }

    /// Returns the payload when it is stored inside the record, or `None`
    /// when it has to be read from another cell.
    pub fn inline_data(&self) -> Option<Vec<u8>> {
        if !self.inline {
            return None;
        }
        let len = (self.data_length as usize).min(4);
        Some(self.data_offset.to_le_bytes()[..len].to_vec())
    }
}

/// A payload interpreted according to its REG_* type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueData {
    /// Zero-length payload.
    Empty,
    /// REG_SZ, REG_EXPAND_SZ or REG_LINK text.
    Text(String),
    /// REG_MULTI_SZ strings.
    MultiText(Vec<String>),
    /// Integer types.
    Number(u64),
    /// Types without a textual interpretation.
    Bytes(Vec<u8>),
}

impl ValueData {
    /// Interprets `data` according to `value_type`.
    ///
    /// Integer types require a payload of exactly their width; text types
    /// require well-formed UTF-16LE.
    pub fn parse(data: &[u8], value_type: ValueType) -> Result<Self> {
        if data.is_empty() {
            return Ok(ValueData::Empty);
        }

        let exact = |expected: usize| {
            if data.len() == expected {
                Ok(())
            } else {
                Err(AnalyzerError::PayloadSize {
                    type_name: value_type.name(),
                    expected,
                    actual: data.len(),
                })
            }
        };

        match value_type {
            ValueType::String | ValueType::ExpandString | ValueType::Link => {
                Ok(ValueData::Text(read_utf16_string(data, 0)?))
            }
            ValueType::MultiString => {
                let joined = read_utf16_string(data, 0)?;
                Ok(ValueData::MultiText(
                    joined
                        .split('\0')
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect(),
                ))
            }
            ValueType::Dword => {
                exact(4)?;
                Ok(ValueData::Number(u64::from(LittleEndian::read_u32(data))))
            }
            ValueType::DwordBigEndian => {
                exact(4)?;
                Ok(ValueData::Number(u64::from(BigEndian::read_u32(data))))
            }
            ValueType::Qword => {
                exact(8)?;
                Ok(ValueData::Number(LittleEndian::read_u64(data)))
            }
            _ => Ok(ValueData::Bytes(data.to_vec())),
        }
    }
}

impl fmt::Display for ValueData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueData::Empty => Ok(()),
            ValueData::Text(s) => f.write_str(s),
            ValueData::MultiText(strings) => f.write_str(&strings.join(", ")),
            ValueData::Number(n) => write!(f, "{}", n),
            ValueData::Bytes(bytes) => f.write_str(&hex::encode(bytes)),
        }
    }
}
