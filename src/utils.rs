//! Little-endian field access, string decoding and FILETIME conversion
//! shared by the hive reader.

use crate::error::{AnalyzerError, Result};
use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, Utc};
use encoding_rs::UTF_16LE;

/// Offset where hive bins start (after the base block).
pub const HBIN_START_OFFSET: u32 = 0x1000;

/// Seconds between 1601-01-01 (FILETIME epoch) and 1970-01-01.
const FILETIME_UNIX_DIFF: i64 = 11_644_473_600;

/// FILETIME ticks per second (100 ns resolution).
const FILETIME_TICKS_PER_SECOND: u64 = 10_000_000;

fn field(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    data.get(offset..offset + len).ok_or_else(|| {
        AnalyzerError::truncated(offset as u32, len, data.len().saturating_sub(offset))
    })
}

/// Reads a little-endian u16 at `offset`.
pub fn read_u16_le(data: &[u8], offset: usize) -> Result<u16> {
    Ok(LittleEndian::read_u16(field(data, offset, 2)?))
}

/// Reads a little-endian u32 at `offset`.
pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    Ok(LittleEndian::read_u32(field(data, offset, 4)?))
}

/// Reads a little-endian i32 at `offset`.
pub fn read_i32_le(data: &[u8], offset: usize) -> Result<i32> {
    Ok(LittleEndian::read_i32(field(data, offset, 4)?))
}

/// Reads a little-endian u64 at `offset`.
pub fn read_u64_le(data: &[u8], offset: usize) -> Result<u64> {
    Ok(LittleEndian::read_u64(field(data, offset, 8)?))
}

/// Decodes a compressed (Latin-1 style) key or value name.
pub fn read_ascii_string(data: &[u8]) -> String {
    data.iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

/// Decodes strict UTF-16LE text and trims trailing null terminators.
///
/// Odd-length input or unpaired surrogates are reported as
/// [`AnalyzerError::InvalidUtf16`].
pub fn read_utf16_string(data: &[u8], offset: u32) -> Result<String> {
    if data.is_empty() {
        return Ok(String::new());
    }
    if data.len() % 2 != 0 {
        return Err(AnalyzerError::InvalidUtf16 { offset });
    }

    let (decoded, had_errors) = UTF_16LE.decode_without_bom_handling(data);
    if had_errors {
        return Err(AnalyzerError::InvalidUtf16 { offset });
    }

    Ok(decoded.trim_end_matches('\0').to_string())
}

/// Converts a Windows FILETIME into a UTC instant.
pub fn filetime_to_datetime(filetime: u64) -> Result<DateTime<Utc>> {
    let seconds = (filetime / FILETIME_TICKS_PER_SECOND) as i64 - FILETIME_UNIX_DIFF;
    let nanos = ((filetime % FILETIME_TICKS_PER_SECOND) * 100) as u32;

    DateTime::from_timestamp(seconds, nanos).ok_or(AnalyzerError::InvalidTimestamp(filetime))
}

/// Converts a cell offset (relative to the first hbin) to an absolute one.
#[inline]
pub fn cell_offset_to_absolute(cell_offset: u32) -> Result<usize> {
    cell_offset
        .checked_add(HBIN_START_OFFSET)
        .map(|abs| abs as usize)
        .ok_or_else(|| AnalyzerError::invalid_offset(cell_offset, 0))
}

/// XOR checksum over the first 508 bytes of a base block.
pub fn calculate_checksum(data: &[u8]) -> u32 {
    data.chunks_exact(4)
        .take(0x1FC / 4)
        .fold(0u32, |acc, dword| acc ^ LittleEndian::read_u32(dword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_read_integers() {
        let data = [0x01, 0x02, 0x03, 0x04, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(read_u16_le(&data, 0).unwrap(), 0x0201);
        assert_eq!(read_u32_le(&data, 0).unwrap(), 0x04030201);
        assert_eq!(read_i32_le(&data, 4).unwrap(), -1);
        assert_eq!(read_u64_le(&data, 0).unwrap(), 0xFFFF_FFFF_0403_0201);
        assert!(matches!(
            read_u32_le(&data, 6),
            Err(AnalyzerError::TruncatedData { expected: 4, actual: 2, .. })
        ));
    }

    #[test]
    fn test_ascii_stops_at_null() {
        assert_eq!(read_ascii_string(b"Software\0\0"), "Software");
        assert_eq!(read_ascii_string(b"RecentDocs"), "RecentDocs");
    }

    #[test]
    fn test_utf16_string() {
        let data: Vec<u8> = "Caf\u{e9}\0"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(read_utf16_string(&data, 0).unwrap(), "Caf\u{e9}");
        assert!(read_utf16_string(&data[..3], 0x20).is_err());
        // Lone high surrogate
        assert!(read_utf16_string(&[0x00, 0xD8], 0).is_err());
    }

    #[test]
    fn test_filetime_conversion() {
        // 2021-03-04 05:06:07.5 UTC
        let instant = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap()
            + chrono::Duration::milliseconds(500);
        assert_eq!(filetime_to_datetime(132_593_079_675_000_000).unwrap(), instant);

        assert_eq!(
            filetime_to_datetime(116_444_736_000_000_000).unwrap(),
            Utc.timestamp_opt(0, 0).unwrap()
        );
    }

    #[test]
    fn test_offset_conversion() {
        assert_eq!(cell_offset_to_absolute(0).unwrap(), 0x1000);
        assert_eq!(cell_offset_to_absolute(0x20).unwrap(), 0x1020);
        assert!(cell_offset_to_absolute(u32::MAX).is_err());
    }

    #[test]
    fn test_checksum_ignores_tail() {
        let mut block = vec![0u8; 0x1000];
        block[0..4].copy_from_slice(&0x1234_5678u32.to_le_bytes());
        block[4..8].copy_from_slice(&0x0000_00FFu32.to_le_bytes());
        block[0x1FC..0x200].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(calculate_checksum(&block), 0x1234_5687);
    }
}
