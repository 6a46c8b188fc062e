//! MRUListEx decoding for RecentDocs-style keys.
//!
//! An MRU key stores its entries in values named after their slot number
//! (`"0"`, `"1"`, ...) and their most-recent-first order in a binary
//! `MRUListEx` value: packed little-endian u32 slot numbers, terminated or
//! padded with `0xFFFFFFFF`.

use crate::error::Result;
use crate::report::{MruEntry, RecentDoc, MRU_ERROR_PREFIX};
use crate::tree::{RawValue, TreeKey};
use byteorder::{ByteOrder, LittleEndian};
use std::collections::HashMap;

/// Name of the value holding the slot order.
pub const MRU_LIST_VALUE: &str = "MRUListEx";

/// Unused slot / end of list marker.
pub const MRU_SENTINEL: u32 = 0xFFFF_FFFF;

/// Path fragment that marks a key for MRU decoding.
///
/// This is a substring match anywhere in the path, so unrelated keys whose
/// path merely contains the fragment are decoded too.
pub const RECENT_DOCS_MARKER: &str = "RecentDocs";

/// Returns true if a key at `path` should have its MRU list decoded.
pub fn is_recent_docs_path(path: &str) -> bool {
    path.contains(RECENT_DOCS_MARKER)
}

/// Decodes the MRU list of `key`.
///
/// Returns an empty list when the key has no `MRUListEx` value. Any failure
/// while reading the key's values is reported as a single
/// [`RecentDoc::Error`] item instead of an error.
pub fn decode<K: TreeKey>(key: &K) -> Vec<RecentDoc> {
    match decode_entries(key) {
        Ok(entries) => entries.into_iter().map(RecentDoc::Entry).collect(),
        Err(e) => vec![RecentDoc::Error(format!("{}{}", MRU_ERROR_PREFIX, e))],
    }
}

/// Decodes the MRU list of `key`, propagating read failures.
pub fn decode_entries<K: TreeKey>(key: &K) -> Result<Vec<MruEntry>> {
    let values = key.values()?;

    let Some(list) = values.iter().find(|v| v.name() == MRU_LIST_VALUE) else {
        return Ok(Vec::new());
    };

    // First value wins if a slot name is repeated
    let mut slots: HashMap<&str, &K::Value> = HashMap::with_capacity(values.len());
    for value in &values {
        slots.entry(value.name()).or_insert(value);
    }

    let mut entries = Vec::new();
    for index in slot_order(&list.data()?) {
        if let Some(slot) = slots.get(index.to_string().as_str()) {
            entries.push(MruEntry {
                index,
                label: decode_label(&slot.data()?),
            });
        }
    }
    Ok(entries)
}

/// Slot numbers in list order, without sentinels. A trailing partial
/// group of fewer than four bytes is ignored.
pub fn slot_order(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .map(LittleEndian::read_u32)
        .filter(|&index| index != MRU_SENTINEL)
        .collect()
}

/// Decodes a slot payload as UTF-16LE, dropping undecodable code units and
/// keeping only the text before the first null character.
pub fn decode_label(data: &[u8]) -> String {
    let units = data.chunks_exact(2).map(LittleEndian::read_u16);
    char::decode_utf16(units)
        .filter_map(|c| c.ok())
        .take_while(|&c| c != '\0')
        .collect()
}
