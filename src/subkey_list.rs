//! Subkey index cells (lf, lh, li, ri).

use crate::error::{AnalyzerError, Result};
use crate::utils::{read_u16_le, read_u32_le};

/// A parsed subkey index cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubkeyList {
    /// `lf`, `lh` or `li`: offsets of key nodes.
    Leaf(Vec<u32>),
    /// `ri`: offsets of further subkey lists.
    IndexRoot(Vec<u32>),
}

impl SubkeyList {
    /// Parses a subkey list from cell data (without the size field).
    pub fn parse(data: &[u8], offset: u32) -> Result<Self> {
        if data.len() < 4 {
            return Err(AnalyzerError::truncated(offset, 4, data.len()));
        }

        let count = read_u16_le(data, 0x02)? as usize;
        // lf/lh entries carry a 4-byte name hint after each offset
        let (stride, root) = match &data[0..2] {
            b"lf" | b"lh" => (8, false),
            b"li" => (4, false),
            b"ri" => (4, true),
            _ => {
                return Err(AnalyzerError::InvalidSubkeyList {
                    list_type: [data[0], data[1]],
                })
            }
        };

        let needed = 4 + count * stride;
        if data.len() < needed {
            return Err(AnalyzerError::truncated(offset, needed, data.len()));
        }

        let offsets = (0..count)
            .map(|i| read_u32_le(data, 4 + i * stride))
            .collect::<Result<Vec<_>>>()?;

        Ok(if root {
            SubkeyList::IndexRoot(offsets)
        } else {
            SubkeyList::Leaf(offsets)
        })
    }

    /// Offsets held by this list.
    pub fn offsets(&self) -> &[u32] {
        match self {
            SubkeyList::Leaf(offsets) | SubkeyList::IndexRoot(offsets) => offsets,
        }
    }
}
