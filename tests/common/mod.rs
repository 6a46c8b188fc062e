//! Builds small regf images in memory for integration tests.

#![allow(dead_code)]

use hive_report::utils::calculate_checksum;

pub const REG_SZ: u32 = 1;
pub const REG_BINARY: u32 = 3;
pub const REG_DWORD: u32 = 4;
pub const REG_MULTI_SZ: u32 = 7;

/// 2021-01-01T00:00:00Z
pub const FILETIME_2021: u64 = 132_539_328_000_000_000;

const HBIN_HEADER_SIZE: usize = 0x20;
const BIG_DATA_SEGMENT: usize = 16344;

pub struct TestValue {
    pub name: String,
    pub data_type: u32,
    pub data: Vec<u8>,
    /// Declared length, when it should differ from `data.len()`.
    pub length: Option<u32>,
    /// Writes the record with a broken `vk` signature.
    pub corrupt: bool,
}

pub struct TestKey {
    pub name: String,
    pub filetime: u64,
    pub values: Vec<TestValue>,
    pub subkeys: Vec<TestKey>,
    pub corrupt_subkey_list: bool,
    /// Writes the key node with a broken `nk` signature.
    pub corrupt_node: bool,
}

impl TestKey {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            filetime: FILETIME_2021,
            values: Vec::new(),
            subkeys: Vec::new(),
            corrupt_subkey_list: false,
            corrupt_node: false,
        }
    }

    pub fn value(mut self, name: &str, data_type: u32, data: impl Into<Vec<u8>>) -> Self {
        self.values.push(TestValue {
            name: name.to_string(),
            data_type,
            data: data.into(),
            length: None,
            corrupt: false,
        });
        self
    }

    /// Adds a value whose record cannot be parsed.
    pub fn corrupt_value(mut self, name: &str) -> Self {
        self.values.push(TestValue {
            name: name.to_string(),
            data_type: REG_DWORD,
            data: 7u32.to_le_bytes().to_vec(),
            length: None,
            corrupt: true,
        });
        self
    }

    pub fn string(self, name: &str, text: &str) -> Self {
        self.value(name, REG_SZ, utf16z(text))
    }

    pub fn dword(self, name: &str, n: u32) -> Self {
        self.value(name, REG_DWORD, n.to_le_bytes())
    }

    pub fn subkey(mut self, key: TestKey) -> Self {
        self.subkeys.push(key);
        self
    }

    pub fn corrupt_subkeys(mut self) -> Self {
        self.corrupt_subkey_list = true;
        self
    }

    pub fn corrupt(mut self) -> Self {
        self.corrupt_node = true;
        self
    }
}

pub fn utf16z(text: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
    bytes.extend_from_slice(&[0, 0]);
    bytes
}

pub fn mru_list(indices: &[u32]) -> Vec<u8> {
    indices.iter().flat_map(|i| i.to_le_bytes()).collect()
}

/// Serializes `root` into a complete hive image.
pub fn build_hive(root: &TestKey) -> Vec<u8> {
    let mut bins = HiveBins::new();
    let root_offset = bins.write_key(root, true);
    bins.finish(root_offset)
}

struct HiveBins {
    data: Vec<u8>,
}

impl HiveBins {
    fn new() -> Self {
        let mut data = vec![0u8; HBIN_HEADER_SIZE];
        data[0..4].copy_from_slice(b"hbin");
        Self { data }
    }

    /// Appends an allocated cell and returns its offset.
    fn cell(&mut self, payload: &[u8]) -> u32 {
        let offset = self.data.len() as u32;
        let size = (4 + payload.len() + 7) & !7;
        self.data.extend_from_slice(&(-(size as i32)).to_le_bytes());
        self.data.extend_from_slice(payload);
        self.data.resize(offset as usize + size, 0);
        offset
    }

    fn write_value(&mut self, value: &TestValue) -> u32 {
        let length = value.length.unwrap_or(value.data.len() as u32);
        let (raw_length, data_offset) = if value.data.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..value.data.len()].copy_from_slice(&value.data);
            (length | 0x8000_0000, u32::from_le_bytes(inline))
        } else if value.data.len() > BIG_DATA_SEGMENT {
            (length, self.write_big_data(&value.data))
        } else {
            (length, self.cell(&value.data))
        };

        let mut vk = vec![0u8; 0x14];
        vk[0..2].copy_from_slice(if value.corrupt { b"xk" } else { b"vk" });
        vk[0x02..0x04].copy_from_slice(&(value.name.len() as u16).to_le_bytes());
        vk[0x04..0x08].copy_from_slice(&raw_length.to_le_bytes());
        vk[0x08..0x0C].copy_from_slice(&data_offset.to_le_bytes());
        vk[0x0C..0x10].copy_from_slice(&value.data_type.to_le_bytes());
        vk[0x10..0x12].copy_from_slice(&1u16.to_le_bytes());
        vk.extend_from_slice(value.name.as_bytes());
        self.cell(&vk)
    }

    fn write_big_data(&mut self, data: &[u8]) -> u32 {
        let segments: Vec<u32> = data
            .chunks(BIG_DATA_SEGMENT)
            .map(|chunk| self.cell(chunk))
            .collect();
        let list: Vec<u8> = segments.iter().flat_map(|s| s.to_le_bytes()).collect();
        let list_offset = self.cell(&list);

        let mut db = vec![0u8; 8];
        db[0..2].copy_from_slice(b"db");
        db[0x02..0x04].copy_from_slice(&(segments.len() as u16).to_le_bytes());
        db[0x04..0x08].copy_from_slice(&list_offset.to_le_bytes());
        self.cell(&db)
    }

    fn write_key(&mut self, key: &TestKey, root: bool) -> u32 {
        let children: Vec<u32> = key.subkeys.iter().map(|k| self.write_key(k, false)).collect();

        let (subkey_count, subkey_list) = if key.corrupt_subkey_list {
            (1, self.cell(b"zz\x01\x00\x00\x00\x00\x00"))
        } else if children.is_empty() {
            (0, u32::MAX)
        } else {
            let mut lf = Vec::with_capacity(4 + children.len() * 8);
            lf.extend_from_slice(b"lf");
            lf.extend_from_slice(&(children.len() as u16).to_le_bytes());
            for child in &children {
                lf.extend_from_slice(&child.to_le_bytes());
                lf.extend_from_slice(&[0; 4]);
            }
            (children.len() as u32, self.cell(&lf))
        };

        let value_offsets: Vec<u32> = key.values.iter().map(|v| self.write_value(v)).collect();
        let value_list = if value_offsets.is_empty() {
            u32::MAX
        } else {
            let list: Vec<u8> = value_offsets.iter().flat_map(|o| o.to_le_bytes()).collect();
            self.cell(&list)
        };

        let flags: u16 = 0x0020 | if root { 0x0004 } else { 0 };
        let mut nk = vec![0u8; 0x4C];
        nk[0..2].copy_from_slice(if key.corrupt_node { b"xk" } else { b"nk" });
        nk[0x02..0x04].copy_from_slice(&flags.to_le_bytes());
        nk[0x04..0x0C].copy_from_slice(&key.filetime.to_le_bytes());
        nk[0x14..0x18].copy_from_slice(&subkey_count.to_le_bytes());
        nk[0x1C..0x20].copy_from_slice(&subkey_list.to_le_bytes());
        nk[0x24..0x28].copy_from_slice(&(key.values.len() as u32).to_le_bytes());
        nk[0x28..0x2C].copy_from_slice(&value_list.to_le_bytes());
        nk[0x48..0x4A].copy_from_slice(&(key.name.len() as u16).to_le_bytes());
        nk.extend_from_slice(key.name.as_bytes());
        self.cell(&nk)
    }

    fn finish(mut self, root_offset: u32) -> Vec<u8> {
        let bins_len = (self.data.len() + 0xFFF) & !0xFFF;
        self.data.resize(bins_len, 0);
        self.data[0x08..0x0C].copy_from_slice(&(bins_len as u32).to_le_bytes());

        let mut base = vec![0u8; 0x1000];
        base[0..4].copy_from_slice(b"regf");
        base[0x04..0x08].copy_from_slice(&1u32.to_le_bytes());
        base[0x08..0x0C].copy_from_slice(&1u32.to_le_bytes());
        base[0x0C..0x14].copy_from_slice(&FILETIME_2021.to_le_bytes());
        base[0x14..0x18].copy_from_slice(&1u32.to_le_bytes());
        base[0x18..0x1C].copy_from_slice(&5u32.to_le_bytes());
        base[0x24..0x28].copy_from_slice(&root_offset.to_le_bytes());
        base[0x28..0x2C].copy_from_slice(&(bins_len as u32).to_le_bytes());
        let checksum = calculate_checksum(&base);
        base[0x1FC..0x200].copy_from_slice(&checksum.to_le_bytes());

        base.extend_from_slice(&self.data);
        base
    }
}

/// A user hive with an Explorer RecentDocs key, an extension subkey and a
/// few malformed entries.
pub fn sample_user_hive() -> TestKey {
    let recent_docs = TestKey::new("RecentDocs")
        .value("0", REG_BINARY, utf16z("budget.xlsx"))
        .value("1", REG_BINARY, {
            let mut slot = utf16z("notes.txt");
            slot.extend_from_slice(&[0x4E, 0x00, 0x32, 0x00]);
            slot.extend(utf16z("notes.lnk"));
            slot
        })
        .value("MRUListEx", REG_BINARY, mru_list(&[1, 0, 0xFFFF_FFFF]))
        .subkey(
            TestKey::new(".txt")
                .value("0", REG_BINARY, utf16z("notes.txt"))
                .value("MRUListEx", REG_BINARY, mru_list(&[0, 7, 0xFFFF_FFFF])),
        );

    let explorer = TestKey::new("Explorer").subkey(recent_docs);

    let settings = TestKey::new("Settings")
        .string("", "default text")
        .dword("Count", 42)
        .value("Short", REG_DWORD, [1, 0, 0])
        .value("Blob", REG_BINARY, [0xDE, 0xAD, 0xBE, 0xEF, 0x01])
        .value("List", REG_MULTI_SZ, {
            let mut data = utf16z("one");
            data.extend(utf16z("two"));
            data.extend_from_slice(&[0, 0]);
            data
        });

    let large = TestKey::new("Large").value("Payload", REG_BINARY, vec![0xAB; 20_000]);

    TestKey::new("ROOT")
        .subkey(TestKey::new("Software").subkey(explorer).subkey(settings))
        .subkey(TestKey::new("Broken").corrupt_subkeys())
        .subkey(large)
}
