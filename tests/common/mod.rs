//! Builds synthetic hive images for the integration tests. The builder lays
//! out one or more hive bins and hands back hbin-relative cell offsets, so a
//! test can wire records together the same way a real hive does.

pub const TEST_FILETIME: u64 = 129782011451468083;
pub const TEST_TIMESTAMP_FORMATTED: &str = "2012-04-06T15:52:25.1468083Z";

const HBIN_HEADER_SIZE: usize = 0x20;
const HBIN_ALIGNMENT: usize = 0x1000;

pub struct HiveBuilder {
    closed_bins: Vec<Vec<u8>>,
    closed_size: usize,
    cells: Vec<u8>,
}

impl HiveBuilder {
    pub fn new() -> Self {
        HiveBuilder {
            closed_bins: Vec::new(),
            closed_size: 0,
            cells: Vec::new(),
        }
    }

    /// Appends an allocated cell wrapping `payload` and returns its offset
    /// relative to the start of the first hive bin.
    pub fn add_cell(&mut self, payload: &[u8]) -> u32 {
        let offset = self.closed_size + HBIN_HEADER_SIZE + self.cells.len();
        let mut total = payload.len() + 4;
        let padding = (8 - total % 8) % 8;
        total += padding;
        self.cells
            .extend_from_slice(&(-(total as i32)).to_le_bytes());
        self.cells.extend_from_slice(payload);
        self.cells.extend_from_slice(&vec![0u8; padding]);
        offset as u32
    }

    /// Closes the current hive bin and starts a new one.
    pub fn new_bin(&mut self) {
        let bin = Self::finish_bin(std::mem::take(&mut self.cells), self.closed_size);
        self.closed_size += bin.len();
        self.closed_bins.push(bin);
    }

    fn finish_bin(cells: Vec<u8>, offset_from_first: usize) -> Vec<u8> {
        let used = HBIN_HEADER_SIZE + cells.len();
        let size = (used + HBIN_ALIGNMENT - 1) / HBIN_ALIGNMENT * HBIN_ALIGNMENT;
        let mut bin = Vec::with_capacity(size);
        bin.extend_from_slice(b"hbin");
        bin.extend_from_slice(&(offset_from_first as u32).to_le_bytes());
        bin.extend_from_slice(&(size as u32).to_le_bytes());
        bin.extend_from_slice(&[0; 8]);
        bin.extend_from_slice(&TEST_FILETIME.to_le_bytes());
        bin.extend_from_slice(&[0; 4]);
        bin.extend_from_slice(&cells);
        // the unused remainder of the bin is one free (positive size) cell
        let remainder = size - used;
        if remainder > 0 {
            bin.extend_from_slice(&(remainder as i32).to_le_bytes());
            bin.resize(size, 0);
        }
        bin
    }

    /// Produces the complete hive image: base block, then every bin.
    pub fn build(mut self, root_cell_offset: u32) -> Vec<u8> {
        self.new_bin();
        let bins_size: usize = self.closed_bins.iter().map(Vec::len).sum();

        let mut image = Vec::with_capacity(0x1000 + bins_size);
        image.extend_from_slice(b"regf");
        image.extend_from_slice(&7u32.to_le_bytes()); // primary sequence number
        image.extend_from_slice(&7u32.to_le_bytes()); // secondary sequence number
        image.extend_from_slice(&TEST_FILETIME.to_le_bytes());
        image.extend_from_slice(&1u32.to_le_bytes()); // major version
        image.extend_from_slice(&5u32.to_le_bytes()); // minor version
        image.extend_from_slice(&0u32.to_le_bytes()); // file type: normal
        image.extend_from_slice(&1u32.to_le_bytes()); // format: direct memory load
        image.extend_from_slice(&root_cell_offset.to_le_bytes());
        image.extend_from_slice(&(bins_size as u32).to_le_bytes());
        image.extend_from_slice(&1u32.to_le_bytes()); // clustering factor
        let mut hive_name = [0u8; 64];
        for (i, b) in "SYNTHETIC".bytes().enumerate() {
            hive_name[i * 2] = b;
        }
        image.extend_from_slice(&hive_name);
        image.resize(0x1000, 0);
        for bin in &self.closed_bins {
            image.extend_from_slice(bin);
        }
        image
    }
}

pub struct NkSpec<'s> {
    pub name: &'s str,
    pub flags: u16,
    pub timestamp: u64,
    pub parent: u32,
    pub sub_key_count: u32,
    pub sub_key_list: u32,
    pub value_count: u32,
    pub value_list: u32,
    pub class_name_offset: u32,
    pub class_name_size: u16,
}

impl<'s> Default for NkSpec<'s> {
    fn default() -> Self {
        NkSpec {
            name: "",
            flags: 0x20, // KEY_COMP_NAME
            timestamp: TEST_FILETIME,
            parent: 0,
            sub_key_count: 0,
            sub_key_list: 0,
            value_count: 0,
            value_list: 0,
            class_name_offset: 0xFFFFFFFF,
            class_name_size: 0,
        }
    }
}

pub fn nk(spec: &NkSpec) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(b"nk");
    payload.extend_from_slice(&spec.flags.to_le_bytes());
    payload.extend_from_slice(&spec.timestamp.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes()); // access bits
    payload.extend_from_slice(&spec.parent.to_le_bytes());
    payload.extend_from_slice(&spec.sub_key_count.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes()); // volatile sub key count
    payload.extend_from_slice(&spec.sub_key_list.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes()); // volatile sub keys list
    payload.extend_from_slice(&spec.value_count.to_le_bytes());
    payload.extend_from_slice(&spec.value_list.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes()); // security key offset
    payload.extend_from_slice(&spec.class_name_offset.to_le_bytes());
    payload.extend_from_slice(&[0; 16]); // largest-* fields
    payload.extend_from_slice(&0u32.to_le_bytes()); // work var
    payload.extend_from_slice(&(spec.name.len() as u16).to_le_bytes());
    payload.extend_from_slice(&spec.class_name_size.to_le_bytes());
    payload.extend_from_slice(spec.name.as_bytes());
    payload
}

pub fn vk(name: &str, data_type: u32, data_size_raw: u32, data_offset: u32) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(b"vk");
    payload.extend_from_slice(&(name.len() as u16).to_le_bytes());
    payload.extend_from_slice(&data_size_raw.to_le_bytes());
    payload.extend_from_slice(&data_offset.to_le_bytes());
    payload.extend_from_slice(&data_type.to_le_bytes());
    payload.extend_from_slice(&1u16.to_le_bytes()); // ascii name
    payload.extend_from_slice(&0u16.to_le_bytes()); // padding
    payload.extend_from_slice(name.as_bytes());
    payload
}

pub fn li(offsets: &[u32]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(b"li");
    payload.extend_from_slice(&(offsets.len() as u16).to_le_bytes());
    for offset in offsets {
        payload.extend_from_slice(&offset.to_le_bytes());
    }
    payload
}

pub fn lh(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(b"lh");
    payload.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (offset, hash) in entries {
        payload.extend_from_slice(&offset.to_le_bytes());
        payload.extend_from_slice(&hash.to_le_bytes());
    }
    payload
}

pub fn lf(entries: &[(u32, &str)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(b"lf");
    payload.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (offset, hint) in entries {
        payload.extend_from_slice(&offset.to_le_bytes());
        let mut hint_bytes = [0u8; 4];
        for (i, b) in hint.bytes().take(4).enumerate() {
            hint_bytes[i] = b;
        }
        payload.extend_from_slice(&hint_bytes);
    }
    payload
}

pub fn ri(offsets: &[u32]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(b"ri");
    payload.extend_from_slice(&(offsets.len() as u16).to_le_bytes());
    for offset in offsets {
        payload.extend_from_slice(&offset.to_le_bytes());
    }
    payload
}

pub fn value_list(offsets: &[u32]) -> Vec<u8> {
    let mut payload = Vec::new();
    for offset in offsets {
        payload.extend_from_slice(&offset.to_le_bytes());
    }
    payload
}

pub fn db(segment_count: u16, segment_list_offset: u32) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(b"db");
    payload.extend_from_slice(&segment_count.to_le_bytes());
    payload.extend_from_slice(&segment_list_offset.to_le_bytes());
    payload
}

pub fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

/// Null-terminated UTF-16LE strings followed by the empty-string terminator.
pub fn multi_sz(entries: &[&str]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for entry in entries {
        bytes.extend_from_slice(&utf16le(entry));
        bytes.extend_from_slice(&[0, 0]);
    }
    bytes.extend_from_slice(&[0, 0]);
    bytes
}
