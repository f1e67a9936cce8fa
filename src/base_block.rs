use nom::{
    bytes::complete::tag,
    bytes::complete::take,
    number::complete::{le_u32, le_u64},
    Finish, IResult,
};

use chrono::{DateTime, Utc};
use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;
use serde::Serialize;

use crate::file_info::FileInfo;
use crate::hive_bin::{HiveBin, HiveBinHeader};
use crate::log::Logs;
use crate::util;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Primitive, Serialize)]
#[repr(u32)]
pub enum FileType {
    Normal = 0,
    TransactionLog = 1,
    Unknown = 0x0fffffff,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Primitive, Serialize)]
#[repr(u32)]
pub enum FileFormat {
    DirectMemoryLoad = 1,
    Unknown = 0x0fffffff,
}

/* Structure based upon:
    https://github.com/msuhanov/regf/blob/master/Windows%20registry%20file%20format%20specification.md#base-block
*/
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FileBaseBlock {
    pub primary_sequence_number: u32,
    pub secondary_sequence_number: u32,
    pub last_modification_date_and_time: DateTime<Utc>,
    pub major_version: u32,
    pub minor_version: u32,
    pub file_type: FileType,
    pub format: FileFormat,
    pub root_cell_offset_relative: u32, // In bytes, relative from the start of the hive bins data
    pub hive_bins_data_size: u32, // In bytes; the hive bins chain ends at this relative offset
    pub clustering_factor: u32, // Logical sector size of the underlying disk in bytes divided by 512
    pub filename: String, // UTF-16LE string (contains a partial file path to the primary file, or a file name of the primary file), used for debugging purposes
    pub checksum: u32,    // XOR-32 checksum of the previous 508 bytes
    pub logs: Logs,
}

impl FileBaseBlock {
    /// Uses nom to parse the registry file header.
    pub fn from_bytes(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, _signature) = tag("regf")(input)?;
        let (input, primary_sequence_number) = le_u32(input)?;
        let (input, secondary_sequence_number) = le_u32(input)?;
        let (input, last_modification_date_and_time) = le_u64(input)?;
        let (input, major_version) = le_u32(input)?;
        let (input, minor_version) = le_u32(input)?;
        let (input, file_type_bytes) = le_u32(input)?;
        let (input, format_bytes) = le_u32(input)?;
        let (input, root_cell_offset_relative) = le_u32(input)?;
        let (input, hive_bins_data_size) = le_u32(input)?;
        let (input, clustering_factor) = le_u32(input)?;
        let (input, filename_bytes) = take(64usize)(input)?;
        let (input, _reserved) = take(396usize)(input)?;
        let (input, checksum) = le_u32(input)?;

        let mut logs = Logs::default();
        let filename = util::from_utf16_le_string(filename_bytes, 64, &mut logs, "filename");
        let file_type = FileType::from_u32(file_type_bytes).unwrap_or(FileType::Unknown);
        let format = FileFormat::from_u32(format_bytes).unwrap_or(FileFormat::Unknown);

        Ok((
            input,
            FileBaseBlock {
                primary_sequence_number,
                secondary_sequence_number,
                last_modification_date_and_time: util::get_date_time_from_filetime(
                    last_modification_date_and_time,
                ),
                major_version,
                minor_version,
                file_type,
                format,
                root_cell_offset_relative,
                hive_bins_data_size,
                clustering_factor,
                filename,
                checksum,
                logs,
            },
        ))
    }

    /// A hive is clean when both sequence numbers match; mismatched numbers mean
    /// an update did not finish flushing.
    pub fn is_synchronized(&self) -> bool {
        self.primary_sequence_number == self.secondary_sequence_number
    }

    /// Returns a fresh lazy sequence over the hive bins chain. Each call restarts
    /// the walk from the first bin.
    pub fn hive_bins<'a>(&self, file_info: &'a FileInfo) -> HiveBins<'a> {
        HiveBins {
            file_info,
            next_offset_relative: 0,
            hive_bins_data_size: self.hive_bins_data_size,
            done: false,
        }
    }
}

/// Walks the hive bins chain. Each step re-derives the next bin from the previous
/// bin's forward offset; nothing is cached centrally. The walk stops at the end of
/// the hive bins data, at the end of the buffer, or at the first non-`hbin` magic.
pub struct HiveBins<'a> {
    file_info: &'a FileInfo,
    next_offset_relative: usize,
    hive_bins_data_size: u32,
    done: bool,
}

impl<'a> Iterator for HiveBins<'a> {
    type Item = HiveBin<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let offset_relative = self.next_offset_relative;
        let offset_absolute = self.file_info.hbin_offset_absolute + offset_relative;
        if offset_relative >= self.hive_bins_data_size as usize
            || offset_absolute >= self.file_info.buffer.len()
        {
            self.done = true;
            return None;
        }
        let header = match HiveBinHeader::from_bytes(&self.file_info.buffer[offset_absolute..])
            .finish()
        {
            Ok((_, header)) => header,
            Err(_) => {
                self.done = true;
                return None;
            }
        };
        if header.size == 0 {
            // a bin that doesn't advance the walk would loop it forever
            self.done = true;
            return None;
        }
        self.next_offset_relative = offset_relative + header.size as usize;
        Some(HiveBin::new(self.file_info, offset_absolute, header))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_block_bytes() -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(b"regf");
        buffer.extend_from_slice(&10407u32.to_le_bytes());
        buffer.extend_from_slice(&10407u32.to_le_bytes());
        buffer.extend_from_slice(&129782121007374460u64.to_le_bytes());
        buffer.extend_from_slice(&1u32.to_le_bytes()); // major
        buffer.extend_from_slice(&3u32.to_le_bytes()); // minor
        buffer.extend_from_slice(&0u32.to_le_bytes()); // file type
        buffer.extend_from_slice(&1u32.to_le_bytes()); // format
        buffer.extend_from_slice(&32u32.to_le_bytes()); // root cell offset
        buffer.extend_from_slice(&4096u32.to_le_bytes()); // hive bins data size
        buffer.extend_from_slice(&1u32.to_le_bytes()); // clustering factor
        let mut name = [0u8; 64];
        for (i, b) in "ntuser.dat".bytes().enumerate() {
            name[i * 2] = b;
        }
        buffer.extend_from_slice(&name);
        buffer.extend_from_slice(&[0; 396]);
        buffer.extend_from_slice(&0xdeadbeefu32.to_le_bytes());
        buffer
    }

    #[test]
    fn test_parse_base_block() {
        let buffer = base_block_bytes();
        let (_, base_block) = FileBaseBlock::from_bytes(&buffer).unwrap();

        let expected = FileBaseBlock {
            primary_sequence_number: 10407,
            secondary_sequence_number: 10407,
            last_modification_date_and_time: util::get_date_time_from_filetime(
                129782121007374460,
            ),
            major_version: 1,
            minor_version: 3,
            file_type: FileType::Normal,
            format: FileFormat::DirectMemoryLoad,
            root_cell_offset_relative: 32,
            hive_bins_data_size: 4096,
            clustering_factor: 1,
            filename: "ntuser.dat".to_string(),
            checksum: 0xdeadbeef,
            logs: Logs::default(),
        };
        assert_eq!(expected, base_block);
        assert!(base_block.is_synchronized());
    }

    #[test]
    fn test_parse_base_block_bad_magic() {
        let mut buffer = base_block_bytes();
        buffer[0] = b'x';
        assert!(FileBaseBlock::from_bytes(&buffer).is_err());
    }

    #[test]
    fn test_unsynchronized_sequence_numbers() {
        let mut buffer = base_block_bytes();
        buffer[4..8].copy_from_slice(&10408u32.to_le_bytes());
        let (_, base_block) = FileBaseBlock::from_bytes(&buffer).unwrap();
        assert!(!base_block.is_synchronized());
    }

    #[test]
    fn test_parse_base_block_truncated() {
        let buffer = base_block_bytes();
        assert!(FileBaseBlock::from_bytes(&buffer[..10]).is_err());
    }
}
