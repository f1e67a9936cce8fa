use nom::{
    bytes::complete::tag,
    number::complete::{le_u32, le_u64},
    IResult,
};
use serde::Serialize;

use crate::cell::Cell;
use crate::err::Error;
use crate::file_info::FileInfo;

/// Byte length of the `hbin` header; the first cell follows immediately.
pub const HIVE_BIN_HEADER_SIZE: usize = 0x20;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct HiveBinHeader {
    pub offset_from_first_hbin: u32, // In bytes, relative from the start of the hive bins data
    pub size: u32, // Size of the hive bin; also the relative offset of the next bin
    pub unknown1: u32, // 0 most of the time, can contain remnant data
    pub unknown2: u32, // 0 most of the time, can contain remnant data
    pub timestamp: u64, // Only the root (first) hive bin seems to contain a valid FILETIME
    pub unknown4: u32, // Contains number of bytes
}

impl HiveBinHeader {
    /// Uses nom to parse a hive bin header.
    pub fn from_bytes(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, _signature) = tag("hbin")(input)?;
        let (input, offset_from_first_hbin) = le_u32(input)?;
        let (input, size) = le_u32(input)?;
        let (input, unknown1) = le_u32(input)?;
        let (input, unknown2) = le_u32(input)?;
        let (input, timestamp) = le_u64(input)?;
        let (input, unknown4) = le_u32(input)?;

        Ok((
            input,
            HiveBinHeader {
                offset_from_first_hbin,
                size,
                unknown1,
                unknown2,
                timestamp,
                unknown4,
            },
        ))
    }
}

/// One allocation unit of the hive: the parsed header plus a view into the image.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct HiveBin<'a> {
    #[serde(skip)]
    file_info: &'a FileInfo,
    pub file_offset_absolute: usize,
    pub header: HiveBinHeader,
}

impl<'a> HiveBin<'a> {
    pub(crate) fn new(
        file_info: &'a FileInfo,
        file_offset_absolute: usize,
        header: HiveBinHeader,
    ) -> Self {
        HiveBin {
            file_info,
            file_offset_absolute,
            header,
        }
    }

    /// Returns a fresh lazy sequence over the cells of this bin.
    pub fn cells(&self) -> Cells<'a> {
        Cells {
            file_info: self.file_info,
            next_offset_absolute: self.file_offset_absolute + HIVE_BIN_HEADER_SIZE,
            end_offset_absolute: self.file_offset_absolute + self.header.size as usize,
            done: false,
        }
    }

    /// Constructs a cell at a caller-supplied offset relative to this bin's start.
    /// No validation beyond what the cell's own constructor performs.
    pub fn cell_at(&self, offset_relative: usize) -> Result<Cell<'a>, Error> {
        Cell::at(self.file_info, self.file_offset_absolute + offset_relative)
    }
}

/// Walks the cells of one hive bin. A cell with a declared size of 0 cannot
/// advance the walk; it is surfaced once as `InvalidCellSize` and the sequence
/// ends, so iteration always makes forward progress.
pub struct Cells<'a> {
    file_info: &'a FileInfo,
    next_offset_absolute: usize,
    end_offset_absolute: usize,
    done: bool,
}

impl<'a> Iterator for Cells<'a> {
    type Item = Result<Cell<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let offset_absolute = self.next_offset_absolute;
        if offset_absolute + 4 > self.end_offset_absolute {
            self.done = true;
            return None;
        }
        let cell = match Cell::at(self.file_info, offset_absolute) {
            Ok(cell) => cell,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        if cell.length() == 0 {
            self.done = true;
            return Some(Err(Error::InvalidCellSize {
                offset: offset_absolute,
            }));
        }
        self.next_offset_absolute = offset_absolute + cell.length() as usize;
        Some(Ok(cell))
    }
}
