use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::byte_view::ByteView;
use crate::cell::Cell;
use crate::err::Error;

/// Absolute offset of the first hive bin; every internal cell pointer is relative to it.
pub const FIRST_HBIN_OFFSET_ABSOLUTE: usize = 0x1000;

/// Owns the hive image. Every record is a transient view into this buffer;
/// concurrent readers may share it freely since nothing here is ever written.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FileInfo {
    pub hbin_offset_absolute: usize,
    pub buffer: Vec<u8>,
}

impl FileInfo {
    pub fn from_path<T>(filename: T) -> Result<Self, Error>
    where
        T: AsRef<Path>,
    {
        Self::from_read_seek(std::fs::File::open(filename)?)
    }

    pub fn from_read_seek<T: ReadSeek>(mut data: T) -> Result<Self, Error> {
        let mut file_buffer = Vec::new();
        data.read_to_end(&mut file_buffer)?;
        Ok(Self::from_vec(file_buffer))
    }

    pub fn from_vec(buffer: Vec<u8>) -> Self {
        Self {
            hbin_offset_absolute: FIRST_HBIN_OFFSET_ABSOLUTE,
            buffer,
        }
    }

    /// A view rooted at an absolute offset into the hive image.
    pub(crate) fn view_at(&self, offset_absolute: usize) -> ByteView<'_> {
        ByteView::new(&self.buffer, offset_absolute)
    }

    /// Resolves a cell pointer relative to the start of the first hive bin.
    /// No validation beyond what `Cell::at` itself performs; callers own offset correctness,
    /// matching the format's internal pointer discipline.
    pub(crate) fn cell_at(&self, offset_relative: u32) -> Result<Cell<'_>, Error> {
        Cell::at(self, self.hbin_offset_absolute + offset_relative as usize)
    }
}

pub trait ReadSeek: Read + Seek {
    fn tell(&mut self) -> io::Result<u64> {
        self.seek(SeekFrom::Current(0))
    }
}

impl<T: Read + Seek> ReadSeek for T {}
