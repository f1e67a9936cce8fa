/*
 * Copyright 2021 Aon Cyber Solutions
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::err::Error;
use crate::log::Logs;
use crate::util;

/// Bounds-checked accessor over a shared, read-only byte buffer plus a base offset.
/// All offsets passed to the read methods are relative to `base_offset`.
/// Many views may alias the same buffer; a view is never mutated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ByteView<'a> {
    buffer: &'a [u8],
    base_offset: usize,
}

impl<'a> ByteView<'a> {
    pub fn new(buffer: &'a [u8], base_offset: usize) -> Self {
        ByteView {
            buffer,
            base_offset,
        }
    }

    /// Translates a relative offset into an absolute offset from the start of the buffer.
    pub fn absolute(&self, offset: usize) -> usize {
        self.base_offset + offset
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Fetches `len` bytes at the relative offset, or `OutOfBounds`. Never reads adjacent memory.
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], Error> {
        let start = self.base_offset + offset;
        self.buffer
            .get(start..start + len)
            .ok_or(Error::OutOfBounds {
                offset: start,
                len,
                capacity: self.buffer.len(),
            })
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, Error> {
        Ok(self.bytes(offset, 1)?[0])
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16, Error> {
        let val = self.bytes(offset, 2)?;
        Ok(u16::from_le_bytes([val[0], val[1]]))
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32, Error> {
        let val = self.bytes(offset, 4)?;
        Ok(u32::from_le_bytes([val[0], val[1], val[2], val[3]]))
    }

    /// Big-endian read; used only for REG_DWORD_BIG_ENDIAN content.
    pub fn read_u32_be(&self, offset: usize) -> Result<u32, Error> {
        let val = self.bytes(offset, 4)?;
        Ok(u32::from_be_bytes([val[0], val[1], val[2], val[3]]))
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32, Error> {
        let val = self.bytes(offset, 4)?;
        Ok(i32::from_le_bytes([val[0], val[1], val[2], val[3]]))
    }

    pub fn read_u64(&self, offset: usize) -> Result<u64, Error> {
        let val = self.bytes(offset, 8)?;
        Ok(u64::from_le_bytes([
            val[0], val[1], val[2], val[3], val[4], val[5], val[6], val[7],
        ]))
    }

    /// Reads `len` bytes as an extended-ASCII string, truncated at the first null byte.
    pub fn read_fixed_ascii(&self, offset: usize, len: usize) -> Result<String, Error> {
        Ok(util::from_ascii(self.bytes(offset, len)?))
    }

    /// Reads `len` bytes as a UTF-16LE string, truncated at the first null character.
    pub fn read_fixed_utf16_le(
        &self,
        offset: usize,
        len: usize,
        logs: &mut Logs,
    ) -> Result<String, Error> {
        let slice = self.bytes(offset, len)?;
        Ok(util::from_utf16_le_string(
            slice,
            len,
            logs,
            "ByteView::read_fixed_utf16_le",
        ))
    }
}
