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

use nom::Finish;
use serde::Serialize;

use crate::cell_big_data::CellBigData;
use crate::cell_key_node::CellKeyNode;
use crate::cell_key_value::CellKeyValue;
use crate::err::Error;
use crate::file_info::FileInfo;
use crate::sub_key_list::{SubKeyList, SubKeyListKind};
use crate::sub_key_list_lf::SubKeyListLf;
use crate::sub_key_list_lh::SubKeyListLh;
use crate::sub_key_list_li::SubKeyListLi;
use crate::sub_key_list_ri::SubKeyListRi;
use crate::value_list::ValueList;

/// Byte span of the cell size field; the payload follows immediately.
const CELL_HEADER_SIZE: usize = 4;

/// A cell is a signed-length envelope around a typed record. The sign of the
/// size field encodes allocation status (negative = allocated, in use).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Cell<'a> {
    #[serde(skip)]
    file_info: &'a FileInfo,
    pub file_offset_absolute: usize,
    pub size_raw: i32,
}

impl<'a> Cell<'a> {
    pub fn at(file_info: &'a FileInfo, file_offset_absolute: usize) -> Result<Self, Error> {
        let size_raw = file_info.view_at(file_offset_absolute).read_i32(0)?;
        Ok(Cell {
            file_info,
            file_offset_absolute,
            size_raw,
        })
    }

    /// The total byte span of the cell (header + payload), always non-negative.
    pub fn length(&self) -> u32 {
        self.size_raw.unsigned_abs()
    }

    pub fn is_allocated(&self) -> bool {
        self.size_raw < 0
    }

    /// The payload span of this cell, bounds-checked against the buffer.
    pub fn data(&self) -> Result<&'a [u8], Error> {
        let length = self.length() as usize;
        if length < CELL_HEADER_SIZE {
            return Err(Error::InsufficientCellSize {
                offset: self.file_offset_absolute,
                required: CELL_HEADER_SIZE,
                actual: length,
            });
        }
        self.file_info
            .view_at(self.file_offset_absolute)
            .bytes(CELL_HEADER_SIZE, length - CELL_HEADER_SIZE)
    }

    /// The first two payload bytes, interpreted as the ASCII tag of the record inside.
    pub fn signature(&self) -> Result<String, Error> {
        let data = self.data()?;
        let sig = data.get(0..2).ok_or(Error::InsufficientCellSize {
            offset: self.file_offset_absolute,
            required: CELL_HEADER_SIZE + 2,
            actual: self.length() as usize,
        })?;
        if sig.iter().all(|b| b.is_ascii()) {
            Ok(String::from_utf8_lossy(sig).to_string())
        } else {
            Err(Error::UnexpectedSignature {
                expected: "an ASCII record tag",
                found: format!("{:02X?}", sig),
            })
        }
    }

    fn expect_signature(&self, expected: &'static str) -> Result<(), Error> {
        let found = self.signature()?;
        if found == expected {
            Ok(())
        } else {
            Err(Error::UnexpectedSignature { expected, found })
        }
    }

    /// The raw input for record parsers: the buffer from this cell's size field on.
    pub(crate) fn input(&self) -> &'a [u8] {
        &self.file_info.buffer[self.file_offset_absolute..]
    }

    pub fn key_node(&self) -> Result<CellKeyNode<'a>, Error> {
        self.expect_signature(CellKeyNode::SIGNATURE)?;
        let (_, key_node) =
            CellKeyNode::from_bytes(self.file_info, self.input(), self.file_offset_absolute)
                .finish()?;
        Ok(key_node)
    }

    pub fn key_value(&self) -> Result<CellKeyValue<'a>, Error> {
        self.expect_signature(CellKeyValue::SIGNATURE)?;
        let (_, key_value) =
            CellKeyValue::from_bytes(self.file_info, self.input(), self.file_offset_absolute)
                .finish()?;
        Ok(key_value)
    }

    /// Dispatches to the sub key list variant named by this cell's tag.
    pub fn sub_key_list(&self) -> Result<SubKeyList<'a>, Error> {
        let signature = self.signature()?;
        let kind = match signature.as_str() {
            SubKeyListLf::SIGNATURE => {
                SubKeyListKind::Lf(SubKeyListLf::from_bytes(self.input()).finish()?.1)
            }
            SubKeyListLh::SIGNATURE => {
                SubKeyListKind::Lh(SubKeyListLh::from_bytes(self.input()).finish()?.1)
            }
            SubKeyListLi::SIGNATURE => {
                SubKeyListKind::Li(SubKeyListLi::from_bytes(self.input()).finish()?.1)
            }
            SubKeyListRi::SIGNATURE => {
                SubKeyListKind::Ri(SubKeyListRi::from_bytes(self.input()).finish()?.1)
            }
            _ => return Err(Error::UnknownSubKeyListType { signature }),
        };
        Ok(SubKeyList::new(self.file_info, kind))
    }

    /// A value list has no tag of its own; the entry count comes from the owning key.
    pub fn value_list(&self, count: u32) -> Result<ValueList<'a>, Error> {
        ValueList::from_cell(self.file_info, self.data()?, count)
    }

    pub fn big_data(&self) -> Result<CellBigData<'a>, Error> {
        self.expect_signature(CellBigData::SIGNATURE)?;
        let (_, big_data) =
            CellBigData::from_bytes(self.file_info, self.input(), self.file_offset_absolute)
                .finish()?;
        Ok(big_data)
    }
}
