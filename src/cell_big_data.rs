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

use nom::{
    bytes::complete::tag,
    multi::count,
    number::complete::{le_i32, le_u16, le_u32},
    Finish, IResult,
};
use serde::Serialize;

use crate::cell_key_value::CellKeyValue;
use crate::err::Error;
use crate::file_info::FileInfo;

/* List of data segments. Big data is used to reference data larger than 16344 bytes
(when the minor version field of the base block is greater than 3). */
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CellBigData<'a> {
    #[serde(skip)]
    file_info: &'a FileInfo,
    pub file_offset_absolute: usize,
    pub size: u32,
    pub count: u16,
    pub segment_list_offset_relative: u32, // In bytes, relative from the start of the hive bins data
}

impl<'a> CellBigData<'a> {
    pub(crate) const SIGNATURE: &'static str = "db";

    /// Uses nom to parse a big data (db) hive bin cell.
    pub fn from_bytes(
        file_info: &'a FileInfo,
        input: &'a [u8],
        file_offset_absolute: usize,
    ) -> IResult<&'a [u8], Self> {
        let (input, size) = le_i32(input)?;
        let (input, _signature) = tag(Self::SIGNATURE)(input)?;
        let (input, count) = le_u16(input)?;
        let (input, segment_list_offset_relative) = le_u32(input)?;

        Ok((
            input,
            CellBigData {
                file_info,
                file_offset_absolute,
                size: size.unsigned_abs(),
                count,
                segment_list_offset_relative,
            },
        ))
    }

    /// Offsets of the direct data segment cells, read from the segment list cell.
    pub(crate) fn segment_offsets(&self) -> Result<Vec<u32>, Error> {
        let data = self
            .file_info
            .cell_at(self.segment_list_offset_relative)?
            .data()?;
        let parsed: IResult<&[u8], Vec<u32>> = count(le_u32, self.count as usize)(data);
        let (_, offsets) = parsed.finish()?;
        Ok(offsets)
    }

    /// Reassembles the value bytes by concatenating each segment cell's
    /// contribution, capped per segment at the big data block size and at the
    /// remaining requested length.
    pub fn get_data(&self, total_length: usize) -> Result<Vec<u8>, Error> {
        let mut data = Vec::with_capacity(total_length);
        let mut remaining = total_length;
        for segment_offset in self.segment_offsets()? {
            if remaining == 0 {
                break;
            }
            let segment = self.file_info.cell_at(segment_offset)?.data()?;
            let size_to_read = remaining
                .min(CellKeyValue::BIG_DATA_SIZE_THRESHOLD as usize)
                .min(segment.len());
            data.extend_from_slice(&segment[..size_to_read]);
            remaining -= size_to_read;
        }
        Ok(data)
    }
}
