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

use bitflags::bitflags;
use enum_primitive_derive::Primitive;
use nom::{
    bytes::complete::{tag, take},
    number::complete::{le_i32, le_u16, le_u32},
    IResult,
};
use num_traits::FromPrimitive;
use serde::Serialize;

use crate::cell_value::{CellValue, ValueData};
use crate::err::Error;
use crate::file_info::FileInfo;
use crate::impl_serialize_for_bitflags;
use crate::log::{LogCode, Logs};
use crate::util;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Primitive, Serialize)]
#[repr(u32)]
#[allow(non_camel_case_types)]
pub enum CellKeyValueDataTypes {
    REG_NONE = 0x0000,
    REG_SZ = 0x0001,
    REG_EXPAND_SZ = 0x0002,
    REG_BIN = 0x0003,
    REG_DWORD = 0x0004,
    REG_DWORD_BIG_ENDIAN = 0x0005,
    REG_LINK = 0x0006,
    REG_MULTI_SZ = 0x0007,
    REG_RESOURCE_LIST = 0x0008,
    REG_FULL_RESOURCE_DESCRIPTOR = 0x0009,
    REG_RESOURCE_REQUIREMENTS_LIST = 0x000A,
    REG_QWORD = 0x000B,
    REG_FILETIME = 0x0010,
    REG_UNKNOWN = 999,
}

bitflags! {
    #[derive(Default)]
    pub struct CellKeyValueFlags: u16 {
        const VALUE_COMP_NAME_ASCII = 1; // Name is an ASCII string / Otherwise the name is an Unicode (UTF-16 little-endian) string
        const IS_TOMBSTONE          = 2; // Is a tombstone value (the flag is used starting from Insider Preview builds of Windows 10 "Redstone 1")
    }
}
impl_serialize_for_bitflags! {CellKeyValueFlags}

/// A `vk` record: one Registry value. Content is not read at parse time;
/// `value_data` routes and fetches the bytes on demand.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CellKeyValue<'a> {
    #[serde(skip)]
    file_info: &'a FileInfo,
    pub file_offset_absolute: usize,
    pub size: u32,
    pub value_name_size: u16, // If the value name size is 0 the value name is "(default)"
    pub data_size_raw: u32, // In bytes, can be 0 (value isn't set); the most significant bit has a special meaning
    pub data_offset_relative: u32,
    pub data_type: CellKeyValueDataTypes,
    pub data_type_raw: u32,
    pub flags: CellKeyValueFlags,
    pub value_name: String, // An empty string for an unnamed value; use `get_pretty_name()` for display
    pub allocated: bool,
    pub logs: Logs,
}

impl<'a> CellKeyValue<'a> {
    pub(crate) const SIGNATURE: &'static str = "vk";

    /// Values whose data exceeds one cell's practical capacity go through the
    /// big data ("db") indirection.
    pub(crate) const BIG_DATA_SIZE_THRESHOLD: u32 = 0x3FD8;
    /// Most significant bit of the raw data size: the data is resident in the
    /// data offset field itself.
    const DATA_IS_RESIDENT_MASK: u32 = 0x8000_0000;
    /// Below this true length the data lives in the data offset field (on-disk
    /// convention, not a heuristic).
    const SMALL_DATA_SIZE: u32 = 5;
    /// Position of the data offset field within the cell.
    const DATA_OFFSET_FIELD: usize = 12;

    /// Uses nom to parse a vk hive bin cell.
    pub fn from_bytes(
        file_info: &'a FileInfo,
        input: &'a [u8],
        file_offset_absolute: usize,
    ) -> IResult<&'a [u8], Self> {
        let start_len = input.len();
        let (input, size) = le_i32(input)?;
        let (input, _signature) = tag(Self::SIGNATURE)(input)?;
        let (input, value_name_size) = le_u16(input)?;
        let (input, data_size_raw) = le_u32(input)?;
        let (input, data_offset_relative) = le_u32(input)?;
        let (input, data_type_raw) = le_u32(input)?;
        let (input, flags_raw) = le_u16(input)?;
        let (input, _padding) = le_u16(input)?;
        let (input, value_name_bytes) = take(value_name_size)(input)?;

        let mut logs = Logs::default();
        let flags = CellKeyValueFlags::from_bits_truncate(flags_raw);
        if flags.bits() != flags_raw {
            logs.add(
                LogCode::WarningUnrecognizedBitflag,
                &format!("CellKeyValueFlags: {:#X}", flags_raw),
            );
        }

        // Windows Apps (UWP) hives pack composite types above the regular range
        const DEVPROP_MASK_TYPE: u32 = 0x0000_0FFF;
        let data_type = CellKeyValueDataTypes::from_u32(data_type_raw & DEVPROP_MASK_TYPE)
            .unwrap_or(CellKeyValueDataTypes::REG_UNKNOWN);

        let value_name = if value_name_size == 0 {
            String::new()
        } else {
            util::string_from_bytes(
                flags.contains(CellKeyValueFlags::VALUE_COMP_NAME_ASCII),
                value_name_bytes,
                value_name_size,
                &mut logs,
                "CellKeyValue::value_name",
            )
        };

        let size_abs = size.unsigned_abs();
        let (input, _slack) =
            util::parser_eat_remaining(input, size_abs as usize, start_len - input.len())?;

        Ok((
            input,
            CellKeyValue {
                file_info,
                file_offset_absolute,
                size: size_abs,
                value_name_size,
                data_size_raw,
                data_offset_relative,
                data_type,
                data_type_raw,
                flags,
                value_name,
                allocated: size < 0,
                logs,
            },
        ))
    }

    pub fn get_pretty_name(&self) -> String {
        util::get_pretty_name(&self.value_name)
    }

    /// The true byte length of the value data, with the resident sentinel bit
    /// stripped.
    pub fn data_length(&self) -> u32 {
        self.data_size_raw & !Self::DATA_IS_RESIDENT_MASK
    }

    /// True when the data lives inside this record's data offset field rather
    /// than in a separate cell.
    pub fn is_resident(&self) -> bool {
        self.data_size_raw & Self::DATA_IS_RESIDENT_MASK != 0
            || self.data_size_raw < Self::SMALL_DATA_SIZE
    }

    /// Routes and fetches the value bytes. Storage depends on the declared
    /// length: resident data is read from the record itself; data above the
    /// one-cell capacity is reassembled through a "db" record when one is
    /// present, else the pointed-to cell is taken as direct data; everything
    /// else is a direct cell read.
    pub fn value_data(&self) -> Result<ValueData, Error> {
        if self.data_size_raw > Self::DATA_IS_RESIDENT_MASK + Self::BIG_DATA_SIZE_THRESHOLD {
            return Err(Error::ValueTooLarge {
                size: self.data_size_raw,
            });
        }
        let length = self.data_length() as usize;
        let raw = match self.data_type {
            // the numeric field width is fixed regardless of the declared length
            CellKeyValueDataTypes::REG_DWORD | CellKeyValueDataTypes::REG_DWORD_BIG_ENDIAN => {
                self.resident_bytes(4)?
            }
            CellKeyValueDataTypes::REG_QWORD => self.cell_data_bytes(length)?,
            _ => {
                if self.is_resident() {
                    self.resident_bytes(length)?
                } else if self.data_size_raw > Self::BIG_DATA_SIZE_THRESHOLD {
                    let cell = self.file_info.cell_at(self.data_offset_relative)?;
                    match cell.big_data() {
                        Ok(big_data) => big_data.get_data(length)?,
                        // not a db record after all: the cell holds the data directly
                        Err(_) => Self::direct_bytes(cell.data()?, length, &cell)?,
                    }
                } else {
                    self.cell_data_bytes(length)?
                }
            }
        };
        Ok(ValueData::new(self.data_type, raw))
    }

    /// Decodes the value content, collecting conversion warnings.
    pub fn get_content(&self) -> (CellValue, Option<Logs>) {
        let mut warnings = Logs::default();
        let cell_value = match self.value_data() {
            Ok(value_data) => value_data.content(&mut warnings),
            Err(e) => {
                warnings.add(LogCode::WarningContent, &e);
                CellValue::Error
            }
        };
        (cell_value, warnings.get_option())
    }

    fn resident_bytes(&self, length: usize) -> Result<Vec<u8>, Error> {
        Ok(self
            .file_info
            .view_at(self.file_offset_absolute)
            .bytes(Self::DATA_OFFSET_FIELD, length)?
            .to_vec())
    }

    fn cell_data_bytes(&self, length: usize) -> Result<Vec<u8>, Error> {
        let cell = self.file_info.cell_at(self.data_offset_relative)?;
        Self::direct_bytes(cell.data()?, length, &cell)
    }

    fn direct_bytes(
        data: &[u8],
        length: usize,
        cell: &crate::cell::Cell<'_>,
    ) -> Result<Vec<u8>, Error> {
        data.get(0..length)
            .map(<[u8]>::to_vec)
            .ok_or(Error::InsufficientCellSize {
                offset: cell.file_offset_absolute,
                required: length,
                actual: data.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn vk_cell_bytes(
        name: &str,
        data_type: u32,
        data_size_raw: u32,
        data_offset_relative: u32,
    ) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(b"vk");
        payload.extend_from_slice(&(name.len() as u16).to_le_bytes());
        payload.extend_from_slice(&data_size_raw.to_le_bytes());
        payload.extend_from_slice(&data_offset_relative.to_le_bytes());
        payload.extend_from_slice(&data_type.to_le_bytes());
        payload.extend_from_slice(&1u16.to_le_bytes()); // ascii name
        payload.extend_from_slice(&0u16.to_le_bytes()); // padding
        payload.extend_from_slice(name.as_bytes());

        let mut cell = Vec::new();
        cell.extend_from_slice(&(-((payload.len() + 4) as i32)).to_le_bytes());
        cell.extend_from_slice(&payload);
        cell
    }

    #[test]
    fn test_parse_cell_key_value() {
        let file_info = FileInfo::from_vec(Vec::new());
        let cell = vk_cell_bytes("Flags", 4, 0x80000004, 0x2A);
        let (_, key_value) = CellKeyValue::from_bytes(&file_info, &cell, 0x1020).unwrap();

        assert_eq!("Flags", key_value.value_name);
        assert_eq!(CellKeyValueDataTypes::REG_DWORD, key_value.data_type);
        assert_eq!(CellKeyValueFlags::VALUE_COMP_NAME_ASCII, key_value.flags);
        assert_eq!(4, key_value.data_length());
        assert!(key_value.is_resident());
        assert!(key_value.allocated);
    }

    #[test]
    fn test_resident_dword_value() {
        let mut buffer = vec![0u8; 0x1020];
        let cell = vk_cell_bytes("Count", 4, 0x80000004, 42);
        buffer.extend_from_slice(&cell);
        let file_info = FileInfo::from_vec(buffer);
        let (_, key_value) =
            CellKeyValue::from_bytes(&file_info, &file_info.buffer[0x1020..], 0x1020).unwrap();

        let value_data = key_value.value_data().unwrap();
        assert_eq!(42, value_data.as_number().unwrap());
        let (content, warnings) = key_value.get_content();
        assert_eq!(CellValue::U32(42), content);
        assert_eq!(None, warnings);
    }

    #[test]
    fn test_non_resident_string_value() {
        let mut buffer = vec![0u8; 0x1020];
        // vk cell at relative 0x20, data cell at relative 0x60
        let vk = vk_cell_bytes("Version", 1, 8, 0x60);
        buffer.extend_from_slice(&vk);
        buffer.resize(0x1060, 0);
        buffer.extend_from_slice(&(-12i32).to_le_bytes());
        buffer.extend_from_slice(&[0x35, 0x00, 0x2E, 0x00, 0x30, 0x00, 0x00, 0x00]);
        let file_info = FileInfo::from_vec(buffer);

        let (_, key_value) =
            CellKeyValue::from_bytes(&file_info, &file_info.buffer[0x1020..], 0x1020).unwrap();
        assert!(!key_value.is_resident());
        assert_eq!(
            CellValue::String("5.0".to_string()),
            key_value.get_content().0
        );
    }

    #[test]
    fn test_value_too_large() {
        let file_info = FileInfo::from_vec(Vec::new());
        let cell = vk_cell_bytes("Huge", 3, 0x80004000, 0);
        let (_, key_value) = CellKeyValue::from_bytes(&file_info, &cell, 0x1020).unwrap();
        assert_eq!(
            Err(Error::ValueTooLarge { size: 0x80004000 }),
            key_value.value_data().map(|_| ())
        );
    }

    #[test]
    fn test_default_value_name() {
        let file_info = FileInfo::from_vec(Vec::new());
        let cell = vk_cell_bytes("", 1, 0x80000000, 0);
        let (_, key_value) = CellKeyValue::from_bytes(&file_info, &cell, 0x1020).unwrap();
        assert_eq!("", key_value.value_name);
        assert_eq!("(default)", key_value.get_pretty_name());
    }
}
