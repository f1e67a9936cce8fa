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
use chrono::{DateTime, Utc};
use nom::{
    bytes::complete::{tag, take},
    number::complete::{le_i32, le_u16, le_u32, le_u64},
    IResult,
};
use serde::Serialize;

use crate::err::Error;
use crate::file_info::FileInfo;
use crate::impl_serialize_for_bitflags;
use crate::log::{LogCode, Logs};
use crate::sub_key_list::SubKeyList;
use crate::util;
use crate::value_list::ValueList;

/// The flags word of a root key; this is the literal on-disk convention
/// (KEY_HIVE_ENTRY | KEY_NO_DELETE | KEY_COMP_NAME) and is matched exactly.
const ROOT_KEY_FLAGS: u16 = 0x2C;

/// Raw count value meaning "none" (documented hive convention).
const NO_ENTRIES: u32 = 0xFFFF_FFFF;

/// Class name pointer sentinel for "absent".
const NO_CLASS_NAME: u32 = 0xFFFF_FFFF;

/// An `nk` record: one Registry key. The struct is a single immutable snapshot;
/// navigation to the parent, subkeys, and values re-resolves pointers through
/// the shared buffer rather than owning child records.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CellKeyNode<'a> {
    #[serde(skip)]
    file_info: &'a FileInfo,
    pub file_offset_absolute: usize,
    pub size: u32,
    pub flags_raw: u16,
    pub flags: KeyNodeFlags,
    pub last_key_written_date_and_time: DateTime<Utc>,
    pub access_bits: AccessFlags, // Bit mask (this field is used as of Windows 8 and Windows Server 2012; in previous versions of Windows, this field is reserved and called Spare)
    pub parent_key_offset_relative: u32, // Offset of a parent key node in bytes, relative from the start of the hive bins data (this field has no meaning on a disk for a root key node)
    pub number_of_sub_keys: u32,
    pub sub_keys_list_offset_relative: u32, // In bytes, relative from the start of the hive bins data (also, this field may point to an Index root)
    pub number_of_key_values: u32,
    pub key_values_list_offset_relative: u32,
    pub security_key_offset_relative: u32,
    pub class_name_offset_relative: u32, // Contains 0xFFFFFFFF if the key has no class name
    pub class_name_size: u16,
    pub key_name: String, // ASCII (extended) string or UTF-16LE string
    pub allocated: bool,
    pub logs: Logs,
}

impl<'a> CellKeyNode<'a> {
    pub(crate) const SIGNATURE: &'static str = "nk";

    /// Uses nom to parse an nk hive bin cell.
    pub fn from_bytes(
        file_info: &'a FileInfo,
        input: &'a [u8],
        file_offset_absolute: usize,
    ) -> IResult<&'a [u8], Self> {
        let start_len = input.len();
        let (input, size) = le_i32(input)?;
        let (input, _signature) = tag(Self::SIGNATURE)(input)?;
        let (input, flags_raw) = le_u16(input)?;
        let (input, last_key_written_date_and_time) = le_u64(input)?;
        let (input, access_bits) = le_u32(input)?;
        let (input, parent_key_offset_relative) = le_u32(input)?;
        let (input, number_of_sub_keys) = le_u32(input)?;
        let (input, _number_of_volatile_sub_keys) = le_u32(input)?;
        let (input, sub_keys_list_offset_relative) = le_u32(input)?;
        let (input, _volatile_sub_keys_list_offset) = le_u32(input)?;
        let (input, number_of_key_values) = le_u32(input)?;
        let (input, key_values_list_offset_relative) = le_u32(input)?;
        let (input, security_key_offset_relative) = le_u32(input)?;
        let (input, class_name_offset_relative) = le_u32(input)?;
        let (input, _largest_sub_key_name_size) = le_u32(input)?;
        let (input, _largest_sub_key_class_name_size) = le_u32(input)?;
        let (input, _largest_value_name_size) = le_u32(input)?;
        let (input, _largest_value_data_size) = le_u32(input)?;
        let (input, _work_var) = le_u32(input)?;
        let (input, key_name_size) = le_u16(input)?;
        let (input, class_name_size) = le_u16(input)?;
        let (input, key_name_bytes) = take(key_name_size)(input)?;

        let mut logs = Logs::default();
        let flags = KeyNodeFlags::from_bits_truncate(flags_raw);
        if flags.bits() != flags_raw {
            logs.add(
                LogCode::WarningUnrecognizedBitflag,
                &format!("KeyNodeFlags: {:#X}", flags_raw),
            );
        }
        let key_name = util::string_from_bytes(
            flags.contains(KeyNodeFlags::KEY_COMP_NAME),
            key_name_bytes,
            key_name_size,
            &mut logs,
            "CellKeyNode::key_name",
        );

        let size_abs = size.unsigned_abs();
        let (input, _slack) =
            util::parser_eat_remaining(input, size_abs as usize, start_len - input.len())?;

        Ok((
            input,
            CellKeyNode {
                file_info,
                file_offset_absolute,
                size: size_abs,
                flags_raw,
                flags,
                last_key_written_date_and_time: util::get_date_time_from_filetime(
                    last_key_written_date_and_time,
                ),
                access_bits: AccessFlags::from_bits_truncate(access_bits),
                parent_key_offset_relative,
                number_of_sub_keys,
                sub_keys_list_offset_relative,
                number_of_key_values,
                key_values_list_offset_relative,
                security_key_offset_relative,
                class_name_offset_relative,
                class_name_size,
                key_name,
                allocated: size < 0,
                logs,
            },
        ))
    }

    /// The key's modification timestamp, converted from FILETIME to UTC.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.last_key_written_date_and_time
    }

    pub fn is_root(&self) -> bool {
        self.flags_raw == ROOT_KEY_FLAGS
    }

    pub fn sub_key_count(&self) -> u32 {
        if self.number_of_sub_keys == NO_ENTRIES {
            0
        } else {
            self.number_of_sub_keys
        }
    }

    pub fn value_count(&self) -> u32 {
        if self.number_of_key_values == NO_ENTRIES {
            0
        } else {
            self.number_of_key_values
        }
    }

    pub fn has_class_name(&self) -> bool {
        self.class_name_offset_relative != NO_CLASS_NAME
    }

    /// The key's class name, or the empty string if it has none (in which case
    /// no cell is resolved at all).
    pub fn class_name(&self) -> Result<String, Error> {
        if !self.has_class_name() {
            return Ok(String::new());
        }
        let cell = self.file_info.cell_at(self.class_name_offset_relative)?;
        let data = cell.data()?;
        let length = self.class_name_size as usize;
        if length > data.len() {
            return Err(Error::InsufficientCellSize {
                offset: cell.file_offset_absolute,
                required: length,
                actual: data.len(),
            });
        }
        let mut logs = Logs::default();
        Ok(util::from_utf16_le_string(
            data,
            length,
            &mut logs,
            "CellKeyNode::class_name",
        ))
    }

    /// Re-parses the parent key from the shared buffer. The parent pointer is a
    /// back-reference, never an owning link, so the key tree stays acyclic in
    /// the child direction.
    pub fn parent(&self) -> Result<CellKeyNode<'a>, Error> {
        if self.is_root() {
            return Err(Error::NoParent);
        }
        self.file_info
            .cell_at(self.parent_key_offset_relative)
            .and_then(|cell| cell.key_node())
            .map_err(|_| Error::NoParent)
    }

    /// The subkeys index of this key. A key without subkeys gets the canonical
    /// empty list; no cell lookup is attempted.
    pub fn sub_key_list(&self) -> Result<SubKeyList<'a>, Error> {
        if self.sub_key_count() == 0 {
            return Ok(SubKeyList::empty(self.file_info));
        }
        self.file_info
            .cell_at(self.sub_keys_list_offset_relative)?
            .sub_key_list()
    }

    /// The value list of this key; canonical empty list when the key has no values.
    pub fn value_list(&self) -> Result<ValueList<'a>, Error> {
        if self.value_count() == 0 {
            return Ok(ValueList::empty(self.file_info));
        }
        self.file_info
            .cell_at(self.key_values_list_offset_relative)?
            .value_list(self.value_count())
    }
}

bitflags! {
    #[allow(non_camel_case_types)]
    #[derive(Default)]
    pub struct AccessFlags: u32 {
        const ACCESSED_BEFORE_INIT = 0x00000001; // This key was accessed before a Windows registry was initialized with the NtInitializeRegistry() routine during the boot
        const ACCESSED_AFTER_INIT  = 0x00000002; // This key was accessed after a Windows registry was initialized with the NtInitializeRegistry() routine during the boot
    }
}
impl_serialize_for_bitflags! {AccessFlags}

bitflags! {
    #[allow(non_camel_case_types)]
    #[derive(Default)]
    pub struct KeyNodeFlags: u16 {
        const KEY_VOLATILE       = 0x0001; // Is volatile (not used, a key node on a disk isn't expected to have this flag set)
        const KEY_HIVE_EXIT      = 0x0002; // Is the mount point of another hive (a key node on a disk isn't expected to have this flag set)
        const KEY_HIVE_ENTRY     = 0x0004; // Is the root key for this hive
        const KEY_NO_DELETE      = 0x0008; // This key can't be deleted
        const KEY_SYM_LINK       = 0x0010; // This key is a symlink (a target key is specified as a UTF-16LE string (REG_LINK) in a value named "SymbolicLinkValue")
        const KEY_COMP_NAME      = 0x0020; // Key name is an ASCII string, possibly an extended ASCII string (otherwise it is a UTF-16LE string)
        const KEY_PREDEF_HANDLE  = 0x0040; // Is a predefined handle (a handle is stored in the Number of key values field)
        const KEY_VIRTUAL_SOURCE = 0x0080; // This key was virtualized at least once
        const KEY_VIRTUAL_TARGET = 0x0100; // Is virtual
        const KEY_VIRTUAL_STORE  = 0x0200; // Is a part of a virtual store path
        const KEY_UNKNOWN1       = 0x1000;
        const KEY_UNKNOWN2       = 0x4000;
    }
}
impl_serialize_for_bitflags! {KeyNodeFlags}
