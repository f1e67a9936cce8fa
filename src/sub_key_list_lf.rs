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
    bytes::complete::{tag, take},
    number::complete::{le_i32, le_u16, le_u32},
    IResult,
};
use serde::Serialize;

use crate::util;

// Subkeys list with name hints
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SubKeyListLf {
    pub size: u32,
    pub count: u16,
    pub items: Vec<SubKeyListLfItem>, // Vec size = count
}

impl SubKeyListLf {
    pub(crate) const SIGNATURE: &'static str = "lf";

    /// Uses nom to parse an lf sub key list (lf) hive bin cell.
    pub fn from_bytes(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, size) = le_i32(input)?;
        let (input, _signature) = tag(Self::SIGNATURE)(input)?;
        let (input, count) = le_u16(input)?;
        let (input, items) = nom::multi::count(SubKeyListLfItem::from_bytes(), count.into())(input)?;
        Ok((
            input,
            SubKeyListLf {
                size: size.unsigned_abs(),
                count,
                items,
            },
        ))
    }

    /// Entry offsets in list order, relative from the start of the hive bins data.
    pub fn offsets(&self) -> Vec<u32> {
        self.items
            .iter()
            .map(|x| x.named_key_offset_relative)
            .collect()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SubKeyListLfItem {
    pub named_key_offset_relative: u32, // The offset value is in bytes and relative from the start of the hive bin data
    pub name_hint: String, // The first 4 ASCII characters of a key name string (used to speed up lookups)
}

impl SubKeyListLfItem {
    fn from_bytes() -> impl Fn(&[u8]) -> IResult<&[u8], Self> {
        |input: &[u8]| {
            let (input, named_key_offset_relative) = le_u32(input)?;
            let (input, name_hint) = take(4usize)(input)?;
            Ok((
                input,
                SubKeyListLfItem {
                    named_key_offset_relative,
                    name_hint: util::from_ascii(name_hint),
                },
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sub_key_list_lf() {
        let slice = [
            0xF0, 0xFF, 0xFF, 0xFF, 0x6C, 0x66, 0x02, 0x00, 0x20, 0x01, 0x00, 0x00, 0x41, 0x6C,
            0x70, 0x68, 0xA0, 0x01, 0x00, 0x00, 0x42, 0x65, 0x74, 0x61,
        ];
        let (_, key_list) = SubKeyListLf::from_bytes(&slice).unwrap();

        let expected_output = SubKeyListLf {
            size: 16,
            count: 2,
            items: vec![
                SubKeyListLfItem {
                    named_key_offset_relative: 0x120,
                    name_hint: "Alph".to_string(),
                },
                SubKeyListLfItem {
                    named_key_offset_relative: 0x1A0,
                    name_hint: "Beta".to_string(),
                },
            ],
        };
        assert_eq!(expected_output, key_list);
        assert_eq!(vec![0x120, 0x1A0], key_list.offsets());
    }

    #[test]
    fn test_parse_sub_key_list_lf_bad_signature() {
        let slice = [
            0xF0, 0xFF, 0xFF, 0xFF, 0x6C, 0x69, 0x01, 0x00, 0x20, 0x01, 0x00, 0x00,
        ];
        assert!(SubKeyListLf::from_bytes(&slice).is_err());
    }
}
