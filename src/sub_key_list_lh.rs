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
    number::complete::{le_i32, le_u16, le_u32},
    IResult,
};
use serde::Serialize;

// Subkeys list with name hashes
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SubKeyListLh {
    pub size: u32,
    pub count: u16,
    pub items: Vec<SubKeyListLhItem>, // Vec size = count
}

impl SubKeyListLh {
    pub(crate) const SIGNATURE: &'static str = "lh";

    /// Uses nom to parse an lh sub key list (lh) hive bin cell.
    pub fn from_bytes(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, size) = le_i32(input)?;
        let (input, _signature) = tag(Self::SIGNATURE)(input)?;
        let (input, count) = le_u16(input)?;
        let (input, items) = nom::multi::count(SubKeyListLhItem::from_bytes(), count.into())(input)?;
        Ok((
            input,
            SubKeyListLh {
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
pub struct SubKeyListLhItem {
    pub named_key_offset_relative: u32, // The offset value is in bytes and relative from the start of the hive bin data
    pub name_hash: u32, // Hash of a key name string (used to speed up lookups). A different hash function is used for different sub key list types.
}

impl SubKeyListLhItem {
    fn from_bytes() -> impl Fn(&[u8]) -> IResult<&[u8], Self> {
        |input: &[u8]| {
            let (input, named_key_offset_relative) = le_u32(input)?;
            let (input, name_hash) = le_u32(input)?;
            Ok((
                input,
                SubKeyListLhItem {
                    named_key_offset_relative,
                    name_hash,
                },
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sub_key_list_lh() {
        let slice = [
            0xE8, 0xFF, 0xFF, 0xFF, 0x6C, 0x68, 0x02, 0x00, 0xF8, 0x11, 0x00, 0x00, 0x15, 0xD1,
            0xB6, 0x07, 0x60, 0x1B, 0x00, 0x00, 0x4F, 0x7D, 0x01, 0x00,
        ];
        let (_, key_list) = SubKeyListLh::from_bytes(&slice).unwrap();

        let expected_output = SubKeyListLh {
            size: 24,
            count: 2,
            items: vec![
                SubKeyListLhItem {
                    named_key_offset_relative: 4600,
                    name_hash: 129487125,
                },
                SubKeyListLhItem {
                    named_key_offset_relative: 7008,
                    name_hash: 97615,
                },
            ],
        };
        assert_eq!(expected_output, key_list);
        assert_eq!(vec![4600, 7008], key_list.offsets());
    }
}
