use nom::{
    bytes::complete::tag,
    number::complete::{le_i32, le_u16, le_u32},
    IResult,
};
use serde::Serialize;

// List of subkeys lists (used to subdivide subkeys lists)
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SubKeyListRi {
    pub size: u32,
    pub count: u16,
    pub items: Vec<SubKeyListRiItem>, // Vec size = count
}

impl SubKeyListRi {
    pub(crate) const SIGNATURE: &'static str = "ri";

    /// Uses nom to parse an ri sub key list (ri) hive bin cell.
    pub fn from_bytes(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, size) = le_i32(input)?;
        let (input, _signature) = tag(Self::SIGNATURE)(input)?;
        let (input, count) = le_u16(input)?;
        let (input, items) = nom::multi::count(parse_sub_key_list_ri_item(), count.into())(input)?;
        Ok((
            input,
            SubKeyListRi {
                size: size.unsigned_abs(),
                count,
                items,
            },
        ))
    }

    /// Offsets of the child sub key lists (not of key records), in page order,
    /// relative from the start of the hive bins data.
    pub fn offsets(&self) -> Vec<u32> {
        self.items.iter().map(|x| x.sub_key_list_offset).collect()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SubKeyListRiItem {
    pub sub_key_list_offset: u32, // The offset value is in bytes and relative from the start of the hive bin data
}

fn parse_sub_key_list_ri_item() -> impl Fn(&[u8]) -> IResult<&[u8], SubKeyListRiItem> {
    |input: &[u8]| {
        let (input, sub_key_list_offset) = le_u32(input)?;
        Ok((input, SubKeyListRiItem { sub_key_list_offset }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sub_key_list_ri() {
        let slice = [
            0xF0, 0xFF, 0xFF, 0xFF, 0x72, 0x69, 0x03, 0x00, 0x20, 0xC0, 0x00, 0x00, 0x20, 0xB0,
            0x02, 0x00, 0x20, 0x70, 0x06, 0x00,
        ];
        let (_, key_list) = SubKeyListRi::from_bytes(&slice).unwrap();

        let expected_output = SubKeyListRi {
            size: 16,
            count: 3,
            items: vec![
                SubKeyListRiItem {
                    sub_key_list_offset: 0xC020,
                },
                SubKeyListRiItem {
                    sub_key_list_offset: 0x2B020,
                },
                SubKeyListRiItem {
                    sub_key_list_offset: 0x67020,
                },
            ],
        };
        assert_eq!(expected_output, key_list);
        assert_eq!(vec![0xC020, 0x2B020, 0x67020], key_list.offsets());
    }
}
