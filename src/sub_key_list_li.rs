use nom::{
    bytes::complete::tag,
    number::complete::{le_i32, le_u16, le_u32},
    IResult,
};
use serde::Serialize;

// Subkeys list
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SubKeyListLi {
    pub size: u32,
    pub count: u16,
    pub items: Vec<SubKeyListLiItem>, // Vec size = count
}

impl SubKeyListLi {
    pub(crate) const SIGNATURE: &'static str = "li";

    /// Uses nom to parse an li sub key list (li) hive bin cell.
    pub fn from_bytes(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, size) = le_i32(input)?;
        let (input, _signature) = tag(Self::SIGNATURE)(input)?;
        let (input, count) = le_u16(input)?;
        let (input, items) = nom::multi::count(SubKeyListLiItem::from_bytes(), count.into())(input)?;
        Ok((
            input,
            SubKeyListLi {
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
pub struct SubKeyListLiItem {
    pub named_key_offset_relative: u32, // The offset value is in bytes and relative from the start of the hive bin data
}

impl SubKeyListLiItem {
    fn from_bytes() -> impl Fn(&[u8]) -> IResult<&[u8], Self> {
        |input: &[u8]| {
            let (input, named_key_offset_relative) = le_u32(input)?;
            Ok((
                input,
                SubKeyListLiItem {
                    named_key_offset_relative,
                },
            ))
        }
    }
}
