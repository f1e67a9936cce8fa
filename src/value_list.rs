use nom::{multi::count, number::complete::le_u32, Finish, IResult};
use serde::Serialize;

use crate::cell_key_value::CellKeyValue;
use crate::err::Error;
use crate::file_info::FileInfo;

/// A flat array of pointers to `vk` cells. The list is not self-describing:
/// the entry count comes from the owning key record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValueList<'a> {
    #[serde(skip)]
    file_info: &'a FileInfo,
    pub offsets: Vec<u32>, // In bytes, relative from the start of the hive bins data
}

impl<'a> ValueList<'a> {
    pub(crate) fn from_cell(
        file_info: &'a FileInfo,
        data: &'a [u8],
        num_values: u32,
    ) -> Result<Self, Error> {
        let parsed: IResult<&[u8], Vec<u32>> = count(le_u32, num_values as usize)(data);
        let (_, offsets) = parsed.finish()?;
        Ok(ValueList { file_info, offsets })
    }

    pub(crate) fn empty(file_info: &'a FileInfo) -> Self {
        ValueList {
            file_info,
            offsets: Vec::new(),
        }
    }

    /// Returns a fresh lazy sequence over this list's value records. A corrupt
    /// entry pointer ends the sequence early rather than failing the walk.
    pub fn values(&self) -> Values<'a> {
        Values {
            file_info: self.file_info,
            offsets: self.offsets.clone().into_iter(),
        }
    }

    /// Case-insensitive linear scan; first match wins.
    pub fn find_value(&self, name: &str) -> Result<CellKeyValue<'a>, Error> {
        self.values()
            .find(|value| value.value_name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::not_found(name))
    }
}

pub struct Values<'a> {
    file_info: &'a FileInfo,
    offsets: std::vec::IntoIter<u32>,
}

impl<'a> Iterator for Values<'a> {
    type Item = CellKeyValue<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offsets.next()?;
        match self
            .file_info
            .cell_at(offset)
            .and_then(|cell| cell.key_value())
        {
            Ok(key_value) => Some(key_value),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cell_reads_exactly_num_values() {
        let file_info = FileInfo::from_vec(Vec::new());
        let data: Vec<u8> = [0x20u32, 0x80, 0x120, 0x200]
            .iter()
            .flat_map(|o| o.to_le_bytes())
            .collect();
        let list = ValueList::from_cell(&file_info, &data, 3).unwrap();
        assert_eq!(vec![0x20, 0x80, 0x120], list.offsets);
    }

    #[test]
    fn test_from_cell_truncated_list() {
        let file_info = FileInfo::from_vec(Vec::new());
        let data = 0x20u32.to_le_bytes();
        assert!(ValueList::from_cell(&file_info, &data, 3).is_err());
    }

    #[test]
    fn test_empty_list() {
        let file_info = FileInfo::from_vec(Vec::new());
        let list = ValueList::empty(&file_info);
        assert_eq!(0, list.values().count());
        assert_eq!(
            Err(Error::not_found("Flags")),
            list.find_value("Flags").map(|_| ())
        );
    }
}
