use serde::Serialize;

use crate::cell_key_value::CellKeyValueDataTypes;
use crate::err::Error;
use crate::log::{LogCode, Logs};
use crate::util;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum CellValue {
    None,
    #[serde(serialize_with = "util::data_as_hex")]
    Binary(Vec<u8>),
    String(String),
    MultiString(Vec<String>),
    U32(u32),
    U64(u64),
    Error,
}

/// The routed byte span of a value, tagged with its registry type. Typed
/// accessors fail when the requested interpretation is incompatible with the
/// stored type; `content` decodes to the natural `CellValue`, collecting
/// conversion warnings instead of failing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValueData {
    pub data_type: CellKeyValueDataTypes,
    #[serde(serialize_with = "util::data_as_hex")]
    raw: Vec<u8>,
}

impl ValueData {
    pub(crate) fn new(data_type: CellKeyValueDataTypes, raw: Vec<u8>) -> Self {
        ValueData { data_type, raw }
    }

    /// The raw bytes; valid for every data type.
    pub fn as_raw_data(&self) -> &[u8] {
        &self.raw
    }

    pub fn as_string(&self) -> Result<String, Error> {
        match self.data_type {
            CellKeyValueDataTypes::REG_SZ
            | CellKeyValueDataTypes::REG_EXPAND_SZ
            | CellKeyValueDataTypes::REG_LINK => {
                let mut logs = Logs::default();
                Ok(util::from_utf16_le_string(
                    &self.raw,
                    self.raw.len(),
                    &mut logs,
                    "ValueData::as_string",
                ))
            }
            _ => Err(Error::UnsupportedValueType {
                wanted: "string",
                data_type: self.data_type,
            }),
        }
    }

    /// A string list; data that parses as a single string is returned as a
    /// one-entry list.
    pub fn as_multi_string(&self) -> Result<Vec<String>, Error> {
        match self.data_type {
            CellKeyValueDataTypes::REG_SZ | CellKeyValueDataTypes::REG_EXPAND_SZ => {
                Ok(vec![self.as_string()?])
            }
            CellKeyValueDataTypes::REG_MULTI_SZ => {
                let mut logs = Logs::default();
                Ok(util::from_utf16_le_strings(
                    &self.raw,
                    self.raw.len(),
                    &mut logs,
                    "ValueData::as_multi_string",
                ))
            }
            _ => Err(Error::UnsupportedValueType {
                wanted: "string list",
                data_type: self.data_type,
            }),
        }
    }

    pub fn as_number(&self) -> Result<u64, Error> {
        let wanted_len = match self.data_type {
            CellKeyValueDataTypes::REG_DWORD | CellKeyValueDataTypes::REG_DWORD_BIG_ENDIAN => 4,
            CellKeyValueDataTypes::REG_QWORD => 8,
            _ => {
                return Err(Error::UnsupportedValueType {
                    wanted: "number",
                    data_type: self.data_type,
                })
            }
        };
        let bytes = self.raw.get(0..wanted_len).ok_or(Error::OutOfBounds {
            offset: 0,
            len: wanted_len,
            capacity: self.raw.len(),
        })?;
        match self.data_type {
            CellKeyValueDataTypes::REG_DWORD => Ok(u64::from(u32::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ]))),
            CellKeyValueDataTypes::REG_DWORD_BIG_ENDIAN => Ok(u64::from(u32::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ]))),
            _ => Ok(u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ])),
        }
    }

    /// Decodes the bytes per the stored registry type.
    pub fn content(&self, logs: &mut Logs) -> CellValue {
        match self.data_type {
            CellKeyValueDataTypes::REG_SZ
            | CellKeyValueDataTypes::REG_EXPAND_SZ
            | CellKeyValueDataTypes::REG_LINK => CellValue::String(util::from_utf16_le_string(
                &self.raw,
                self.raw.len(),
                logs,
                "ValueData::content",
            )),
            CellKeyValueDataTypes::REG_MULTI_SZ => CellValue::MultiString(
                util::from_utf16_le_strings(&self.raw, self.raw.len(), logs, "ValueData::content"),
            ),
            CellKeyValueDataTypes::REG_DWORD => match self.raw.get(0..4) {
                Some(v) => CellValue::U32(u32::from_le_bytes([v[0], v[1], v[2], v[3]])),
                None => self.handle_invalid_input(logs),
            },
            CellKeyValueDataTypes::REG_DWORD_BIG_ENDIAN => match self.raw.get(0..4) {
                Some(v) => CellValue::U32(u32::from_be_bytes([v[0], v[1], v[2], v[3]])),
                None => self.handle_invalid_input(logs),
            },
            CellKeyValueDataTypes::REG_QWORD | CellKeyValueDataTypes::REG_FILETIME => {
                match self.raw.get(0..8) {
                    Some(v) => CellValue::U64(u64::from_le_bytes([
                        v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7],
                    ])),
                    None => self.handle_invalid_input(logs),
                }
            }
            // REG_BIN, REG_NONE, resource types, and unrecognized tags stay raw
            _ => CellValue::Binary(self.raw.clone()),
        }
    }

    fn handle_invalid_input(&self, logs: &mut Logs) -> CellValue {
        logs.add(
            LogCode::WarningConversion,
            &"Too few input bytes for data type",
        );
        CellValue::Binary(self.raw.clone())
    }
}
