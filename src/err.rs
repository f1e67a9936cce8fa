use thiserror::Error;

use crate::cell_key_value::CellKeyValueDataTypes;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid magic: expected {}, found {:02X?}", expected, found)]
    InvalidMagic { expected: &'static str, found: Vec<u8> },
    #[error("Read of {} bytes at offset 0x{:08X} is outside the buffer (capacity 0x{:08X})", len, offset, capacity)]
    OutOfBounds { offset: usize, len: usize, capacity: usize },
    #[error("Unexpected cell signature: expected {}, found {}", expected, found)]
    UnexpectedSignature { expected: &'static str, found: String },
    #[error("Unknown sub key list type: {}", signature)]
    UnknownSubKeyListType { signature: String },
    #[error("Cell at offset 0x{:08X} is too small: {} bytes declared, {} required", offset, actual, required)]
    InsufficientCellSize { offset: usize, required: usize, actual: usize },
    #[error("Cell at offset 0x{:08X} has an invalid size of 0", offset)]
    InvalidCellSize { offset: usize },
    #[error("Name not found: {}", name)]
    NotFound { name: String },
    #[error("Key has no parent")]
    NoParent,
    #[error("Value data size 0x{:08X} exceeds the big data scheme", size)]
    ValueTooLarge { size: u32 },
    #[error("Cannot decode {:?} as {}", data_type, wanted)]
    UnsupportedValueType { wanted: &'static str, data_type: CellKeyValueDataTypes },
    #[error("An error has occurred while parsing: {}", detail)]
    Nom { detail: String },
    #[error("An I/O error has occurred: {}", source)]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn not_found(name: &str) -> Error {
        Error::NotFound {
            name: name.to_string(),
        }
    }
}

impl<'a> From<nom::Err<nom::error::Error<&'a [u8]>>> for Error {
    fn from(error: nom::Err<nom::error::Error<&'a [u8]>>) -> Self {
        match error {
            nom::Err::Incomplete(_) => Error::Nom {
                detail: "incomplete input".to_string(),
            },
            nom::Err::Error(e) | nom::Err::Failure(e) => Error::Nom {
                detail: format!("{:?} (remaining input: {} bytes)", e.code, e.input.len()),
            },
        }
    }
}

impl<'a> From<nom::error::Error<&'a [u8]>> for Error {
    fn from(error: nom::error::Error<&'a [u8]>) -> Self {
        Error::Nom {
            detail: format!("{:?} (remaining input: {} bytes)", error.code, error.input.len()),
        }
    }
}

// Io sources aren't comparable; the rendered message is sufficient for tests.
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Error {}
