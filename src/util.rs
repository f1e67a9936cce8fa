use crate::log::{LogCode, Logs};
use chrono::{DateTime, TimeZone, Utc};
use nom::bytes::complete::take;
use nom::IResult;
use serde::ser;
use std::char::REPLACEMENT_CHARACTER;
use std::fmt::Write as FmtWrite;

const SIZE_OF_UTF16_CHAR: usize = std::mem::size_of::<u16>();

fn utf16_le_units(slice: &[u8], count: usize) -> Vec<u16> {
    let count = std::cmp::min(count, slice.len());
    slice[..count]
        .chunks_exact(SIZE_OF_UTF16_CHAR)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect()
}

fn decode_utf16_units(units: &[u16], logs: &mut Logs, err_detail: &str) -> String {
    std::char::decode_utf16(units.iter().copied())
        .map(|r| {
            r.unwrap_or_else(|err| {
                logs.add(
                    LogCode::WarningConversion,
                    &format!("{}: {}", err_detail, err),
                );
                REPLACEMENT_CHARACTER
            })
        })
        .collect()
}

/// Reads a UTF-16LE string, truncated at the first null character (REG_SZ)
pub(crate) fn from_utf16_le_string(
    slice: &[u8],
    count: usize,
    logs: &mut Logs,
    err_detail: &str,
) -> String {
    let units = utf16_le_units(slice, count);
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    decode_utf16_units(&units[..end], logs, err_detail)
}

/// Reads a sequence of null-terminated UTF-16LE strings, terminated by an empty string (REG_MULTI_SZ).
/// A trailing fragment with no terminator is kept as a final partial entry.
pub(crate) fn from_utf16_le_strings(
    slice: &[u8],
    count: usize,
    logs: &mut Logs,
    err_detail: &str,
) -> Vec<String> {
    let units = utf16_le_units(slice, count);
    let mut strings = Vec::new();
    let mut current: Vec<u16> = Vec::new();
    for &unit in &units {
        if unit == 0 {
            if current.is_empty() {
                return strings;
            }
            strings.push(decode_utf16_units(&current, logs, err_detail));
            current.clear();
        } else {
            current.push(unit);
        }
    }
    if !current.is_empty() {
        strings.push(decode_utf16_units(&current, logs, err_detail));
    }
    strings
}

/// Converts a slice of extended-ASCII bytes into a String, truncated at the first null byte.
/// Bytes above 0x7F map per Latin-1, which matches `python-registry`'s handling.
pub(crate) fn from_ascii(slice: &[u8]) -> String {
    slice
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

pub(crate) fn string_from_bytes(
    is_ascii: bool,
    slice: &[u8],
    count: u16,
    logs: &mut Logs,
    err_detail: &str,
) -> String {
    if is_ascii {
        from_ascii(slice)
    } else {
        from_utf16_le_string(slice, count.into(), logs, err_detail)
    }
}

/// An unnamed value is displayed as __(default)__ in the Windows Registry Editor
/// (lowercase to be compatible with `python-registry`).
pub fn get_pretty_name(name: &str) -> String {
    if name.is_empty() {
        "(default)".to_string()
    } else {
        name.to_string()
    }
}

/// Consumes any slack space at the end of a hive bin cell.
pub(crate) fn parser_eat_remaining(
    input: &[u8],
    cell_size: usize,
    bytes_consumed: usize,
) -> IResult<&[u8], &[u8]> {
    take(cell_size.saturating_sub(bytes_consumed))(input)
}

/// Converts a u64 filetime (100ns ticks since 1601-01-01 UTC) to a DateTime<Utc>
pub fn get_date_time_from_filetime(filetime: u64) -> DateTime<Utc> {
    const UNIX_EPOCH_SECONDS_SINCE_WINDOWS_EPOCH: i64 = 11_644_473_600;
    const TICKS_PER_SECOND: u64 = 10_000_000;
    let seconds = (filetime / TICKS_PER_SECOND) as i64 - UNIX_EPOCH_SECONDS_SINCE_WINDOWS_EPOCH;
    let nanos = (filetime % TICKS_PER_SECOND) as u32 * 100;
    Utc.timestamp_opt(seconds, nanos).single().unwrap_or_default()
}

/// Converts a DateTime<Utc> to ISO-8601/RFC-3339 format `%Y-%m-%dT%H:%M:%S%.7f` (manually, since Rust doesn't support `%.7f`)
pub fn format_date_time(date_time: DateTime<Utc>) -> String {
    let fractional_seconds = date_time.format("%9f").to_string();
    const EXPECTED_FRACTIONAL_SECONDS_LEN: usize = 9;
    if EXPECTED_FRACTIONAL_SECONDS_LEN == fractional_seconds.len() {
        let byte_slice = fractional_seconds.as_bytes(); // we know that the string is only ASCII, so this is safe
        // Make sure that our last two digits are 0, as we expect
        // Note that we aren't just using chrono::SecondsFormat::AutoSi because we want 7 digits to correspond to the original filetime's 100ns precision
        if byte_slice[EXPECTED_FRACTIONAL_SECONDS_LEN - 1] == b'0'
            && byte_slice[EXPECTED_FRACTIONAL_SECONDS_LEN - 2] == b'0'
        {
            return format!(
                "{}.{}Z",
                date_time.format("%Y-%m-%dT%H:%M:%S"),
                &fractional_seconds[..7]
            );
        }
    }
    // We should never hit this when coming from a FILETIME; we don't have that much precision
    date_time.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

pub(crate) fn data_as_hex<S: ser::Serializer>(x: &[u8], s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&to_hex_string(x))
}

/// Adapted from https://github.com/omerbenamram/mft
pub(crate) fn to_hex_string(bytes: &[u8]) -> String {
    let len = bytes.len();
    let mut s = String::with_capacity(len * 3); // Each byte is represented by 2 ascii bytes, and then we add a space between them

    for byte in bytes {
        write!(s, "{:02X} ", byte).expect("Writing to an allocated string cannot fail");
    }
    s.trim_end().to_string()
}
