//! OLE2 compound file helpers for the legacy binary formats (DOC, XLS, PPT).

use std::io::{Cursor, Read};

use cfb::CompoundFile;
use encoding_rs::Encoding;

use crate::types::Metadata;
use crate::{Result, SharetextError};

const SUMMARY_INFORMATION: &str = "\u{5}SummaryInformation";

const PID_CODEPAGE: u32 = 1;
const PID_TITLE: u32 = 2;
const PID_SUBJECT: u32 = 3;
const PID_AUTHOR: u32 = 4;
const PID_KEYWORDS: u32 = 5;
const PID_LAST_AUTHOR: u32 = 8;
const PID_REVISION: u32 = 9;
const PID_CREATED: u32 = 12;
const PID_LAST_SAVED: u32 = 13;

const VT_I2: u32 = 0x0002;
const VT_I4: u32 = 0x0003;
const VT_LPSTR: u32 = 0x001E;
const VT_LPWSTR: u32 = 0x001F;
const VT_FILETIME: u32 = 0x0040;

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_OFFSET: i64 = 11_644_473_600;

pub type OleFile<'a> = CompoundFile<Cursor<&'a [u8]>>;

/// # Errors
///
/// `CorruptContainer` when the bytes are not a compound file.
pub fn open(bytes: &[u8]) -> Result<OleFile<'_>> {
    CompoundFile::open(Cursor::new(bytes))
        .map_err(|e| SharetextError::corrupt_container_with_source("Not a readable OLE2 compound file", e))
}

/// Full contents of a stream.
pub fn read_stream(file: &mut OleFile, path: &str) -> Result<Vec<u8>> {
    let mut stream = file
        .open_stream(path)
        .map_err(|e| SharetextError::corrupt_container_with_source(format!("Missing OLE2 stream {}", path), e))?;
    let mut data = Vec::new();
    stream.read_to_end(&mut data)?;
    Ok(data)
}

/// Like [`read_stream`] for streams that may be absent.
pub fn read_optional_stream(file: &mut OleFile, path: &str) -> Option<Vec<u8>> {
    if !file.is_stream(path) {
        return None;
    }
    read_stream(file, path)
        .inspect_err(|e| tracing::debug!("Skipping unreadable OLE2 stream {}: {}", path, e))
        .ok()
}

/// Metadata from the `\u{5}SummaryInformation` property set. Missing or
/// malformed property sets yield empty metadata.
pub fn summary_information(file: &mut OleFile) -> Metadata {
    match read_optional_stream(file, SUMMARY_INFORMATION) {
        Some(data) => parse_summary_information(&data).unwrap_or_default(),
        None => Metadata::default(),
    }
}

pub(crate) fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    data.get(offset..offset + 8)
        .map(|b| u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
}

enum PropertyValue {
    Int(i64),
    Text(Vec<u8>),
    WideText(String),
    FileTime(u64),
}

fn parse_summary_information(data: &[u8]) -> Option<Metadata> {
    if read_u16(data, 0)? != 0xFFFE {
        return None;
    }
    let section_count = read_u32(data, 24)?;
    if section_count == 0 {
        return None;
    }
    let section = read_u32(data, 44)? as usize;
    let property_count = read_u32(data, section + 4)? as usize;

    let mut properties = Vec::with_capacity(property_count.min(64));
    for i in 0..property_count.min(256) {
        let entry = section + 8 + i * 8;
        let pid = read_u32(data, entry)?;
        let offset = section + read_u32(data, entry + 4)? as usize;
        if let Some(value) = read_property(data, offset) {
            properties.push((pid, value));
        }
    }

    let codepage = properties.iter().find_map(|(pid, value)| match (pid, value) {
        (&PID_CODEPAGE, PropertyValue::Int(cp)) => Some(*cp),
        _ => None,
    });

    let mut metadata = Metadata::default();
    for (pid, value) in properties {
        let text = match value {
            PropertyValue::Text(bytes) => decode_codepage(&bytes, codepage),
            PropertyValue::WideText(text) => text,
            PropertyValue::FileTime(ft) => match filetime_to_iso(ft) {
                Some(iso) => iso,
                None => continue,
            },
            PropertyValue::Int(n) if pid == PID_REVISION => n.to_string(),
            PropertyValue::Int(_) => continue,
        };
        let text = text.trim_end_matches('\0').trim().to_string();
        if text.is_empty() {
            continue;
        }
        let slot = match pid {
            PID_TITLE => &mut metadata.title,
            PID_SUBJECT => &mut metadata.subject,
            PID_AUTHOR => &mut metadata.author,
            PID_KEYWORDS => &mut metadata.keywords,
            PID_LAST_AUTHOR => &mut metadata.last_modified_by,
            PID_REVISION => &mut metadata.revision,
            PID_CREATED => &mut metadata.created,
            PID_LAST_SAVED => &mut metadata.modified,
            _ => continue,
        };
        *slot = Some(text);
    }
    Some(metadata)
}

fn read_property(data: &[u8], offset: usize) -> Option<PropertyValue> {
    let vt = read_u32(data, offset)? & 0xFFFF;
    let body = offset + 4;
    match vt {
        VT_I2 => read_u16(data, body).map(|v| PropertyValue::Int(i64::from(v as i16))),
        VT_I4 => read_u32(data, body).map(|v| PropertyValue::Int(i64::from(v as i32))),
        VT_LPSTR => {
            let len = read_u32(data, body)? as usize;
            data.get(body + 4..body + 4 + len).map(|b| PropertyValue::Text(b.to_vec()))
        }
        VT_LPWSTR => {
            let chars = read_u32(data, body)? as usize;
            let bytes = data.get(body + 4..body + 4 + chars * 2)?;
            let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
            Some(PropertyValue::WideText(String::from_utf16_lossy(&units)))
        }
        VT_FILETIME => read_u64(data, body).map(PropertyValue::FileTime),
        _ => None,
    }
}

/// Decode 8-bit text in a Windows code page; unknown pages decode as cp1252.
pub fn decode_codepage(bytes: &[u8], codepage: Option<i64>) -> String {
    let encoding: &'static Encoding = match codepage {
        Some(65001) => encoding_rs::UTF_8,
        Some(1200) => encoding_rs::UTF_16LE,
        Some(1250) => encoding_rs::WINDOWS_1250,
        Some(1251) => encoding_rs::WINDOWS_1251,
        Some(1253) => encoding_rs::WINDOWS_1253,
        Some(1254) => encoding_rs::WINDOWS_1254,
        Some(1255) => encoding_rs::WINDOWS_1255,
        Some(1256) => encoding_rs::WINDOWS_1256,
        Some(1257) => encoding_rs::WINDOWS_1257,
        Some(1258) => encoding_rs::WINDOWS_1258,
        Some(932) => encoding_rs::SHIFT_JIS,
        Some(936) => encoding_rs::GBK,
        Some(949) => encoding_rs::EUC_KR,
        Some(950) => encoding_rs::BIG5,
        _ => encoding_rs::WINDOWS_1252,
    };
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Windows FILETIME (100 ns ticks since 1601) as `YYYY-MM-DDTHH:MM:SSZ`.
/// Zero means "not set".
pub fn filetime_to_iso(filetime: u64) -> Option<String> {
    if filetime == 0 {
        return None;
    }
    let seconds = (filetime / 10_000_000) as i64 - FILETIME_UNIX_OFFSET;
    let days = seconds.div_euclid(86_400);
    let second_of_day = seconds.rem_euclid(86_400);
    let (year, month, day) = civil_from_days(days);
    Some(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        second_of_day / 3600,
        (second_of_day % 3600) / 60,
        second_of_day % 60
    ))
}

/// Proleptic Gregorian date for days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
