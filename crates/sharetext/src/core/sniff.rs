//! Content-based format detection.
//!
//! SharePoint exports routinely carry the wrong extension, so a container signature
//! always beats the filename, and so do the conclusive text heuristics (JSON, HTML,
//! mail). The extension is consulted when the signature is inconclusive, and to
//! refine text buffers between the text-family formats (a CSV and a Markdown file
//! look the same to a byte sniffer).

use std::io::{Cursor, Read};

use crate::core::format::FormatTag;

const OLE2_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const PDF_MAGIC: &[u8] = b"%PDF-";
const RTF_MAGIC: &[u8] = b"{\\rtf";

/// Bytes scanned for a PDF header in non-text buffers; some producers prepend
/// binary junk before `%PDF-`.
const PDF_HEADER_WINDOW: usize = 1024;

/// Lines inspected by the delimited-text heuristic.
const DELIMITED_SAMPLE_LINES: usize = 5;

const RFC822_HEADERS: &[&str] = &[
    "from",
    "to",
    "cc",
    "subject",
    "date",
    "message-id",
    "mime-version",
    "received",
    "return-path",
    "content-type",
    "reply-to",
];

/// Determine the format of `bytes`, optionally helped by `filename`.
///
/// Never fails: anything that cannot be classified resolves to
/// [`FormatTag::Unsupported`].
pub fn sniff(filename: Option<&str>, bytes: &[u8]) -> FormatTag {
    let by_name = filename.map(FormatTag::from_filename).unwrap_or(FormatTag::Unsupported);

    if bytes.starts_with(&OLE2_MAGIC) {
        return sniff_ole2(bytes).unwrap_or(if by_name.is_ole2() { by_name } else { FormatTag::Unsupported });
    }

    if bytes.starts_with(ZIP_MAGIC) {
        return sniff_zip(bytes).unwrap_or(if by_name.is_zip_package() {
            by_name
        } else {
            FormatTag::Unsupported
        });
    }

    if strip_utf8_bom(bytes).trim_ascii_start().starts_with(PDF_MAGIC) {
        return FormatTag::Pdf;
    }

    if strip_utf8_bom(bytes).starts_with(RTF_MAGIC) {
        return FormatTag::Rtf;
    }

    if bytes.is_empty() {
        return if filename.is_some() { by_name } else { FormatTag::Txt };
    }

    match decode_text(bytes) {
        Some(text) => sniff_text(&text, by_name),
        None => {
            let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
            if memfind(window, PDF_MAGIC).is_some() {
                FormatTag::Pdf
            } else {
                by_name
            }
        }
    }
}

/// Discriminate the OLE2 formats by their root stream names.
fn sniff_ole2(bytes: &[u8]) -> Option<FormatTag> {
    let compound = match cfb::CompoundFile::open(Cursor::new(bytes)) {
        Ok(compound) => compound,
        Err(e) => {
            tracing::debug!("OLE2 signature present but compound file unreadable: {}", e);
            return None;
        }
    };

    let names: Vec<String> = compound.read_root_storage().map(|entry| entry.name().to_string()).collect();
    let has = |wanted: &str| names.iter().any(|name| name == wanted);

    if has("WordDocument") {
        return Some(FormatTag::Doc);
    }
    if has("Workbook") || has("Book") {
        return Some(FormatTag::Xls);
    }
    if has("PowerPoint Document") {
        return Some(FormatTag::Ppt);
    }
    if has("__properties_version1.0") || names.iter().any(|name| name.starts_with("__substg1.0_")) {
        return Some(FormatTag::Msg);
    }
    None
}

/// Discriminate the ZIP packages by their required manifest member.
fn sniff_zip(bytes: &[u8]) -> Option<FormatTag> {
    let mut archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(e) => {
            tracing::debug!("ZIP signature present but archive unreadable: {}", e);
            return None;
        }
    };

    if archive.by_name("word/document.xml").is_ok() {
        return Some(FormatTag::Docx);
    }
    if archive.by_name("ppt/presentation.xml").is_ok() {
        return Some(FormatTag::Pptx);
    }
    if archive.by_name("xl/workbook.xml").is_ok() {
        return Some(FormatTag::Xlsx);
    }

    let mut mimetype = String::new();
    if let Ok(mut member) = archive.by_name("mimetype") {
        member.read_to_string(&mut mimetype).ok()?;
    }
    let mimetype = mimetype.trim();
    if mimetype.ends_with("opendocument.text") {
        Some(FormatTag::Odt)
    } else if mimetype.ends_with("opendocument.spreadsheet") {
        Some(FormatTag::Ods)
    } else if mimetype.ends_with("opendocument.presentation") {
        Some(FormatTag::Odp)
    } else {
        None
    }
}

/// Classify a text buffer. JSON, HTML and mail content win over the name; a
/// text-family extension then decides before the delimiter heuristic.
fn sniff_text(text: &str, by_name: FormatTag) -> FormatTag {
    let trimmed = text.trim_start();

    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
    {
        return FormatTag::Json;
    }

    let head: String = trimmed.chars().take(256).collect::<String>().to_ascii_lowercase();
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        return FormatTag::Html;
    }

    if trimmed.starts_with("From ") && looks_like_rfc822(trimmed.split_once('\n').map(|(_, rest)| rest).unwrap_or("")) {
        return FormatTag::Mbox;
    }
    if looks_like_rfc822(trimmed) {
        return FormatTag::Eml;
    }

    if by_name.is_textual() {
        return by_name;
    }

    if let Some(tag) = sniff_delimited(text) {
        return tag;
    }

    FormatTag::Txt
}

/// A header block of at least two well-known RFC 822 fields.
fn looks_like_rfc822(text: &str) -> bool {
    let mut known = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            break;
        }
        if line.starts_with([' ', '\t']) {
            continue;
        }
        let Some((name, _)) = line.split_once(':') else {
            return false;
        };
        if name.is_empty() || name.contains(' ') {
            return false;
        }
        if RFC822_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
            known += 1;
        }
    }
    known >= 2
}

/// Same non-zero delimiter count on every sampled line.
fn sniff_delimited(text: &str) -> Option<FormatTag> {
    let sample: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(DELIMITED_SAMPLE_LINES)
        .collect();
    if sample.len() < 2 {
        return None;
    }

    for (delimiter, tag) in [('\t', FormatTag::Tsv), (',', FormatTag::Csv)] {
        let first = sample[0].matches(delimiter).count();
        if first > 0 && sample.iter().all(|line| line.matches(delimiter).count() == first) {
            return Some(tag);
        }
    }
    None
}

/// Decode a buffer that looks like text: UTF-8 (optionally with BOM) or
/// BOM-marked UTF-16, and free of NUL bytes after decoding.
pub(crate) fn decode_text(bytes: &[u8]) -> Option<String> {
    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(bytes)
        && encoding != encoding_rs::UTF_8
    {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return (!had_errors && !text.contains('\0')).then(|| text.into_owned());
    }

    let body = strip_utf8_bom(bytes);
    if body.contains(&0) {
        return None;
    }
    std::str::from_utf8(body).ok().map(str::to_string)
}

fn strip_utf8_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes)
}

fn memfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
