//! PDF extraction with `lopdf`.
//!
//! Pages are keyed by their 1-based page number. Text comes from lopdf's
//! content-stream text extraction; image XObjects referenced from a page's
//! resources become [`ImageRecord`]s with the stored (still encoded) stream
//! bytes.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::Result;
use crate::core::config::ExtractionConfig;
use crate::extraction::normalize::normalize_text;
use crate::types::{ImageRecord, Metadata, Page, PdfDocument};

pub fn read_pdf(bytes: &[u8]) -> Result<PdfDocument> {
    read_pdf_with_config(bytes, &ExtractionConfig::default())
}

/// Extract a PDF document.
///
/// # Errors
///
/// `CorruptContainer` when lopdf cannot load the document (broken xref,
/// truncated objects, unsupported encryption).
#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_pdf_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<PdfDocument> {
    let document = Document::load_mem(bytes)?;
    let metadata = info_metadata(&document);

    let mut pages = BTreeMap::new();
    for (number, page_id) in document.get_pages() {
        let text = match document.extract_text(&[number]) {
            Ok(text) => normalize_text(text.trim_end(), config),
            Err(e) => {
                tracing::debug!("No text extracted from page {}: {}", number, e);
                String::new()
            }
        };
        let images = if config.extract_images {
            page_images(&document, page_id)
        } else {
            Vec::new()
        };
        pages.insert(number, Page { text, images });
    }

    Ok(PdfDocument { metadata, pages })
}

fn info_metadata(document: &Document) -> Metadata {
    let info = match document.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => document.get_dictionary(*id).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };
    let Some(info) = info else {
        return Metadata::default();
    };

    let field = |key: &[u8]| {
        info.get(key)
            .ok()
            .and_then(pdf_string)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    Metadata {
        title: field(b"Title"),
        author: field(b"Author"),
        subject: field(b"Subject"),
        keywords: field(b"Keywords"),
        created: field(b"CreationDate").map(|date| pdf_date_to_iso(&date)),
        modified: field(b"ModDate").map(|date| pdf_date_to_iso(&date)),
        ..Default::default()
    }
}

/// A text string: UTF-16BE with BOM, UTF-8, or single-byte text otherwise.
fn pdf_string(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => {
            if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
                let units: Vec<u16> = utf16.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
                Some(String::from_utf16_lossy(&units))
            } else {
                Some(
                    String::from_utf8(bytes.clone())
                        .unwrap_or_else(|_| bytes.iter().map(|&b| char::from(b)).collect()),
                )
            }
        }
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// `D:YYYYMMDDHHmmSS+HH'mm'` as `YYYY-MM-DDTHH:MM:SS+HH:MM`. Missing fields
/// default as the PDF date format prescribes; unparseable input is kept.
fn pdf_date_to_iso(raw: &str) -> String {
    let date = raw.trim().strip_prefix("D:").unwrap_or(raw.trim());
    let digits: String = date.chars().take_while(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return raw.to_string();
    }
    let part = |start: usize, len: usize, default: &'static str| digits.get(start..start + len).unwrap_or(default);
    let mut iso = format!(
        "{}-{}-{}T{}:{}:{}",
        part(0, 4, "0000"),
        part(4, 2, "01"),
        part(6, 2, "01"),
        part(8, 2, "00"),
        part(10, 2, "00"),
        part(12, 2, "00")
    );

    let zone = &date[digits.len()..];
    match zone.chars().next() {
        Some('Z') => iso.push('Z'),
        Some(sign @ ('+' | '-')) => {
            let zone_digits: String = zone[1..].chars().filter(char::is_ascii_digit).collect();
            if zone_digits.len() >= 2 {
                let minutes = zone_digits.get(2..4).unwrap_or("00");
                iso.push_str(&format!("{}{}:{}", sign, &zone_digits[..2], minutes));
            }
        }
        _ => {}
    }
    iso
}

fn resolve_dictionary<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match object {
        Object::Reference(id) => document.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn page_images(document: &Document, page_id: ObjectId) -> Vec<ImageRecord> {
    let Some(xobjects) = document
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Resources").ok())
        .and_then(|resources| resolve_dictionary(document, resources))
        .and_then(|resources| resources.get(b"XObject").ok())
        .and_then(|xobjects| resolve_dictionary(document, xobjects))
    else {
        return Vec::new();
    };

    let mut images = Vec::new();
    for (name, object) in xobjects.iter() {
        let Ok(id) = object.as_reference() else {
            continue;
        };
        let stream = match document.get_object(id) {
            Ok(Object::Stream(stream)) => stream,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("Skipping unreadable XObject {:?}: {}", id, e);
                continue;
            }
        };
        let dict = &stream.dict;
        if !matches!(dict.get(b"Subtype"), Ok(Object::Name(subtype)) if subtype.as_slice() == b"Image") {
            continue;
        }

        let dimension = |key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(|value| value.as_i64().ok())
                .and_then(|value| u32::try_from(value).ok())
        };
        images.push(ImageRecord {
            index: images.len(),
            name: String::from_utf8_lossy(name).into_owned(),
            width: dimension(b"Width"),
            height: dimension(b"Height"),
            format: image_format(dict).to_string(),
            data: stream.content.clone(),
            caption: None,
        });
    }
    images
}

/// Image format named by the innermost stream filter.
fn image_format(dict: &Dictionary) -> &'static str {
    let filter = match dict.get(b"Filter") {
        Ok(Object::Name(name)) => Some(name.as_slice()),
        Ok(Object::Array(filters)) => filters.iter().rev().find_map(|f| match f {
            Object::Name(name) => Some(name.as_slice()),
            _ => None,
        }),
        _ => None,
    };
    match filter {
        Some(b"DCTDecode") => "jpeg",
        Some(b"JPXDecode") => "jp2",
        Some(b"CCITTFaxDecode") => "tiff",
        Some(b"JBIG2Decode") => "jbig2",
        _ => "raw",
    }
}
