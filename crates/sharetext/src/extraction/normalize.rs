//! Shared normalization helpers: whitespace, spreadsheet headers and image formats.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::core::config::ExtractionConfig;
use crate::types::{CellValue, Sheet};

/// Trim trailing whitespace on every line and squeeze runs of blank lines into
/// one. Leading and trailing blank lines are dropped.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_blank = false;

    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if pending_blank {
                out.push('\n');
            }
        }
        out.push_str(line);
        pending_blank = false;
    }
    out
}

/// Apply the whitespace policy of `config` to one text unit.
pub fn normalize_text(text: &str, config: &ExtractionConfig) -> String {
    if config.collapse_blank_lines {
        collapse_blank_lines(text)
    } else {
        text.to_string()
    }
}

/// Spreadsheet column letter for a 0-based index: 0 is `A`, 26 is `AA`.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Unique column keys for a header row.
///
/// Empty cells take their column letter. A repeated name gets the first free
/// `_2`, `_3`, ... suffix that is neither already used nor a literal header
/// appearing elsewhere in the row.
pub fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let named: Vec<String> = raw
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let name = name.trim();
            if name.is_empty() {
                column_letter(idx)
            } else {
                name.to_string()
            }
        })
        .collect();

    let literal: HashSet<&str> = named.iter().map(String::as_str).collect();
    let mut used: HashSet<String> = HashSet::with_capacity(named.len());
    let mut columns = Vec::with_capacity(named.len());

    for name in &named {
        if used.insert(name.clone()) {
            columns.push(name.clone());
            continue;
        }
        let mut suffix = 2usize;
        loop {
            let candidate = format!("{}_{}", name, suffix);
            if !literal.contains(candidate.as_str()) && used.insert(candidate.clone()) {
                columns.push(candidate);
                break;
            }
            suffix += 1;
        }
    }
    columns
}

/// Build a [`Sheet`] from a raw cell grid.
///
/// The first row with a non-empty cell is the header row; rows above it are
/// dropped, as are rows below it whose cells are all empty. Rows wider than
/// the header get letter-named columns.
pub fn sheet_from_grid(name: &str, grid: Vec<Vec<CellValue>>) -> Sheet {
    let mut rows = grid.into_iter().skip_while(|row| row.iter().all(CellValue::is_empty));

    let Some(header) = rows.next() else {
        return Sheet {
            name: name.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
        };
    };

    let body: Vec<Vec<CellValue>> = rows.filter(|row| !row.iter().all(CellValue::is_empty)).collect();
    let width = body.iter().map(Vec::len).chain(std::iter::once(header.len())).max().unwrap_or(0);

    let mut raw_header: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
    raw_header.resize(width, String::new());
    let columns = dedupe_headers(&raw_header);

    let records = body
        .into_iter()
        .map(|row| {
            let mut record = IndexMap::with_capacity(columns.len());
            let mut cells = row.into_iter();
            for column in &columns {
                record.insert(column.clone(), cells.next().unwrap_or(CellValue::Empty));
            }
            record
        })
        .collect();

    Sheet {
        name: name.to_string(),
        columns,
        rows: records,
    }
}

/// Short image format name from magic bytes, falling back to the extension of
/// `name` and then to `"unknown"`.
pub fn detect_image_format(data: &[u8], name: &str) -> String {
    let magic = if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpeg")
    } else if data.starts_with(b"GIF8") {
        Some("gif")
    } else if data.starts_with(b"BM") {
        Some("bmp")
    } else if data.starts_with(b"II\x2A\x00") || data.starts_with(b"MM\x00\x2A") {
        Some("tiff")
    } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("webp")
    } else if data.len() >= 44 && &data[40..44] == b" EMF" {
        Some("emf")
    } else if data.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A]) || data.starts_with(&[0x01, 0x00, 0x09, 0x00]) {
        Some("wmf")
    } else if looks_like_svg(data) {
        Some("svg")
    } else {
        None
    };

    if let Some(format) = magic {
        return format.to_string();
    }

    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.len() <= 5 => match ext.to_ascii_lowercase().as_str() {
            "jpg" => "jpeg".to_string(),
            "tif" => "tiff".to_string(),
            other => other.to_string(),
        },
        _ => "unknown".to_string(),
    }
}

fn looks_like_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(512)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"))
}

/// EMU (English Metric Units) to pixels at 96 dpi.
pub fn emu_to_pixels(emu: &str) -> Option<u32> {
    emu.trim()
        .parse::<u64>()
        .ok()
        .map(|value| value / 9525)
        .and_then(|px| u32::try_from(px).ok())
}
