//! Legacy Word (97-2003) extraction.
//!
//! The `WordDocument` stream starts with the FIB, which names the table stream
//! (`0Table` or `1Table`) and the location of the piece table (CLX). Each piece
//! maps a run of character positions to either UTF-16LE or compressed cp1252
//! bytes in the `WordDocument` stream. Only the main document story is read.
//!
//! Paragraphs end with `\r`; table cells end with `\x07` and a second `\x07`
//! closes the row. Field codes (`\x13` … `\x14`) are dropped and the field
//! result (`\x14` … `\x15`) kept.

use crate::core::config::ExtractionConfig;
use crate::core::format::FormatTag;
use crate::extraction::normalize::normalize_text;
use crate::extraction::ole::{self, decode_codepage, read_u16, read_u32};
use crate::types::{Block, Paragraph, Table, TextDocument};
use crate::{Result, SharetextError};

const WORD_STREAM: &str = "WordDocument";
const WORD_IDENT: u16 = 0xA5EC;

const FIB_FLAGS: usize = 0x0A;
const FIB_FC_MIN: usize = 0x18;
const FIB_FC_MAC: usize = 0x1C;
const FIB_BASE_LEN: usize = 32;
const F_WHICH_TBL_STM: u16 = 0x0200;

/// Index of the `fcClx`/`lcbClx` pair in `FibRgFcLcb97`.
const CLX_PAIR_INDEX: usize = 33;
/// Index of `ccpText` in `FibRgLw97`.
const CCP_TEXT_INDEX: usize = 3;

const CLXT_PRC: u8 = 0x01;
const CLXT_PCDT: u8 = 0x02;
const PCD_LEN: usize = 8;
const FC_COMPRESSED: u32 = 0x4000_0000;

const PARAGRAPH_END: char = '\r';
const CELL_MARK: char = '\u{07}';
const FIELD_BEGIN: char = '\u{13}';
const FIELD_SEPARATOR: char = '\u{14}';
const FIELD_END: char = '\u{15}';

#[derive(Debug)]
struct Fib {
    table_stream: &'static str,
    fc_min: u32,
    fc_mac: u32,
    ccp_text: Option<u32>,
    clx: Option<(u32, u32)>,
}

#[derive(Debug, Clone, Copy)]
struct Piece {
    cp_start: u32,
    cp_end: u32,
    fc: u32,
}

impl Piece {
    fn is_compressed(&self) -> bool {
        self.fc & FC_COMPRESSED != 0
    }
}

pub fn read_doc(bytes: &[u8]) -> Result<TextDocument> {
    read_doc_with_config(bytes, &ExtractionConfig::default())
}

/// Extract a Word 97-2003 document.
///
/// # Errors
///
/// `CorruptContainer` when the bytes are not a compound file, the
/// `WordDocument` stream is missing or its FIB is not a Word 97+ FIB.
#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_doc_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<TextDocument> {
    let mut file = ole::open(bytes)?;
    let word = ole::read_stream(&mut file, WORD_STREAM)?;
    let fib = parse_fib(&word)?;

    let pieces = ole::read_optional_stream(&mut file, fib.table_stream).and_then(|table| {
        let (fc_clx, lcb_clx) = fib.clx?;
        parse_piece_table(&table, fc_clx as usize, lcb_clx as usize)
    });

    let text = match pieces {
        Some(pieces) if !pieces.is_empty() => decode_pieces(&word, &pieces, fib.ccp_text),
        _ => {
            tracing::warn!("No usable piece table in {}, reading the FIB text range", fib.table_stream);
            decode_fib_range(&word, &fib)
        }
    };

    let mut document = TextDocument::new(FormatTag::Doc);
    document.metadata = ole::summary_information(&mut file);
    document.blocks = split_blocks(&strip_field_codes(&text), config);
    Ok(document)
}

fn parse_fib(word: &[u8]) -> Result<Fib> {
    if read_u16(word, 0) != Some(WORD_IDENT) {
        return Err(SharetextError::corrupt_container(
            "WordDocument stream does not start with a Word 97-2003 FIB",
        ));
    }
    let flags = read_u16(word, FIB_FLAGS).unwrap_or(0);
    let table_stream = if flags & F_WHICH_TBL_STM != 0 { "1Table" } else { "0Table" };

    // FibBase, then csw + FibRgW, cslw + FibRgLw, cbRgFcLcb + FibRgFcLcb.
    let rg_lw = read_u16(word, FIB_BASE_LEN).map(|csw| FIB_BASE_LEN + 2 + csw as usize * 2);
    let cslw = rg_lw.and_then(|offset| read_u16(word, offset));
    let ccp_text = rg_lw.and_then(|offset| read_u32(word, offset + 2 + CCP_TEXT_INDEX * 4));
    let clx = rg_lw.zip(cslw).and_then(|(offset, cslw)| {
        let rg_fc_lcb = offset + 2 + cslw as usize * 4 + 2;
        let pair = rg_fc_lcb + CLX_PAIR_INDEX * 8;
        Some((read_u32(word, pair)?, read_u32(word, pair + 4)?))
    });

    Ok(Fib {
        table_stream,
        fc_min: read_u32(word, FIB_FC_MIN).unwrap_or(0),
        fc_mac: read_u32(word, FIB_FC_MAC).unwrap_or(0),
        ccp_text,
        clx: clx.filter(|(_, lcb)| *lcb > 0),
    })
}

/// Pieces from the CLX: any number of `Prc` entries followed by one `Pcdt`.
fn parse_piece_table(table: &[u8], fc_clx: usize, lcb_clx: usize) -> Option<Vec<Piece>> {
    let clx = table.get(fc_clx..fc_clx.checked_add(lcb_clx)?)?;
    let mut pos = 0;
    while pos < clx.len() {
        match clx[pos] {
            CLXT_PRC => {
                let cb = read_u16(clx, pos + 1)? as i16;
                pos += 3 + usize::try_from(cb).ok()?;
            }
            CLXT_PCDT => {
                let lcb = read_u32(clx, pos + 1)? as usize;
                let plc = clx.get(pos + 5..(pos + 5).checked_add(lcb)?)?;
                return Some(parse_plc_pcd(plc));
            }
            other => {
                tracing::debug!("Unexpected CLX entry type {:#04x}", other);
                return None;
            }
        }
    }
    None
}

/// A PlcPcd holds n+1 character positions followed by n 8-byte descriptors.
fn parse_plc_pcd(plc: &[u8]) -> Vec<Piece> {
    let count = plc.len().saturating_sub(4) / (4 + PCD_LEN);
    let descriptors = (count + 1) * 4;
    (0..count)
        .filter_map(|i| {
            Some(Piece {
                cp_start: read_u32(plc, i * 4)?,
                cp_end: read_u32(plc, (i + 1) * 4)?,
                fc: read_u32(plc, descriptors + i * PCD_LEN + 2)?,
            })
        })
        .collect()
}

fn decode_pieces(word: &[u8], pieces: &[Piece], ccp_text: Option<u32>) -> String {
    let limit = ccp_text.unwrap_or(u32::MAX);
    let mut text = String::new();
    for piece in pieces {
        if piece.cp_start >= limit {
            break;
        }
        let chars = (piece.cp_end.min(limit).saturating_sub(piece.cp_start)) as usize;
        if piece.is_compressed() {
            let start = ((piece.fc & !FC_COMPRESSED) / 2) as usize;
            match word.get(start..start + chars) {
                Some(bytes) => text.push_str(&decode_codepage(bytes, Some(1252))),
                None => tracing::debug!("Piece at {} runs past the WordDocument stream", start),
            }
        } else {
            let start = piece.fc as usize;
            match word.get(start..start + chars * 2) {
                Some(bytes) => text.push_str(&decode_utf16le(bytes)),
                None => tracing::debug!("Piece at {} runs past the WordDocument stream", start),
            }
        }
    }
    text
}

fn decode_fib_range(word: &[u8], fib: &Fib) -> String {
    let Some(bytes) = word.get(fib.fc_min as usize..fib.fc_mac as usize) else {
        return String::new();
    };
    // Unicode text has a zero high byte for most Latin characters.
    let zero_high_bytes = bytes.iter().skip(1).step_by(2).filter(|b| **b == 0).count();
    if zero_high_bytes * 4 > bytes.len() {
        decode_utf16le(bytes)
    } else {
        decode_codepage(bytes, Some(1252))
    }
}

fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
    String::from_utf16_lossy(&units)
}

/// Drop field instructions, keep field results. Fields nest.
fn strip_field_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // One entry per open field: true while still in its instruction part.
    let mut fields: Vec<bool> = Vec::new();
    for c in text.chars() {
        match c {
            FIELD_BEGIN => fields.push(true),
            FIELD_SEPARATOR => {
                if let Some(in_code) = fields.last_mut() {
                    *in_code = false;
                }
            }
            FIELD_END => {
                fields.pop();
            }
            _ if fields.iter().any(|in_code| *in_code) => {}
            c => out.push(c),
        }
    }
    out
}

fn clean_run(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            '\u{0b}' => Some('\n'),
            '\u{1e}' => Some('-'),
            '\t' | '\n' => Some(c),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    cell_paragraphs: Vec<String>,
    row: Vec<String>,
    table: Vec<Vec<String>>,
    last_was_cell_mark: bool,
}

impl BlockBuilder {
    fn close_table(&mut self) {
        if !self.row.is_empty() {
            self.table.push(std::mem::take(&mut self.row));
        }
        if !self.table.is_empty() {
            self.blocks.push(Block::Table(Table {
                rows: std::mem::take(&mut self.table),
            }));
        }
    }

    fn end_paragraph(&mut self, text: String, config: &ExtractionConfig) {
        let text = normalize_text(clean_run(&text).trim(), config);
        if !self.row.is_empty() {
            self.cell_paragraphs.push(text);
            return;
        }
        self.close_table();
        if !text.is_empty() {
            self.blocks.push(Block::Paragraph(Paragraph { text, style: None }));
        }
    }

    fn end_cell(&mut self, text: String, config: &ExtractionConfig) {
        if self.last_was_cell_mark && text.is_empty() {
            self.table.push(std::mem::take(&mut self.row));
            return;
        }
        let mut paragraphs = std::mem::take(&mut self.cell_paragraphs);
        paragraphs.push(normalize_text(clean_run(&text).trim(), config));
        paragraphs.retain(|p| !p.is_empty());
        self.row.push(paragraphs.join("\n"));
    }
}

fn split_blocks(text: &str, config: &ExtractionConfig) -> Vec<Block> {
    let mut builder = BlockBuilder::default();
    let mut current = String::new();
    for c in text.chars() {
        match c {
            PARAGRAPH_END | '\u{0c}' => {
                builder.end_paragraph(std::mem::take(&mut current), config);
                builder.last_was_cell_mark = false;
            }
            CELL_MARK => {
                builder.end_cell(std::mem::take(&mut current), config);
                builder.last_was_cell_mark = !builder.last_was_cell_mark;
            }
            c => {
                current.push(c);
                builder.last_was_cell_mark = false;
            }
        }
    }
    builder.end_paragraph(current, config);
    builder.close_table();
    builder.blocks
}
