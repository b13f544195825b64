//! Legacy PowerPoint (97-2003) extraction.
//!
//! Text lives in the `PowerPoint Document` stream as a tree of binary
//! records. The slide list (`SlideListWithTextContainer`) carries each slide's
//! placeholder text in order; presentations saved without one are read slide
//! container by slide container instead.

use crate::Result;
use crate::core::config::ExtractionConfig;
use crate::core::format::FormatTag;
use crate::extraction::normalize::normalize_text;
use crate::extraction::ole::{self, read_u16, read_u32};
use crate::types::{Presentation, Slide};

const DOCUMENT_STREAM: &str = "PowerPoint Document";

const RT_SLIDE: u16 = 0x03EE;
const RT_SLIDE_PERSIST_ATOM: u16 = 0x03F3;
const RT_TEXT_HEADER_ATOM: u16 = 0x0F9F;
const RT_TEXT_CHARS_ATOM: u16 = 0x0FA0;
const RT_TEXT_BYTES_ATOM: u16 = 0x0FA8;
const RT_SLIDE_LIST_WITH_TEXT: u16 = 0x0FF0;

/// `SlideListWithTextContainer` instance holding presentation slides (1 is
/// masters, 2 is notes).
const SLIDE_LIST_SLIDES: u16 = 0;

const RECORD_HEADER_LEN: usize = 8;
const MAX_RECORD_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextType {
    Title,
    Body,
    Notes,
}

impl TextType {
    fn from_raw(raw: u32) -> Self {
        match raw {
            0 | 6 => TextType::Title,
            2 => TextType::Notes,
            _ => TextType::Body,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RecordHeader {
    version: u16,
    instance: u16,
    rec_type: u16,
}

impl RecordHeader {
    fn is_container(&self) -> bool {
        self.version == 0x000F
    }
}

/// Sibling records of one level. Bodies that run past the end of the buffer
/// are truncated.
struct Records<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Records<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = (RecordHeader, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let ver_instance = read_u16(self.data, self.offset)?;
        let rec_type = read_u16(self.data, self.offset + 2)?;
        let len = read_u32(self.data, self.offset + 4)? as usize;

        let start = self.offset + RECORD_HEADER_LEN;
        let end = start.saturating_add(len).min(self.data.len());
        self.offset = end;

        let header = RecordHeader {
            version: ver_instance & 0x000F,
            instance: ver_instance >> 4,
            rec_type,
        };
        Some((header, &self.data[start..end]))
    }
}

pub fn read_ppt(bytes: &[u8]) -> Result<Presentation> {
    read_ppt_with_config(bytes, &ExtractionConfig::default())
}

/// Extract a PowerPoint 97-2003 presentation.
///
/// # Errors
///
/// `CorruptContainer` when the bytes are not a compound file or the
/// `PowerPoint Document` stream is missing.
#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_ppt_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<Presentation> {
    let mut file = ole::open(bytes)?;
    let stream = ole::read_stream(&mut file, DOCUMENT_STREAM)?;
    let metadata = ole::summary_information(&mut file);

    let mut slides = slides_from_slide_list(&stream, config);
    if slides.is_empty() {
        tracing::debug!("No slide text list found, reading slide containers");
        slides = slides_from_containers(&stream, config);
    }

    Ok(Presentation {
        format: FormatTag::Ppt,
        metadata,
        slides,
        include_notes: config.include_notes,
    })
}

fn find_records<'a>(data: &'a [u8], rec_type: u16, depth: usize, found: &mut Vec<(RecordHeader, &'a [u8])>) {
    if depth > MAX_RECORD_DEPTH {
        return;
    }
    for (header, body) in Records::new(data) {
        if header.rec_type == rec_type {
            found.push((header, body));
        } else if header.is_container() {
            find_records(body, rec_type, depth + 1, found);
        }
    }
}

fn decode_text_atom(header: &RecordHeader, body: &[u8]) -> Option<String> {
    let raw = match header.rec_type {
        RT_TEXT_CHARS_ATOM => {
            let units: Vec<u16> = body.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
            String::from_utf16_lossy(&units)
        }
        // Latin-1: every byte is its own code point.
        RT_TEXT_BYTES_ATOM => body.iter().map(|&b| char::from(b)).collect(),
        _ => return None,
    };
    Some(clean_text(&raw))
}

/// Paragraph (`\r`) and line (`\x0b`) breaks become newlines; other control
/// characters are dropped.
fn clean_text(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            '\r' | '\u{0b}' | '\n' => Some('\n'),
            '\t' => Some('\t'),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect::<String>()
        .trim()
        .to_string()
}

fn push_text(slide: &mut Slide, kind: TextType, text: String, config: &ExtractionConfig) {
    if text.is_empty() {
        return;
    }
    let text = normalize_text(&text, config);
    match kind {
        TextType::Title if slide.title.is_none() => slide.title = Some(text),
        TextType::Notes => slide.notes.push(text),
        _ => slide.body.push(text),
    }
}

/// Slides from the last slide list in the stream. Incremental saves append a
/// new document record, so earlier lists are stale.
fn slides_from_slide_list(stream: &[u8], config: &ExtractionConfig) -> Vec<Slide> {
    let mut lists = Vec::new();
    find_records(stream, RT_SLIDE_LIST_WITH_TEXT, 0, &mut lists);
    let Some((_, list)) = lists.into_iter().rfind(|(header, _)| header.instance == SLIDE_LIST_SLIDES) else {
        return Vec::new();
    };

    let mut slides: Vec<Slide> = Vec::new();
    let mut kind = TextType::Body;
    for (header, body) in Records::new(list) {
        match header.rec_type {
            RT_SLIDE_PERSIST_ATOM => {
                slides.push(Slide::empty(slides.len() as u32 + 1));
                kind = TextType::Body;
            }
            RT_TEXT_HEADER_ATOM => kind = read_u32(body, 0).map(TextType::from_raw).unwrap_or(TextType::Body),
            RT_TEXT_CHARS_ATOM | RT_TEXT_BYTES_ATOM => {
                let Some(slide) = slides.last_mut() else {
                    continue;
                };
                if let Some(text) = decode_text_atom(&header, body) {
                    push_text(slide, kind, text, config);
                }
            }
            _ => {}
        }
    }
    slides
}

fn slides_from_containers(stream: &[u8], config: &ExtractionConfig) -> Vec<Slide> {
    let mut containers = Vec::new();
    find_records(stream, RT_SLIDE, 0, &mut containers);

    containers
        .into_iter()
        .enumerate()
        .map(|(idx, (_, body))| {
            let mut slide = Slide::empty(idx as u32 + 1);
            let mut kind = TextType::Body;
            collect_container_text(body, &mut slide, &mut kind, config, 0);
            slide
        })
        .collect()
}

fn collect_container_text(data: &[u8], slide: &mut Slide, kind: &mut TextType, config: &ExtractionConfig, depth: usize) {
    if depth > MAX_RECORD_DEPTH {
        return;
    }
    for (header, body) in Records::new(data) {
        match header.rec_type {
            RT_TEXT_HEADER_ATOM => *kind = read_u32(body, 0).map(TextType::from_raw).unwrap_or(TextType::Body),
            RT_TEXT_CHARS_ATOM | RT_TEXT_BYTES_ATOM => {
                if let Some(text) = decode_text_atom(&header, body) {
                    push_text(slide, *kind, text, config);
                }
            }
            _ if header.is_container() => collect_container_text(body, slide, kind, config, depth + 1),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SharetextError;
    use crate::extraction::ole::tests::{compound_file, summary_stream};
    use crate::types::Content;

    const RT_DOCUMENT: u16 = 0x03E8;
    const RT_PPDRAWING: u16 = 0x040C;

    fn atom(rec_type: u16, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&rec_type.to_le_bytes());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    fn container(rec_type: u16, instance: u16, children: &[Vec<u8>]) -> Vec<u8> {
        let body = children.concat();
        let mut out = Vec::new();
        out.extend_from_slice(&(0x000F | (instance << 4)).to_le_bytes());
        out.extend_from_slice(&rec_type.to_le_bytes());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    fn text_header(kind: u32) -> Vec<u8> {
        atom(RT_TEXT_HEADER_ATOM, &kind.to_le_bytes())
    }

    fn chars(text: &str) -> Vec<u8> {
        let body: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        atom(RT_TEXT_CHARS_ATOM, &body)
    }

    fn bytes_atom(text: &[u8]) -> Vec<u8> {
        atom(RT_TEXT_BYTES_ATOM, text)
    }

    fn persist() -> Vec<u8> {
        atom(RT_SLIDE_PERSIST_ATOM, &[0u8; 20])
    }

    #[test]
    fn test_slide_list_text() {
        let masters = container(RT_SLIDE_LIST_WITH_TEXT, 1, &[persist(), text_header(0), chars("Master title")]);
        let slides = container(
            RT_SLIDE_LIST_WITH_TEXT,
            0,
            &[
                persist(),
                text_header(0),
                chars("Kickoff"),
                text_header(1),
                bytes_atom(b"Agenda\rCaf\xE9 at ten"),
                persist(),
                text_header(6),
                chars("Wrap up"),
                text_header(2),
                chars("Thank the team"),
            ],
        );
        let stream = container(RT_DOCUMENT, 0, &[masters, slides]);
        let summary = summary_stream("Offsite", "Lee", 0);
        let bytes = compound_file(&[(DOCUMENT_STREAM, &stream), ("\u{5}SummaryInformation", &summary)]);

        let deck = read_ppt(&bytes).unwrap();
        assert_eq!(deck.format, FormatTag::Ppt);
        assert_eq!(deck.metadata.title.as_deref(), Some("Offsite"));
        assert_eq!(deck.slides.len(), 2);
        assert_eq!(deck.slides[0].title.as_deref(), Some("Kickoff"));
        assert_eq!(deck.slides[0].body, vec!["Agenda\nCafé at ten"]);
        assert_eq!(deck.slides[1].number, 2);
        assert_eq!(deck.slides[1].title.as_deref(), Some("Wrap up"));
        assert_eq!(deck.slides[1].notes, vec!["Thank the team"]);
        assert_eq!(deck.full_text(), "Kickoff\nAgenda\nCafé at ten\n\nWrap up");
    }

    #[test]
    fn test_slide_containers_fallback() {
        let slide = |title: &str, body: &str| {
            container(
                RT_SLIDE,
                0,
                &[container(RT_PPDRAWING, 0, &[text_header(0), chars(title), text_header(1), chars(body)])],
            )
        };
        let stream = [slide("First", "alpha"), slide("Second", "beta")].concat();
        let bytes = compound_file(&[(DOCUMENT_STREAM, &stream)]);

        let deck = read_ppt(&bytes).unwrap();
        let titles: Vec<_> = deck.slides.iter().filter_map(|s| s.title.as_deref()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
        assert_eq!(deck.slides[1].body, vec!["beta"]);
        assert!(deck.metadata.is_empty());
    }

    #[test]
    fn test_truncated_record_is_clamped() {
        let mut stream = container(RT_SLIDE_LIST_WITH_TEXT, 0, &[persist(), text_header(0), chars("Cut")]);
        // Claim a longer body than the buffer holds.
        stream[4..8].copy_from_slice(&10_000u32.to_le_bytes());
        let slides = slides_from_slide_list(&stream, &ExtractionConfig::default());
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].title.as_deref(), Some("Cut"));
    }

    #[test]
    fn test_clean_text_controls() {
        assert_eq!(clean_text("one\u{0b}two\rthree\u{1}"), "one\ntwo\nthree");
    }

    #[test]
    fn test_missing_document_stream() {
        let bytes = compound_file(&[("WordDocument", b"nope")]);
        let err = read_ppt(&bytes).unwrap_err();
        assert!(matches!(err, SharetextError::CorruptContainer { .. }));
    }

    #[test]
    fn test_not_a_compound_file() {
        let err = read_ppt(b"plain bytes, not OLE2").unwrap_err();
        assert!(matches!(err, SharetextError::CorruptContainer { .. }));
    }
}
