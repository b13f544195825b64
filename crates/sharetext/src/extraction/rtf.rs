//! RTF (Rich Text Format) extraction.
//!
//! A single pass over the control-word stream. Every `{ }` group inherits the
//! destination of its parent. Destinations that carry no body text (font and
//! color tables, stylesheets, list tables) are skipped. `\info`, headers, footers,
//! footnotes, field instructions and pictures are captured into their own
//! buffers and land in the matching [`TextDocument`] fields when their group closes.

use std::mem;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::config::ExtractionConfig;
use crate::core::format::FormatTag;
use crate::extraction::normalize::{detect_image_format, normalize_text};
use crate::extraction::ole::decode_codepage;
use crate::types::{Block, HeaderFooter, HeaderFooterKind, Hyperlink, ImageRecord, Note, Paragraph, Table, TextDocument};
use crate::{Result, SharetextError};

const DEFAULT_CODEPAGE: i64 = 1252;
const TWIPS_PER_PIXEL: i32 = 15;

static HYPERLINK_INSTRUCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*HYPERLINK\s+(\\l\s+)?(?:"([^"]*)"|(\S+))"#)
        .expect("Hyperlink field regex pattern is valid and should compile")
});

/// Destinations whose text never belongs to the document body.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "listtable",
    "listoverridetable",
    "revtbl",
    "filetbl",
    "nonshppict",
    "pntext",
    "listtext",
    "ftnsep",
    "ftnsepc",
    "aftnsep",
    "xe",
    "tc",
];

pub fn read_rtf(bytes: &[u8]) -> Result<TextDocument> {
    read_rtf_with_config(bytes, &ExtractionConfig::default())
}

/// Extract an RTF document.
///
/// # Errors
///
/// `CorruptContainer` when the bytes do not start with an `{\rtf` group.
/// Unbalanced groups and unknown control words are tolerated.
#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_rtf_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<TextDocument> {
    let source = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes).trim_ascii_start();
    if !source.starts_with(b"{\\rtf") {
        return Err(SharetextError::corrupt_container("missing {\\rtf header"));
    }

    let mut parser = RtfParser::new(source, config);
    parser.run();
    Ok(parser.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    Body,
    /// Inside `\info`: only the known property groups are read.
    Info,
    /// Text goes to the innermost [`Sink`].
    Capture,
    Skip,
}

#[derive(Debug, Clone, Copy)]
struct Group {
    destination: Destination,
    /// Fallback characters to drop after each `\uN`.
    unicode_skip: usize,
}

impl Group {
    const ROOT: Group = Group {
        destination: Destination::Body,
        unicode_skip: 1,
    };
}

#[derive(Debug, Clone, Copy)]
enum InfoField {
    Title,
    Subject,
    Author,
    Keywords,
    Operator,
}

#[derive(Debug, Clone, Copy)]
enum DateField {
    Created,
    Revised,
}

#[derive(Debug, Clone, Copy, Default)]
struct DateParts {
    year: Option<i32>,
    month: Option<i32>,
    day: Option<i32>,
    hour: Option<i32>,
    minute: Option<i32>,
}

impl DateParts {
    fn to_iso(self) -> Option<String> {
        Some(format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:00",
            self.year?,
            self.month?,
            self.day?,
            self.hour.unwrap_or(0),
            self.minute.unwrap_or(0)
        ))
    }
}

#[derive(Debug, Default)]
struct PictureInfo {
    format: Option<&'static str>,
    width: Option<u32>,
    height: Option<u32>,
    /// Payload given through `\binN` instead of hex digits.
    binary: Vec<u8>,
}

#[derive(Debug)]
enum SinkKind {
    Info(InfoField),
    Date(DateField, DateParts),
    HeaderFooter { footer: bool, kind: HeaderFooterKind },
    Footnote,
    FieldInstruction,
    Picture(PictureInfo),
}

#[derive(Debug)]
struct Sink {
    /// Group depth that opened the destination; the sink closes with it.
    depth: usize,
    kind: SinkKind,
    text: String,
}

#[derive(Debug)]
struct Field {
    depth: usize,
    instruction: String,
    result: String,
}

/// Paragraphs and tables of the body in source order.
#[derive(Debug, Default)]
struct BodyBuilder {
    blocks: Vec<Block>,
    paragraph: String,
    style: Option<String>,
    in_table: bool,
    cell: String,
    row: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl BodyBuilder {
    fn push_text(&mut self, text: &str) {
        if self.in_table {
            if !self.paragraph.trim().is_empty() {
                self.push_paragraph();
            }
            self.cell.push_str(text);
        } else {
            self.close_table();
            self.paragraph.push_str(text);
        }
    }

    fn end_paragraph(&mut self) {
        if self.in_table {
            self.cell.push('\n');
        } else {
            self.close_table();
            self.push_paragraph();
        }
    }

    fn push_paragraph(&mut self) {
        let text = mem::take(&mut self.paragraph);
        let text = text.trim();
        if !text.is_empty() {
            self.blocks.push(Block::Paragraph(Paragraph {
                text: text.to_string(),
                style: self.style.clone(),
            }));
        }
    }

    fn end_cell(&mut self) {
        let cell = mem::take(&mut self.cell);
        self.row.push(cell.trim().to_string());
    }

    fn end_row(&mut self) {
        if !self.cell.trim().is_empty() {
            self.end_cell();
        }
        let row = mem::take(&mut self.row);
        if !row.is_empty() {
            self.rows.push(row);
        }
    }

    fn close_table(&mut self) {
        if !self.cell.trim().is_empty() || !self.row.is_empty() {
            self.end_row();
        }
        self.cell.clear();
        if !self.rows.is_empty() {
            self.blocks.push(Block::Table(Table {
                rows: mem::take(&mut self.rows),
            }));
        }
    }

    fn finish(mut self) -> Vec<Block> {
        if !self.paragraph.trim().is_empty() {
            self.in_table = false;
            self.end_paragraph();
        }
        self.close_table();
        self.blocks
    }
}

struct RtfParser<'a> {
    bytes: &'a [u8],
    pos: usize,
    config: &'a ExtractionConfig,
    groups: Vec<Group>,
    codepage: i64,
    /// Undecoded text bytes; multi-byte code pages need whole runs.
    pending: Vec<u8>,
    unicode_skip_remaining: usize,
    high_surrogate: Option<u16>,
    /// Set by `\*`: the next control word names an optional destination.
    ignorable: bool,
    body: BodyBuilder,
    sinks: Vec<Sink>,
    fields: Vec<Field>,
    doc: TextDocument,
}

impl<'a> RtfParser<'a> {
    fn new(bytes: &'a [u8], config: &'a ExtractionConfig) -> Self {
        Self {
            bytes,
            pos: 0,
            config,
            groups: vec![Group::ROOT],
            codepage: DEFAULT_CODEPAGE,
            pending: Vec::new(),
            unicode_skip_remaining: 0,
            high_surrogate: None,
            ignorable: false,
            body: BodyBuilder::default(),
            sinks: Vec::new(),
            fields: Vec::new(),
            doc: TextDocument::new(FormatTag::Rtf),
        }
    }

    fn run(&mut self) {
        while let Some(&byte) = self.bytes.get(self.pos) {
            self.pos += 1;
            match byte {
                b'{' => {
                    self.flush();
                    let group = self.current();
                    self.groups.push(group);
                }
                b'}' => {
                    self.flush();
                    self.close_group();
                }
                b'\\' => self.control(),
                b'\r' | b'\n' => {}
                _ => self.text_byte(byte),
            }
        }
        self.flush();
    }

    fn finish(mut self) -> TextDocument {
        while let Some(sink) = self.sinks.pop() {
            self.finish_sink(sink);
        }
        while let Some(field) = self.fields.pop() {
            self.finish_field(field);
        }

        let config = self.config;
        let mut doc = self.doc;
        doc.blocks = self
            .body
            .finish()
            .into_iter()
            .map(|block| match block {
                Block::Paragraph(paragraph) => Block::Paragraph(Paragraph {
                    text: normalize_text(&paragraph.text, config),
                    style: paragraph.style,
                }),
                table => table,
            })
            .collect();
        doc
    }

    fn current(&self) -> Group {
        self.groups.last().copied().unwrap_or(Group::ROOT)
    }

    fn set_destination(&mut self, destination: Destination) {
        if let Some(group) = self.groups.last_mut() {
            group.destination = destination;
        }
    }

    fn close_group(&mut self) {
        let depth = self.groups.len();
        while self.sinks.last().is_some_and(|sink| sink.depth >= depth) {
            if let Some(sink) = self.sinks.pop() {
                self.finish_sink(sink);
            }
        }
        while self.fields.last().is_some_and(|field| field.depth >= depth) {
            if let Some(field) = self.fields.pop() {
                self.finish_field(field);
            }
        }
        if self.groups.len() > 1 {
            self.groups.pop();
        }
        self.unicode_skip_remaining = 0;
        self.ignorable = false;
    }

    fn text_byte(&mut self, byte: u8) {
        if matches!(self.current().destination, Destination::Skip | Destination::Info) {
            return;
        }
        if self.unicode_skip_remaining > 0 {
            self.unicode_skip_remaining -= 1;
            return;
        }
        self.pending.push(byte);
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let bytes = mem::take(&mut self.pending);
        let text = decode_codepage(&bytes, Some(self.codepage));
        self.emit(&text);
    }

    fn emit(&mut self, text: &str) {
        match self.current().destination {
            Destination::Body => {
                self.body.push_text(text);
                if let Some(field) = self.fields.last_mut() {
                    field.result.push_str(text);
                }
            }
            Destination::Capture => {
                if let Some(sink) = self.sinks.last_mut() {
                    sink.text.push_str(text);
                }
            }
            Destination::Info | Destination::Skip => {}
        }
    }

    fn control(&mut self) {
        let Some(&next) = self.bytes.get(self.pos) else {
            return;
        };
        if next.is_ascii_alphabetic() {
            let (word, param) = self.read_control_word();
            self.flush();
            self.control_word(&word, param);
            return;
        }

        self.pos += 1;
        match next {
            b'\'' => {
                let byte = self
                    .bytes
                    .get(self.pos..self.pos + 2)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                if let Some(byte) = byte {
                    self.pos += 2;
                    self.text_byte(byte);
                }
            }
            b'\\' | b'{' | b'}' => self.text_byte(next),
            b'*' => self.ignorable = true,
            b'~' => {
                self.flush();
                self.emit("\u{a0}");
            }
            b'_' => {
                self.flush();
                self.emit("-");
            }
            b'\r' | b'\n' => {
                self.flush();
                self.paragraph_break();
            }
            _ => {}
        }
    }

    fn read_control_word(&mut self) -> (String, Option<i32>) {
        let start = self.pos;
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_alphabetic) {
            self.pos += 1;
        }
        let word = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();

        let number_start = self.pos;
        if self.bytes.get(self.pos) == Some(&b'-') && self.bytes.get(self.pos + 1).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        let param = std::str::from_utf8(&self.bytes[number_start..self.pos])
            .ok()
            .and_then(|number| number.parse::<i32>().ok());

        if self.bytes.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
        (word, param)
    }

    fn control_word(&mut self, word: &str, param: Option<i32>) {
        let ignorable = mem::take(&mut self.ignorable);
        let destination = self.current().destination;

        match word {
            "bin" => {
                let length = param.unwrap_or(0).max(0) as usize;
                let end = (self.pos + length).min(self.bytes.len());
                if destination == Destination::Capture
                    && let Some(Sink {
                        kind: SinkKind::Picture(picture),
                        ..
                    }) = self.sinks.last_mut()
                {
                    picture.binary.extend_from_slice(&self.bytes[self.pos..end]);
                }
                self.pos = end;
                return;
            }
            "uc" => {
                if let Some(group) = self.groups.last_mut() {
                    group.unicode_skip = param.unwrap_or(1).max(0) as usize;
                }
                return;
            }
            _ => {}
        }

        match destination {
            Destination::Skip => return,
            Destination::Info => {
                self.info_word(word);
                return;
            }
            Destination::Body | Destination::Capture => {}
        }

        if ignorable {
            match word {
                "fldinst" => self.start_sink(SinkKind::FieldInstruction),
                "shppict" => {}
                _ => self.set_destination(Destination::Skip),
            }
            return;
        }

        match word {
            "ansicpg" => self.codepage = param.map(i64::from).unwrap_or(DEFAULT_CODEPAGE),
            "par" | "sect" | "page" => self.paragraph_break(),
            "line" => self.emit("\n"),
            "tab" => self.emit("\t"),
            "cell" | "nestcell" => match destination {
                Destination::Body => self.body.end_cell(),
                _ => self.emit("\t"),
            },
            "row" | "nestrow" => match destination {
                Destination::Body => self.body.end_row(),
                _ => self.emit("\n"),
            },
            "trowd" | "intbl" if destination == Destination::Body => self.body.in_table = true,
            "pard" if destination == Destination::Body => {
                self.body.in_table = false;
                self.body.style = None;
            }
            "outlinelevel" if destination == Destination::Body => {
                self.body.style = param.map(|level| format!("Heading {}", level + 1));
            }
            "u" => self.unicode(param),
            "emdash" => self.emit("\u{2014}"),
            "endash" => self.emit("\u{2013}"),
            "bullet" => self.emit("\u{2022}"),
            "lquote" => self.emit("\u{2018}"),
            "rquote" => self.emit("\u{2019}"),
            "ldblquote" => self.emit("\u{201C}"),
            "rdblquote" => self.emit("\u{201D}"),
            "emspace" | "enspace" | "qmspace" => self.emit(" "),
            "info" => self.set_destination(Destination::Info),
            "field" => self.fields.push(Field {
                depth: self.groups.len(),
                instruction: String::new(),
                result: String::new(),
            }),
            "fldinst" => self.start_sink(SinkKind::FieldInstruction),
            "footnote" => self.start_sink(SinkKind::Footnote),
            "header" | "headerr" => self.start_header_footer(false, HeaderFooterKind::Default),
            "headerl" => self.start_header_footer(false, HeaderFooterKind::EvenPage),
            "headerf" => self.start_header_footer(false, HeaderFooterKind::FirstPage),
            "footer" | "footerr" => self.start_header_footer(true, HeaderFooterKind::Default),
            "footerl" => self.start_header_footer(true, HeaderFooterKind::EvenPage),
            "footerf" => self.start_header_footer(true, HeaderFooterKind::FirstPage),
            "pict" => {
                if self.config.extract_images {
                    self.start_sink(SinkKind::Picture(PictureInfo::default()));
                } else {
                    self.set_destination(Destination::Skip);
                }
            }
            "pngblip" | "jpegblip" | "emfblip" | "wmetafile" | "dibitmap" | "wbitmap" | "picw" | "pich" | "picwgoal"
            | "pichgoal" => self.picture_property(word, param),
            "yr" | "mo" | "dy" | "hr" | "min" => self.date_part(word, param),
            w if SKIPPED_DESTINATIONS.contains(&w) => self.set_destination(Destination::Skip),
            _ => {}
        }
    }

    fn info_word(&mut self, word: &str) {
        let kind = match word {
            "title" => SinkKind::Info(InfoField::Title),
            "subject" => SinkKind::Info(InfoField::Subject),
            "author" => SinkKind::Info(InfoField::Author),
            "keywords" => SinkKind::Info(InfoField::Keywords),
            "operator" => SinkKind::Info(InfoField::Operator),
            "creatim" => SinkKind::Date(DateField::Created, DateParts::default()),
            "revtim" => SinkKind::Date(DateField::Revised, DateParts::default()),
            _ => return,
        };
        self.start_sink(kind);
    }

    fn start_sink(&mut self, kind: SinkKind) {
        self.sinks.push(Sink {
            depth: self.groups.len(),
            kind,
            text: String::new(),
        });
        self.set_destination(Destination::Capture);
    }

    fn start_header_footer(&mut self, footer: bool, kind: HeaderFooterKind) {
        self.start_sink(SinkKind::HeaderFooter { footer, kind });
    }

    fn paragraph_break(&mut self) {
        match self.current().destination {
            Destination::Body => self.body.end_paragraph(),
            Destination::Capture => self.emit("\n"),
            Destination::Info | Destination::Skip => {}
        }
    }

    fn unicode(&mut self, param: Option<i32>) {
        let Some(value) = param else {
            return;
        };
        let unit = (if value < 0 { value + 0x10000 } else { value }) as u32;
        self.unicode_skip_remaining = self.current().unicode_skip;

        if (0xD800..0xDC00).contains(&unit) {
            self.high_surrogate = Some(unit as u16);
            return;
        }
        let ch = match self.high_surrogate.take() {
            Some(high) if (0xDC00..0xE000).contains(&unit) => {
                char::decode_utf16([high, unit as u16]).next().and_then(|decoded| decoded.ok())
            }
            _ => char::from_u32(unit),
        };
        if let Some(ch) = ch {
            let mut buffer = [0u8; 4];
            self.emit(ch.encode_utf8(&mut buffer));
        }
    }

    fn picture_property(&mut self, word: &str, param: Option<i32>) {
        let Some(Sink {
            kind: SinkKind::Picture(picture),
            ..
        }) = self.sinks.last_mut()
        else {
            return;
        };
        let pixels = |value: i32| u32::try_from(value).ok();
        match word {
            "pngblip" => picture.format = Some("png"),
            "jpegblip" => picture.format = Some("jpeg"),
            "emfblip" => picture.format = Some("emf"),
            "wmetafile" => picture.format = Some("wmf"),
            "dibitmap" | "wbitmap" => picture.format = Some("bmp"),
            "picw" => picture.width = picture.width.or(param.and_then(pixels)),
            "pich" => picture.height = picture.height.or(param.and_then(pixels)),
            "picwgoal" => {
                if let Some(width) = param.and_then(|twips| pixels(twips / TWIPS_PER_PIXEL)) {
                    picture.width = Some(width);
                }
            }
            "pichgoal" => {
                if let Some(height) = param.and_then(|twips| pixels(twips / TWIPS_PER_PIXEL)) {
                    picture.height = Some(height);
                }
            }
            _ => {}
        }
    }

    fn date_part(&mut self, word: &str, param: Option<i32>) {
        let Some(Sink {
            kind: SinkKind::Date(_, parts),
            ..
        }) = self.sinks.last_mut()
        else {
            return;
        };
        match word {
            "yr" => parts.year = param,
            "mo" => parts.month = param,
            "dy" => parts.day = param,
            "hr" => parts.hour = param,
            "min" => parts.minute = param,
            _ => {}
        }
    }

    fn finish_sink(&mut self, sink: Sink) {
        let text = sink.text.trim();
        match sink.kind {
            SinkKind::Info(field) => {
                if text.is_empty() {
                    return;
                }
                let metadata = &mut self.doc.metadata;
                let slot = match field {
                    InfoField::Title => &mut metadata.title,
                    InfoField::Subject => &mut metadata.subject,
                    InfoField::Author => &mut metadata.author,
                    InfoField::Keywords => &mut metadata.keywords,
                    InfoField::Operator => &mut metadata.last_modified_by,
                };
                *slot = Some(text.to_string());
            }
            SinkKind::Date(field, parts) => {
                let value = parts.to_iso();
                match field {
                    DateField::Created => self.doc.metadata.created = value,
                    DateField::Revised => self.doc.metadata.modified = value,
                }
            }
            SinkKind::HeaderFooter { footer, kind } => {
                let text = normalize_text(text, self.config);
                if text.is_empty() {
                    return;
                }
                let entry = HeaderFooter { kind, text };
                if footer {
                    self.doc.footers.push(entry);
                } else {
                    self.doc.headers.push(entry);
                }
            }
            SinkKind::Footnote => {
                let text = normalize_text(text, self.config);
                if !text.is_empty() {
                    let id = (self.doc.footnotes.len() + 1).to_string();
                    self.doc.footnotes.push(Note { id, text });
                }
            }
            SinkKind::FieldInstruction => {
                if let Some(field) = self.fields.last_mut() {
                    field.instruction = text.to_string();
                }
            }
            SinkKind::Picture(picture) => self.finish_picture(picture, text),
        }
    }

    fn finish_picture(&mut self, picture: PictureInfo, hex_text: &str) {
        let data = if picture.binary.is_empty() {
            let mut digits: String = hex_text.chars().filter(char::is_ascii_hexdigit).collect();
            if digits.len() % 2 == 1 {
                digits.pop();
            }
            match hex::decode(&digits) {
                Ok(data) => data,
                Err(e) => {
                    tracing::debug!("Skipping RTF picture with undecodable payload: {}", e);
                    return;
                }
            }
        } else {
            picture.binary
        };
        if data.is_empty() {
            return;
        }

        let format = picture
            .format
            .map(str::to_string)
            .unwrap_or_else(|| detect_image_format(&data, ""));
        let index = self.doc.images.len();
        self.doc.images.push(ImageRecord {
            index,
            name: format!("image{}.{}", index + 1, format),
            width: picture.width,
            height: picture.height,
            data,
            format,
            caption: None,
        });
    }

    fn finish_field(&mut self, field: Field) {
        let Some(captures) = HYPERLINK_INSTRUCTION.captures(&field.instruction) else {
            return;
        };
        let Some(target) = captures.get(2).or_else(|| captures.get(3)) else {
            return;
        };
        let url = if captures.get(1).is_some() {
            format!("#{}", target.as_str())
        } else {
            target.as_str().to_string()
        };
        if url.is_empty() || url == "#" {
            return;
        }
        self.doc.hyperlinks.push(Hyperlink {
            text: field.result.trim().to_string(),
            url,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Content;

    fn paragraph_texts(doc: &TextDocument) -> Vec<&str> {
        doc.paragraphs().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn test_text_metadata_and_escapes() {
        let rtf = br"{\rtf1\ansi\ansicpg1252\deff0{\fonttbl{\f0 Times New Roman;}}{\colortbl;\red0\green0\blue0;}
{\info{\title Quarterly}{\author Ana Silva}{\creatim\yr2024\mo1\dy15\hr10\min30}}
\pard\outlinelevel0 Overview\par
\pard Caf\'e9 costs \u8364? 5\par
\pard Say \ldblquote hi\rdblquote\tab now\par}";
        let doc = read_rtf(rtf).unwrap();

        assert_eq!(doc.format, FormatTag::Rtf);
        assert_eq!(paragraph_texts(&doc), vec!["Overview", "Café costs € 5", "Say \u{201C}hi\u{201D}\tnow"]);
        assert_eq!(doc.paragraphs().next().unwrap().style.as_deref(), Some("Heading 1"));
        assert_eq!(doc.paragraphs().nth(1).unwrap().style, None);
        assert_eq!(doc.metadata.title.as_deref(), Some("Quarterly"));
        assert_eq!(doc.metadata.author.as_deref(), Some("Ana Silva"));
        assert_eq!(doc.metadata.created.as_deref(), Some("2024-01-15T10:30:00"));
        assert!(!doc.full_text().contains("Times"));
    }

    #[test]
    fn test_tables_and_hyperlinks() {
        let rtf = br#"{\rtf1\ansi Intro\par
\trowd\cellx1000\cellx2000\pard\intbl A1\cell B1\cell\row
\trowd\cellx1000\cellx2000\pard\intbl A2\cell B2\cell\row
\pard See {\field{\*\fldinst HYPERLINK "https://example.com"}{\fldrslt Example}} now.\par}"#;
        let doc = read_rtf(rtf).unwrap();

        assert_eq!(doc.blocks.len(), 3);
        assert_eq!(
            doc.tables().next().unwrap().rows,
            vec![vec!["A1".to_string(), "B1".to_string()], vec!["A2".to_string(), "B2".to_string()]]
        );
        assert_eq!(
            doc.hyperlinks,
            vec![Hyperlink {
                text: "Example".to_string(),
                url: "https://example.com".to_string(),
            }]
        );
        assert_eq!(doc.full_text(), "Intro\nA1\tB1\nA2\tB2\nSee Example now.");
    }

    #[test]
    fn test_headers_footers_and_footnotes() {
        let rtf = br"{\rtf1{\header\pard Page head\par}{\footerf\pard First foot\par}Body text{\super\chftn}{\footnote\pard{\super\chftn} A note.}\par}";
        let doc = read_rtf(rtf).unwrap();

        assert_eq!(paragraph_texts(&doc), vec!["Body text"]);
        assert_eq!(
            doc.headers,
            vec![HeaderFooter {
                kind: HeaderFooterKind::Default,
                text: "Page head".to_string(),
            }]
        );
        assert_eq!(doc.footers[0].kind, HeaderFooterKind::FirstPage);
        assert_eq!(doc.footers[0].text, "First foot");
        assert_eq!(
            doc.footnotes,
            vec![Note {
                id: "1".to_string(),
                text: "A note.".to_string(),
            }]
        );
    }

    #[test]
    fn test_pictures() {
        let rtf = br"{\rtf1 {\*\shppict{\pict\pngblip\picwgoal1500\pichgoal750 89504e470d0a1a0a}}{\nonshppict{\pict\wmetafile8 0100}}Caption\par}";
        let doc = read_rtf(rtf).unwrap();

        assert_eq!(doc.images.len(), 1);
        let image = &doc.images[0];
        assert_eq!(image.format, "png");
        assert_eq!(image.name, "image1.png");
        assert_eq!((image.width, image.height), (Some(100), Some(50)));
        assert_eq!(&image.data[..4], &[0x89, b'P', b'N', b'G']);
        assert_eq!(paragraph_texts(&doc), vec!["Caption"]);

        let config = ExtractionConfig {
            extract_images: false,
            ..Default::default()
        };
        let doc = read_rtf_with_config(rtf, &config).unwrap();
        assert!(doc.images.is_empty());
        assert_eq!(paragraph_texts(&doc), vec!["Caption"]);
    }

    #[test]
    fn test_codepage_and_surrogate_pairs() {
        let rtf = br"{\rtf1\ansi\ansicpg1251\uc0 \'cf\'f0\'e8\'e2\'e5\'f2 \u-10179\u-8704\par}";
        let doc = read_rtf(rtf).unwrap();
        assert_eq!(paragraph_texts(&doc), vec!["Привет 😀"]);
    }

    #[test]
    fn test_unbalanced_groups_are_tolerated() {
        let doc = read_rtf(br"{\rtf1 {\b Bold} tail").unwrap();
        assert_eq!(doc.full_text(), "Bold tail");
    }

    #[test]
    fn test_not_rtf() {
        let err = read_rtf(b"plain words").unwrap_err();
        assert!(matches!(err, SharetextError::CorruptContainer { .. }));
    }
}
