//! The uniform content model every decoder normalizes into.
//!
//! Each variant keeps its structured fields and exposes the same three views
//! through [`Content`]: a metadata record, a restartable sequence of text units
//! (one per paragraph block, sheet, slide, page or message) and `full_text`, which
//! is always derived from the units and never stored separately.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use indexmap::IndexMap;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::Result;
use crate::core::config::ExtractionConfig;
use crate::core::format::FormatTag;

/// Lazy sequence of text units. Calling [`Content::units`] again starts over.
pub type Units<'a> = Box<dyn Iterator<Item = String> + 'a>;

/// Views shared by every content variant.
pub trait Content {
    /// Document properties. Every field is optional.
    fn metadata(&self) -> &Metadata;

    /// One text unit per page, slide, sheet, paragraph block or message.
    fn units(&self) -> Units<'_>;

    /// Separator placed between non-empty units by [`Content::full_text`].
    fn unit_separator(&self) -> &'static str {
        "\n\n"
    }

    /// All text, built from [`Content::units`]: empty units are dropped and the rest
    /// joined with [`Content::unit_separator`].
    fn full_text(&self) -> String {
        let separator = self.unit_separator();
        let mut text = String::new();
        for unit in self.units() {
            if unit.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push_str(separator);
            }
            text.push_str(&unit);
        }
        text
    }
}

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    /// Creation timestamp, ISO 8601 where the source allows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        *self == Metadata::default()
    }
}

/// An image pulled out of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    /// Position within the owning collection, starting at 0.
    pub index: usize,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(serialize_with = "serialize_base64")]
    pub data: Vec<u8>,
    /// Short format name: "png", "jpeg", "emf", ...
    pub format: String,
    /// Alternative text, when the source carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

fn serialize_base64<S: Serializer>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64_STANDARD.encode(data))
}

// ---------------------------------------------------------------------------
// Text documents (DOCX, DOC, ODT, RTF, HTML)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// A 2-D grid of cell strings, rows in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Rows on separate lines, cells separated by tabs.
    pub fn to_text(&self) -> String {
        self.rows.iter().map(|row| row.join("\t")).collect::<Vec<_>>().join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(|cell| cell.trim().is_empty()))
    }
}

/// A body element. Paragraphs and tables interleave in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderFooterKind {
    Default,
    FirstPage,
    EvenPage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderFooter {
    pub kind: HeaderFooterKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hyperlink {
    pub text: String,
    pub url: String,
}

/// A footnote or endnote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub text: String,
}

/// Word-processing content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextDocument {
    pub format: FormatTag,
    pub metadata: Metadata,
    pub blocks: Vec<Block>,
    pub images: Vec<ImageRecord>,
    pub headers: Vec<HeaderFooter>,
    pub footers: Vec<HeaderFooter>,
    pub hyperlinks: Vec<Hyperlink>,
    pub footnotes: Vec<Note>,
    pub endnotes: Vec<Note>,
    pub comments: Vec<Comment>,
    /// Reconstructed formulas (LaTeX) of the main body, in source order.
    pub formulas: Vec<String>,
}

impl TextDocument {
    pub fn new(format: FormatTag) -> Self {
        Self {
            format,
            metadata: Metadata::default(),
            blocks: Vec::new(),
            images: Vec::new(),
            headers: Vec::new(),
            footers: Vec::new(),
            hyperlinks: Vec::new(),
            footnotes: Vec::new(),
            endnotes: Vec::new(),
            comments: Vec::new(),
            formulas: Vec::new(),
        }
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Paragraph(paragraph) => Some(paragraph),
            Block::Table(_) => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Table(table) => Some(table),
            Block::Paragraph(_) => None,
        })
    }
}

impl Content for TextDocument {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn units(&self) -> Units<'_> {
        Box::new(self.blocks.iter().filter_map(|block| match block {
            Block::Paragraph(paragraph) if !paragraph.text.trim().is_empty() => Some(paragraph.text.clone()),
            Block::Table(table) if !table.is_empty() => Some(table.to_text()),
            _ => None,
        }))
    }

    fn unit_separator(&self) -> &'static str {
        "\n"
    }
}

// ---------------------------------------------------------------------------
// Spreadsheets (XLSX, XLS, ODS)
// ---------------------------------------------------------------------------

/// A decoded cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(String),
    Duration(String),
    Error(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::String(s) | CellValue::DateTime(s) | CellValue::Duration(s) => f.write_str(s),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{}", *v as i64),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
            CellValue::Error(e) => write!(f, "#{}", e),
        }
    }
}

/// One worksheet. Row records are keyed by the (deduplicated) header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<IndexMap<String, CellValue>>,
}

impl Sheet {
    /// Header line followed by one line per row, cells separated by tabs.
    pub fn text(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        if !self.columns.is_empty() {
            lines.push(self.columns.join("\t"));
        }
        for row in &self.rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|column| row.get(column).map(|value| value.to_string()).unwrap_or_default())
                .collect();
            lines.push(cells.join("\t"));
        }
        lines.join("\n")
    }
}

impl Serialize for Sheet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Sheet", 4)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("columns", &self.columns)?;
        state.serialize_field("rows", &self.rows)?;
        state.serialize_field("text", &self.text())?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spreadsheet {
    pub format: FormatTag,
    pub metadata: Metadata,
    pub sheets: Vec<Sheet>,
}

impl Content for Spreadsheet {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn units(&self) -> Units<'_> {
        Box::new(self.sheets.iter().map(|sheet| {
            let text = sheet.text();
            if text.is_empty() {
                sheet.name.clone()
            } else {
                format!("{}\n{}", sheet.name, text)
            }
        }))
    }
}

// ---------------------------------------------------------------------------
// Presentations (PPTX, PPT, ODP)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Slide {
    /// 1-based, in presentation order.
    pub number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: Vec<String>,
    pub notes: Vec<String>,
    pub images: Vec<ImageRecord>,
    /// Review comments anchored on the slide; not part of its text unit.
    pub comments: Vec<Comment>,
}

impl Slide {
    /// An empty slide in position `number`; used when a slide fails to decode.
    pub fn empty(number: u32) -> Self {
        Self {
            number,
            ..Default::default()
        }
    }

    fn text(&self, include_notes: bool) -> String {
        let mut lines: Vec<&str> = Vec::new();
        if let Some(title) = &self.title {
            lines.push(title);
        }
        lines.extend(self.body.iter().map(String::as_str));
        if include_notes {
            lines.extend(self.notes.iter().map(String::as_str));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presentation {
    pub format: FormatTag,
    pub metadata: Metadata,
    pub slides: Vec<Slide>,
    /// Append speaker notes to each slide's text unit.
    #[serde(skip)]
    pub include_notes: bool,
}

impl Content for Presentation {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn units(&self) -> Units<'_> {
        Box::new(self.slides.iter().map(|slide| slide.text(self.include_notes)))
    }
}

// ---------------------------------------------------------------------------
// PDF
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Page {
    pub text: String,
    pub images: Vec<ImageRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfDocument {
    pub metadata: Metadata,
    /// Keyed by 1-based page number.
    pub pages: BTreeMap<u32, Page>,
}

impl Content for PdfDocument {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn units(&self) -> Units<'_> {
        Box::new(self.pages.values().map(|page| page.text.clone()))
    }
}

// ---------------------------------------------------------------------------
// Plain text (TXT, CSV, TSV, JSON, MD)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainText {
    pub format: FormatTag,
    pub metadata: Metadata,
    pub text: String,
}

impl Content for PlainText {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn units(&self) -> Units<'_> {
        Box::new(std::iter::once(self.text.clone()))
    }
}

// ---------------------------------------------------------------------------
// Email (EML, MSG, MBOX)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailHeaders {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    #[serde(serialize_with = "serialize_base64")]
    pub data: Vec<u8>,
    /// The attachment itself sniffs to a supported format.
    pub is_extractable: bool,
}

impl Attachment {
    /// Decode the attachment through the registry.
    pub fn extract(&self) -> Result<ExtractedContent> {
        crate::core::extractor::extract_bytes(&self.data, Some(&self.dispatch_name()), &ExtractionConfig::default())
    }

    /// The filename, with the declared content type's extension appended when
    /// the name alone does not name a supported format.
    pub(crate) fn dispatch_name(&self) -> String {
        let declared = crate::core::mime::tag_for_mime(&self.mime_type);
        if declared.is_supported() && !FormatTag::from_filename(&self.filename).is_supported() {
            format!("{}.{}", self.filename, declared.as_str())
        } else {
            self.filename.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Message {
    pub headers: EmailHeaders,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_html: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl Message {
    fn text(&self) -> String {
        let headers = &self.headers;
        let mut lines = Vec::new();
        if let Some(from) = &headers.from {
            lines.push(format!("From: {}", from));
        }
        for (label, values) in [("To", &headers.to), ("Cc", &headers.cc), ("Bcc", &headers.bcc)] {
            if !values.is_empty() {
                lines.push(format!("{}: {}", label, values.join(", ")));
            }
        }
        if let Some(subject) = &headers.subject {
            lines.push(format!("Subject: {}", subject));
        }
        if let Some(date) = &headers.date {
            lines.push(format!("Date: {}", date));
        }

        let body = self.body.trim();
        if !body.is_empty() {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(body.to_string());
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub format: FormatTag,
    pub metadata: Metadata,
    pub messages: Vec<Message>,
}

impl Content for EmailMessage {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn units(&self) -> Units<'_> {
        Box::new(self.messages.iter().map(Message::text))
    }
}

// ---------------------------------------------------------------------------
// Dispatch result
// ---------------------------------------------------------------------------

/// Result of a registry dispatch: one of the content variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractedContent {
    TextDocument(TextDocument),
    Spreadsheet(Spreadsheet),
    Presentation(Presentation),
    PdfDocument(PdfDocument),
    PlainText(PlainText),
    EmailMessage(EmailMessage),
}

impl ExtractedContent {
    /// The format the content was decoded from.
    pub fn format(&self) -> FormatTag {
        match self {
            ExtractedContent::TextDocument(doc) => doc.format,
            ExtractedContent::Spreadsheet(sheet) => sheet.format,
            ExtractedContent::Presentation(deck) => deck.format,
            ExtractedContent::PdfDocument(_) => FormatTag::Pdf,
            ExtractedContent::PlainText(text) => text.format,
            ExtractedContent::EmailMessage(email) => email.format,
        }
    }

    /// Pretty-printed JSON of the content, tagged by `kind`.
    ///
    /// # Errors
    ///
    /// `Serialization` when the content cannot be encoded.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn as_content(&self) -> &dyn Content {
        match self {
            ExtractedContent::TextDocument(c) => c,
            ExtractedContent::Spreadsheet(c) => c,
            ExtractedContent::Presentation(c) => c,
            ExtractedContent::PdfDocument(c) => c,
            ExtractedContent::PlainText(c) => c,
            ExtractedContent::EmailMessage(c) => c,
        }
    }

    pub fn as_text_document(&self) -> Option<&TextDocument> {
        match self {
            ExtractedContent::TextDocument(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_spreadsheet(&self) -> Option<&Spreadsheet> {
        match self {
            ExtractedContent::Spreadsheet(sheet) => Some(sheet),
            _ => None,
        }
    }

    pub fn as_presentation(&self) -> Option<&Presentation> {
        match self {
            ExtractedContent::Presentation(deck) => Some(deck),
            _ => None,
        }
    }

    pub fn as_pdf(&self) -> Option<&PdfDocument> {
        match self {
            ExtractedContent::PdfDocument(pdf) => Some(pdf),
            _ => None,
        }
    }

    pub fn as_plain_text(&self) -> Option<&PlainText> {
        match self {
            ExtractedContent::PlainText(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_email(&self) -> Option<&EmailMessage> {
        match self {
            ExtractedContent::EmailMessage(email) => Some(email),
            _ => None,
        }
    }
}

impl Content for ExtractedContent {
    fn metadata(&self) -> &Metadata {
        self.as_content().metadata()
    }

    fn units(&self) -> Units<'_> {
        self.as_content().units()
    }

    fn unit_separator(&self) -> &'static str {
        self.as_content().unit_separator()
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for ExtractedContent {
                fn from(content: $variant) -> Self {
                    ExtractedContent::$variant(content)
                }
            }
        )*
    };
}

impl_from_variant!(TextDocument, Spreadsheet, Presentation, PdfDocument, PlainText, EmailMessage);
