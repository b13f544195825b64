//! Sharetext - text and structure extraction for SharePoint-style document dumps
//!
//! Sharetext turns Office, OpenDocument, PDF, email and plain-text files into one
//! uniform content model. The format is sniffed from the bytes first and the file
//! name second, so mislabelled exports still reach the right decoder.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sharetext::{Content, read_file};
//!
//! # fn main() -> sharetext::Result<()> {
//! let content = read_file("Board Minutes.doc")?;
//! println!("{}", content.full_text());
//! for unit in content.units() {
//!     println!("--- {}", unit);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core Module** (`core`): format sniffing, the decoder registry, dispatch and config
//! - **Extraction** (`extraction`): one decoder per format family, each mapping its
//!   container onto the types in `types`
//! - **Formula** (`formula`): OMML and MathML trees to linear LaTeX
//!
//! All calls are synchronous and share no mutable state; run them from as many
//! threads as you like.

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod extraction;
pub mod formula;
pub mod types;

pub use error::{Result, SharetextError};

pub use core::config::ExtractionConfig;
pub use core::extractor::{
    Extractor, detect_file, extract_bytes, get_extractor, get_extractor_for, is_supported_bytes, is_supported_file,
    read_file, read_file_with_config,
};
pub use core::format::FormatTag;
pub use core::sniff::sniff;

pub use types::{
    Attachment, Content, EmailMessage, ExtractedContent, ImageRecord, Message, Metadata, PdfDocument, PlainText,
    Presentation, Sheet, Slide, Spreadsheet, TextDocument,
};

pub use extraction::{
    read_csv, read_doc, read_docx, read_eml, read_html, read_json, read_mbox, read_md, read_msg, read_odp, read_ods,
    read_odt, read_pdf, read_plain_text, read_ppt, read_pptx, read_rtf, read_tsv, read_xls, read_xlsx,
};
