//! Decoder registry: the process-wide table mapping each [`FormatTag`] to its
//! decoder, MIME type and capabilities.
//!
//! The table is built once on first use and never mutated, so concurrent readers
//! need no locking.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::core::config::ExtractionConfig;
use crate::core::format::FormatTag;
use crate::core::mime::mime_for_tag;
use crate::extraction::{doc, docx, email, html, odp, odt, pdf, ppt, pptx, rtf, spreadsheet, text};
use crate::types::ExtractedContent;
use crate::{Result, SharetextError};

/// Signature shared by every registered decoder.
pub type DecodeFn = fn(&[u8], &ExtractionConfig) -> Result<ExtractedContent>;

/// One registry row.
#[derive(Clone, Copy)]
pub struct DecoderEntry {
    pub tag: FormatTag,
    pub decode: DecodeFn,
    pub mime_type: &'static str,
    /// The format can carry attachments worth routing back through the registry.
    pub supports_attachments: bool,
}

impl std::fmt::Debug for DecoderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderEntry")
            .field("tag", &self.tag)
            .field("mime_type", &self.mime_type)
            .field("supports_attachments", &self.supports_attachments)
            .finish()
    }
}

macro_rules! entry {
    ($tag:expr, $decode:path) => {
        entry!($tag, $decode, false)
    };
    ($tag:expr, $decode:path, $attachments:expr) => {
        DecoderEntry {
            tag: $tag,
            decode: |bytes, config| $decode(bytes, config).map(ExtractedContent::from),
            mime_type: mime_for_tag($tag),
            supports_attachments: $attachments,
        }
    };
}

static REGISTRY: Lazy<HashMap<FormatTag, DecoderEntry>> = Lazy::new(|| {
    let entries = [
        entry!(FormatTag::Docx, docx::read_docx_with_config),
        entry!(FormatTag::Doc, doc::read_doc_with_config),
        entry!(FormatTag::Xlsx, spreadsheet::read_xlsx_with_config),
        entry!(FormatTag::Xls, spreadsheet::read_xls_with_config),
        entry!(FormatTag::Ods, spreadsheet::read_ods_with_config),
        entry!(FormatTag::Pptx, pptx::read_pptx_with_config),
        entry!(FormatTag::Ppt, ppt::read_ppt_with_config),
        entry!(FormatTag::Odp, odp::read_odp_with_config),
        entry!(FormatTag::Odt, odt::read_odt_with_config),
        entry!(FormatTag::Pdf, pdf::read_pdf_with_config),
        entry!(FormatTag::Eml, email::read_eml_with_config, true),
        entry!(FormatTag::Msg, email::read_msg_with_config, true),
        entry!(FormatTag::Mbox, email::read_mbox_with_config, true),
        entry!(FormatTag::Json, text::read_json_with_config),
        entry!(FormatTag::Txt, text::read_plain_text_with_config),
        entry!(FormatTag::Csv, text::read_csv_with_config),
        entry!(FormatTag::Tsv, text::read_tsv_with_config),
        entry!(FormatTag::Md, text::read_md_with_config),
        entry!(FormatTag::Rtf, rtf::read_rtf_with_config),
        entry!(FormatTag::Html, html::read_html_with_config),
    ];

    entries.into_iter().map(|entry| (entry.tag, entry)).collect()
});

/// Registry row for `tag`; `None` only for [`FormatTag::Unsupported`].
pub fn lookup(tag: FormatTag) -> Option<&'static DecoderEntry> {
    REGISTRY.get(&tag)
}

/// Registry row for `tag`, or `UnsupportedFormat`.
pub fn entry(tag: FormatTag) -> Result<&'static DecoderEntry> {
    lookup(tag).ok_or_else(|| SharetextError::UnsupportedFormat(format!("no decoder registered for {}", tag)))
}

/// Canonical MIME type of `tag`.
pub fn mime_type(tag: FormatTag) -> &'static str {
    lookup(tag).map(|entry| entry.mime_type).unwrap_or_else(|| mime_for_tag(tag))
}

/// Whether documents of this format carry attachments.
pub fn supports_attachments(tag: FormatTag) -> bool {
    lookup(tag).is_some_and(|entry| entry.supports_attachments)
}

/// Every tag with a registered decoder, in declaration order.
pub fn registered_tags() -> Vec<FormatTag> {
    FormatTag::ALL.into_iter().filter(|tag| REGISTRY.contains_key(tag)).collect()
}
