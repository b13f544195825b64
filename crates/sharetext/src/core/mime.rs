//! Canonical MIME types for every [`FormatTag`].
//!
//! The forward mapping lives in the decoder registry; this module owns the
//! constants and the reverse lookup used when an email attachment declares a
//! content type but carries no usable filename.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::core::format::FormatTag;

pub const DOCX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const LEGACY_WORD_MIME_TYPE: &str = "application/msword";
pub const EXCEL_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const EXCEL_BINARY_MIME_TYPE: &str = "application/vnd.ms-excel";
pub const POWER_POINT_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const LEGACY_POWERPOINT_MIME_TYPE: &str = "application/vnd.ms-powerpoint";
pub const OPENDOC_TEXT_MIME_TYPE: &str = "application/vnd.oasis.opendocument.text";
pub const OPENDOC_SPREADSHEET_MIME_TYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";
pub const OPENDOC_PRESENTATION_MIME_TYPE: &str = "application/vnd.oasis.opendocument.presentation";
pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const EML_MIME_TYPE: &str = "message/rfc822";
pub const MSG_MIME_TYPE: &str = "application/vnd.ms-outlook";
pub const MBOX_MIME_TYPE: &str = "application/mbox";
pub const JSON_MIME_TYPE: &str = "application/json";
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";
pub const CSV_MIME_TYPE: &str = "text/csv";
pub const TSV_MIME_TYPE: &str = "text/tab-separated-values";
pub const MARKDOWN_MIME_TYPE: &str = "text/markdown";
pub const RTF_MIME_TYPE: &str = "application/rtf";
pub const HTML_MIME_TYPE: &str = "text/html";
pub const OCTET_STREAM_MIME_TYPE: &str = "application/octet-stream";

/// Canonical MIME string of a tag.
pub fn mime_for_tag(tag: FormatTag) -> &'static str {
    match tag {
        FormatTag::Docx => DOCX_MIME_TYPE,
        FormatTag::Doc => LEGACY_WORD_MIME_TYPE,
        FormatTag::Xlsx => EXCEL_MIME_TYPE,
        FormatTag::Xls => EXCEL_BINARY_MIME_TYPE,
        FormatTag::Pptx => POWER_POINT_MIME_TYPE,
        FormatTag::Ppt => LEGACY_POWERPOINT_MIME_TYPE,
        FormatTag::Odt => OPENDOC_TEXT_MIME_TYPE,
        FormatTag::Ods => OPENDOC_SPREADSHEET_MIME_TYPE,
        FormatTag::Odp => OPENDOC_PRESENTATION_MIME_TYPE,
        FormatTag::Pdf => PDF_MIME_TYPE,
        FormatTag::Eml => EML_MIME_TYPE,
        FormatTag::Msg => MSG_MIME_TYPE,
        FormatTag::Mbox => MBOX_MIME_TYPE,
        FormatTag::Json => JSON_MIME_TYPE,
        FormatTag::Txt => PLAIN_TEXT_MIME_TYPE,
        FormatTag::Csv => CSV_MIME_TYPE,
        FormatTag::Tsv => TSV_MIME_TYPE,
        FormatTag::Md => MARKDOWN_MIME_TYPE,
        FormatTag::Rtf => RTF_MIME_TYPE,
        FormatTag::Html => HTML_MIME_TYPE,
        FormatTag::Unsupported => OCTET_STREAM_MIME_TYPE,
    }
}

/// MIME type to tag, including the common aliases mail clients emit.
static MIME_TO_TAG: Lazy<HashMap<&'static str, FormatTag>> = Lazy::new(|| {
    let mut m = HashMap::new();

    for tag in FormatTag::ALL {
        if tag.is_supported() {
            m.insert(mime_for_tag(tag), tag);
        }
    }

    m.insert("text/rtf", FormatTag::Rtf);
    m.insert("text/x-markdown", FormatTag::Md);
    m.insert("application/xhtml+xml", FormatTag::Html);
    m.insert("text/json", FormatTag::Json);
    m.insert("application/x-msg", FormatTag::Msg);
    m.insert("application/mspowerpoint", FormatTag::Ppt);
    m.insert("application/x-msexcel", FormatTag::Xls);
    m.insert("application/vnd.ms-word", FormatTag::Doc);

    m
});

/// Resolve a MIME type (parameters such as `; charset=` are ignored).
pub fn tag_for_mime(mime_type: &str) -> FormatTag {
    let essence = mime_type.split(';').next().unwrap_or(mime_type).trim().to_ascii_lowercase();
    MIME_TO_TAG.get(essence.as_str()).copied().unwrap_or(FormatTag::Unsupported)
}

/// Best-effort MIME type for an arbitrary filename, used for attachments that
/// declare no content type.
pub fn guess_mime_for_filename(filename: &str) -> String {
    let tag = FormatTag::from_filename(filename);
    if tag.is_supported() {
        return mime_for_tag(tag).to_string();
    }
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(OCTET_STREAM_MIME_TYPE)
        .to_string()
}
