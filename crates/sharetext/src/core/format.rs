//! The closed set of formats sharetext knows how to decode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal format tag resolved by [`crate::core::sniff::sniff`].
///
/// Every input resolves to exactly one tag; `Unsupported` closes the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    Docx,
    Doc,
    Xlsx,
    Xls,
    Pptx,
    Ppt,
    Odt,
    Ods,
    Odp,
    Pdf,
    Eml,
    Msg,
    Mbox,
    Json,
    Txt,
    Csv,
    Tsv,
    Md,
    Rtf,
    Html,
    Unsupported,
}

impl FormatTag {
    /// All tags, in declaration order.
    pub const ALL: [FormatTag; 21] = [
        FormatTag::Docx,
        FormatTag::Doc,
        FormatTag::Xlsx,
        FormatTag::Xls,
        FormatTag::Pptx,
        FormatTag::Ppt,
        FormatTag::Odt,
        FormatTag::Ods,
        FormatTag::Odp,
        FormatTag::Pdf,
        FormatTag::Eml,
        FormatTag::Msg,
        FormatTag::Mbox,
        FormatTag::Json,
        FormatTag::Txt,
        FormatTag::Csv,
        FormatTag::Tsv,
        FormatTag::Md,
        FormatTag::Rtf,
        FormatTag::Html,
        FormatTag::Unsupported,
    ];

    /// Map a file extension (without the dot, any case) to a tag.
    pub fn from_extension(ext: &str) -> FormatTag {
        match ext.to_ascii_lowercase().as_str() {
            "docx" | "docm" => FormatTag::Docx,
            "doc" | "dot" => FormatTag::Doc,
            "xlsx" | "xlsm" => FormatTag::Xlsx,
            "xls" => FormatTag::Xls,
            "pptx" | "pptm" => FormatTag::Pptx,
            "ppt" | "pps" => FormatTag::Ppt,
            "odt" => FormatTag::Odt,
            "ods" => FormatTag::Ods,
            "odp" => FormatTag::Odp,
            "pdf" => FormatTag::Pdf,
            "eml" => FormatTag::Eml,
            "msg" => FormatTag::Msg,
            "mbox" => FormatTag::Mbox,
            "json" => FormatTag::Json,
            "txt" | "text" | "log" => FormatTag::Txt,
            "csv" => FormatTag::Csv,
            "tsv" | "tab" => FormatTag::Tsv,
            "md" | "markdown" => FormatTag::Md,
            "rtf" => FormatTag::Rtf,
            "html" | "htm" | "xhtml" => FormatTag::Html,
            _ => FormatTag::Unsupported,
        }
    }

    /// Resolve a tag from the extension of `filename`.
    pub fn from_filename(filename: &str) -> FormatTag {
        let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
        match base.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => FormatTag::from_extension(ext),
            _ => FormatTag::Unsupported,
        }
    }

    /// Canonical lowercase name, also used for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTag::Docx => "docx",
            FormatTag::Doc => "doc",
            FormatTag::Xlsx => "xlsx",
            FormatTag::Xls => "xls",
            FormatTag::Pptx => "pptx",
            FormatTag::Ppt => "ppt",
            FormatTag::Odt => "odt",
            FormatTag::Ods => "ods",
            FormatTag::Odp => "odp",
            FormatTag::Pdf => "pdf",
            FormatTag::Eml => "eml",
            FormatTag::Msg => "msg",
            FormatTag::Mbox => "mbox",
            FormatTag::Json => "json",
            FormatTag::Txt => "txt",
            FormatTag::Csv => "csv",
            FormatTag::Tsv => "tsv",
            FormatTag::Md => "md",
            FormatTag::Rtf => "rtf",
            FormatTag::Html => "html",
            FormatTag::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        *self != FormatTag::Unsupported
    }

    /// Formats stored in an OLE2 compound file.
    pub fn is_ole2(&self) -> bool {
        matches!(self, FormatTag::Doc | FormatTag::Xls | FormatTag::Ppt | FormatTag::Msg)
    }

    /// Formats stored in a ZIP package.
    pub fn is_zip_package(&self) -> bool {
        matches!(
            self,
            FormatTag::Docx | FormatTag::Xlsx | FormatTag::Pptx | FormatTag::Odt | FormatTag::Ods | FormatTag::Odp
        )
    }

    /// Formats whose bytes are human-readable text.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            FormatTag::Txt
                | FormatTag::Md
                | FormatTag::Csv
                | FormatTag::Tsv
                | FormatTag::Json
                | FormatTag::Html
                | FormatTag::Eml
                | FormatTag::Mbox
                | FormatTag::Rtf
        )
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_filename_is_case_insensitive() {
        assert_eq!(FormatTag::from_filename("Report.DOCX"), FormatTag::Docx);
        assert_eq!(FormatTag::from_filename("sites/hr/Budget.xlsx"), FormatTag::Xlsx);
        assert_eq!(FormatTag::from_filename("C:\\exports\\deck.ppt"), FormatTag::Ppt);
    }

    #[test]
    fn test_from_filename_without_extension() {
        assert_eq!(FormatTag::from_filename("README"), FormatTag::Unsupported);
        assert_eq!(FormatTag::from_filename(".docx"), FormatTag::Unsupported);
        assert_eq!(FormatTag::from_filename("archive.7z"), FormatTag::Unsupported);
    }

    #[test]
    fn test_as_str_round_trips_through_extension() {
        for tag in FormatTag::ALL {
            if tag.is_supported() {
                assert_eq!(FormatTag::from_extension(tag.as_str()), tag);
            }
        }
    }

    #[test]
    fn test_families_are_disjoint() {
        for tag in FormatTag::ALL {
            let families = [tag.is_ole2(), tag.is_zip_package(), tag.is_textual()];
            assert!(families.iter().filter(|f| **f).count() <= 1, "{tag} in two families");
        }
    }
}
