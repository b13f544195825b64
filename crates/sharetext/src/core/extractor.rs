//! Public dispatch entry points.
//!
//! `read_file` and `extract_bytes` sniff the input, look the tag up in the
//! registry and run the decoder. Decode errors surface unchanged.

use std::path::Path;

use crate::core::config::ExtractionConfig;
use crate::core::format::FormatTag;
use crate::core::registry::{self, DecoderEntry};
use crate::core::{io, sniff};
use crate::types::ExtractedContent;
use crate::{Result, SharetextError};

/// A resolved decoder, returned by [`get_extractor`].
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    entry: &'static DecoderEntry,
}

impl Extractor {
    pub fn tag(&self) -> FormatTag {
        self.entry.tag
    }

    pub fn mime_type(&self) -> &'static str {
        self.entry.mime_type
    }

    pub fn supports_attachments(&self) -> bool {
        self.entry.supports_attachments
    }

    /// Decode `bytes` with the default configuration.
    pub fn extract(&self, bytes: &[u8]) -> Result<ExtractedContent> {
        self.extract_with_config(bytes, &ExtractionConfig::default())
    }

    pub fn extract_with_config(&self, bytes: &[u8], config: &ExtractionConfig) -> Result<ExtractedContent> {
        (self.entry.decode)(bytes, config)
    }
}

/// True if `name` resolves to a supported format.
pub fn is_supported_file(name: &str) -> bool {
    sniff::sniff(Some(name), &[]).is_supported()
}

/// True if `name` and the leading `bytes` together resolve to a supported format.
pub fn is_supported_bytes(name: Option<&str>, bytes: &[u8]) -> bool {
    sniff::sniff(name, bytes).is_supported()
}

/// Decoder for a file name, resolved by extension.
///
/// # Errors
///
/// Returns `SharetextError::UnsupportedFormat` when the name resolves to no decoder.
pub fn get_extractor(name: &str) -> Result<Extractor> {
    get_extractor_for(Some(name), &[])
}

/// Decoder for a name plus content; the content signature wins over the name.
pub fn get_extractor_for(name: Option<&str>, bytes: &[u8]) -> Result<Extractor> {
    let tag = sniff::sniff(name, bytes);
    if !tag.is_supported() {
        return Err(SharetextError::UnsupportedFormat(match name {
            Some(name) => format!("cannot determine format of {}", name),
            None => "cannot determine format of byte buffer".to_string(),
        }));
    }
    Ok(Extractor {
        entry: registry::entry(tag)?,
    })
}

/// Sniff and decode an in-memory document.
#[tracing::instrument(skip(bytes, config), fields(size = bytes.len()))]
pub fn extract_bytes(bytes: &[u8], filename: Option<&str>, config: &ExtractionConfig) -> Result<ExtractedContent> {
    let extractor = get_extractor_for(filename, bytes)?;
    tracing::debug!(
        "Dispatching {} ({} bytes) to the {} decoder",
        filename.unwrap_or("<bytes>"),
        bytes.len(),
        extractor.tag()
    );
    extractor.extract_with_config(bytes, config)
}

/// Read, sniff and decode a file with the default configuration.
pub fn read_file(path: impl AsRef<Path>) -> Result<ExtractedContent> {
    read_file_with_config(path, &ExtractionConfig::default())
}

/// Read, sniff and decode a file.
///
/// # Errors
///
/// - `SharetextError::FileNotFound` if `path` does not exist
/// - `SharetextError::UnsupportedFormat` if the format cannot be determined
/// - decoder errors (`CorruptContainer`, ...) unchanged
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_file_with_config(path: impl AsRef<Path>, config: &ExtractionConfig) -> Result<ExtractedContent> {
    let path = path.as_ref();
    let bytes = io::read_file_bytes(path, config.max_file_size)?;
    let filename = path.file_name().and_then(|name| name.to_str());
    extract_bytes(&bytes, filename, config)
}

/// Format tag and MIME type of a file, without decoding it.
pub fn detect_file(path: impl AsRef<Path>) -> Result<(FormatTag, &'static str)> {
    let path = path.as_ref();
    let bytes = io::read_file_bytes(path, None)?;
    let tag = sniff::sniff(path.file_name().and_then(|name| name.to_str()), &bytes);
    Ok((tag, registry::mime_type(tag)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_supported_file_by_name() {
        assert!(is_supported_file("report.docx"));
        assert!(is_supported_file("INBOX.mbox"));
        assert!(!is_supported_file("photo.jpg"));
        assert!(!is_supported_file("Makefile"));
    }

    #[test]
    fn test_get_extractor_unsupported() {
        let err = get_extractor("archive.7z").unwrap_err();
        assert!(matches!(err, SharetextError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_get_extractor_reports_tag_and_mime() {
        let extractor = get_extractor("notes.md").unwrap();
        assert_eq!(extractor.tag(), FormatTag::Md);
        assert_eq!(extractor.mime_type(), "text/markdown");
        assert!(!extractor.supports_attachments());

        let content = extractor.extract(b"# Title\n\nBody").unwrap();
        assert_eq!(content.format(), FormatTag::Md);
    }

    #[test]
    fn test_read_file_missing() {
        let dir = tempdir().unwrap();
        let err = read_file(dir.path().join("gone.pdf")).unwrap_err();
        assert!(matches!(err, SharetextError::FileNotFound { .. }));
    }

    #[test]
    fn test_read_file_unsupported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, [0u8, 1, 2, 3, 0xFF]).unwrap();
        let err = read_file(&path).unwrap_err();
        assert!(matches!(err, SharetextError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_read_file_surfaces_decode_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n1 0 obj\n<<").unwrap();
        let err = read_file(&path).unwrap_err();
        assert!(matches!(err, SharetextError::CorruptContainer { .. }), "got {err:?}");
    }

    #[test]
    fn test_detect_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.txt");
        fs::write(&path, b"a,b\n1,2\n").unwrap();
        let (tag, mime) = detect_file(&path).unwrap();
        assert_eq!(tag, FormatTag::Txt);
        assert_eq!(mime, "text/plain");
    }
}
