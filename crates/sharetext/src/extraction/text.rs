//! Plain text family: TXT, Markdown, CSV, TSV and JSON.
//!
//! The bytes are decoded (UTF-8 with BOM stripped, UTF-16 when a BOM says so,
//! lossy UTF-8 otherwise) and kept as a single text unit. Markdown documents
//! take their title from the front matter or the first heading.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::Result;
use crate::core::config::ExtractionConfig;
use crate::core::format::FormatTag;
use crate::extraction::normalize::normalize_text;
use crate::types::{Metadata, PlainText};

static MARKDOWN_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}\s+(.+?)\s*#*\s*$").expect("Markdown header regex pattern is valid and should compile"));
static FRONT_MATTER_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(title|author|date|keywords|lang)\s*:\s*["']?(.*?)["']?\s*$"#)
        .expect("Front matter regex pattern is valid and should compile")
});

/// Decode text bytes. Never fails: invalid UTF-8 is replaced.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(b"\xEF\xBB\xBF") {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if bytes.starts_with(b"\xFF\xFE") || bytes.starts_with(b"\xFE\xFF") {
        let encoding = if bytes[0] == 0xFF {
            encoding_rs::UTF_16LE
        } else {
            encoding_rs::UTF_16BE
        };
        let (text, _) = encoding.decode_with_bom_removal(bytes);
        return text.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            tracing::debug!("Text is not valid UTF-8 ({}), decoding lossily", e);
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn plain(bytes: &[u8], format: FormatTag, config: &ExtractionConfig) -> PlainText {
    PlainText {
        format,
        metadata: Metadata::default(),
        text: normalize_text(&decode_text(bytes), config),
    }
}

pub fn read_plain_text(bytes: &[u8]) -> Result<PlainText> {
    read_plain_text_with_config(bytes, &ExtractionConfig::default())
}

pub fn read_plain_text_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<PlainText> {
    Ok(plain(bytes, FormatTag::Txt, config))
}

pub fn read_csv(bytes: &[u8]) -> Result<PlainText> {
    read_csv_with_config(bytes, &ExtractionConfig::default())
}

pub fn read_csv_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<PlainText> {
    Ok(plain(bytes, FormatTag::Csv, config))
}

pub fn read_tsv(bytes: &[u8]) -> Result<PlainText> {
    read_tsv_with_config(bytes, &ExtractionConfig::default())
}

pub fn read_tsv_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<PlainText> {
    Ok(plain(bytes, FormatTag::Tsv, config))
}

pub fn read_json(bytes: &[u8]) -> Result<PlainText> {
    read_json_with_config(bytes, &ExtractionConfig::default())
}

/// JSON is kept verbatim. Content that does not parse is still returned as
/// text, since `.json` exports are often truncated or commented.
pub fn read_json_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<PlainText> {
    let content = plain(bytes, FormatTag::Json, config);
    if let Err(e) = serde_json::from_str::<serde_json::Value>(&content.text) {
        tracing::debug!("JSON content does not parse, keeping raw text: {}", e);
    }
    Ok(content)
}

pub fn read_md(bytes: &[u8]) -> Result<PlainText> {
    read_md_with_config(bytes, &ExtractionConfig::default())
}

pub fn read_md_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<PlainText> {
    let mut content = plain(bytes, FormatTag::Md, config);
    content.metadata = markdown_metadata(&content.text);
    Ok(content)
}

/// Title and author from YAML front matter, falling back to the first heading
/// outside fenced code blocks for the title.
fn markdown_metadata(text: &str) -> Metadata {
    let mut metadata = Metadata::default();
    let mut lines = text.lines().peekable();

    if lines.peek().map(|line| line.trim_end()) == Some("---") {
        lines.next();
        for line in lines.by_ref() {
            let line = line.trim_end();
            if line == "---" || line == "..." {
                break;
            }
            let Some(caps) = FRONT_MATTER_FIELD.captures(line) else {
                continue;
            };
            let value = caps[2].trim().to_string();
            if value.is_empty() {
                continue;
            }
            match &caps[1] {
                "title" => metadata.title = Some(value),
                "author" => metadata.author = Some(value),
                "date" => metadata.created = Some(value),
                "keywords" => metadata.keywords = Some(value),
                "lang" => metadata.language = Some(value),
                _ => {}
            }
        }
    }

    if metadata.title.is_none() {
        let mut in_code_block = false;
        for line in lines {
            if line.trim_start().starts_with("```") {
                in_code_block = !in_code_block;
                continue;
            }
            if in_code_block {
                continue;
            }
            if let Some(caps) = MARKDOWN_HEADER.captures(line) {
                metadata.title = Some(caps[1].to_string());
                break;
            }
        }
    }
    metadata
}
