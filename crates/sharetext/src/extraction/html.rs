//! HTML extraction.
//!
//! The document is parsed with `scraper` (html5ever), so malformed markup and
//! entities are handled the way browsers do. The tree is then walked once:
//! block elements close the current paragraph, inline text is whitespace
//! collapsed, and tables, links and inline `data:` images are collected
//! alongside the text.

use std::mem;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::Result;
use crate::core::config::ExtractionConfig;
use crate::core::format::FormatTag;
use crate::extraction::normalize::{detect_image_format, normalize_text};
use crate::types::{Block, Content, Hyperlink, ImageRecord, Metadata, Paragraph, Table, TextDocument};

static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_.:\-]+)"#)
        .expect("Meta charset regex pattern is valid and should compile")
});

/// Elements dropped together with their content.
const REMOVED_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "object", "embed", "applet", "template", "head", "svg",
];

const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "header",
    "footer",
    "nav",
    "aside",
    "main",
    "blockquote",
    "address",
    "figure",
    "figcaption",
    "form",
    "fieldset",
    "details",
    "summary",
    "dl",
    "dt",
    "dd",
    "center",
];

const MAX_DEPTH: usize = 512;

pub fn read_html(bytes: &[u8]) -> Result<TextDocument> {
    read_html_with_config(bytes, &ExtractionConfig::default())
}

/// Extract an HTML page. Parsing is lenient and never fails.
#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_html_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<TextDocument> {
    let html = decode_html(bytes);
    let document = Html::parse_document(&html);

    let mut walker = HtmlWalker::new(config);
    walker.doc.metadata = read_metadata(&document);
    walker.walk(document.root_element(), 0);
    walker.flush();
    Ok(walker.doc)
}

/// Plain text of an HTML fragment, one line per block.
pub(crate) fn html_to_text(html: &str, config: &ExtractionConfig) -> String {
    let document = Html::parse_document(html);
    let mut walker = HtmlWalker::new(config);
    walker.walk(document.root_element(), 0);
    walker.flush();
    walker.doc.full_text()
}

/// Decode by BOM, then by a `<meta>` charset declaration, then as UTF-8 with a
/// windows-1252 fallback.
fn decode_html(bytes: &[u8]) -> String {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        return text.into_owned();
    }

    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]);
    let declared = META_CHARSET
        .captures(&head)
        .and_then(|captures| Encoding::for_label(captures[1].as_bytes()))
        .map(|encoding| {
            if encoding == encoding_rs::UTF_16LE || encoding == encoding_rs::UTF_16BE {
                encoding_rs::UTF_8
            } else {
                encoding
            }
        });
    if let Some(encoding) = declared {
        let (text, _) = encoding.decode_without_bom_handling(bytes);
        return text.into_owned();
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            tracing::debug!("HTML without charset is not UTF-8, decoding as windows-1252");
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}

fn read_metadata(document: &Html) -> Metadata {
    let mut metadata = Metadata::default();

    if let Ok(selector) = Selector::parse("title")
        && let Some(title) = document.select(&selector).next()
    {
        let title = collapse_whitespace(&title.text().collect::<String>());
        if !title.is_empty() {
            metadata.title = Some(title);
        }
    }

    metadata.language = document
        .root_element()
        .value()
        .attr("lang")
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(String::from);

    if let Ok(selector) = Selector::parse("meta[name][content]") {
        for meta in document.select(&selector) {
            let name = meta.value().attr("name").unwrap_or_default().to_ascii_lowercase();
            let content = meta.value().attr("content").unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }
            let slot = match name.as_str() {
                "author" => &mut metadata.author,
                "keywords" => &mut metadata.keywords,
                "description" => &mut metadata.subject,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(content.to_string());
            }
        }
    }
    metadata
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct ListState {
    ordered: bool,
    next: usize,
}

struct HtmlWalker<'c> {
    config: &'c ExtractionConfig,
    doc: TextDocument,
    paragraph: String,
    style: Option<String>,
    /// List marker for the paragraph being built.
    prefix: Option<String>,
    lists: Vec<ListState>,
}

impl<'c> HtmlWalker<'c> {
    fn new(config: &'c ExtractionConfig) -> Self {
        Self {
            config,
            doc: TextDocument::new(FormatTag::Html),
            paragraph: String::new(),
            style: None,
            prefix: None,
            lists: Vec::new(),
        }
    }

    fn walk(&mut self, element: ElementRef, depth: usize) {
        if depth > MAX_DEPTH {
            self.push_inline(&element.text().collect::<String>());
            return;
        }

        let name = element.value().name();
        match name {
            _ if REMOVED_TAGS.contains(&name) => {}
            "br" => self.paragraph.push('\n'),
            "hr" => self.flush(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                self.walk_children(element, depth);
                self.style = Some(format!("Heading {}", &name[1..]));
                self.flush();
            }
            "ul" | "ol" => {
                self.flush();
                let next = element
                    .value()
                    .attr("start")
                    .and_then(|start| start.trim().parse().ok())
                    .unwrap_or(1);
                self.lists.push(ListState {
                    ordered: name == "ol",
                    next,
                });
                self.walk_children(element, depth);
                self.lists.pop();
                self.flush();
            }
            "li" => {
                self.flush();
                self.prefix = Some(match self.lists.last_mut() {
                    Some(list) if list.ordered => {
                        let marker = format!("{}. ", list.next);
                        list.next += 1;
                        marker
                    }
                    _ => "- ".to_string(),
                });
                self.walk_children(element, depth);
                self.flush();
            }
            "table" => {
                self.flush();
                self.read_table(element);
            }
            "pre" => {
                self.flush();
                let text: String = element.text().collect();
                let text = text.trim_matches(['\n', '\r']);
                if !text.trim().is_empty() {
                    self.doc.blocks.push(Block::Paragraph(Paragraph {
                        text: normalize_text(text, self.config),
                        style: None,
                    }));
                }
            }
            "a" => {
                self.record_link(element);
                self.walk_children(element, depth);
            }
            "img" => {
                if self.config.extract_images {
                    self.read_image(element);
                }
            }
            _ if BLOCK_TAGS.contains(&name) => {
                self.flush();
                self.walk_children(element, depth);
                self.flush();
            }
            _ => self.walk_children(element, depth),
        }
    }

    fn walk_children(&mut self, element: ElementRef, depth: usize) {
        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                self.walk(child_element, depth + 1);
            } else if let Some(text) = child.value().as_text() {
                self.push_inline(text);
            }
        }
    }

    fn push_inline(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if !self.paragraph.is_empty() && !self.paragraph.ends_with([' ', '\n']) {
                    self.paragraph.push(' ');
                }
            } else {
                self.paragraph.push(ch);
            }
        }
    }

    fn flush(&mut self) {
        let text = mem::take(&mut self.paragraph);
        let prefix = self.prefix.take();
        let style = self.style.take();

        let text = normalize_text(text.trim(), self.config);
        if text.is_empty() {
            return;
        }
        let text = match prefix {
            Some(prefix) => format!("{}{}", prefix, text),
            None => text,
        };
        self.doc.blocks.push(Block::Paragraph(Paragraph { text, style }));
    }

    fn record_link(&mut self, anchor: ElementRef) {
        let Some(url) = anchor.value().attr("href").map(str::trim) else {
            return;
        };
        if url.is_empty() || url.to_ascii_lowercase().starts_with("javascript:") {
            return;
        }
        self.doc.hyperlinks.push(Hyperlink {
            text: collapse_whitespace(&anchor.text().collect::<String>()),
            url: url.to_string(),
        });
    }

    fn read_table(&mut self, table: ElementRef) {
        let mut rows = Vec::new();
        for child in table.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "caption" => {
                    let caption = collapse_whitespace(&child.text().collect::<String>());
                    if !caption.is_empty() {
                        self.doc.blocks.push(Block::Paragraph(Paragraph {
                            text: caption,
                            style: Some("Caption".to_string()),
                        }));
                    }
                }
                "tr" => rows.extend(table_row(child)),
                "thead" | "tbody" | "tfoot" => rows.extend(
                    child
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|row| row.value().name() == "tr")
                        .filter_map(table_row),
                ),
                _ => {}
            }
        }

        for anchor in table
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|element| element.value().name() == "a")
        {
            self.record_link(anchor);
        }

        if !rows.is_empty() {
            self.doc.blocks.push(Block::Table(Table { rows }));
        }
    }

    fn read_image(&mut self, img: ElementRef) {
        let Some(src) = img.value().attr("src") else {
            return;
        };
        let Some((subtype, data)) = decode_data_url(src) else {
            tracing::debug!("Skipping image that is not an inline data URL");
            return;
        };

        let dimension = |name: &str| {
            img.value()
                .attr(name)
                .and_then(|value| value.trim().trim_end_matches("px").parse::<u32>().ok())
        };
        let format = detect_image_format(&data, &format!("image.{}", subtype));
        let index = self.doc.images.len();
        self.doc.images.push(ImageRecord {
            index,
            name: format!("image{}.{}", index + 1, format),
            width: dimension("width"),
            height: dimension("height"),
            data,
            format,
            caption: img
                .value()
                .attr("alt")
                .map(str::trim)
                .filter(|alt| !alt.is_empty())
                .map(String::from),
        });
    }
}

fn table_row(row: ElementRef) -> Option<Vec<String>> {
    let cells: Vec<String> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
        .collect();
    (!cells.is_empty()).then_some(cells)
}

/// `data:image/<subtype>;base64,<payload>` into the subtype and decoded bytes.
fn decode_data_url(src: &str) -> Option<(String, Vec<u8>)> {
    let rest = src.trim().strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let media_type = header.split(';').next().unwrap_or_default();
    let subtype = media_type.strip_prefix("image/")?;
    if !header.ends_with(";base64") {
        return None;
    }
    let subtype = subtype.split('+').next().unwrap_or(subtype).to_ascii_lowercase();

    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    match BASE64_STANDARD.decode(payload) {
        Ok(data) => Some((subtype, data)),
        Err(e) => {
            tracing::debug!("Invalid base64 in image data URL: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title> Release   notes </title>
  <meta name="author" content="Ana Silva">
  <meta name="keywords" content="release, notes">
  <meta name="description" content="What changed">
  <style>p { color: red }</style>
  <script>var x = "<p>no</p>";</script>
</head>
<body>
  <!-- hidden comment -->
  <h1>Version 2</h1>
  <p>Read the <a href="https://example.com/docs">full   docs</a> &amp; enjoy.</p>
  <ul><li>Faster</li><li>Smaller</li></ul>
  <ol start="3"><li>Install</li></ol>
  <table>
    <tr><th>Name</th><th>Size</th></tr>
    <tr><td>core</td><td>12 kB</td></tr>
  </table>
  <p>Line one<br>Line two</p>
  <noscript>Enable JS</noscript>
</body>
</html>"#;

    fn paragraph_texts(doc: &TextDocument) -> Vec<&str> {
        doc.paragraphs().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn test_blocks_links_and_metadata() {
        let doc = read_html(PAGE.as_bytes()).unwrap();

        assert_eq!(doc.format, FormatTag::Html);
        assert_eq!(
            paragraph_texts(&doc),
            vec![
                "Version 2",
                "Read the full docs & enjoy.",
                "- Faster",
                "- Smaller",
                "3. Install",
                "Line one\nLine two"
            ]
        );
        assert_eq!(doc.paragraphs().next().unwrap().style.as_deref(), Some("Heading 1"));
        assert_eq!(
            doc.tables().next().unwrap().rows,
            vec![
                vec!["Name".to_string(), "Size".to_string()],
                vec!["core".to_string(), "12 kB".to_string()]
            ]
        );
        assert_eq!(
            doc.hyperlinks,
            vec![Hyperlink {
                text: "full docs".to_string(),
                url: "https://example.com/docs".to_string(),
            }]
        );

        assert_eq!(doc.metadata.title.as_deref(), Some("Release notes"));
        assert_eq!(doc.metadata.author.as_deref(), Some("Ana Silva"));
        assert_eq!(doc.metadata.keywords.as_deref(), Some("release, notes"));
        assert_eq!(doc.metadata.subject.as_deref(), Some("What changed"));
        assert_eq!(doc.metadata.language.as_deref(), Some("en"));

        let text = doc.full_text();
        for hidden in ["var x", "color", "hidden comment", "Enable JS"] {
            assert!(!text.contains(hidden), "{hidden}");
        }
    }

    #[test]
    fn test_nested_blocks_split_paragraphs() {
        let doc = read_html(b"<div>Loose text<div>Inner</div>tail</div>").unwrap();
        assert_eq!(paragraph_texts(&doc), vec!["Loose text", "Inner", "tail"]);
    }

    #[test]
    fn test_charset_detection() {
        let declared = b"<html><head><meta charset=\"windows-1251\"></head><body><p>\xcf\xf0\xe8\xe2\xe5\xf2</p></body></html>";
        assert_eq!(read_html(declared).unwrap().full_text(), "Привет");

        let undeclared = b"<p>caf\xe9</p>";
        assert_eq!(read_html(undeclared).unwrap().full_text(), "café");

        let bom = b"\xEF\xBB\xBF<p>na\xc3\xafve</p>";
        assert_eq!(read_html(bom).unwrap().full_text(), "naïve");
    }

    #[test]
    fn test_inline_images() {
        let html = br#"<p>Logo <img src="data:image/png;base64,iVBORw0KGgo=" alt="Company logo" width="32" height="16px">
            <img src="https://example.com/remote.png"></p>"#;
        let doc = read_html(html).unwrap();

        assert_eq!(doc.images.len(), 1);
        let image = &doc.images[0];
        assert_eq!(image.format, "png");
        assert_eq!(image.caption.as_deref(), Some("Company logo"));
        assert_eq!((image.width, image.height), (Some(32), Some(16)));
        assert_eq!(&image.data[..4], &[0x89, b'P', b'N', b'G']);

        let config = ExtractionConfig {
            extract_images: false,
            ..Default::default()
        };
        assert!(read_html_with_config(html, &config).unwrap().images.is_empty());
    }

    #[test]
    fn test_html_to_text() {
        let text = html_to_text("<p>Hello <b>there</b></p><p>Bye</p>", &ExtractionConfig::default());
        assert_eq!(text, "Hello there\nBye");
    }

    #[test]
    fn test_decode_data_url_rejects_non_images() {
        assert!(decode_data_url("data:text/plain;base64,aGk=").is_none());
        assert!(decode_data_url("data:image/png,raw").is_none());
        assert_eq!(decode_data_url("data:image/svg+xml;base64,PHN2Zz4=").unwrap().0, "svg");
    }
}
