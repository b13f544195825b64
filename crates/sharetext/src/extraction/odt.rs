//! ODT (OpenDocument Text) extraction, plus the ODF helpers shared with ODP.
//!
//! `content.xml` is walked in document order. Headings, paragraphs and list
//! items become paragraphs, `table:table` elements become tables. Embedded
//! formula objects (`Object N/content.xml`, MathML) are rendered to LaTeX and
//! placed inline as `$…$`. Headers and footers come from the master pages in
//! `styles.xml`.

use roxmltree::Node;

use crate::core::config::ExtractionConfig;
use crate::core::format::FormatTag;
use crate::extraction::normalize::{detect_image_format, normalize_text};
use crate::extraction::office_metadata::odf_meta;
use crate::extraction::ooxml::{Package, parse_xml};
use crate::formula::mathml::mathml_str_to_latex;
use crate::types::{
    Block, Comment, HeaderFooter, HeaderFooterKind, Hyperlink, ImageRecord, Note, Paragraph, Table, TextDocument,
};
use crate::{Result, SharetextError};

pub(crate) const OFFICE_NAMESPACE: &str = "urn:oasis:names:tc:opendocument:xmlns:office:1.0";
pub(crate) const TEXT_NAMESPACE: &str = "urn:oasis:names:tc:opendocument:xmlns:text:1.0";
pub(crate) const TABLE_NAMESPACE: &str = "urn:oasis:names:tc:opendocument:xmlns:table:1.0";
pub(crate) const DRAW_NAMESPACE: &str = "urn:oasis:names:tc:opendocument:xmlns:drawing:1.0";
pub(crate) const STYLE_NAMESPACE: &str = "urn:oasis:names:tc:opendocument:xmlns:style:1.0";
pub(crate) const SVG_NAMESPACE: &str = "urn:oasis:names:tc:opendocument:xmlns:svg-compatible:1.0";
pub(crate) const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

pub(crate) const CONTENT_PART: &str = "content.xml";
const STYLES_PART: &str = "styles.xml";

const MAX_NESTING: usize = 64;

/// Text of an ODF element: spans flattened, `text:s` expanded, tabs and line
/// breaks kept. Notes, annotations and drawing objects are left out.
pub(crate) fn odf_text(node: Node) -> String {
    let mut out = String::new();
    push_odf_text(node, &mut out, 0);
    out
}

fn push_odf_text(node: Node, out: &mut String, depth: usize) {
    if depth > MAX_NESTING {
        return;
    }
    for child in node.children() {
        if child.is_text() {
            out.push_str(child.text().unwrap_or_default());
            continue;
        }
        if !child.is_element() {
            continue;
        }
        match (child.tag_name().namespace(), child.tag_name().name()) {
            (Some(TEXT_NAMESPACE), "s") => push_spaces(child, out),
            (Some(TEXT_NAMESPACE), "tab") => out.push('\t'),
            (Some(TEXT_NAMESPACE), "line-break") => out.push('\n'),
            (Some(TEXT_NAMESPACE), "note") | (Some(OFFICE_NAMESPACE), "annotation") => {}
            (Some(DRAW_NAMESPACE), _) => {}
            (Some(TEXT_NAMESPACE), "p" | "h") => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                push_odf_text(child, out, depth + 1);
            }
            _ => push_odf_text(child, out, depth + 1),
        }
    }
}

fn push_spaces(node: Node, out: &mut String) {
    let count = node
        .attribute((TEXT_NAMESPACE, "c"))
        .and_then(|c| c.parse::<usize>().ok())
        .unwrap_or(1);
    out.extend(std::iter::repeat_n(' ', count.min(1024)));
}

/// ODF length (`2.5cm`, `1in`, `12pt`, `30mm`, `100px`) in pixels at 96 dpi.
pub(crate) fn length_to_pixels(length: &str) -> Option<u32> {
    let length = length.trim();
    let split = length.find(|c: char| c.is_ascii_alphabetic())?;
    let (value, unit) = length.split_at(split);
    let value: f64 = value.trim().parse().ok()?;
    let pixels = match unit {
        "cm" => value * 96.0 / 2.54,
        "mm" => value * 96.0 / 25.4,
        "in" => value * 96.0,
        "pt" => value * 96.0 / 72.0,
        "pc" => value * 16.0,
        "px" => value,
        _ => return None,
    };
    (pixels >= 0.0).then(|| pixels.round() as u32)
}

/// LaTeX of an embedded formula object (`./Object 1` → `Object 1/content.xml`).
pub(crate) fn formula_object_latex(package: &mut Package, href: &str) -> Option<String> {
    let dir = href.trim_start_matches("./").trim_end_matches('/');
    let part = format!("{}/{}", dir, CONTENT_PART);
    let Some(xml) = package.read_optional_string(&part) else {
        tracing::debug!("Embedded object {} has no content part", dir);
        return None;
    };
    let latex = mathml_str_to_latex(&xml);
    (!latex.trim().is_empty()).then_some(latex)
}

/// The image of a `draw:frame`, when it has an internal `draw:image`.
pub(crate) fn frame_image(package: &mut Package, frame: Node, index: usize) -> Option<ImageRecord> {
    let href = frame
        .children()
        .find(|n| n.has_tag_name((DRAW_NAMESPACE, "image")))?
        .attribute((XLINK_NAMESPACE, "href"))?;
    if href.contains("://") {
        return None;
    }
    let path = href.trim_start_matches("./");
    let data = match package.read_part(path) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!("Skipping unreadable image {}: {}", path, e);
            return None;
        }
    };
    let name = path.rsplit('/').next().unwrap_or(path).to_string();
    let caption = frame
        .children()
        .find(|n| n.has_tag_name((SVG_NAMESPACE, "desc")) || n.has_tag_name((SVG_NAMESPACE, "title")))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from);

    Some(ImageRecord {
        index,
        format: detect_image_format(&data, &name),
        width: frame.attribute((SVG_NAMESPACE, "width")).and_then(length_to_pixels),
        height: frame.attribute((SVG_NAMESPACE, "height")).and_then(length_to_pixels),
        name,
        data,
        caption,
    })
}

/// An `office:annotation` as a comment; `fallback_id` names annotations
/// without `office:name`.
pub(crate) fn odf_annotation(node: Node, fallback_id: usize, config: &ExtractionConfig) -> Comment {
    let child_text = |name: &str| {
        node.children()
            .find(|n| n.has_tag_name((DC_NAMESPACE, name)))
            .and_then(|n| n.text())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(String::from)
    };
    let text = node
        .children()
        .filter(|n| n.has_tag_name((TEXT_NAMESPACE, "p")))
        .map(odf_text)
        .collect::<Vec<_>>()
        .join("\n");

    Comment {
        id: node
            .attribute((OFFICE_NAMESPACE, "name"))
            .map(String::from)
            .unwrap_or_else(|| fallback_id.to_string()),
        author: child_text("creator"),
        date: child_text("date"),
        text: normalize_text(text.trim(), config),
    }
}

/// `href` of the frame's embedded object, if it is one.
pub(crate) fn frame_object_href<'a>(frame: Node<'a, '_>) -> Option<&'a str> {
    frame
        .children()
        .find(|n| n.has_tag_name((DRAW_NAMESPACE, "object")))
        .and_then(|object| object.attribute((XLINK_NAMESPACE, "href")))
}

pub fn read_odt(bytes: &[u8]) -> Result<TextDocument> {
    read_odt_with_config(bytes, &ExtractionConfig::default())
}

/// Extract an OpenDocument text document.
///
/// # Errors
///
/// `CorruptContainer` when the bytes are not a ZIP package or `content.xml`
/// is missing, malformed or has no text body.
#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_odt_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<TextDocument> {
    let mut package = Package::open(bytes)?;
    let xml = package.read_part_string(CONTENT_PART)?;
    let doc = parse_xml(&xml, CONTENT_PART)?;
    let body = doc
        .descendants()
        .find(|n| n.has_tag_name((OFFICE_NAMESPACE, "text")))
        .ok_or_else(|| SharetextError::corrupt_container("content.xml has no office:text body"))?;

    let mut reader = OdtReader {
        package,
        config,
        document: TextDocument::new(FormatTag::Odt),
    };
    reader.document.metadata = odf_meta(&mut reader.package);

    let mut blocks = Vec::new();
    reader.collect_blocks(body, &mut blocks, 0);
    reader.document.blocks = blocks;
    reader.read_master_pages();

    Ok(reader.document)
}

struct OdtReader<'a, 'c> {
    package: Package<'a>,
    config: &'c ExtractionConfig,
    document: TextDocument,
}

impl OdtReader<'_, '_> {
    fn collect_blocks(&mut self, parent: Node, blocks: &mut Vec<Block>, depth: usize) {
        if depth > MAX_NESTING {
            return;
        }
        for node in parent.children().filter(Node::is_element) {
            match (node.tag_name().namespace(), node.tag_name().name()) {
                (Some(TEXT_NAMESPACE), "p" | "h") => blocks.push(Block::Paragraph(self.paragraph(node))),
                (Some(TABLE_NAMESPACE), "table") => blocks.push(Block::Table(self.table(node, depth))),
                (Some(TEXT_NAMESPACE), "list" | "list-item" | "list-header" | "section" | "index-body")
                | (Some(TEXT_NAMESPACE), "table-of-content" | "alphabetical-index" | "illustration-index") => {
                    self.collect_blocks(node, blocks, depth + 1)
                }
                _ => {}
            }
        }
    }

    fn paragraph(&mut self, node: Node) -> Paragraph {
        let style = if node.tag_name().name() == "h" {
            node.attribute((TEXT_NAMESPACE, "outline-level"))
                .map(|level| format!("Heading {}", level))
                .or_else(|| node.attribute((TEXT_NAMESPACE, "style-name")).map(String::from))
        } else {
            node.attribute((TEXT_NAMESPACE, "style-name")).map(String::from)
        };

        let mut text = String::new();
        self.inline_text(node, &mut text, 0);
        Paragraph {
            text: normalize_text(&text, self.config),
            style,
        }
    }

    fn table(&mut self, node: Node, depth: usize) -> Table {
        let rows = node
            .descendants()
            .filter(|n| n.has_tag_name((TABLE_NAMESPACE, "table-row")))
            // Rows of nested tables belong to their own cell.
            .filter(|row| row.ancestors().find(|a| a.has_tag_name((TABLE_NAMESPACE, "table"))) == Some(node))
            .map(|row| {
                row.children()
                    .filter(|n| n.has_tag_name((TABLE_NAMESPACE, "table-cell")))
                    .map(|cell| self.cell_text(cell, depth))
                    .collect()
            })
            .collect();
        Table { rows }
    }

    fn cell_text(&mut self, cell: Node, depth: usize) -> String {
        let mut blocks = Vec::new();
        self.collect_blocks(cell, &mut blocks, depth + 1);
        blocks
            .iter()
            .map(|block| match block {
                Block::Paragraph(p) => p.text.clone(),
                Block::Table(t) => t.to_text(),
            })
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn inline_text(&mut self, node: Node, out: &mut String, depth: usize) {
        if depth > MAX_NESTING {
            return;
        }
        for child in node.children() {
            if child.is_text() {
                out.push_str(child.text().unwrap_or_default());
                continue;
            }
            if !child.is_element() {
                continue;
            }
            match (child.tag_name().namespace(), child.tag_name().name()) {
                (Some(TEXT_NAMESPACE), "s") => push_spaces(child, out),
                (Some(TEXT_NAMESPACE), "tab") => out.push('\t'),
                (Some(TEXT_NAMESPACE), "line-break") => out.push('\n'),
                (Some(TEXT_NAMESPACE), "note") => self.note(child),
                (Some(OFFICE_NAMESPACE), "annotation") => self.annotation(child),
                (Some(OFFICE_NAMESPACE), "annotation-end") => {}
                (Some(TEXT_NAMESPACE), "a") => {
                    let start = out.len();
                    self.inline_text(child, out, depth + 1);
                    if let Some(url) = child.attribute((XLINK_NAMESPACE, "href")) {
                        self.document.hyperlinks.push(Hyperlink {
                            text: out[start..].trim().to_string(),
                            url: url.to_string(),
                        });
                    }
                }
                (Some(DRAW_NAMESPACE), "frame") => self.frame(child, out, depth),
                (Some(DRAW_NAMESPACE), "a" | "g") => self.inline_text(child, out, depth + 1),
                (Some(DRAW_NAMESPACE), _) => {}
                _ => self.inline_text(child, out, depth + 1),
            }
        }
    }

    fn frame(&mut self, frame: Node, out: &mut String, depth: usize) {
        if let Some(href) = frame_object_href(frame) {
            // The object's replacement image is a rendering of the formula.
            if let Some(latex) = formula_object_latex(&mut self.package, href) {
                out.push_str(&format!("${}$", latex));
                self.document.formulas.push(latex);
            }
            return;
        }

        if self.config.extract_images
            && let Some(image) = frame_image(&mut self.package, frame, self.document.images.len())
        {
            self.document.images.push(image);
        }

        if let Some(text_box) = frame.children().find(|n| n.has_tag_name((DRAW_NAMESPACE, "text-box"))) {
            for paragraph in text_box.descendants().filter(|n| {
                n.has_tag_name((TEXT_NAMESPACE, "p")) || n.has_tag_name((TEXT_NAMESPACE, "h"))
            }) {
                if !out.is_empty() && !out.ends_with(['\n', ' ']) {
                    out.push(' ');
                }
                self.inline_text(paragraph, out, depth + 1);
            }
        }
    }

    fn note(&mut self, node: Node) {
        let id = node.attribute((TEXT_NAMESPACE, "id")).unwrap_or_default().to_string();
        let text = node
            .children()
            .find(|n| n.has_tag_name((TEXT_NAMESPACE, "note-body")))
            .map(|body| normalize_text(odf_text(body).trim(), self.config))
            .unwrap_or_default();
        let note = Note { id, text };
        if node.attribute((TEXT_NAMESPACE, "note-class")) == Some("endnote") {
            self.document.endnotes.push(note);
        } else {
            self.document.footnotes.push(note);
        }
    }

    fn annotation(&mut self, node: Node) {
        let comment = odf_annotation(node, self.document.comments.len(), self.config);
        self.document.comments.push(comment);
    }

    fn read_master_pages(&mut self) {
        let Some(xml) = self.package.read_optional_string(STYLES_PART) else {
            return;
        };
        let doc = match parse_xml(&xml, STYLES_PART) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!("Ignoring malformed styles part: {}", e);
                return;
            }
        };

        for page in doc.descendants().filter(|n| n.has_tag_name((STYLE_NAMESPACE, "master-page"))) {
            for region in page.children().filter(Node::is_element) {
                let (is_header, kind) = match region.tag_name().name() {
                    "header" => (true, HeaderFooterKind::Default),
                    "header-left" => (true, HeaderFooterKind::EvenPage),
                    "header-first" => (true, HeaderFooterKind::FirstPage),
                    "footer" => (false, HeaderFooterKind::Default),
                    "footer-left" => (false, HeaderFooterKind::EvenPage),
                    "footer-first" => (false, HeaderFooterKind::FirstPage),
                    _ => continue,
                };
                let text = normalize_text(odf_text(region).trim(), self.config);
                if text.is_empty() {
                    continue;
                }
                let target = if is_header {
                    &mut self.document.headers
                } else {
                    &mut self.document.footers
                };
                let entry = HeaderFooter { kind, text };
                if !target.contains(&entry) {
                    target.push(entry);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Content;
    use std::io::{Cursor, Write};
    use zip::write::{SimpleFileOptions, ZipWriter};

    const NS: &str = r#"xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:draw="urn:oasis:names:tc:opendocument:xmlns:drawing:1.0" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:svg="urn:oasis:names:tc:opendocument:xmlns:svg-compatible:1.0" xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:meta="urn:oasis:names:tc:opendocument:xmlns:meta:1.0""#;

    const FRACTION_MATHML: &str = r#"<math xmlns="http://www.w3.org/1998/Math/MathML"><semantics><mrow><mfrac><mn>1</mn><mn>2</mn></mfrac></mrow></semantics></math>"#;

    fn content(body: &str) -> String {
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><office:document-content {NS}><office:body><office:text>{body}</office:text></office:body></office:document-content>"#)
    }

    fn build_odt(content_xml: &str, extra: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options = SimpleFileOptions::default();
            zip.start_file("mimetype", options).unwrap();
            zip.write_all(b"application/vnd.oasis.opendocument.text").unwrap();
            zip.start_file("content.xml", options).unwrap();
            zip.write_all(content_xml.as_bytes()).unwrap();
            for (name, data) in extra {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }

    #[test]
    fn test_blocks_in_document_order() {
        let body = r#"<text:h text:outline-level="1">Annual   Plan</text:h>
            <text:p text:style-name="Body">Goals<text:s text:c="2"/>and<text:tab/>risks</text:p>
            <table:table><table:table-row><table:table-cell><text:p>Q1</text:p></table:table-cell><table:table-cell><text:p>Launch</text:p><text:p>Beta</text:p></table:table-cell></table:table-row></table:table>
            <text:list><text:list-item><text:p>First item</text:p></text:list-item></text:list>"#;
        let document = read_odt(&build_odt(&content(body), &[])).unwrap();

        let paragraphs: Vec<_> = document.paragraphs().collect();
        assert_eq!(paragraphs[0].text, "Annual   Plan");
        assert_eq!(paragraphs[0].style.as_deref(), Some("Heading 1"));
        assert_eq!(paragraphs[1].text, "Goals  and\trisks");
        assert_eq!(paragraphs[1].style.as_deref(), Some("Body"));
        assert_eq!(paragraphs[2].text, "First item");
        assert_eq!(document.tables().next().unwrap().rows, vec![vec!["Q1", "Launch\nBeta"]]);
        assert_eq!(
            document.full_text(),
            "Annual   Plan\nGoals  and\trisks\nQ1\tLaunch\nBeta\nFirst item"
        );
    }

    #[test]
    fn test_embedded_formula_object() {
        let body = r#"<text:p>Half is <draw:frame draw:name="Object1"><draw:object xlink:href="./Object 1"/><draw:image xlink:href="./ObjectReplacements/Object 1"/></draw:frame></text:p>"#;
        let document = read_odt(&build_odt(
            &content(body),
            &[("Object 1/content.xml", FRACTION_MATHML.as_bytes())],
        ))
        .unwrap();

        assert_eq!(document.formulas, vec!["\\frac{1}{2}"]);
        assert_eq!(document.paragraphs().next().unwrap().text, "Half is $\\frac{1}{2}$");
        assert!(document.images.is_empty());
    }

    #[test]
    fn test_links_notes_annotations_and_images() {
        let png: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let body = r#"<text:p>Read <text:a xlink:href="https://example.com/spec">the guide</text:a><text:note text:id="ftn1" text:note-class="footnote"><text:note-citation>1</text:note-citation><text:note-body><text:p>Updated yearly.</text:p></text:note-body></text:note>.<office:annotation office:name="c1"><dc:creator>Rui</dc:creator><dc:date>2024-03-01T10:00:00</dc:date><text:p>Check this</text:p></office:annotation></text:p>
            <text:p><draw:frame svg:width="2.54cm" svg:height="1in"><draw:image xlink:href="Pictures/logo.png"/><svg:desc>Company logo</svg:desc></draw:frame><draw:frame><draw:image xlink:href="Pictures/missing.png"/></draw:frame></text:p>"#;
        let document = read_odt(&build_odt(&content(body), &[("Pictures/logo.png", png)])).unwrap();

        assert_eq!(document.paragraphs().next().unwrap().text, "Read the guide.");
        assert_eq!(document.hyperlinks[0].url, "https://example.com/spec");
        assert_eq!(document.hyperlinks[0].text, "the guide");
        assert_eq!(document.footnotes, vec![Note { id: "ftn1".into(), text: "Updated yearly.".into() }]);
        assert_eq!(document.comments[0].author.as_deref(), Some("Rui"));
        assert_eq!(document.comments[0].text, "Check this");

        assert_eq!(document.images.len(), 1);
        let image = &document.images[0];
        assert_eq!(image.name, "logo.png");
        assert_eq!(image.format, "png");
        assert_eq!((image.width, image.height), (Some(96), Some(96)));
        assert_eq!(image.caption.as_deref(), Some("Company logo"));
    }

    #[test]
    fn test_headers_footers_and_metadata() {
        let styles = format!(
            r#"<office:document-styles {NS}><office:master-styles><style:master-page style:name="Standard"><style:header><text:p>Confidential</text:p></style:header><style:footer-left><text:p>Page</text:p></style:footer-left></style:master-page></office:master-styles></office:document-styles>"#
        );
        let meta = format!(
            r#"<office:document-meta {NS}><office:meta><dc:title>Roadmap</dc:title><meta:initial-creator>Ines</meta:initial-creator></office:meta></office:document-meta>"#
        );
        let document = read_odt(&build_odt(
            &content("<text:p>Body</text:p>"),
            &[("styles.xml", styles.as_bytes()), ("meta.xml", meta.as_bytes())],
        ))
        .unwrap();

        assert_eq!(document.headers, vec![HeaderFooter { kind: HeaderFooterKind::Default, text: "Confidential".into() }]);
        assert_eq!(document.footers[0].kind, HeaderFooterKind::EvenPage);
        assert_eq!(document.metadata.title.as_deref(), Some("Roadmap"));
        assert_eq!(document.metadata.author.as_deref(), Some("Ines"));
    }

    #[test]
    fn test_missing_content_part() {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            zip.start_file("mimetype", SimpleFileOptions::default()).unwrap();
            zip.write_all(b"application/vnd.oasis.opendocument.text").unwrap();
            zip.finish().unwrap();
        }
        assert!(matches!(read_odt(&buffer).unwrap_err(), SharetextError::CorruptContainer { .. }));
    }

    #[test]
    fn test_length_to_pixels() {
        assert_eq!(length_to_pixels("2.54cm"), Some(96));
        assert_eq!(length_to_pixels("72pt"), Some(96));
        assert_eq!(length_to_pixels("10mm"), Some(38));
        assert_eq!(length_to_pixels("wide"), None);
    }
}
