//! DOCX (WordprocessingML) extraction.
//!
//! The main document part is walked in source order: paragraphs and tables
//! become [`Block`]s, inline OMML formulas are rendered to LaTeX and embedded
//! in the paragraph text as `$…$`. Headers, footers, footnotes, endnotes and
//! comments are read from the parts the main document references.
//!
//! Only the container is fatal: a missing or malformed main part is a
//! `CorruptContainer` error. Secondary parts and images that cannot be read are
//! logged and skipped.

use std::collections::{HashMap, HashSet};

use roxmltree::Node;

use crate::Result;
use crate::core::config::ExtractionConfig;
use crate::core::format::FormatTag;
use crate::extraction::normalize::{detect_image_format, emu_to_pixels, normalize_text};
use crate::extraction::office_metadata::core_properties;
use crate::extraction::ooxml::{A_NAMESPACE, Package, R_NAMESPACE, Relationship, W_NAMESPACE, WP_NAMESPACE, parse_xml};
use crate::formula::omml::{OMML_NAMESPACE, omml_to_latex};
use crate::types::{
    Block, Comment, HeaderFooter, HeaderFooterKind, Hyperlink, ImageRecord, Note, Paragraph, Table, TextDocument,
};

const MAIN_PART: &str = "word/document.xml";
const MC_NAMESPACE: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

/// Nested tables and content controls deeper than this are flattened.
const MAX_NESTING: usize = 64;

type Rels = HashMap<String, Relationship>;

pub fn read_docx(bytes: &[u8]) -> Result<TextDocument> {
    read_docx_with_config(bytes, &ExtractionConfig::default())
}

/// Extract a DOCX document.
///
/// # Errors
///
/// `CorruptContainer` when the bytes are not a ZIP package or the main
/// document part is missing or malformed.
#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_docx_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<TextDocument> {
    let mut package = Package::open(bytes)?;
    let main_part = package.main_part(MAIN_PART);
    let xml = package.read_part_string(&main_part)?;
    let doc = parse_xml(&xml, &main_part)?;

    let mut reader = DocxReader {
        package,
        config,
        document: TextDocument::new(FormatTag::Docx),
        in_body: true,
    };
    reader.document.metadata = core_properties(&mut reader.package);

    let rels = reader.package.relationship_map(&main_part);
    let body = doc
        .root_element()
        .children()
        .find(|n| n.has_tag_name((W_NAMESPACE, "body")));
    if let Some(body) = body {
        let mut blocks = Vec::new();
        reader.collect_blocks(body, &rels, &mut blocks, 0);
        reader.document.blocks = blocks;
        reader.in_body = false;
        reader.read_headers_footers(body, &rels);
    } else {
        tracing::warn!("DOCX main part {} has no body", main_part);
    }

    reader.in_body = false;
    reader.read_notes(&rels);
    reader.read_comments(&rels);
    Ok(reader.document)
}

struct DocxReader<'a, 'c> {
    package: Package<'a>,
    config: &'c ExtractionConfig,
    document: TextDocument,
    /// Formulas are listed only while walking the main body; headers, notes
    /// and comments keep theirs inline.
    in_body: bool,
}

impl DocxReader<'_, '_> {
    fn collect_blocks(&mut self, container: Node, rels: &Rels, blocks: &mut Vec<Block>, depth: usize) {
        for child in container.children().filter(Node::is_element) {
            if child.tag_name().namespace() != Some(W_NAMESPACE) {
                continue;
            }
            match child.tag_name().name() {
                "p" => blocks.push(Block::Paragraph(self.paragraph(child, rels))),
                "tbl" => blocks.push(Block::Table(self.table(child, rels, depth))),
                "sdt" | "customXml" | "ins" | "smartTag" if depth < MAX_NESTING => {
                    let inner = child
                        .children()
                        .find(|n| n.has_tag_name((W_NAMESPACE, "sdtContent")))
                        .unwrap_or(child);
                    self.collect_blocks(inner, rels, blocks, depth + 1);
                }
                _ => {}
            }
        }
    }

    fn paragraph(&mut self, node: Node, rels: &Rels) -> Paragraph {
        let style = node
            .children()
            .find(|n| n.has_tag_name((W_NAMESPACE, "pPr")))
            .and_then(|ppr| ppr.children().find(|n| n.has_tag_name((W_NAMESPACE, "pStyle"))))
            .and_then(|style| style.attribute((W_NAMESPACE, "val")))
            .map(String::from);

        let mut text = String::new();
        self.inline_text(node, rels, &mut text, 0);
        Paragraph {
            text: normalize_text(&text, self.config),
            style,
        }
    }

    fn table(&mut self, node: Node, rels: &Rels, depth: usize) -> Table {
        let mut rows = Vec::new();
        for row in node.children().filter(|n| n.has_tag_name((W_NAMESPACE, "tr"))) {
            let cells = row
                .children()
                .filter(|n| n.has_tag_name((W_NAMESPACE, "tc")))
                .map(|cell| self.cell_text(cell, rels, depth))
                .collect();
            rows.push(cells);
        }
        Table { rows }
    }

    /// Cell paragraphs joined with `\n`; nested tables contribute their text.
    fn cell_text(&mut self, cell: Node, rels: &Rels, depth: usize) -> String {
        let mut blocks = Vec::new();
        if depth < MAX_NESTING {
            self.collect_blocks(cell, rels, &mut blocks, depth + 1);
        }
        blocks
            .into_iter()
            .map(|block| match block {
                Block::Paragraph(paragraph) => paragraph.text,
                Block::Table(table) => table.to_text(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn inline_text(&mut self, node: Node, rels: &Rels, out: &mut String, depth: usize) {
        if depth > MAX_NESTING {
            return;
        }
        for child in node.children().filter(Node::is_element) {
            let name = child.tag_name().name();
            match child.tag_name().namespace() {
                Some(W_NAMESPACE) => match name {
                    "t" => out.push_str(child.text().unwrap_or_default()),
                    "tab" | "ptab" => out.push('\t'),
                    "br" | "cr" => out.push('\n'),
                    "noBreakHyphen" => out.push('-'),
                    "pPr" | "rPr" | "del" | "delText" | "instrText" | "moveFrom" | "fldChar" => {}
                    "hyperlink" => self.hyperlink(child, rels, out, depth),
                    "drawing" => self.drawing(child, rels, out, depth),
                    _ => self.inline_text(child, rels, out, depth + 1),
                },
                Some(OMML_NAMESPACE) if name == "oMath" || name == "oMathPara" => {
                    let latex = omml_to_latex(child);
                    if !latex.is_empty() {
                        out.push('$');
                        out.push_str(&latex);
                        out.push('$');
                        if self.in_body {
                            self.document.formulas.push(latex);
                        }
                    }
                }
                Some(MC_NAMESPACE) if name == "AlternateContent" => {
                    if let Some(choice) = child.children().find(Node::is_element) {
                        self.inline_text(choice, rels, out, depth + 1);
                    }
                }
                _ => self.inline_text(child, rels, out, depth + 1),
            }
        }
    }

    fn hyperlink(&mut self, node: Node, rels: &Rels, out: &mut String, depth: usize) {
        let start = out.len();
        self.inline_text(node, rels, out, depth + 1);
        let text = out[start..].trim().to_string();

        let url = match node.attribute((R_NAMESPACE, "id")) {
            Some(id) => rels.get(id).map(|rel| rel.target.clone()),
            None => node.attribute((W_NAMESPACE, "anchor")).map(|anchor| format!("#{}", anchor)),
        };
        match url {
            Some(url) if !url.is_empty() => self.document.hyperlinks.push(Hyperlink { text, url }),
            _ => tracing::debug!("Hyperlink without a resolvable target: {:?}", text),
        }
    }

    /// An inline or anchored drawing: the picture becomes an image record and
    /// any text box content is appended to the paragraph.
    fn drawing(&mut self, node: Node, rels: &Rels, out: &mut String, depth: usize) {
        if self.config.extract_images {
            self.image(node, rels);
        }
        for textbox in node.descendants().filter(|n| n.has_tag_name((W_NAMESPACE, "txbxContent"))) {
            for paragraph in textbox.children().filter(|n| n.has_tag_name((W_NAMESPACE, "p"))) {
                let mut text = String::new();
                self.inline_text(paragraph, rels, &mut text, depth + 1);
                if !text.trim().is_empty() {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str(text.trim());
                }
            }
        }
    }

    fn image(&mut self, drawing: Node, rels: &Rels) {
        let Some(embed) = drawing
            .descendants()
            .find(|n| n.has_tag_name((A_NAMESPACE, "blip")))
            .and_then(|blip| blip.attribute((R_NAMESPACE, "embed")))
        else {
            return;
        };
        let Some(rel) = rels.get(embed).filter(|rel| !rel.external) else {
            tracing::debug!("Image relationship {} not found", embed);
            return;
        };
        let data = match self.package.read_part(&rel.target) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("Skipping unreadable image {}: {}", rel.target, e);
                return;
            }
        };

        let extent = drawing.descendants().find(|n| n.has_tag_name((WP_NAMESPACE, "extent")));
        let caption = drawing
            .descendants()
            .find(|n| n.has_tag_name((WP_NAMESPACE, "docPr")))
            .and_then(|pr| pr.attribute("descr"))
            .map(str::trim)
            .filter(|descr| !descr.is_empty())
            .map(String::from);

        let name = rel.target.rsplit('/').next().unwrap_or(&rel.target).to_string();
        self.document.images.push(ImageRecord {
            index: self.document.images.len(),
            format: detect_image_format(&data, &name),
            width: extent.and_then(|e| e.attribute("cx")).and_then(emu_to_pixels),
            height: extent.and_then(|e| e.attribute("cy")).and_then(emu_to_pixels),
            name,
            data,
            caption,
        });
    }

    /// Text of a secondary part (header, footer) with its own relationships.
    fn part_text(&mut self, part: &str) -> Option<String> {
        let xml = self.package.read_optional_string(part)?;
        let doc = match parse_xml(&xml, part) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!("Skipping part {}: {}", part, e);
                return None;
            }
        };
        let rels = self.package.relationship_map(part);
        let mut blocks = Vec::new();
        self.collect_blocks(doc.root_element(), &rels, &mut blocks, 0);
        let text = blocks
            .into_iter()
            .map(|block| match block {
                Block::Paragraph(paragraph) => paragraph.text,
                Block::Table(table) => table.to_text(),
            })
            .collect::<Vec<_>>()
            .join("\n");
        Some(text)
    }

    fn read_headers_footers(&mut self, body: Node, rels: &Rels) {
        let mut seen = HashSet::new();
        for section in body.descendants().filter(|n| n.has_tag_name((W_NAMESPACE, "sectPr"))) {
            for reference in section.children().filter(Node::is_element) {
                let is_header = reference.has_tag_name((W_NAMESPACE, "headerReference"));
                if !is_header && !reference.has_tag_name((W_NAMESPACE, "footerReference")) {
                    continue;
                }
                let Some(rel) = reference.attribute((R_NAMESPACE, "id")).and_then(|id| rels.get(id)) else {
                    continue;
                };
                let kind = match reference.attribute((W_NAMESPACE, "type")) {
                    Some("first") => HeaderFooterKind::FirstPage,
                    Some("even") => HeaderFooterKind::EvenPage,
                    _ => HeaderFooterKind::Default,
                };
                if !seen.insert((rel.target.clone(), kind)) {
                    continue;
                }
                let Some(text) = self.part_text(&rel.target) else {
                    tracing::warn!("Referenced header/footer part {} is missing", rel.target);
                    continue;
                };
                if text.trim().is_empty() {
                    continue;
                }
                let entry = HeaderFooter { kind, text };
                if is_header {
                    self.document.headers.push(entry);
                } else {
                    self.document.footers.push(entry);
                }
            }
        }
    }

    fn read_notes(&mut self, rels: &Rels) {
        let targets: Vec<(bool, String)> = rels
            .values()
            .filter(|rel| !rel.external && (rel.is("footnotes") || rel.is("endnotes")))
            .map(|rel| (rel.is("footnotes"), rel.target.clone()))
            .collect();

        for (is_footnotes, part) in targets {
            let element = if is_footnotes { "footnote" } else { "endnote" };
            let notes = self.notes_in(&part, element);
            if is_footnotes {
                self.document.footnotes = notes;
            } else {
                self.document.endnotes = notes;
            }
        }
    }

    fn notes_in(&mut self, part: &str, element: &str) -> Vec<Note> {
        let Some(xml) = self.package.read_optional_string(part) else {
            return Vec::new();
        };
        let doc = match parse_xml(&xml, part) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!("Ignoring malformed notes part {}: {}", part, e);
                return Vec::new();
            }
        };
        let rels = self.package.relationship_map(part);

        let mut notes = Vec::new();
        for note in doc.root_element().children().filter(|n| n.has_tag_name((W_NAMESPACE, element))) {
            let id = note.attribute((W_NAMESPACE, "id")).unwrap_or_default();
            let separator = note
                .attribute((W_NAMESPACE, "type"))
                .is_some_and(|kind| kind != "normal");
            if separator || id == "-1" || id == "0" {
                continue;
            }
            let text = self.note_text(note, &rels);
            notes.push(Note {
                id: id.to_string(),
                text,
            });
        }
        notes
    }

    fn note_text(&mut self, node: Node, rels: &Rels) -> String {
        let mut blocks = Vec::new();
        self.collect_blocks(node, rels, &mut blocks, 0);
        blocks
            .into_iter()
            .filter_map(|block| match block {
                Block::Paragraph(paragraph) => Some(paragraph.text.trim().to_string()),
                Block::Table(table) => Some(table.to_text()),
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn read_comments(&mut self, rels: &Rels) {
        let Some(part) = rels
            .values()
            .find(|rel| !rel.external && rel.is("comments"))
            .map(|rel| rel.target.clone())
        else {
            return;
        };
        let Some(xml) = self.package.read_optional_string(&part) else {
            return;
        };
        let doc = match parse_xml(&xml, &part) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!("Ignoring malformed comments part {}: {}", part, e);
                return;
            }
        };
        let comment_rels = self.package.relationship_map(&part);

        for comment in doc.root_element().children().filter(|n| n.has_tag_name((W_NAMESPACE, "comment"))) {
            let text = self.note_text(comment, &comment_rels);
            self.document.comments.push(Comment {
                id: comment.attribute((W_NAMESPACE, "id")).unwrap_or_default().to_string(),
                author: comment.attribute((W_NAMESPACE, "author")).map(String::from),
                date: comment.attribute((W_NAMESPACE, "date")).map(String::from),
                text,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SharetextError;
    use crate::types::Content;
    use std::io::{Cursor, Write};
    use zip::write::{SimpleFileOptions, ZipWriter};

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
        xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
        xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math"
        xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"
        xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
        xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture""#;

    fn build_docx(document_body: &str, extra: &[(&str, &[u8])]) -> Vec<u8> {
        let document = format!(r#"<?xml version="1.0" encoding="UTF-8"?><w:document {NS}><w:body>{document_body}</w:body></w:document>"#);
        let rels = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/report" TargetMode="External"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>
  <Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/footnotes" Target="footnotes.xml"/>
  <Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="comments.xml"/>
  <Relationship Id="rId6" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/missing.png"/>
</Relationships>"#;
        let package_rels = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options = SimpleFileOptions::default();
            let mut parts: Vec<(&str, &[u8])> = vec![
                ("_rels/.rels", package_rels.as_bytes()),
                ("word/document.xml", document.as_bytes()),
                ("word/_rels/document.xml.rels", rels.as_bytes()),
            ];
            parts.extend_from_slice(extra);
            for (name, content) in parts {
                zip.start_file(name, options).unwrap();
                zip.write_all(content).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }

    fn drawing(embed: &str, descr: &str) -> String {
        format!(
            r#"<w:r><w:drawing><wp:inline><wp:extent cx="952500" cy="476250"/><wp:docPr id="1" name="Picture 1" descr="{descr}"/>
            <a:graphic><a:graphicData><pic:pic><pic:blipFill><a:blip r:embed="{embed}"/></pic:blipFill></pic:pic></a:graphicData></a:graphic>
            </wp:inline></w:drawing></w:r>"#
        )
    }

    #[test]
    fn test_paragraphs_tables_and_links_in_order() {
        let body = r#"
            <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Quarterly</w:t></w:r><w:r><w:t xml:space="preserve"> Report</w:t></w:r></w:p>
            <w:tbl>
              <w:tr><w:tc><w:p><w:r><w:t>Region</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Total</w:t></w:r></w:p></w:tc></w:tr>
              <w:tr><w:tc><w:p><w:r><w:t>North</w:t></w:r></w:p><w:p><w:r><w:t>East</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>10</w:t></w:r></w:p></w:tc></w:tr>
            </w:tbl>
            <w:p><w:r><w:t xml:space="preserve">See </w:t></w:r><w:hyperlink r:id="rId1"><w:r><w:t>the report</w:t></w:r></w:hyperlink><w:r><w:tab/><w:t>now</w:t></w:r></w:p>
            <w:p><w:r><w:delText>removed</w:delText></w:r><w:r><w:instrText>PAGE</w:instrText></w:r></w:p>
        "#;
        let doc = read_docx(&build_docx(body, &[])).unwrap();

        assert_eq!(doc.format, FormatTag::Docx);
        assert_eq!(doc.blocks.len(), 4);
        let first = doc.paragraphs().next().unwrap();
        assert_eq!(first.text, "Quarterly Report");
        assert_eq!(first.style.as_deref(), Some("Heading1"));

        let table = doc.tables().next().unwrap();
        assert_eq!(table.rows[1][0], "North\nEast");

        assert_eq!(doc.hyperlinks.len(), 1);
        assert_eq!(doc.hyperlinks[0].text, "the report");
        assert_eq!(doc.hyperlinks[0].url, "https://example.com/report");

        assert_eq!(
            doc.full_text(),
            "Quarterly Report\nRegion\tTotal\nNorth\nEast\t10\nSee the report\tnow"
        );
    }

    #[test]
    fn test_inline_formula_rendered_as_latex() {
        let body = r#"<w:p><w:r><w:t xml:space="preserve">Half is </w:t></w:r>
            <m:oMath><m:f><m:num><m:r><m:t>1</m:t></m:r></m:num><m:den><m:r><m:t>2</m:t></m:r></m:den></m:f></m:oMath></w:p>"#;
        let doc = read_docx(&build_docx(body, &[])).unwrap();
        assert_eq!(doc.formulas, vec!["\\frac{1}{2}".to_string()]);
        assert_eq!(doc.full_text(), "Half is $\\frac{1}{2}$");
    }

    #[test]
    fn test_images_with_size_and_caption() {
        let body = format!(
            "<w:p>{}</w:p><w:p>{}</w:p>",
            drawing("rId2", "Sales chart"),
            drawing("rId6", "")
        );
        let doc = read_docx(&build_docx(&body, &[("word/media/image1.png", PNG)])).unwrap();

        assert_eq!(doc.images.len(), 1, "unreadable image is skipped");
        let image = &doc.images[0];
        assert_eq!(image.index, 0);
        assert_eq!(image.name, "image1.png");
        assert_eq!(image.format, "png");
        assert_eq!(image.width, Some(100));
        assert_eq!(image.height, Some(50));
        assert_eq!(image.caption.as_deref(), Some("Sales chart"));
    }

    #[test]
    fn test_extract_images_disabled() {
        let body = format!("<w:p>{}</w:p>", drawing("rId2", "chart"));
        let config = ExtractionConfig {
            extract_images: false,
            ..Default::default()
        };
        let doc = read_docx_with_config(&build_docx(&body, &[("word/media/image1.png", PNG)]), &config).unwrap();
        assert!(doc.images.is_empty());
    }

    #[test]
    fn test_headers_footnotes_and_comments() {
        let body = r#"<w:p><w:r><w:t>Body</w:t></w:r></w:p>
            <w:sectPr><w:headerReference w:type="first" r:id="rId3"/></w:sectPr>"#;
        let header = format!(r#"<w:hdr {NS}><w:p><w:r><w:t>Confidential</w:t></w:r></w:p></w:hdr>"#);
        let footnotes = format!(
            r#"<w:footnotes {NS}>
                <w:footnote w:type="separator" w:id="-1"><w:p><w:r><w:separator/></w:r></w:p></w:footnote>
                <w:footnote w:id="1"><w:p><w:r><w:t>Source: survey</w:t></w:r></w:p></w:footnote>
            </w:footnotes>"#
        );
        let comments = format!(
            r#"<w:comments {NS}><w:comment w:id="0" w:author="Dana" w:date="2024-05-01T10:00:00Z"><w:p><w:r><w:t>Check this</w:t></w:r></w:p></w:comment></w:comments>"#
        );
        let doc = read_docx(&build_docx(
            body,
            &[
                ("word/header1.xml", header.as_bytes()),
                ("word/footnotes.xml", footnotes.as_bytes()),
                ("word/comments.xml", comments.as_bytes()),
            ],
        ))
        .unwrap();

        assert_eq!(doc.headers.len(), 1);
        assert_eq!(doc.headers[0].kind, HeaderFooterKind::FirstPage);
        assert_eq!(doc.headers[0].text, "Confidential");
        assert_eq!(doc.footnotes.len(), 1);
        assert_eq!(doc.footnotes[0].id, "1");
        assert_eq!(doc.footnotes[0].text, "Source: survey");
        assert_eq!(doc.comments.len(), 1);
        assert_eq!(doc.comments[0].author.as_deref(), Some("Dana"));
        assert_eq!(doc.comments[0].text, "Check this");
        assert_eq!(doc.full_text(), "Body");
    }

    #[test]
    fn test_formula_list_covers_body_only() {
        let half = r#"<m:oMath><m:f><m:num><m:r><m:t>1</m:t></m:r></m:num><m:den><m:r><m:t>2</m:t></m:r></m:den></m:f></m:oMath>"#;
        let body = format!(
            r#"<w:p><w:r><w:t xml:space="preserve">Ratio </w:t></w:r>{half}</w:p>
            <w:sectPr><w:headerReference w:type="default" r:id="rId3"/></w:sectPr>"#
        );
        let header = format!(
            r#"<w:hdr {NS}><w:p><m:oMath><m:r><m:t>x</m:t></m:r></m:oMath></w:p></w:hdr>"#
        );
        let footnotes = format!(
            r#"<w:footnotes {NS}><w:footnote w:id="1"><w:p><w:r><w:t xml:space="preserve">Derived from </w:t></w:r><m:oMath><m:sSup><m:e><m:r><m:t>y</m:t></m:r></m:e><m:sup><m:r><m:t>2</m:t></m:r></m:sup></m:sSup></m:oMath></w:p></w:footnote></w:footnotes>"#
        );
        let doc = read_docx(&build_docx(
            &body,
            &[
                ("word/header1.xml", header.as_bytes()),
                ("word/footnotes.xml", footnotes.as_bytes()),
            ],
        ))
        .unwrap();

        assert_eq!(doc.formulas, vec!["\\frac{1}{2}".to_string()]);
        assert_eq!(doc.headers[0].text, "$x$");
        assert_eq!(doc.footnotes[0].text, "Derived from $y^{2}$");
    }

    #[test]
    fn test_missing_main_part_is_corrupt_container() {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            zip.start_file("unrelated.txt", SimpleFileOptions::default()).unwrap();
            zip.write_all(b"nothing").unwrap();
            zip.finish().unwrap();
        }
        let err = read_docx(&buffer).unwrap_err();
        assert!(matches!(err, SharetextError::CorruptContainer { .. }));
    }

    #[test]
    fn test_malformed_main_part_is_corrupt_container() {
        let err = read_docx(&build_docx("<w:p><w:r>", &[])).unwrap_err();
        assert!(matches!(err, SharetextError::CorruptContainer { .. }));
    }
}
