//! ZIP package access shared by the OOXML (DOCX, PPTX) and ODF (ODT, ODP) decoders.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use roxmltree::Document;
use zip::ZipArchive;

use crate::{Result, SharetextError};

pub const W_NAMESPACE: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const A_NAMESPACE: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const P_NAMESPACE: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub const R_NAMESPACE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const WP_NAMESPACE: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";

const OFFICE_DOCUMENT_REL: &str = "officeDocument";

/// One entry of a `_rels/*.rels` part. `target` is resolved to a package path
/// unless the relationship is external.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// True when the relationship type URI ends with `/{kind}`.
    pub fn is(&self, kind: &str) -> bool {
        self.rel_type.rsplit('/').next() == Some(kind)
    }
}

/// An opened ZIP package.
pub struct Package<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Package<'a> {
    /// # Errors
    ///
    /// `CorruptContainer` when the bytes are not a readable ZIP archive.
    pub fn open(bytes: &'a [u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))?;
        Ok(Self { archive })
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }

    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Raw bytes of a member.
    pub fn read_part(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(SharetextError::corrupt_container(format!("Missing package part: {}", name)));
            }
            Err(zip::result::ZipError::Io(io_err)) => return Err(io_err.into()),
            Err(e) => {
                return Err(SharetextError::corrupt_container_with_source(
                    format!("Failed to read package part {}", name),
                    e,
                ));
            }
        };
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        Ok(contents)
    }

    /// A member decoded as UTF-8 (BOM stripped).
    pub fn read_part_string(&mut self, name: &str) -> Result<String> {
        let bytes = self.read_part(name)?;
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
        String::from_utf8(bytes.to_vec())
            .map_err(|e| SharetextError::corrupt_container_with_source(format!("Invalid UTF-8 in {}", name), e))
    }

    /// A member that may legitimately be absent. Read errors are logged and
    /// treated as absence.
    pub fn read_optional_string(&mut self, name: &str) -> Option<String> {
        if !self.has_part(name) {
            return None;
        }
        match self.read_part_string(name) {
            Ok(xml) => Some(xml),
            Err(e) => {
                tracing::debug!("Skipping unreadable package part {}: {}", name, e);
                None
            }
        }
    }

    /// Relationships declared for `part` (empty when it has no rels part).
    pub fn relationships(&mut self, part: &str) -> Vec<Relationship> {
        let rels = rels_path(part);
        match self.read_optional_string(&rels) {
            Some(xml) => parse_relationships(&xml, part),
            None => Vec::new(),
        }
    }

    /// Relationships of `part` keyed by id.
    pub fn relationship_map(&mut self, part: &str) -> HashMap<String, Relationship> {
        self.relationships(part).into_iter().map(|rel| (rel.id.clone(), rel)).collect()
    }

    /// Main part named by the package-level `officeDocument` relationship, or
    /// `fallback` when the package does not declare one.
    pub fn main_part(&mut self, fallback: &str) -> String {
        self.relationships("")
            .into_iter()
            .find(|rel| rel.is(OFFICE_DOCUMENT_REL) && !rel.external && self.has_part(&rel.target))
            .map(|rel| rel.target)
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Parse XML, mapping failures to `CorruptContainer`.
pub fn parse_xml<'x>(xml: &'x str, part: &str) -> Result<Document<'x>> {
    Document::parse(xml).map_err(|e| SharetextError::corrupt_container_with_source(format!("Malformed XML in {}", part), e))
}

/// `_rels` path for a part: `ppt/slides/slide1.xml` → `ppt/slides/_rels/slide1.xml.rels`.
/// The empty part name addresses the package-level `_rels/.rels`.
pub fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the directory of `source_part`.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').filter(|s| !s.is_empty()).collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

pub fn parse_relationships(xml: &str, source_part: &str) -> Vec<Relationship> {
    let doc = match Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("Ignoring malformed relationships for {}: {}", source_part, e);
            return Vec::new();
        }
    };

    doc.descendants()
        .filter(|node| node.has_tag_name("Relationship"))
        .filter_map(|node| {
            let id = node.attribute("Id")?;
            let target = node.attribute("Target")?;
            let external = node.attribute("TargetMode").is_some_and(|mode| mode.eq_ignore_ascii_case("External"));
            Some(Relationship {
                id: id.to_string(),
                rel_type: node.attribute("Type").unwrap_or_default().to_string(),
                target: if external {
                    target.to_string()
                } else {
                    resolve_target(source_part, target)
                },
                external,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn package_bytes(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options = SimpleFileOptions::default();
            for (name, content) in parts {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }

    #[test]
    fn test_rels_path() {
        assert_eq!(rels_path("ppt/slides/slide1.xml"), "ppt/slides/_rels/slide1.xml.rels");
        assert_eq!(rels_path("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(rels_path(""), "_rels/.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt/slides/slide1.xml", "../media/image1.png"), "ppt/media/image1.png");
        assert_eq!(resolve_target("word/document.xml", "media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve_target("ppt/presentation.xml", "slides/slide2.xml"), "ppt/slides/slide2.xml");
        assert_eq!(resolve_target("", "word/document.xml"), "word/document.xml");
        assert_eq!(resolve_target("ppt/slides/slide1.xml", "/ppt/media/a.png"), "ppt/media/a.png");
    }

    #[test]
    fn test_parse_relationships() {
        let xml = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/>
            <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
        </Relationships>"#;
        let rels = parse_relationships(xml, "ppt/slides/slide1.xml");
        assert_eq!(rels.len(), 2);
        assert!(rels[0].is("image"));
        assert_eq!(rels[0].target, "ppt/media/image1.png");
        assert!(rels[1].external);
        assert_eq!(rels[1].target, "https://example.com");
    }

    #[test]
    fn test_package_parts_and_main_part() {
        let bytes = package_bytes(&[
            (
                "_rels/.rels",
                r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/main.xml"/></Relationships>"#,
            ),
            ("word/main.xml", "\u{FEFF}<doc/>"),
        ]);
        let mut package = Package::open(&bytes).unwrap();
        assert!(package.has_part("word/main.xml"));
        assert_eq!(package.main_part("word/document.xml"), "word/main.xml");
        assert_eq!(package.read_part_string("word/main.xml").unwrap(), "<doc/>");
        assert!(package.read_optional_string("word/missing.xml").is_none());

        let err = package.read_part("word/missing.xml").unwrap_err();
        assert!(matches!(err, SharetextError::CorruptContainer { .. }));
    }

    #[test]
    fn test_open_rejects_non_zip() {
        let err = Package::open(b"definitely not a zip").err().unwrap();
        assert!(matches!(err, SharetextError::CorruptContainer { .. }));
    }
}
