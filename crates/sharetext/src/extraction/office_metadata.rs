//! Document properties from OOXML `docProps/core.xml` and ODF `meta.xml`.

use roxmltree::Node;

use crate::extraction::ooxml::Package;
use crate::types::Metadata;

const CORE_PROPERTIES_PART: &str = "docProps/core.xml";
const ODF_META_PART: &str = "meta.xml";

/// Text of the first descendant with local name `name`, trimmed, if non-empty.
pub(crate) fn parse_xml_text(node: Node, name: &str) -> Option<String> {
    node.descendants()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Dublin Core properties of an OOXML package. A missing or malformed part
/// yields empty metadata.
pub fn core_properties(package: &mut Package) -> Metadata {
    let Some(xml) = package.read_optional_string(CORE_PROPERTIES_PART) else {
        return Metadata::default();
    };
    parse_core_properties(&xml)
}

pub fn parse_core_properties(xml: &str) -> Metadata {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("Ignoring malformed core properties: {}", e);
            return Metadata::default();
        }
    };
    let root = doc.root_element();

    Metadata {
        title: parse_xml_text(root, "title"),
        author: parse_xml_text(root, "creator"),
        subject: parse_xml_text(root, "subject"),
        keywords: parse_xml_text(root, "keywords"),
        last_modified_by: parse_xml_text(root, "lastModifiedBy"),
        created: parse_xml_text(root, "created"),
        modified: parse_xml_text(root, "modified"),
        language: parse_xml_text(root, "language"),
        revision: parse_xml_text(root, "revision"),
    }
}

/// Properties of an OpenDocument package from `meta.xml`.
pub fn odf_meta(package: &mut Package) -> Metadata {
    let Some(xml) = package.read_optional_string(ODF_META_PART) else {
        return Metadata::default();
    };
    parse_odf_meta(&xml)
}

pub fn parse_odf_meta(xml: &str) -> Metadata {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("Ignoring malformed meta.xml: {}", e);
            return Metadata::default();
        }
    };
    let root = doc.root_element();

    let keywords: Vec<String> = root
        .descendants()
        .filter(|n| n.has_tag_name("keyword"))
        .filter_map(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    // dc:creator is the last editor in ODF; the author is meta:initial-creator.
    let last_editor = parse_xml_text(root, "creator");
    Metadata {
        title: parse_xml_text(root, "title"),
        author: parse_xml_text(root, "initial-creator").or_else(|| last_editor.clone()),
        subject: parse_xml_text(root, "subject"),
        keywords: (!keywords.is_empty()).then(|| keywords.join(", ")),
        last_modified_by: last_editor,
        created: parse_xml_text(root, "creation-date"),
        modified: parse_xml_text(root, "date"),
        language: parse_xml_text(root, "language"),
        revision: parse_xml_text(root, "editing-cycles"),
    }
}
