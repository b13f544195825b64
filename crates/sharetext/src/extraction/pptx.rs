//! PPTX (PresentationML) extraction.
//!
//! Slides are read in presentation order (`sldIdLst`), falling back to the
//! numeric order of `ppt/slides/slideN.xml` when the presentation part lists no
//! resolvable slides. Within a slide, shapes are ordered top-to-bottom then
//! left-to-right.
//!
//! A slide that fails to parse becomes an empty slide with its number kept,
//! and an image that cannot be read is dropped without touching the rest of
//! the slide.

use std::collections::HashMap;

use roxmltree::Node;

use crate::core::config::ExtractionConfig;
use crate::core::format::FormatTag;
use crate::extraction::normalize::{detect_image_format, emu_to_pixels, normalize_text};
use crate::extraction::office_metadata::core_properties;
use crate::extraction::ooxml::{A_NAMESPACE, P_NAMESPACE, Package, R_NAMESPACE, Relationship, parse_xml};
use crate::formula::omml::{OMML_NAMESPACE, omml_to_latex};
use crate::types::{Comment, ImageRecord, Presentation, Slide};
use crate::{Result, SharetextError};

const PRESENTATION_PART: &str = "ppt/presentation.xml";

const TITLE_PLACEHOLDERS: &[&str] = &["title", "ctrTitle"];
const BODY_PLACEHOLDERS: &[&str] = &["body", "subTitle", "obj", "tbl"];
const SKIPPED_PLACEHOLDERS: &[&str] = &["dt", "sldNum", "hdr", "ftr", "sldImg"];

/// Sort key for shapes without an explicit offset.
const UNPLACED: i64 = 999_999_999;

pub fn read_pptx(bytes: &[u8]) -> Result<Presentation> {
    read_pptx_with_config(bytes, &ExtractionConfig::default())
}

/// Extract a PPTX presentation.
///
/// # Errors
///
/// `CorruptContainer` when the bytes are not a ZIP package or the
/// presentation part is missing or malformed.
#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_pptx_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<Presentation> {
    let mut package = Package::open(bytes)?;
    let presentation_part = package.main_part(PRESENTATION_PART);
    let slide_paths = find_slide_paths(&mut package, &presentation_part)?;
    let metadata = core_properties(&mut package);
    let authors = comment_authors(&mut package, &presentation_part);

    let mut slides = Vec::with_capacity(slide_paths.len());
    for (idx, path) in slide_paths.iter().enumerate() {
        let number = (idx + 1) as u32;
        let slide = match read_slide(&mut package, path, number, &authors, config) {
            Ok(slide) => slide,
            Err(e) => {
                tracing::debug!("Slide {} ({}) could not be decoded: {}", number, path, e);
                Slide::empty(number)
            }
        };
        slides.push(slide);
    }

    Ok(Presentation {
        format: FormatTag::Pptx,
        metadata,
        slides,
        include_notes: config.include_notes,
    })
}

/// Slide part names in presentation order.
fn find_slide_paths(package: &mut Package, presentation_part: &str) -> Result<Vec<String>> {
    let xml = package.read_part_string(presentation_part)?;
    let doc = parse_xml(&xml, presentation_part)?;
    let rels = package.relationship_map(presentation_part);

    let ordered: Vec<String> = doc
        .descendants()
        .filter(|n| n.has_tag_name((P_NAMESPACE, "sldId")))
        .filter_map(|n| n.attribute((R_NAMESPACE, "id")))
        .filter_map(|id| rels.get(id))
        .filter(|rel| rel.is("slide") && package.has_part(&rel.target))
        .map(|rel| rel.target.clone())
        .collect();
    if !ordered.is_empty() {
        return Ok(ordered);
    }

    let mut numbered: Vec<(u32, String)> = package
        .part_names()
        .into_iter()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, name))
        })
        .collect();
    numbered.sort();
    if numbered.is_empty() {
        tracing::warn!("Presentation {} lists no slides", presentation_part);
    }
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
struct ElementPosition {
    y: i64,
    x: i64,
}

#[derive(Debug)]
enum SlideElement {
    Title(String),
    Text(String),
    Formula(String),
    Table(String),
    Picture(PictureReference),
}

#[derive(Debug)]
struct PictureReference {
    embed: String,
    caption: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

fn read_slide(
    package: &mut Package,
    path: &str,
    number: u32,
    authors: &HashMap<String, String>,
    config: &ExtractionConfig,
) -> Result<Slide> {
    let xml = package.read_part_string(path)?;
    let doc = parse_xml(&xml, path)?;
    let rels = package.relationship_map(path);

    let mut elements = parse_shape_tree(doc.root_element())?;
    elements.sort_by_key(|(position, _)| *position);

    let mut slide = Slide::empty(number);
    for (_, element) in elements {
        match element {
            SlideElement::Title(text) if slide.title.is_none() => slide.title = Some(normalize_text(&text, config)),
            SlideElement::Title(text) | SlideElement::Text(text) | SlideElement::Table(text) => {
                slide.body.push(normalize_text(&text, config))
            }
            SlideElement::Formula(latex) => slide.body.push(format!("${}$", latex)),
            SlideElement::Picture(picture) => {
                if config.extract_images
                    && let Some(image) = load_picture(package, &rels, picture, slide.images.len())
                {
                    slide.images.push(image);
                }
            }
        }
    }

    slide.notes = read_notes(package, &rels, config);
    slide.comments = read_comments(package, &rels, authors, config);
    Ok(slide)
}

fn parse_shape_tree(root: Node) -> Result<Vec<(ElementPosition, SlideElement)>> {
    let sp_tree = root
        .children()
        .find(|n| n.has_tag_name((P_NAMESPACE, "cSld")))
        .and_then(|c_sld| c_sld.children().find(|n| n.has_tag_name((P_NAMESPACE, "spTree"))))
        .ok_or_else(|| SharetextError::corrupt_container("Slide has no shape tree"))?;

    let mut elements = Vec::new();
    for child in sp_tree.children().filter(Node::is_element) {
        parse_group(child, &mut elements);
    }
    Ok(elements)
}

fn parse_group(node: Node, elements: &mut Vec<(ElementPosition, SlideElement)>) {
    if node.tag_name().namespace() != Some(P_NAMESPACE) {
        // Shapes wrapped for compatibility: take the first alternative only.
        if node.tag_name().name() == "AlternateContent"
            && let Some(choice) = node.children().find(Node::is_element)
        {
            for child in choice.children().filter(Node::is_element) {
                parse_group(child, elements);
            }
        }
        return;
    }

    match node.tag_name().name() {
        "sp" => parse_sp(node, elements),
        "graphicFrame" => {
            if let Some(table) = parse_graphic_frame(node) {
                elements.push((extract_position(node), SlideElement::Table(table)));
            }
        }
        "pic" => {
            if let Some(picture) = parse_pic(node) {
                elements.push((extract_position(node), SlideElement::Picture(picture)));
            }
        }
        "grpSp" => {
            for child in node.children().filter(Node::is_element) {
                parse_group(child, elements);
            }
        }
        _ => {}
    }
}

fn placeholder<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| {
            n.tag_name().namespace() == Some(P_NAMESPACE)
                && matches!(n.tag_name().name(), "nvSpPr" | "nvPicPr" | "nvGraphicFramePr")
        })
        .and_then(|nv| nv.children().find(|n| n.has_tag_name((P_NAMESPACE, "nvPr"))))
        .and_then(|nv_pr| nv_pr.children().find(|n| n.has_tag_name((P_NAMESPACE, "ph"))))
}

fn parse_sp(node: Node, elements: &mut Vec<(ElementPosition, SlideElement)>) {
    let ph = placeholder(node);
    let ph_type = ph.map(|ph| ph.attribute("type").unwrap_or("body"));
    if ph_type.is_some_and(|kind| SKIPPED_PLACEHOLDERS.contains(&kind)) {
        return;
    }
    let position = extract_position(node);

    for math in node
        .descendants()
        .filter(|n| n.tag_name().namespace() == Some(OMML_NAMESPACE))
        .filter(|n| match n.tag_name().name() {
            "oMathPara" => true,
            "oMath" => !n.parent_element().is_some_and(|p| p.has_tag_name((OMML_NAMESPACE, "oMathPara"))),
            _ => false,
        })
    {
        let latex = omml_to_latex(math);
        if !latex.trim().is_empty() {
            elements.push((position, SlideElement::Formula(latex)));
        }
    }

    let Some(tx_body) = node.children().find(|n| n.has_tag_name((P_NAMESPACE, "txBody"))) else {
        return;
    };
    let text = text_body(tx_body);
    if text.trim().is_empty() {
        return;
    }

    let element = match ph_type {
        Some(kind) if TITLE_PLACEHOLDERS.contains(&kind) => SlideElement::Title(text.trim().to_string()),
        _ => SlideElement::Text(text.trim().to_string()),
    };
    elements.push((position, element));
}

/// Paragraph text of a `txBody`, one line per paragraph. Math runs are
/// rendered separately.
fn text_body(tx_body: Node) -> String {
    tx_body
        .children()
        .filter(|n| n.has_tag_name((A_NAMESPACE, "p")))
        .map(|p| {
            let mut line = String::new();
            for child in p.children().filter(Node::is_element) {
                if child.tag_name().namespace() != Some(A_NAMESPACE) {
                    continue;
                }
                match child.tag_name().name() {
                    "r" | "fld" => {
                        if let Some(t) = child.children().find(|n| n.has_tag_name((A_NAMESPACE, "t"))) {
                            line.push_str(t.text().unwrap_or_default());
                        }
                    }
                    "br" => line.push('\n'),
                    _ => {}
                }
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_graphic_frame(node: Node) -> Option<String> {
    let tbl = node
        .descendants()
        .find(|n| n.has_tag_name((A_NAMESPACE, "graphicData")))?
        .children()
        .find(|n| n.has_tag_name((A_NAMESPACE, "tbl")))?;

    let rows: Vec<String> = tbl
        .children()
        .filter(|n| n.has_tag_name((A_NAMESPACE, "tr")))
        .map(|tr| {
            tr.children()
                .filter(|n| n.has_tag_name((A_NAMESPACE, "tc")))
                .map(|tc| {
                    tc.children()
                        .find(|n| n.has_tag_name((A_NAMESPACE, "txBody")))
                        .map(|body| text_body(body).replace('\n', " ").trim().to_string())
                        .unwrap_or_default()
                })
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect();

    let text = rows.join("\n");
    (!text.trim().is_empty()).then_some(text)
}

fn parse_pic(node: Node) -> Option<PictureReference> {
    let embed = node
        .descendants()
        .find(|n| n.has_tag_name((A_NAMESPACE, "blip")))?
        .attribute((R_NAMESPACE, "embed"))?;

    let caption = node
        .descendants()
        .find(|n| n.has_tag_name((P_NAMESPACE, "cNvPr")))
        .and_then(|pr| pr.attribute("descr"))
        .map(str::trim)
        .filter(|descr| !descr.is_empty())
        .map(String::from);

    // Only the shape transform carries the size; `a:ext` also names extension
    // entries under `a:extLst`.
    let extent = node
        .children()
        .find(|n| n.has_tag_name((P_NAMESPACE, "spPr")))
        .and_then(|sp_pr| sp_pr.children().find(|n| n.has_tag_name((A_NAMESPACE, "xfrm"))))
        .and_then(|xfrm| xfrm.children().find(|n| n.has_tag_name((A_NAMESPACE, "ext"))));
    Some(PictureReference {
        embed: embed.to_string(),
        caption,
        width: extent.and_then(|e| e.attribute("cx")).and_then(emu_to_pixels),
        height: extent.and_then(|e| e.attribute("cy")).and_then(emu_to_pixels),
    })
}

/// Offset of the shape's transform. Placeholders that inherit their position
/// from the layout get a key from their role: titles first, body placeholders
/// by index, everything else last.
fn extract_position(node: Node) -> ElementPosition {
    // Graphic frames carry `p:xfrm`, other shapes `a:xfrm`.
    let offset = node
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "xfrm")
        .and_then(|xfrm| xfrm.children().find(|n| n.has_tag_name((A_NAMESPACE, "off"))))
        .and_then(|off| {
            let x = off.attribute("x")?.parse::<i64>().ok()?;
            let y = off.attribute("y")?.parse::<i64>().ok()?;
            Some(ElementPosition { x, y })
        });
    if let Some(position) = offset {
        return position;
    }

    let Some(ph) = placeholder(node) else {
        return ElementPosition { y: UNPLACED, x: UNPLACED };
    };
    let kind = ph.attribute("type").unwrap_or("");
    let idx = ph.attribute("idx").and_then(|idx| idx.parse::<i64>().ok());
    if TITLE_PLACEHOLDERS.contains(&kind) {
        ElementPosition { y: -2, x: 0 }
    } else if BODY_PLACEHOLDERS.contains(&kind) || (kind.is_empty() && idx.is_some()) {
        ElementPosition {
            y: -1,
            x: idx.unwrap_or(0),
        }
    } else {
        ElementPosition { y: UNPLACED, x: 0 }
    }
}

fn load_picture(
    package: &mut Package,
    rels: &HashMap<String, Relationship>,
    picture: PictureReference,
    index: usize,
) -> Option<ImageRecord> {
    let rel = rels.get(&picture.embed).filter(|rel| !rel.external)?;
    let data = match package.read_part(&rel.target) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!("Skipping unreadable slide image {}: {}", rel.target, e);
            return None;
        }
    };
    let name = rel.target.rsplit('/').next().unwrap_or(&rel.target).to_string();
    Some(ImageRecord {
        index,
        format: detect_image_format(&data, &name),
        name,
        width: picture.width,
        height: picture.height,
        data,
        caption: picture.caption,
    })
}

/// Speaker notes: text shapes of the slide's notes part, skipping the slide
/// image and slide number placeholders.
fn read_notes(package: &mut Package, rels: &HashMap<String, Relationship>, config: &ExtractionConfig) -> Vec<String> {
    let Some(notes_path) = rels
        .values()
        .find(|rel| rel.is("notesSlide") && !rel.external)
        .map(|rel| rel.target.clone())
    else {
        return Vec::new();
    };

    let Some(xml) = package.read_optional_string(&notes_path) else {
        return Vec::new();
    };
    let doc = match parse_xml(&xml, &notes_path) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("Ignoring malformed notes part {}: {}", notes_path, e);
            return Vec::new();
        }
    };

    doc.descendants()
        .filter(|n| n.has_tag_name((P_NAMESPACE, "sp")))
        .filter(|sp| {
            !placeholder(*sp)
                .map(|ph| ph.attribute("type").unwrap_or("body"))
                .is_some_and(|kind| SKIPPED_PLACEHOLDERS.contains(&kind))
        })
        .filter_map(|sp| sp.children().find(|n| n.has_tag_name((P_NAMESPACE, "txBody"))))
        .map(|body| normalize_text(text_body(body).trim(), config))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Comment author names by id, from the presentation's `commentAuthors` part.
fn comment_authors(package: &mut Package, presentation_part: &str) -> HashMap<String, String> {
    let Some(path) = package
        .relationships(presentation_part)
        .into_iter()
        .find(|rel| rel.is("commentAuthors") && !rel.external)
        .map(|rel| rel.target)
    else {
        return HashMap::new();
    };
    let Some(xml) = package.read_optional_string(&path) else {
        return HashMap::new();
    };
    let doc = match parse_xml(&xml, &path) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("Ignoring malformed comment authors part {}: {}", path, e);
            return HashMap::new();
        }
    };

    doc.descendants()
        .filter(|n| n.has_tag_name((P_NAMESPACE, "cmAuthor")))
        .filter_map(|author| Some((author.attribute("id")?.to_string(), author.attribute("name")?.to_string())))
        .collect()
}

/// Review comments of the slide's `comments` part (`p:cmLst`).
fn read_comments(
    package: &mut Package,
    rels: &HashMap<String, Relationship>,
    authors: &HashMap<String, String>,
    config: &ExtractionConfig,
) -> Vec<Comment> {
    let Some(path) = rels
        .values()
        .find(|rel| rel.is("comments") && !rel.external)
        .map(|rel| rel.target.clone())
    else {
        return Vec::new();
    };
    let Some(xml) = package.read_optional_string(&path) else {
        return Vec::new();
    };
    let doc = match parse_xml(&xml, &path) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("Ignoring malformed comments part {}: {}", path, e);
            return Vec::new();
        }
    };

    doc.descendants()
        .filter(|n| n.has_tag_name((P_NAMESPACE, "cm")))
        .enumerate()
        .map(|(idx, cm)| Comment {
            id: cm.attribute("idx").map(String::from).unwrap_or_else(|| idx.to_string()),
            author: cm.attribute("authorId").and_then(|id| authors.get(id)).cloned(),
            date: cm.attribute("dt").map(String::from),
            text: cm
                .children()
                .find(|n| n.has_tag_name((P_NAMESPACE, "text")))
                .and_then(|t| t.text())
                .map(|text| normalize_text(text.trim(), config))
                .unwrap_or_default(),
        })
        .collect()
}
