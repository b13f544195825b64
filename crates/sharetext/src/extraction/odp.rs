//! ODP (OpenDocument Presentation) extraction.
//!
//! Slides are the `draw:page` elements of `content.xml` in document order.
//! Frames on a page are read top-to-bottom then left-to-right.

use roxmltree::Node;

use crate::core::config::ExtractionConfig;
use crate::core::format::FormatTag;
use crate::extraction::normalize::normalize_text;
use crate::extraction::odt::{
    CONTENT_PART, DRAW_NAMESPACE, OFFICE_NAMESPACE, SVG_NAMESPACE, TABLE_NAMESPACE, TEXT_NAMESPACE,
    formula_object_latex, frame_image, frame_object_href, length_to_pixels, odf_annotation, odf_text,
};
use crate::extraction::office_metadata::odf_meta;
use crate::extraction::ooxml::{Package, parse_xml};
use crate::types::{Presentation, Slide};
use crate::{Result, SharetextError};

const PRESENTATION_NAMESPACE: &str = "urn:oasis:names:tc:opendocument:xmlns:presentation:1.0";

const SKIPPED_CLASSES: &[&str] = &["date-time", "footer", "header", "page-number", "page"];

pub fn read_odp(bytes: &[u8]) -> Result<Presentation> {
    read_odp_with_config(bytes, &ExtractionConfig::default())
}

/// Extract an OpenDocument presentation.
///
/// # Errors
///
/// `CorruptContainer` when the bytes are not a ZIP package or `content.xml`
/// is missing, malformed or has no presentation body.
#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_odp_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<Presentation> {
    let mut package = Package::open(bytes)?;
    let xml = package.read_part_string(CONTENT_PART)?;
    let doc = parse_xml(&xml, CONTENT_PART)?;
    let body = doc
        .descendants()
        .find(|n| n.has_tag_name((OFFICE_NAMESPACE, "presentation")))
        .ok_or_else(|| SharetextError::corrupt_container("content.xml has no office:presentation body"))?;

    let metadata = odf_meta(&mut package);
    let slides = body
        .children()
        .filter(|n| n.has_tag_name((DRAW_NAMESPACE, "page")))
        .enumerate()
        .map(|(idx, page)| read_page(&mut package, page, idx as u32 + 1, config))
        .collect();

    Ok(Presentation {
        format: FormatTag::Odp,
        metadata,
        slides,
        include_notes: config.include_notes,
    })
}

fn frame_position(frame: Node) -> (u32, u32) {
    let coordinate = |name: &str| frame.attribute((SVG_NAMESPACE, name)).and_then(length_to_pixels).unwrap_or(0);
    (coordinate("y"), coordinate("x"))
}

fn text_box_paragraphs(text_box: Node, config: &ExtractionConfig) -> Vec<String> {
    text_box
        .descendants()
        .filter(|n| n.has_tag_name((TEXT_NAMESPACE, "p")) || n.has_tag_name((TEXT_NAMESPACE, "h")))
        .filter(|p| !p.ancestors().any(|a| a.has_tag_name((OFFICE_NAMESPACE, "annotation"))))
        .map(|p| normalize_text(odf_text(p).trim(), config))
        .filter(|text| !text.is_empty())
        .collect()
}

fn read_page(package: &mut Package, page: Node, number: u32, config: &ExtractionConfig) -> Slide {
    let mut frames: Vec<Node> = page
        .descendants()
        .filter(|n| n.has_tag_name((DRAW_NAMESPACE, "frame")))
        .filter(|frame| {
            !frame
                .ancestors()
                .any(|a| a.has_tag_name((PRESENTATION_NAMESPACE, "notes")))
        })
        .collect();
    frames.sort_by_key(|frame| frame_position(*frame));

    let mut slide = Slide::empty(number);
    for frame in frames {
        let class = frame.attribute((PRESENTATION_NAMESPACE, "class")).unwrap_or_default();
        if SKIPPED_CLASSES.contains(&class) {
            continue;
        }

        if let Some(href) = frame_object_href(frame) {
            if let Some(latex) = formula_object_latex(package, href) {
                slide.body.push(format!("${}$", latex));
            }
            continue;
        }

        if let Some(table) = frame.children().find(|n| n.has_tag_name((TABLE_NAMESPACE, "table"))) {
            let text = table_text(table);
            if !text.trim().is_empty() {
                slide.body.push(normalize_text(&text, config));
            }
        }

        if let Some(text_box) = frame.children().find(|n| n.has_tag_name((DRAW_NAMESPACE, "text-box"))) {
            let paragraphs = text_box_paragraphs(text_box, config);
            let is_title = class == "title" || (class.is_empty() && is_title_styled(text_box));
            if is_title && slide.title.is_none() && !paragraphs.is_empty() {
                slide.title = Some(paragraphs.join("\n"));
            } else {
                slide.body.extend(paragraphs);
            }
        }

        if config.extract_images
            && let Some(image) = frame_image(package, frame, slide.images.len())
        {
            slide.images.push(image);
        }
    }

    if let Some(notes) = page.children().find(|n| n.has_tag_name((PRESENTATION_NAMESPACE, "notes"))) {
        slide.notes = notes
            .descendants()
            .filter(|n| n.has_tag_name((DRAW_NAMESPACE, "text-box")))
            .flat_map(|text_box| text_box_paragraphs(text_box, config))
            .collect();
    }

    for annotation in page.descendants().filter(|n| n.has_tag_name((OFFICE_NAMESPACE, "annotation"))) {
        let comment = odf_annotation(annotation, slide.comments.len(), config);
        slide.comments.push(comment);
    }
    slide
}

/// Frames without a presentation class are titles when their first paragraph
/// uses a title style.
fn is_title_styled(text_box: Node) -> bool {
    text_box
        .descendants()
        .find(|n| n.has_tag_name((TEXT_NAMESPACE, "p")))
        .and_then(|p| p.attribute((TEXT_NAMESPACE, "style-name")))
        .is_some_and(|style| style.contains("Title"))
}

fn table_text(table: Node) -> String {
    table
        .descendants()
        .filter(|n| n.has_tag_name((TABLE_NAMESPACE, "table-row")))
        .map(|row| {
            row.children()
                .filter(|n| n.has_tag_name((TABLE_NAMESPACE, "table-cell")))
                .map(|cell| odf_text(cell).replace('\n', " ").trim().to_string())
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
