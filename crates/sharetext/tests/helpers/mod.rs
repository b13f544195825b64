//! Fixture builders shared by the integration tests.
#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::{SimpleFileOptions, ZipWriter};

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const OFFICE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Zip `parts` in order.
pub fn zip_package(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options = SimpleFileOptions::default();
        for (name, data) in parts {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer
}

/// A DOCX whose body is `body_xml` (the inside of `w:body`).
pub fn docx(body_xml: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math"><w:body>{body_xml}</w:body></w:document>"#
    );
    let package_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{RELS_NS}"><Relationship Id="rId1" Type="{OFFICE_REL}/officeDocument" Target="word/document.xml"/></Relationships>"#
    );
    let core = r#"<?xml version="1.0" encoding="UTF-8"?><cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Budget Memo</dc:title><dc:creator>Finance Team</dc:creator></cp:coreProperties>"#;
    zip_package(&[
        ("_rels/.rels", package_rels.as_bytes()),
        ("word/document.xml", document.as_bytes()),
        ("docProps/core.xml", core.as_bytes()),
    ])
}

pub fn paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
}

const SLIDE_NS: &str = r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;

/// A slide with a title placeholder and, when `image_target` is set, one picture
/// whose relationship points at that part.
pub fn slide(title: &str, image_target: Option<&str>) -> (String, Option<String>) {
    let picture = if image_target.is_some() {
        r#"<p:pic><p:nvPicPr><p:cNvPr id="3" name="Picture"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/></p:blipFill><p:spPr><a:xfrm><a:off x="0" y="500"/><a:ext cx="952500" cy="952500"/></a:xfrm></p:spPr></p:pic>"#
    } else {
        ""
    };
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><p:sld {SLIDE_NS}><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="0" y="0"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:p><a:r><a:t>{title}</a:t></a:r></a:p></p:txBody></p:sp>{picture}</p:spTree></p:cSld></p:sld>"#
    );
    let rels = image_target.map(|target| {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{RELS_NS}"><Relationship Id="rId2" Type="{OFFICE_REL}/image" Target="{target}"/></Relationships>"#
        )
    });
    (xml, rels)
}

/// A PPTX with `slides` in presentation order, plus `media` parts.
pub fn pptx(slides: &[(String, Option<String>)], media: &[(&str, &[u8])]) -> Vec<u8> {
    let mut ids = String::new();
    let mut rels = String::new();
    let mut names = Vec::new();
    for i in 0..slides.len() {
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rIdS{}"/>"#, 256 + i, i));
        rels.push_str(&format!(
            r#"<Relationship Id="rIdS{i}" Type="{OFFICE_REL}/slide" Target="slides/slide{}.xml"/>"#,
            i + 1
        ));
        names.push((format!("ppt/slides/slide{}.xml", i + 1), format!("ppt/slides/_rels/slide{}.xml.rels", i + 1)));
    }
    let presentation = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><p:presentation {SLIDE_NS}><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#
    );
    let presentation_rels =
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{RELS_NS}">{rels}</Relationships>"#);

    let mut parts: Vec<(&str, &[u8])> = vec![
        ("ppt/presentation.xml", presentation.as_bytes()),
        ("ppt/_rels/presentation.xml.rels", presentation_rels.as_bytes()),
    ];
    for ((xml, slide_rels), (name, rels_name)) in slides.iter().zip(&names) {
        parts.push((name.as_str(), xml.as_bytes()));
        if let Some(slide_rels) = slide_rels {
            parts.push((rels_name.as_str(), slide_rels.as_bytes()));
        }
    }
    parts.extend_from_slice(media);
    zip_package(&parts)
}
