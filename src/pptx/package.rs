//! Zip packaging of a presentation

use super::template::*;
use super::{escape_xml, MediaId, PptxError, Presentation};
use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Relationships of `ppt/presentation.xml` that precede the slides
const FIXED_PRESENTATION_RELS: usize = 5;

/// Collects `<Relationship>` entries for one `.rels` part
struct Relationships {
    xml: String,
    next: usize,
}

impl Relationships {
    fn new() -> Self {
        let mut xml = String::with_capacity(512);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(r#"<Relationships xmlns=""#);
        xml.push_str(RELATIONSHIP_NS);
        xml.push_str(r#"">"#);
        Relationships { xml, next: 1 }
    }

    /// Add a relationship and return its id
    fn add(&mut self, rel_type: &str, target: &str) -> Result<String, PptxError> {
        let id = format!("rId{}", self.next);
        self.next += 1;
        write!(
            self.xml,
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            id,
            rel_type,
            escape_xml(target)
        )?;
        Ok(id)
    }

    fn finish(mut self) -> String {
        self.xml.push_str("</Relationships>");
        self.xml
    }
}

struct PackageWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl PackageWriter {
    fn new() -> Self {
        PackageWriter {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    fn add(&mut self, path: &str, content: &[u8]) -> Result<(), PptxError> {
        self.zip.start_file(path, self.options)?;
        self.zip.write_all(content)?;
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>, PptxError> {
        Ok(self.zip.finish()?.into_inner())
    }
}

pub(crate) fn write_package(pres: &Presentation) -> Result<Vec<u8>, PptxError> {
    let mut package = PackageWriter::new();
    let slide_count = pres.slide_count();

    package.add("[Content_Types].xml", content_types_xml(pres)?.as_bytes())?;

    let mut root_rels = Relationships::new();
    root_rels.add(REL_OFFICE_DOCUMENT, "ppt/presentation.xml")?;
    root_rels.add(REL_CORE_PROPERTIES, "docProps/core.xml")?;
    root_rels.add(REL_EXTENDED_PROPERTIES, "docProps/app.xml")?;
    package.add("_rels/.rels", root_rels.finish().as_bytes())?;

    package.add("docProps/core.xml", CORE_PROPS_XML.as_bytes())?;
    package.add("docProps/app.xml", app_xml(slide_count)?.as_bytes())?;

    let mut pres_rels = Relationships::new();
    pres_rels.add(REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml")?;
    pres_rels.add(REL_THEME, "theme/theme1.xml")?;
    pres_rels.add(REL_PRES_PROPS, "presProps.xml")?;
    pres_rels.add(REL_VIEW_PROPS, "viewProps.xml")?;
    pres_rels.add(REL_TABLE_STYLES, "tableStyles.xml")?;
    for index in 0..slide_count {
        pres_rels.add(REL_SLIDE, &format!("slides/slide{}.xml", index + 1))?;
    }
    package.add("ppt/_rels/presentation.xml.rels", pres_rels.finish().as_bytes())?;
    package.add(
        "ppt/presentation.xml",
        pres.presentation_xml(FIXED_PRESENTATION_RELS + 1)?.as_bytes(),
    )?;

    let mut master_rels = Relationships::new();
    master_rels.add(REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml")?;
    master_rels.add(REL_THEME, "../theme/theme1.xml")?;
    package.add("ppt/slideMasters/slideMaster1.xml", SLIDE_MASTER_XML.as_bytes())?;
    package.add(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        master_rels.finish().as_bytes(),
    )?;

    let mut layout_rels = Relationships::new();
    layout_rels.add(REL_SLIDE_MASTER, "../slideMasters/slideMaster1.xml")?;
    package.add("ppt/slideLayouts/slideLayout1.xml", SLIDE_LAYOUT_XML.as_bytes())?;
    package.add(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        layout_rels.finish().as_bytes(),
    )?;

    package.add("ppt/theme/theme1.xml", THEME_XML.as_bytes())?;
    package.add("ppt/presProps.xml", PRES_PROPS_XML.as_bytes())?;
    package.add("ppt/viewProps.xml", VIEW_PROPS_XML.as_bytes())?;
    package.add("ppt/tableStyles.xml", TABLE_STYLES_XML.as_bytes())?;

    for (index, slide) in pres.slides().iter().enumerate() {
        let mut rels = Relationships::new();
        rels.add(REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml")?;

        let mut media_rels: HashMap<MediaId, String> = HashMap::new();
        for media_id in slide.media_ids() {
            let part = pres.media_part(media_id).ok_or(PptxError::UnknownMedia(media_id))?;
            let rel_id = rels.add(REL_IMAGE, &format!("../media/{}", media_id.part_name(part.format)))?;
            media_rels.insert(media_id, rel_id);
        }

        let number = index + 1;
        package.add(
            &format!("ppt/slides/slide{}.xml", number),
            slide.to_xml(&media_rels)?.as_bytes(),
        )?;
        package.add(
            &format!("ppt/slides/_rels/slide{}.xml.rels", number),
            rels.finish().as_bytes(),
        )?;
    }

    for (index, part) in pres.media().iter().enumerate() {
        let name = MediaId(index).part_name(part.format);
        package.add(&format!("ppt/media/{}", name), &part.data)?;
    }

    package.finish()
}

fn content_types_xml(pres: &Presentation) -> Result<String, PptxError> {
    let mut xml = String::with_capacity(2048);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);

    let mut formats: Vec<_> = pres.media().iter().map(|m| m.format).collect();
    formats.sort_by_key(|f| f.extension());
    formats.dedup();
    for format in formats {
        write!(
            xml,
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            format.extension(),
            format.content_type()
        )?;
    }

    let overrides = [
        ("/ppt/presentation.xml", CT_PRESENTATION),
        ("/ppt/slideMasters/slideMaster1.xml", CT_SLIDE_MASTER),
        ("/ppt/slideLayouts/slideLayout1.xml", CT_SLIDE_LAYOUT),
        ("/ppt/theme/theme1.xml", CT_THEME),
        ("/ppt/presProps.xml", CT_PRES_PROPS),
        ("/ppt/viewProps.xml", CT_VIEW_PROPS),
        ("/ppt/tableStyles.xml", CT_TABLE_STYLES),
        ("/docProps/core.xml", CT_CORE),
        ("/docProps/app.xml", CT_APP),
    ];
    for (part, content_type) in overrides {
        write!(
            xml,
            r#"<Override PartName="{}" ContentType="{}"/>"#,
            part, content_type
        )?;
    }
    for index in 0..pres.slide_count() {
        write!(
            xml,
            r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="{}"/>"#,
            index + 1,
            CT_SLIDE
        )?;
    }

    xml.push_str("</Types>");
    Ok(xml)
}

fn app_xml(slide_count: usize) -> Result<String, PptxError> {
    let mut xml = String::with_capacity(512);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" "#);
    xml.push_str(r#"xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">"#);
    write!(
        xml,
        "<Application>pdf-to-pptx {}</Application>",
        env!("CARGO_PKG_VERSION")
    )?;
    write!(xml, "<Slides>{}</Slides>", slide_count)?;
    xml.push_str("<PresentationFormat>Custom</PresentationFormat>");
    xml.push_str("</Properties>");
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::pptx::{CanvasSize, Frame, ImageFormat, Slide};
    use std::io::Read;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_package_parts() {
        let mut pres = Presentation::new(CanvasSize::default());
        let media = pres.add_media(vec![0xFF, 0xD8, 0xFF, 0xD9], ImageFormat::Jpeg);
        let mut slide = Slide::new();
        slide.add_rectangle(Frame::new(0, 0, 10, 10), Rgb::BLACK);
        slide.add_picture(Frame::new(0, 0, 10, 10), media);
        pres.push_slide(slide);
        pres.push_slide(Slide::new());

        let bytes = pres.to_bytes().unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for expected in [
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/app.xml",
            "ppt/presentation.xml",
            "ppt/slideMasters/slideMaster1.xml",
            "ppt/slideLayouts/slideLayout1.xml",
            "ppt/theme/theme1.xml",
            "ppt/slides/slide1.xml",
            "ppt/slides/slide2.xml",
            "ppt/slides/_rels/slide1.xml.rels",
            "ppt/media/image1.jpeg",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }

        let content_types = read_part(&bytes, "[Content_Types].xml");
        assert!(content_types.contains(r#"Extension="jpeg""#));
        assert!(!content_types.contains(r#"Extension="png""#));
        assert!(content_types.contains("/ppt/slides/slide2.xml"));

        let slide_rels = read_part(&bytes, "ppt/slides/_rels/slide1.xml.rels");
        assert!(slide_rels.contains(r#"Id="rId2""#));
        assert!(slide_rels.contains("../media/image1.jpeg"));

        let pres_rels = read_part(&bytes, "ppt/_rels/presentation.xml.rels");
        assert!(pres_rels.contains(r#"Id="rId6""#));
        assert!(pres_rels.contains("slides/slide1.xml"));

        assert!(read_part(&bytes, "docProps/app.xml").contains("<Slides>2</Slides>"));
    }

    #[test]
    fn test_empty_presentation_packages() {
        let bytes = Presentation::default().to_bytes().unwrap();
        let xml = read_part(&bytes, "ppt/presentation.xml");
        assert!(xml.contains(r#"<p:sldSz cx="9144000" cy="6858000"/>"#));
    }
}
