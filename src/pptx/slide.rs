use super::{escape_xml, MediaId, PptxError};
use crate::color::Rgb;
use std::collections::HashMap;
use std::fmt::Write as FmtWrite;

/// Smallest and largest `sz` values (hundredths of a point) PowerPoint accepts
const MIN_FONT_SIZE: i64 = 100;
const MAX_FONT_SIZE: i64 = 400_000;

/// Absolute position and size in EMU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Frame {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Frame {
            x,
            y,
            width,
            height,
        }
    }

    fn write_xfrm(&self, xml: &mut String) -> Result<(), PptxError> {
        xml.push_str("<a:xfrm>");
        write!(xml, r#"<a:off x="{}" y="{}"/>"#, self.x, self.y)?;
        write!(
            xml,
            r#"<a:ext cx="{}" cy="{}"/>"#,
            self.width.max(0),
            self.height.max(0)
        )?;
        xml.push_str("</a:xfrm>");
        Ok(())
    }
}

/// A styled text run
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    /// Font size in points
    pub size_pt: f64,
    pub bold: bool,
    pub italic: bool,
    /// `None` keeps the theme's default text color
    pub color: Option<Rgb>,
}

impl Run {
    /// Font size as written to `sz`
    pub fn size_hundredths(&self) -> i64 {
        ((self.size_pt * 100.0) as i64).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
    }

    fn write_xml(&self, xml: &mut String) -> Result<(), PptxError> {
        xml.push_str("<a:r>");
        write!(xml, r#"<a:rPr lang="en-US" sz="{}""#, self.size_hundredths())?;
        if self.bold {
            xml.push_str(r#" b="1""#);
        }
        if self.italic {
            xml.push_str(r#" i="1""#);
        }
        xml.push_str(r#" dirty="0">"#);
        if let Some(color) = self.color {
            write!(
                xml,
                r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#,
                color.hex()
            )?;
        }
        xml.push_str("</a:rPr>");
        write!(xml, "<a:t>{}</a:t>", escape_xml(&self.text))?;
        xml.push_str("</a:r>");
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn add_run(&mut self, run: Run) -> &mut Self {
        self.runs.push(run);
        self
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Body of a text box. Always holds at least one paragraph, like a freshly
/// inserted PowerPoint text box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFrame {
    paragraphs: Vec<Paragraph>,
    pub word_wrap: bool,
}

impl Default for TextFrame {
    fn default() -> Self {
        TextFrame {
            paragraphs: vec![Paragraph::default()],
            word_wrap: true,
        }
    }
}

impl TextFrame {
    /// The implicit first paragraph
    pub fn first_paragraph(&mut self) -> &mut Paragraph {
        &mut self.paragraphs[0]
    }

    pub fn add_paragraph(&mut self) -> &mut Paragraph {
        self.paragraphs.push(Paragraph::default());
        let last = self.paragraphs.len() - 1;
        &mut self.paragraphs[last]
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn run_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.runs.len()).sum()
    }

    fn write_xml(&self, xml: &mut String) -> Result<(), PptxError> {
        xml.push_str("<p:txBody>");
        let wrap = if self.word_wrap { "square" } else { "none" };
        write!(
            xml,
            r#"<a:bodyPr wrap="{}" lIns="0" tIns="0" rIns="0" bIns="0" rtlCol="0"><a:noAutofit/></a:bodyPr>"#,
            wrap
        )?;
        xml.push_str("<a:lstStyle/>");
        for paragraph in &self.paragraphs {
            xml.push_str("<a:p>");
            for run in &paragraph.runs {
                run.write_xml(xml)?;
            }
            xml.push_str("</a:p>");
        }
        xml.push_str("</p:txBody>");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Solid rectangle without outline
    Rectangle { frame: Frame, fill: Rgb },
    Picture { frame: Frame, media: MediaId },
    TextBox { frame: Frame, text: TextFrame },
}

impl Shape {
    pub fn frame(&self) -> Frame {
        match self {
            Shape::Rectangle { frame, .. }
            | Shape::Picture { frame, .. }
            | Shape::TextBox { frame, .. } => *frame,
        }
    }

    fn write_xml(
        &self,
        xml: &mut String,
        shape_id: usize,
        media_rels: &HashMap<MediaId, String>,
    ) -> Result<(), PptxError> {
        match self {
            Shape::Rectangle { frame, fill } => {
                xml.push_str("<p:sp><p:nvSpPr>");
                write!(
                    xml,
                    r#"<p:cNvPr id="{}" name="Rectangle {}"/>"#,
                    shape_id,
                    shape_id - 1
                )?;
                xml.push_str("<p:cNvSpPr/><p:nvPr/></p:nvSpPr>");
                xml.push_str("<p:spPr>");
                frame.write_xfrm(xml)?;
                xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
                write!(
                    xml,
                    r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#,
                    fill.hex()
                )?;
                xml.push_str("<a:ln><a:noFill/></a:ln>");
                xml.push_str("</p:spPr></p:sp>");
            }
            Shape::Picture { frame, media } => {
                let rel_id = media_rels.get(media).ok_or(PptxError::UnknownMedia(*media))?;
                xml.push_str("<p:pic><p:nvPicPr>");
                write!(
                    xml,
                    r#"<p:cNvPr id="{}" name="Picture {}"/>"#,
                    shape_id,
                    shape_id - 1
                )?;
                xml.push_str(r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#);
                xml.push_str("<p:blipFill>");
                write!(xml, r#"<a:blip r:embed="{}"/>"#, rel_id)?;
                xml.push_str("<a:stretch><a:fillRect/></a:stretch></p:blipFill>");
                xml.push_str("<p:spPr>");
                frame.write_xfrm(xml)?;
                xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
                xml.push_str("</p:spPr></p:pic>");
            }
            Shape::TextBox { frame, text } => {
                xml.push_str("<p:sp><p:nvSpPr>");
                write!(
                    xml,
                    r#"<p:cNvPr id="{}" name="TextBox {}"/>"#,
                    shape_id,
                    shape_id - 1
                )?;
                xml.push_str(r#"<p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#);
                xml.push_str("<p:spPr>");
                frame.write_xfrm(xml)?;
                xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/>"#);
                xml.push_str("</p:spPr>");
                text.write_xml(xml)?;
                xml.push_str("</p:sp>");
            }
        }
        Ok(())
    }
}

/// A slide on the blank layout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slide {
    shapes: Vec<Shape>,
}

impl Slide {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rectangle(&mut self, frame: Frame, fill: Rgb) {
        self.shapes.push(Shape::Rectangle { frame, fill });
    }

    pub fn add_picture(&mut self, frame: Frame, media: MediaId) {
        self.shapes.push(Shape::Picture { frame, media });
    }

    /// Add a word-wrapped text box and return its text frame
    pub fn add_text_box(&mut self, frame: Frame) -> &mut TextFrame {
        self.shapes.push(Shape::TextBox {
            frame,
            text: TextFrame::default(),
        });
        match self.shapes.last_mut() {
            Some(Shape::TextBox { text, .. }) => text,
            _ => unreachable!("text box was just pushed"),
        }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Media referenced by this slide, first use first, without repeats
    pub fn media_ids(&self) -> Vec<MediaId> {
        let mut ids = Vec::new();
        for shape in &self.shapes {
            if let Shape::Picture { media, .. } = shape {
                if !ids.contains(media) {
                    ids.push(*media);
                }
            }
        }
        ids
    }

    /// Slide XML. Shape ids start at 2; id 1 is the shape tree itself.
    pub(crate) fn to_xml(&self, media_rels: &HashMap<MediaId, String>) -> Result<String, PptxError> {
        let mut xml = String::with_capacity(1024 + self.shapes.len() * 512);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#);
        xml.push_str(r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#);
        xml.push_str(r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#);
        xml.push_str("<p:cSld><p:spTree>");
        xml.push_str(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#);
        xml.push_str(r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#);

        for (index, shape) in self.shapes.iter().enumerate() {
            shape.write_xml(&mut xml, index + 2, media_rels)?;
        }

        xml.push_str("</p:spTree></p:cSld>");
        xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
        xml.push_str("</p:sld>");
        Ok(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Run {
        Run {
            text: text.into(),
            size_pt: 24.0,
            bold: false,
            italic: false,
            color: Some(Rgb::BLACK),
        }
    }

    #[test]
    fn test_text_frame_has_implicit_paragraph() {
        let mut slide = Slide::new();
        let frame = slide.add_text_box(Frame::new(0, 0, 100, 100));
        assert_eq!(frame.paragraphs().len(), 1);
        frame.first_paragraph().add_run(run("one"));
        frame.add_paragraph().add_run(run("two"));
        assert_eq!(frame.paragraphs().len(), 2);
        assert_eq!(frame.run_count(), 2);
    }

    #[test]
    fn test_font_size_clamped() {
        let mut r = run("x");
        assert_eq!(r.size_hundredths(), 2400);
        r.size_pt = 0.3;
        assert_eq!(r.size_hundredths(), MIN_FONT_SIZE);
        r.size_pt = 10_000.0;
        assert_eq!(r.size_hundredths(), MAX_FONT_SIZE);
    }

    #[test]
    fn test_slide_xml() {
        let mut slide = Slide::new();
        slide.add_rectangle(Frame::new(0, 0, 914400, 914400), Rgb::new(255, 0, 0));
        slide.add_picture(Frame::new(10, 20, 30, 40), MediaId(0));
        let text = slide.add_text_box(Frame::new(1, 2, 3, 4));
        let mut bold = run("Tom & Jerry");
        bold.bold = true;
        text.first_paragraph().add_run(bold);

        let rels = HashMap::from([(MediaId(0), "rId2".to_string())]);
        let xml = slide.to_xml(&rels).unwrap();

        assert!(xml.contains(r#"<p:cNvPr id="2" name="Rectangle 1"/>"#));
        assert!(xml.contains(r#"<a:srgbClr val="FF0000"/>"#));
        assert!(xml.contains("<a:ln><a:noFill/></a:ln>"));
        assert!(xml.contains(r#"<a:blip r:embed="rId2"/>"#));
        assert!(xml.contains(r#"<a:off x="10" y="20"/><a:ext cx="30" cy="40"/>"#));
        assert!(xml.contains(r#"<p:cNvPr id="4" name="TextBox 3"/>"#));
        assert!(xml.contains(r#"sz="2400" b="1""#));
        assert!(xml.contains("<a:t>Tom &amp; Jerry</a:t>"));
        assert!(xml.contains(r#"wrap="square""#));
    }

    #[test]
    fn test_unknown_media_is_an_error() {
        let mut slide = Slide::new();
        slide.add_picture(Frame::new(0, 0, 1, 1), MediaId(3));
        assert!(matches!(
            slide.to_xml(&HashMap::new()),
            Err(PptxError::UnknownMedia(MediaId(3)))
        ));
    }

    #[test]
    fn test_media_ids_deduplicated() {
        let mut slide = Slide::new();
        slide.add_picture(Frame::new(0, 0, 1, 1), MediaId(1));
        slide.add_picture(Frame::new(5, 5, 1, 1), MediaId(0));
        slide.add_picture(Frame::new(9, 9, 1, 1), MediaId(1));
        assert_eq!(slide.media_ids(), vec![MediaId(1), MediaId(0)]);
    }
}
