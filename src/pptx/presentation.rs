use super::package;
use super::{ImageFormat, MediaId, MediaPart, PptxError, Slide};
use crate::units::{pt_to_emu, DEFAULT_SLIDE_HEIGHT_EMU, DEFAULT_SLIDE_WIDTH_EMU};
use std::fmt::Write as FmtWrite;
use std::path::Path;

/// Slide size in EMU, shared by every slide of a deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CanvasSize {
    pub width: i64,
    pub height: i64,
}

impl CanvasSize {
    /// Canvas matching a page size given in points
    pub fn from_points(width: f64, height: f64) -> Self {
        CanvasSize {
            width: pt_to_emu(width),
            height: pt_to_emu(height),
        }
    }
}

impl Default for CanvasSize {
    /// 10in × 7.5in
    fn default() -> Self {
        CanvasSize {
            width: DEFAULT_SLIDE_WIDTH_EMU,
            height: DEFAULT_SLIDE_HEIGHT_EMU,
        }
    }
}

/// An in-memory presentation. The canvas is fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct Presentation {
    canvas: CanvasSize,
    slides: Vec<Slide>,
    media: Vec<MediaPart>,
}

impl Presentation {
    pub fn new(canvas: CanvasSize) -> Self {
        Presentation {
            canvas,
            slides: Vec::new(),
            media: Vec::new(),
        }
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// Append a slide and return its index
    pub fn push_slide(&mut self, slide: Slide) -> usize {
        self.slides.push(slide);
        self.slides.len() - 1
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Store an encoded image once; slides refer to it by the returned id
    pub fn add_media(&mut self, data: Vec<u8>, format: ImageFormat) -> MediaId {
        self.media.push(MediaPart { data, format });
        MediaId(self.media.len() - 1)
    }

    pub fn media(&self) -> &[MediaPart] {
        &self.media
    }

    pub fn media_part(&self, id: MediaId) -> Option<&MediaPart> {
        self.media.get(id.0)
    }

    /// Serialise to `.pptx` bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, PptxError> {
        package::write_package(self)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PptxError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// `ppt/presentation.xml`. Slide relationships start at `first_slide_rel`.
    pub(crate) fn presentation_xml(&self, first_slide_rel: usize) -> Result<String, PptxError> {
        let mut xml = String::with_capacity(1024 + self.slides.len() * 64);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(r#"<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#);
        xml.push_str(r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#);
        xml.push_str(r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" saveSubsetFonts="1">"#);

        xml.push_str(r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#);

        if !self.slides.is_empty() {
            xml.push_str("<p:sldIdLst>");
            for index in 0..self.slides.len() {
                write!(
                    xml,
                    r#"<p:sldId id="{}" r:id="rId{}"/>"#,
                    256 + index,
                    first_slide_rel + index
                )?;
            }
            xml.push_str("</p:sldIdLst>");
        }

        write!(
            xml,
            r#"<p:sldSz cx="{}" cy="{}"/>"#,
            self.canvas.width, self.canvas.height
        )?;
        xml.push_str(r#"<p:notesSz cx="6858000" cy="9144000"/>"#);
        xml.push_str("</p:presentation>");
        Ok(xml)
    }
}
