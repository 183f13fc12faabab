//! Page to slide mapping
//!
//! Each source page becomes one slide: filled drawings become rectangles,
//! image placements become pictures and text blocks become text boxes with
//! one paragraph per line and one run per span. Every element is converted
//! on its own; a failure skips that element, records why, and the rest of
//! the page carries on.

use crate::color::{ColorError, Rgb};
use crate::fonts::{is_bold_font, is_italic_font};
use crate::geometry::Rect;
use crate::images::{extract_image, ImageError};
use crate::layout::LayoutOptions;
use crate::page::{Drawing, PageImage, SourcePage, TextBlock, TextSpan};
use crate::pptx::{CanvasSize, Frame, MediaId, Presentation, Run, Slide};
use crate::units::pt_to_emu;
use log::{debug, warn};
use lopdf::{Document, ObjectId};
use serde::Serialize;
use std::collections::HashMap;

/// Options for PDF to PPTX conversion
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Factor applied to text box widths so substituted fonts do not wrap
    /// earlier than the source rendering did
    pub width_buffer: f64,
    /// Text grouping thresholds
    pub layout: LayoutOptions,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            width_buffer: 1.10,
            layout: LayoutOptions::default(),
        }
    }
}

/// Which kind of element was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Drawing,
    Image,
    TextRun,
    PageContent,
}

/// Why an element did not make it onto the slide (or lost its color)
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("invalid color: {0}")]
    Color(#[from] ColorError),

    #[error("no readable color")]
    MissingColor,

    #[error("non-finite geometry")]
    Geometry,

    #[error("{0}")]
    Image(#[from] ImageError),

    #[error("content stream unreadable: {0}")]
    PageContent(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub element: ElementKind,
    pub reason: SkipReason,
}

/// What one page produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageReport {
    /// Page number (1-indexed)
    pub page: u32,
    pub shapes: usize,
    pub pictures: usize,
    pub text_boxes: usize,
    pub runs: usize,
    /// The page size differs from the canvas, which is never resized
    pub size_mismatch: bool,
    pub skipped: Vec<Skipped>,
}

impl PageReport {
    fn skip(&mut self, element: ElementKind, reason: SkipReason) {
        warn!("page {}: skipped {:?}: {}", self.page, element, reason);
        self.skipped.push(Skipped { element, reason });
    }
}

/// What a whole conversion produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    pub canvas: CanvasSize,
    pub pages: Vec<PageReport>,
}

impl ConversionReport {
    pub fn slide_count(&self) -> usize {
        self.pages.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.pages.iter().map(|p| p.skipped.len()).sum()
    }

    pub fn mismatched_pages(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|p| p.size_mismatch)
            .map(|p| p.page)
            .collect()
    }
}

/// Frame of a page-space rectangle
fn frame_for(rect: &Rect) -> Result<Frame, SkipReason> {
    if !rect.is_finite() {
        return Err(SkipReason::Geometry);
    }
    Ok(Frame::new(
        pt_to_emu(rect.x0),
        pt_to_emu(rect.y0),
        pt_to_emu(rect.width()),
        pt_to_emu(rect.height()),
    ))
}

/// Rectangle for a drawing; `Ok(None)` when the drawing is not a fill
pub fn rectangle_for(drawing: &Drawing) -> Result<Option<(Frame, Rgb)>, SkipReason> {
    let Some(fill) = drawing.fill.as_deref() else {
        return Ok(None);
    };
    if fill.is_empty() || drawing.items == 0 {
        return Ok(None);
    }
    let color = Rgb::from_normalized(fill)?;
    let frame = frame_for(&drawing.rect)?;
    Ok(Some((frame, color)))
}

/// Run for a span. The error, if any, only concerns the color: the run is
/// still returned, with the default color.
pub fn run_for(span: &TextSpan) -> (Run, Option<SkipReason>) {
    let (color, problem) = match span.color.map(Rgb::from_packed) {
        Some(Ok(rgb)) => (Some(rgb), None),
        Some(Err(e)) => (None, Some(SkipReason::Color(e))),
        None => (None, Some(SkipReason::MissingColor)),
    };
    let run = Run {
        text: span.text.clone(),
        size_pt: span.size,
        bold: is_bold_font(&span.font),
        italic: is_italic_font(&span.font),
        color,
    };
    (run, problem)
}

/// Text box frame for a block: the width is inflated, the height is not
pub fn text_box_frame(bbox: &Rect, width_buffer: f64) -> Result<Frame, SkipReason> {
    if !bbox.is_finite() {
        return Err(SkipReason::Geometry);
    }
    Ok(Frame::new(
        pt_to_emu(bbox.x0),
        pt_to_emu(bbox.y0),
        pt_to_emu(bbox.width() * width_buffer),
        pt_to_emu(bbox.height()),
    ))
}

/// Maps source pages onto slides of one presentation
pub struct SlideMapper<'a> {
    doc: &'a Document,
    options: &'a ConvertOptions,
    canvas: CanvasSize,
    /// Images are extracted once per object id and shared by every slide
    media: HashMap<ObjectId, Result<MediaId, ImageError>>,
}

impl<'a> SlideMapper<'a> {
    pub fn new(doc: &'a Document, options: &'a ConvertOptions, canvas: CanvasSize) -> Self {
        SlideMapper {
            doc,
            options,
            canvas,
            media: HashMap::new(),
        }
    }

    /// Map one page into a new slide of `pres`
    pub fn map_page(&mut self, page: &SourcePage, pres: &mut Presentation) -> PageReport {
        let mut report = PageReport {
            page: page.number,
            ..Default::default()
        };

        let page_size = CanvasSize::from_points(page.width, page.height);
        if page_size != self.canvas {
            warn!(
                "page {} is {}x{} EMU, canvas stays {}x{}",
                page.number, page_size.width, page_size.height, self.canvas.width, self.canvas.height
            );
            report.size_mismatch = true;
        }

        let mut slide = Slide::new();

        for drawing in &page.drawings {
            match rectangle_for(drawing) {
                Ok(Some((frame, fill))) => {
                    debug!("page {}: rectangle {:?} fill {}", page.number, frame, fill);
                    slide.add_rectangle(frame, fill);
                    report.shapes += 1;
                }
                Ok(None) => {}
                Err(reason) => report.skip(ElementKind::Drawing, reason),
            }
        }

        for image in &page.images {
            self.place_image(image, &mut slide, pres, &mut report);
        }

        for block in &page.blocks {
            self.place_text(block, &mut slide, &mut report);
        }

        pres.push_slide(slide);
        report
    }

    /// Map a page whose content could not be read: an empty slide
    pub fn map_unreadable_page(&mut self, page: &SourcePage, reason: String, pres: &mut Presentation) -> PageReport {
        let mut report = self.map_page(page, pres);
        report.skip(ElementKind::PageContent, SkipReason::PageContent(reason));
        report
    }

    fn media_for(&mut self, id: ObjectId, pres: &mut Presentation) -> Result<MediaId, ImageError> {
        let doc = self.doc;
        self.media
            .entry(id)
            .or_insert_with(|| {
                extract_image(doc, id).map(|image| {
                    debug!(
                        "image {:?}: {}x{} {}",
                        id,
                        image.width,
                        image.height,
                        image.format.extension()
                    );
                    pres.add_media(image.data, image.format)
                })
            })
            .clone()
    }

    fn place_image(&mut self, image: &PageImage, slide: &mut Slide, pres: &mut Presentation, report: &mut PageReport) {
        let media = match self.media_for(image.id, pres) {
            Ok(media) => media,
            Err(e) => {
                report.skip(ElementKind::Image, SkipReason::Image(e));
                return;
            }
        };

        for placement in &image.placements {
            match frame_for(placement) {
                Ok(frame) => {
                    debug!("page {}: picture /{} at {:?}", report.page, image.name, frame);
                    slide.add_picture(frame, media);
                    report.pictures += 1;
                }
                Err(reason) => report.skip(ElementKind::Image, reason),
            }
        }
    }

    fn place_text(&self, block: &TextBlock, slide: &mut Slide, report: &mut PageReport) {
        if block.lines.is_empty() {
            return;
        }
        let frame = match text_box_frame(&block.bbox, self.options.width_buffer) {
            Ok(frame) => frame,
            Err(reason) => {
                report.skip(ElementKind::TextRun, reason);
                return;
            }
        };

        let text = slide.add_text_box(frame);
        report.text_boxes += 1;

        for (index, line) in block.lines.iter().enumerate() {
            let paragraph = if index == 0 {
                text.first_paragraph()
            } else {
                text.add_paragraph()
            };
            for span in &line.spans {
                let (run, problem) = run_for(span);
                if let Some(reason) = problem {
                    report.skip(ElementKind::TextRun, reason);
                }
                paragraph.add_run(run);
                report.runs += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::TextLine;

    fn span(text: &str, font: &str, color: Option<u32>) -> TextSpan {
        TextSpan {
            text: text.into(),
            font: font.into(),
            size: 24.0,
            color,
            bbox: Rect::new(0.0, 0.0, 50.0, 24.0),
        }
    }

    fn page(number: u32, width: f64, height: f64) -> SourcePage {
        SourcePage {
            number,
            width,
            height,
            drawings: Vec::new(),
            images: Vec::new(),
            blocks: Vec::new(),
        }
    }

    #[test]
    fn test_rectangle_for_fill() {
        let drawing = Drawing {
            fill: Some(vec![1.0, 0.0, 0.0]),
            items: 1,
            rect: Rect::new(0.0, 0.0, 72.0, 36.0),
        };
        let (frame, color) = rectangle_for(&drawing).unwrap().unwrap();
        assert_eq!(frame, Frame::new(0, 0, 914_400, 457_200));
        assert_eq!(color, Rgb::new(255, 0, 0));
    }

    #[test]
    fn test_unfilled_drawings_dropped_silently() {
        let stroke = Drawing {
            fill: None,
            items: 1,
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
        };
        let no_items = Drawing {
            fill: Some(vec![0.0, 0.0, 0.0]),
            items: 0,
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
        };
        assert_eq!(rectangle_for(&stroke), Ok(None));
        assert_eq!(rectangle_for(&no_items), Ok(None));
    }

    #[test]
    fn test_malformed_drawings_skipped() {
        let bad_color = Drawing {
            fill: Some(vec![2.0, 0.0, 0.0]),
            items: 1,
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
        };
        let bad_rect = Drawing {
            fill: Some(vec![0.0, 0.0, 0.0]),
            items: 1,
            rect: Rect::new(0.0, 0.0, f64::INFINITY, 10.0),
        };
        assert!(matches!(rectangle_for(&bad_color), Err(SkipReason::Color(_))));
        assert_eq!(rectangle_for(&bad_rect), Err(SkipReason::Geometry));
    }

    #[test]
    fn test_width_buffer() {
        let frame = text_box_frame(&Rect::new(72.0, 100.0, 172.0, 130.0), 1.10).unwrap();
        assert_eq!(frame.width, 1_397_000);
        assert_eq!(frame.height, pt_to_emu(30.0));
        assert_eq!(frame.x, 914_400);
    }

    #[test]
    fn test_run_styles() {
        let (run, problem) = run_for(&span("Hello", "Helvetica-Bold", Some(0xFF8040)));
        assert!(problem.is_none());
        assert!(run.bold);
        assert!(!run.italic);
        assert_eq!(run.color, Some(Rgb::new(255, 128, 64)));
        assert_eq!(run.size_hundredths(), 2400);

        let (run, _) = run_for(&span("x", "Arial-Medium", Some(0)));
        assert!(run.bold);
        let (run, _) = run_for(&span("x", "Times-Italic", Some(0)));
        assert!(run.italic && !run.bold);
    }

    #[test]
    fn test_unreadable_color_keeps_run() {
        let (run, problem) = run_for(&span("x", "Arial", Some(0x1_000000)));
        assert_eq!(run.text, "x");
        assert_eq!(run.color, None);
        assert!(matches!(problem, Some(SkipReason::Color(_))));

        let (_, problem) = run_for(&span("x", "Arial", None));
        assert_eq!(problem, Some(SkipReason::MissingColor));
    }

    #[test]
    fn test_map_page_text_and_size_mismatch() {
        let doc = Document::with_version("1.5");
        let options = ConvertOptions::default();
        let canvas = CanvasSize::from_points(612.0, 792.0);
        let mut mapper = SlideMapper::new(&doc, &options, canvas);
        let mut pres = Presentation::new(canvas);

        let mut source = page(1, 612.0, 792.0);
        source.blocks.push(TextBlock {
            lines: vec![
                TextLine {
                    spans: vec![span("Hello ", "Arial", Some(0)), span("bold", "Arial-Bold", Some(0))],
                    bbox: Rect::new(72.0, 72.0, 172.0, 96.0),
                },
                TextLine {
                    spans: vec![span("second", "Arial", None)],
                    bbox: Rect::new(72.0, 100.0, 150.0, 124.0),
                },
            ],
            bbox: Rect::new(72.0, 72.0, 172.0, 124.0),
        });

        let report = mapper.map_page(&source, &mut pres);
        assert_eq!(report.text_boxes, 1);
        assert_eq!(report.runs, 3);
        assert!(!report.size_mismatch);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].element, ElementKind::TextRun);

        let report = mapper.map_page(&page(2, 792.0, 612.0), &mut pres);
        assert!(report.size_mismatch);
        assert_eq!(pres.slide_count(), 2);
        assert_eq!(pres.canvas(), canvas);
    }

    #[test]
    fn test_missing_image_is_skipped() {
        let doc = Document::with_version("1.5");
        let options = ConvertOptions::default();
        let mut mapper = SlideMapper::new(&doc, &options, CanvasSize::default());
        let mut pres = Presentation::default();

        let mut source = page(1, 720.0, 540.0);
        source.images.push(PageImage {
            id: (42, 0),
            name: "Im1".into(),
            placements: vec![Rect::new(0.0, 0.0, 10.0, 10.0)],
        });

        let report = mapper.map_page(&source, &mut pres);
        assert_eq!(report.pictures, 0);
        assert_eq!(report.skipped[0].element, ElementKind::Image);
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::Image(ImageError::Missing((42, 0)))
        );
        assert!(pres.media().is_empty());
    }
}
