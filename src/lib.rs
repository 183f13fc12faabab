//! Layout-preserving PDF to PowerPoint conversion using lopdf
//!
//! This crate provides:
//! - A content stream interpreter producing a page model of filled paths,
//!   image placements and block/line/span text
//! - A mapper turning each page into one slide of rectangles, pictures and
//!   text boxes
//! - A small PresentationML writer
//! - An optional HTTP service (feature `server`) with upload and one-shot
//!   download endpoints

pub mod color;
pub mod fonts;
pub mod geometry;
pub mod images;
mod interpreter;
pub mod layout;
pub mod mapper;
mod objects;
pub mod page;
pub mod pptx;
#[cfg(feature = "server")]
pub mod server;
pub mod tounicode;
pub mod units;

pub use color::{ColorError, Rgb};
pub use images::{extract_image, ExtractedImage, ImageError};
pub use layout::{group_into_blocks, group_into_lines, LayoutOptions, TextRun};
pub use mapper::{ConversionReport, ConvertOptions, ElementKind, PageReport, SkipReason, Skipped, SlideMapper};
pub use page::{load_page, load_pages, page_box, Drawing, PageImage, SourcePage, TextBlock, TextLine, TextSpan};
pub use pptx::{CanvasSize, Presentation, PptxError};
pub use units::pt_to_emu;

use lopdf::Document;
use std::path::Path;

/// A converted deck held in memory
#[derive(Debug)]
pub struct ConvertedDeck {
    /// The `.pptx` package
    pub bytes: Vec<u8>,
    pub report: ConversionReport,
}

/// Convert a PDF file into a `.pptx` file
pub fn convert_pdf_to_pptx<P: AsRef<Path>, Q: AsRef<Path>>(
    pdf_path: P,
    pptx_path: Q,
) -> Result<ConversionReport, ConvertError> {
    let start = std::time::Instant::now();
    let doc = Document::load(&pdf_path).map_err(PdfError::from)?;
    let (pres, report) = convert_document(&doc, &ConvertOptions::default())?;
    pres.save(&pptx_path)?;

    log::info!(
        "converted {} -> {} ({} slides, {} skipped) in {} ms",
        pdf_path.as_ref().display(),
        pptx_path.as_ref().display(),
        report.slide_count(),
        report.skipped_count(),
        start.elapsed().as_millis()
    );
    Ok(report)
}

/// Convert a PDF held in memory
pub fn convert_pdf_mem(buffer: &[u8]) -> Result<ConvertedDeck, ConvertError> {
    let doc = Document::load_mem(buffer).map_err(PdfError::from)?;
    let (pres, report) = convert_document(&doc, &ConvertOptions::default())?;
    let bytes = pres.to_bytes()?;
    log::info!(
        "converted {} byte PDF into {} slides ({} skipped)",
        buffer.len(),
        report.slide_count(),
        report.skipped_count()
    );
    Ok(ConvertedDeck { bytes, report })
}

/// Convert a loaded document into a presentation, one slide per page.
///
/// The canvas is the first page's size and applies to every slide; an empty
/// document gets the default 10in × 7.5in canvas.
pub fn convert_document(
    doc: &Document,
    options: &ConvertOptions,
) -> Result<(Presentation, ConversionReport), ConvertError> {
    if doc.is_encrypted() {
        return Err(PdfError::Encrypted.into());
    }
    if doc.catalog().is_err() {
        return Err(PdfError::InvalidStructure.into());
    }

    let pages = doc.get_pages();
    let canvas = match pages.values().next() {
        Some(&first) => {
            let bounds = page_box(doc, first);
            CanvasSize::from_points(bounds.width(), bounds.height())
        }
        None => CanvasSize::default(),
    };
    log::debug!("{} pages, canvas {}x{} EMU", pages.len(), canvas.width, canvas.height);

    let mut pres = Presentation::new(canvas);
    let mut mapper = SlideMapper::new(doc, options, canvas);
    let mut reports = Vec::with_capacity(pages.len());

    for (&page_num, &page_id) in &pages {
        let (page, error) = load_page(doc, page_id, page_num, &options.layout);
        let report = match error {
            Some(e) => mapper.map_unreadable_page(&page, e.to_string(), &mut pres),
            None => mapper.map_page(&page, &mut pres),
        };
        reports.push(report);
    }

    Ok((
        pres,
        ConversionReport {
            canvas,
            pages: reports,
        },
    ))
}

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("PDF is encrypted")]
    Encrypted,
    #[error("Invalid PDF structure")]
    InvalidStructure,
}

impl From<lopdf::Error> for PdfError {
    fn from(e: lopdf::Error) -> Self {
        PdfError::Parse(e.to_string())
    }
}

/// Errors that abort a whole conversion
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Pdf(#[from] PdfError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PPTX packaging error: {0}")]
    Package(#[from] PptxError),
}

impl From<lopdf::Error> for ConvertError {
    fn from(e: lopdf::Error) -> Self {
        ConvertError::Pdf(e.into())
    }
}
