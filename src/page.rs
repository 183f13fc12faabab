//! Source page model
//!
//! A page is read once into plain data: its size, the painted paths, the
//! image placements and the block/line/span text structure. All coordinates
//! are in points with the origin at the top-left corner of the visible page
//! box and y growing downward, which is how slides are laid out.

use crate::geometry::{Matrix, Rect};
use crate::interpreter::Interpreter;
use crate::layout::{group_into_blocks, LayoutOptions};
use crate::objects::{inherited, number};
use crate::PdfError;
use lopdf::{Document, ObjectId};

/// Fallback page box (US Letter) for pages without a usable MediaBox
const LETTER: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// A painted path
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    /// Raw fill channels in the fill color space; `None` for stroke-only
    /// paths or fills the interpreter cannot express (patterns)
    pub fill: Option<Vec<f64>>,
    /// Number of path segments (`l`, `c`, `v`, `y`, `re`)
    pub items: usize,
    /// Bounding rectangle of every path point
    pub rect: Rect,
}

/// An image XObject and every rectangle it is drawn into on the page
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub id: ObjectId,
    /// Resource name used by the first `Do`
    pub name: String,
    pub placements: Vec<Rect>,
}

/// Smallest styled text unit
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub font: String,
    /// Font size in points
    pub size: f64,
    /// Packed `0xRRGGBB`, `None` when the fill color was unreadable
    pub color: Option<u32>,
    pub bbox: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub bbox: Rect,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub bbox: Rect,
}

/// A page read into layout primitives
#[derive(Debug, Clone)]
pub struct SourcePage {
    /// Page number (1-indexed)
    pub number: u32,
    /// Width in points
    pub width: f64,
    /// Height in points
    pub height: f64,
    pub drawings: Vec<Drawing>,
    pub images: Vec<PageImage>,
    pub blocks: Vec<TextBlock>,
}

impl SourcePage {
    fn blank(number: u32, width: f64, height: f64) -> Self {
        SourcePage {
            number,
            width,
            height,
            drawings: Vec::new(),
            images: Vec::new(),
            blocks: Vec::new(),
        }
    }
}

/// Visible page box: CropBox if present, else MediaBox, else US Letter
pub fn page_box(doc: &Document, page_id: ObjectId) -> Rect {
    [b"CropBox".as_slice(), b"MediaBox".as_slice()]
        .iter()
        .filter_map(|key| inherited(doc, page_id, key))
        .filter_map(|obj| obj.as_array().ok())
        .filter_map(|arr| {
            let values: Vec<f64> = arr.iter().filter_map(number).collect();
            match values.as_slice() {
                [x0, y0, x1, y1] => Some(Rect::new(*x0, *y0, *x1, *y1)),
                _ => None,
            }
        })
        .find(|r| r.width() > 0.0 && r.height() > 0.0)
        .unwrap_or(LETTER)
}

/// Load one page into the source model.
///
/// A page whose content stream cannot be read still yields its size, with
/// the error returned alongside so the caller can record it.
pub fn load_page(
    doc: &Document,
    page_id: ObjectId,
    page_num: u32,
    layout: &LayoutOptions,
) -> (SourcePage, Option<PdfError>) {
    let bounds = page_box(doc, page_id);
    let mut page = SourcePage::blank(page_num, bounds.width(), bounds.height());

    // PDF space has its origin bottom-left; flip into top-left page space
    let base = Matrix([1.0, 0.0, 0.0, -1.0, -bounds.x0, bounds.y1]);

    let content = match Interpreter::new(doc).run_page(page_id, base) {
        Ok(content) => content,
        Err(e) => return (page, Some(e)),
    };

    page.drawings = content.drawings;
    page.images = content.images;
    page.blocks = group_into_blocks(content.runs, layout);

    (page, None)
}

/// Load every page in document order
pub fn load_pages(doc: &Document, layout: &LayoutOptions) -> Vec<(SourcePage, Option<PdfError>)> {
    doc.get_pages()
        .iter()
        .map(|(&page_num, &page_id)| load_page(doc, page_id, page_num, layout))
        .collect()
}
