//! Content stream interpreter
//!
//! Walks a page's content stream tracking the graphics and text state, and
//! collects the three things slides are built from: painted paths, image
//! placements and positioned text runs.

use crate::color::Rgb;
use crate::fonts::{fallback_decode, FontInfo};
use crate::geometry::{Matrix, Rect};
use crate::layout::TextRun;
use crate::objects::{get_array, get_dict, get_name, number, resolve};
use crate::page::{Drawing, PageImage};
use crate::tounicode::stream_bytes;
use crate::PdfError;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::rc::Rc;

/// Form XObjects nested deeper than this are not entered
const MAX_FORM_DEPTH: usize = 12;

/// TJ adjustments more negative than this (1/1000 em) read as a word space
const TJ_SPACE_THRESHOLD: f64 = 200.0;

/// Everything collected from one page
#[derive(Debug, Default)]
pub(crate) struct PageContent {
    pub drawings: Vec<Drawing>,
    pub images: Vec<PageImage>,
    pub runs: Vec<TextRun>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Pattern,
    Unsupported,
}

impl ColorSpace {
    fn initial_color(self) -> Option<Vec<f64>> {
        match self {
            ColorSpace::Gray | ColorSpace::Rgb => Some(vec![0.0, 0.0, 0.0]),
            ColorSpace::Cmyk => Some(vec![0.0, 0.0, 0.0, 1.0]),
            ColorSpace::Pattern | ColorSpace::Unsupported => None,
        }
    }

    /// Turn `sc`/`scn` operands into channel values
    fn color(self, values: &[f64]) -> Option<Vec<f64>> {
        match (self, values) {
            (ColorSpace::Gray, [g]) => Some(vec![*g, *g, *g]),
            (ColorSpace::Rgb, [_, _, _]) | (ColorSpace::Cmyk, [_, _, _, _]) => Some(values.to_vec()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct TextState<'a> {
    font: Option<Rc<FontInfo<'a>>>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// `Tz` as a fraction
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState<'_> {
    fn default() -> Self {
        TextState {
            font: None,
            size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState<'a> {
    ctm: Matrix,
    fill: Option<Vec<f64>>,
    fill_space: ColorSpace,
    text: TextState<'a>,
}

/// Path under construction, already in page space
#[derive(Debug)]
struct PathBuilder {
    items: usize,
    bounds: Rect,
}

impl PathBuilder {
    fn new() -> Self {
        PathBuilder {
            items: 0,
            bounds: Rect::empty(),
        }
    }

    fn point(&mut self, ctm: &Matrix, x: f64, y: f64) {
        let (px, py) = ctm.apply(x, y);
        self.bounds.include(px, py);
    }
}

/// Resources in scope: the page's, or a form XObject's
struct Frame<'a> {
    resources: Option<&'a Dictionary>,
    fonts: HashMap<Vec<u8>, Option<Rc<FontInfo<'a>>>>,
}

impl<'a> Frame<'a> {
    fn new(resources: Option<&'a Dictionary>) -> Self {
        Frame {
            resources,
            fonts: HashMap::new(),
        }
    }
}

pub(crate) struct Interpreter<'a> {
    doc: &'a Document,
    state: GraphicsState<'a>,
    stack: Vec<GraphicsState<'a>>,
    path: PathBuilder,
    text_matrix: Matrix,
    line_matrix: Matrix,
    out: PageContent,
}

impl<'a> Interpreter<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Interpreter {
            doc,
            state: GraphicsState {
                ctm: Matrix::IDENTITY,
                fill: ColorSpace::Gray.initial_color(),
                fill_space: ColorSpace::Gray,
                text: TextState::default(),
            },
            stack: Vec::new(),
            path: PathBuilder::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            out: PageContent::default(),
        }
    }

    /// Interpret a page's content with `base` as the initial CTM
    pub fn run_page(mut self, page_id: ObjectId, base: Matrix) -> Result<PageContent, PdfError> {
        let content_data = self
            .doc
            .get_page_content(page_id)
            .map_err(|e| PdfError::Parse(e.to_string()))?;
        let content = Content::decode(&content_data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let resources = crate::objects::inherited(self.doc, page_id, b"Resources").and_then(|obj| match obj {
            Object::Dictionary(d) => Some(d),
            _ => None,
        });

        self.state.ctm = base;
        let mut frame = Frame::new(resources);
        self.run(&content.operations, &mut frame, 0);

        Ok(self.out)
    }

    fn run(&mut self, operations: &[Operation], frame: &mut Frame<'a>, depth: usize) {
        for op in operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                // graphics state
                "q" => self.stack.push(self.state.clone()),
                "Q" => {
                    if let Some(saved) = self.stack.pop() {
                        self.state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_operands(operands) {
                        self.state.ctm = m.then(&self.state.ctm);
                    }
                }

                // fill color
                "g" => {
                    self.state.fill_space = ColorSpace::Gray;
                    self.state.fill = ColorSpace::Gray.color(&numbers(operands));
                }
                "rg" => {
                    self.state.fill_space = ColorSpace::Rgb;
                    self.state.fill = ColorSpace::Rgb.color(&numbers(operands));
                }
                "k" => {
                    self.state.fill_space = ColorSpace::Cmyk;
                    self.state.fill = ColorSpace::Cmyk.color(&numbers(operands));
                }
                "cs" => {
                    let space = operands
                        .first()
                        .and_then(|o| o.as_name().ok())
                        .map(|name| self.color_space(frame, name))
                        .unwrap_or(ColorSpace::Unsupported);
                    self.state.fill_space = space;
                    self.state.fill = space.initial_color();
                }
                "sc" | "scn" => {
                    self.state.fill = if matches!(operands.last(), Some(Object::Name(_))) {
                        None
                    } else {
                        self.state.fill_space.color(&numbers(operands))
                    };
                }

                // path construction
                "m" => {
                    if let [x, y] = numbers(operands)[..] {
                        self.path.point(&self.state.ctm, x, y);
                    }
                }
                "l" => {
                    if let [x, y] = numbers(operands)[..] {
                        self.path.point(&self.state.ctm, x, y);
                        self.path.items += 1;
                    }
                }
                "c" | "v" | "y" => {
                    let values = numbers(operands);
                    if values.len() >= 4 && values.len() % 2 == 0 {
                        for pair in values.chunks(2) {
                            self.path.point(&self.state.ctm, pair[0], pair[1]);
                        }
                        self.path.items += 1;
                    }
                }
                "re" => {
                    if let [x, y, w, h] = numbers(operands)[..] {
                        for (px, py) in [(x, y), (x + w, y), (x, y + h), (x + w, y + h)] {
                            self.path.point(&self.state.ctm, px, py);
                        }
                        self.path.items += 1;
                    }
                }
                "h" | "W" | "W*" => {}

                // path painting
                "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                    let fill = self.state.fill.clone();
                    self.paint(fill);
                }
                "S" | "s" => self.paint(None),
                "n" => self.path = PathBuilder::new(),

                // text objects and state
                "BT" => {
                    self.text_matrix = Matrix::IDENTITY;
                    self.line_matrix = Matrix::IDENTITY;
                }
                "ET" => {}
                "Tf" => {
                    if let [name, size] = &operands[..] {
                        if let Ok(name) = name.as_name() {
                            self.state.text.font = self.font(frame, name);
                        }
                        if let Some(size) = number(size) {
                            self.state.text.size = size;
                        }
                    }
                }
                "Tc" => set_number(operands, &mut self.state.text.char_spacing),
                "Tw" => set_number(operands, &mut self.state.text.word_spacing),
                "TL" => set_number(operands, &mut self.state.text.leading),
                "Ts" => set_number(operands, &mut self.state.text.rise),
                "Tz" => {
                    if let Some(scale) = operands.first().and_then(number) {
                        self.state.text.horizontal_scale = scale / 100.0;
                    }
                }
                "Td" => {
                    if let [tx, ty] = numbers(operands)[..] {
                        self.move_line(tx, ty);
                    }
                }
                "TD" => {
                    if let [tx, ty] = numbers(operands)[..] {
                        self.state.text.leading = -ty;
                        self.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = matrix_operands(operands) {
                        self.text_matrix = m;
                        self.line_matrix = m;
                    }
                }
                "T*" => self.next_line(),

                // text showing
                "Tj" => {
                    if let Some(s) = operands.first() {
                        self.show(std::slice::from_ref(s));
                    }
                }
                "TJ" => {
                    if let Some(Ok(parts)) = operands.first().map(|o| o.as_array()) {
                        self.show(parts);
                    }
                }
                "'" => {
                    self.next_line();
                    if let Some(s) = operands.first() {
                        self.show(std::slice::from_ref(s));
                    }
                }
                "\"" => {
                    if let [aw, ac, s] = &operands[..] {
                        if let (Some(aw), Some(ac)) = (number(aw), number(ac)) {
                            self.state.text.word_spacing = aw;
                            self.state.text.char_spacing = ac;
                        }
                        self.next_line();
                        self.show(std::slice::from_ref(s));
                    }
                }

                // external objects
                "Do" => {
                    if let Some(Ok(name)) = operands.first().map(|o| o.as_name()) {
                        self.do_xobject(frame, name, depth);
                    }
                }
                _ => {}
            }
        }
    }

    fn paint(&mut self, fill: Option<Vec<f64>>) {
        let path = std::mem::replace(&mut self.path, PathBuilder::new());
        if path.bounds.is_empty() {
            return;
        }
        self.out.drawings.push(Drawing {
            fill,
            items: path.items,
            rect: path.bounds,
        });
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    /// Show one or more strings (with TJ adjustments) as a single run
    fn show(&mut self, parts: &[Object]) {
        let text_state = self.state.text.clone();
        let font = text_state.font.as_deref();
        let size = text_state.size;
        let scale = text_state.horizontal_scale;

        let start = self.text_matrix.then(&self.state.ctm);
        let mut text = String::new();
        let mut advance = 0.0;

        for part in parts {
            match part {
                Object::String(bytes, _) => {
                    let (decoded, codes) = match font {
                        Some(font) => (font.decode(self.doc, bytes), font.codes(bytes)),
                        None => (fallback_decode(bytes), bytes.iter().map(|&b| u32::from(b)).collect()),
                    };
                    let single_byte = font.map_or(true, |f| f.code_bytes == 1);
                    for code in codes {
                        let w0 = font.map_or(500.0, |f| f.width(code)) / 1000.0;
                        let mut tx = w0 * size + text_state.char_spacing;
                        if single_byte && code == 32 {
                            tx += text_state.word_spacing;
                        }
                        advance += tx * scale;
                    }
                    text.push_str(&decoded);
                }
                other => {
                    if let Some(adjust) = number(other) {
                        if adjust < -TJ_SPACE_THRESHOLD && !text.is_empty() && !text.ends_with(' ') {
                            text.push(' ');
                        }
                        advance -= adjust / 1000.0 * size * scale;
                    }
                }
            }
        }

        self.text_matrix = Matrix::translate(advance, 0.0).then(&self.text_matrix);

        if text.trim().is_empty() {
            return;
        }

        let (x0, baseline) = start.apply(0.0, text_state.rise);
        let (x1, _) = Matrix::translate(advance, 0.0)
            .then(&start)
            .apply(0.0, text_state.rise);
        let rendered_size = size * start.vertical_scale();
        let fill_space = self.state.fill_space;
        let color = self
            .state
            .fill
            .as_deref()
            .and_then(|channels| match fill_space {
                ColorSpace::Cmyk => Rgb::from_cmyk(channels).ok(),
                _ => Rgb::from_normalized(channels).ok(),
            })
            .map(|rgb| rgb.packed());

        self.out.runs.push(TextRun {
            text,
            font: font.map(|f| f.name.clone()).unwrap_or_default(),
            size: rendered_size,
            color,
            x: x0.min(x1),
            baseline,
            width: (x1 - x0).abs(),
            ascent: font.map_or(0.8, |f| f.ascent) * rendered_size,
            descent: font.map_or(-0.2, |f| f.descent) * rendered_size,
        });
    }

    fn font(&self, frame: &mut Frame<'a>, name: &[u8]) -> Option<Rc<FontInfo<'a>>> {
        if let Some(cached) = frame.fonts.get(name) {
            return cached.clone();
        }
        let doc = self.doc;
        let font = frame
            .resources
            .and_then(|res| get_dict(doc, res, b"Font"))
            .and_then(|fonts| get_dict(doc, fonts, name))
            .map(|dict| Rc::new(FontInfo::load(doc, dict, &String::from_utf8_lossy(name))));
        if font.is_none() {
            log::debug!("font resource /{} not found", String::from_utf8_lossy(name));
        }
        frame.fonts.insert(name.to_vec(), font.clone());
        font
    }

    fn color_space(&self, frame: &Frame<'a>, name: &[u8]) -> ColorSpace {
        match name {
            b"DeviceGray" | b"CalGray" | b"G" => return ColorSpace::Gray,
            b"DeviceRGB" | b"CalRGB" | b"RGB" => return ColorSpace::Rgb,
            b"DeviceCMYK" | b"CMYK" => return ColorSpace::Cmyk,
            b"Pattern" => return ColorSpace::Pattern,
            _ => {}
        }
        let doc = self.doc;
        let Some(entry) = frame
            .resources
            .and_then(|res| get_dict(doc, res, b"ColorSpace"))
            .and_then(|spaces| spaces.get(name).ok())
        else {
            return ColorSpace::Unsupported;
        };
        match resolve(doc, entry) {
            Object::Name(n) => match n.as_slice() {
                b"DeviceGray" => ColorSpace::Gray,
                b"DeviceRGB" => ColorSpace::Rgb,
                b"DeviceCMYK" => ColorSpace::Cmyk,
                b"Pattern" => ColorSpace::Pattern,
                _ => ColorSpace::Unsupported,
            },
            Object::Array(arr) => color_space_family(doc, arr),
            _ => ColorSpace::Unsupported,
        }
    }

    fn do_xobject(&mut self, frame: &Frame<'a>, name: &[u8], depth: usize) {
        let doc = self.doc;
        let Some(entry) = frame
            .resources
            .and_then(|res| get_dict(doc, res, b"XObject"))
            .and_then(|xobjects| xobjects.get(name).ok())
        else {
            log::debug!("XObject /{} not found", String::from_utf8_lossy(name));
            return;
        };
        let Ok(id) = entry.as_reference() else {
            log::debug!("XObject /{} is not an indirect object", String::from_utf8_lossy(name));
            return;
        };

        let stream = doc.get_object(id).ok().and_then(|o| o.as_stream().ok());
        match stream.map(|s| (s, get_name(doc, &s.dict, b"Subtype"))) {
            Some((stream, Some(b"Form"))) => self.run_form(stream, depth),
            Some((_, Some(b"Image"))) | None => {
                // unreadable targets are still recorded so extraction can
                // report them as skipped images
                self.place_image(id, name);
            }
            Some(_) => {}
        }
    }

    fn place_image(&mut self, id: ObjectId, name: &[u8]) {
        let rect = self.state.ctm.unit_square_bounds();
        match self.out.images.iter_mut().find(|img| img.id == id) {
            Some(image) => image.placements.push(rect),
            None => self.out.images.push(PageImage {
                id,
                name: String::from_utf8_lossy(name).to_string(),
                placements: vec![rect],
            }),
        }
    }

    fn run_form(&mut self, stream: &'a Stream, depth: usize) {
        if depth >= MAX_FORM_DEPTH {
            log::warn!("form XObject nesting deeper than {} levels, skipping", MAX_FORM_DEPTH);
            return;
        }
        let content = match Content::decode(&stream_bytes(stream)) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("form XObject content unreadable: {}", e);
                return;
            }
        };

        let doc = self.doc;
        let form_matrix = get_array(doc, &stream.dict, b"Matrix")
            .and_then(|arr| matrix_operands(arr))
            .unwrap_or(Matrix::IDENTITY);

        // the form gets its own q/Q stack; unbalanced Q cannot reach ours
        let outer_stack = std::mem::take(&mut self.stack);
        let saved_state = self.state.clone();
        let saved_text = (self.text_matrix, self.line_matrix);
        self.state.ctm = form_matrix.then(&self.state.ctm);

        let mut form_frame = Frame::new(get_dict(doc, &stream.dict, b"Resources"));
        self.run(&content.operations, &mut form_frame, depth + 1);

        (self.text_matrix, self.line_matrix) = saved_text;
        self.state = saved_state;
        self.stack = outer_stack;
    }
}

/// Family of an array color space such as `[/ICCBased 5 0 R]`
fn color_space_family(doc: &Document, arr: &[Object]) -> ColorSpace {
    let family = arr.first().and_then(|o| o.as_name().ok());
    match family {
        Some(b"CalGray") => ColorSpace::Gray,
        Some(b"CalRGB") => ColorSpace::Rgb,
        Some(b"Pattern") => ColorSpace::Pattern,
        Some(b"ICCBased") => {
            let components = arr
                .get(1)
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_stream().ok())
                .and_then(|s| s.dict.get(b"N").ok())
                .and_then(number);
            match components.map(|n| n as u32) {
                Some(1) => ColorSpace::Gray,
                Some(3) => ColorSpace::Rgb,
                Some(4) => ColorSpace::Cmyk,
                _ => ColorSpace::Unsupported,
            }
        }
        _ => ColorSpace::Unsupported,
    }
}

fn numbers(operands: &[Object]) -> Vec<f64> {
    operands.iter().filter_map(number).collect()
}

fn set_number(operands: &[Object], slot: &mut f64) {
    if let Some(value) = operands.first().and_then(number) {
        *slot = value;
    }
}

fn matrix_operands(operands: &[Object]) -> Option<Matrix> {
    match numbers(operands)[..] {
        [a, b, c, d, e, f] if operands.len() == 6 => Some(Matrix([a, b, c, d, e, f])),
        _ => None,
    }
}
