//! Content stream interpretation: positions every shown character and every
//! painted image on the page, in top-left-origin page points.

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Object};
use tracing::trace;

use crate::core::geometry::BBox;
use crate::core::model::{Char, Color};
use crate::error::ExtractError;
use crate::parser::fonts::FontInfo;
use crate::parser::pdf_reader::{number, resolve, stream_bytes, PageFrame};

/// Nested form XObjects beyond this depth are ignored.
const MAX_FORM_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self` applied after `other`, in column-vector form.
    pub fn multiply(self, other: Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply_to_point(self, x: f64, y: f64) -> (f64, f64) {
        (x * self.a + y * self.c + self.e, x * self.b + y * self.d + self.f)
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        let values: Vec<f64> = operands.iter().map(number).collect::<Option<_>>()?;
        match values[..] {
            [a, b, c, d, e, f] => Some(Matrix::new(a, b, c, d, e, f)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: Option<Color>,
    stroke: Option<Color>,
    font: Option<String>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horiz_scaling: f64,
    leading: f64,
    rise: f64,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            fill: None,
            stroke: None,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horiz_scaling: 100.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

pub struct ContentInterpreter<'a> {
    doc: &'a lopdf::Document,
    frame: PageFrame,
    page: usize,
    fonts: HashMap<(usize, Vec<u8>), FontInfo>,
    chars: Vec<Char>,
    images: Vec<BBox>,
}

impl<'a> ContentInterpreter<'a> {
    pub fn new(doc: &'a lopdf::Document, frame: PageFrame, page: usize) -> Self {
        Self {
            doc,
            frame,
            page,
            fonts: HashMap::new(),
            chars: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Interprets a page content stream with the given resources.
    pub fn run(&mut self, resources: Option<&'a Dictionary>, bytes: &[u8]) -> Result<(), ExtractError> {
        let state = GraphicsState::new(Matrix::identity());
        self.interpret(resources, bytes, state, 0)
    }

    pub fn finish(self) -> (Vec<Char>, Vec<BBox>) {
        (self.chars, self.images)
    }

    fn interpret(
        &mut self,
        resources: Option<&'a Dictionary>,
        bytes: &[u8],
        mut state: GraphicsState,
        depth: usize,
    ) -> Result<(), ExtractError> {
        let content = Content::decode(bytes).map_err(|e| ExtractError::Content {
            page: self.page,
            reason: e.to_string(),
        })?;

        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut text_matrix = Matrix::identity();
        let mut line_matrix = Matrix::identity();
        let mut fill_space: Option<Vec<u8>> = None;
        let mut stroke_space: Option<Vec<u8>> = None;

        for op in &content.operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => stack.push(state.clone()),
                "Q" => {
                    if let Some(prev) = stack.pop() {
                        state = prev;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        state.ctm = state.ctm.multiply(m);
                    }
                }
                "g" => state.fill = gray(operands),
                "G" => state.stroke = gray(operands),
                "rg" | "k" => state.fill = Some(Color::from_components(&components(operands))),
                "RG" | "K" => state.stroke = Some(Color::from_components(&components(operands))),
                "cs" => fill_space = operands.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec),
                "CS" => stroke_space = operands.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec),
                "sc" | "scn" => state.fill = Some(space_color(fill_space.as_deref(), operands)),
                "SC" | "SCN" => state.stroke = Some(space_color(stroke_space.as_deref(), operands)),
                "BT" => {
                    text_matrix = Matrix::identity();
                    line_matrix = Matrix::identity();
                }
                "Tf" => {
                    if let [name, size, ..] = operands {
                        state.font = name.as_name().ok().map(|n| String::from_utf8_lossy(n).into_owned());
                        state.font_size = number(size).unwrap_or(0.0);
                    }
                }
                "Tc" => state.char_spacing = first_number(operands).unwrap_or(state.char_spacing),
                "Tw" => state.word_spacing = first_number(operands).unwrap_or(state.word_spacing),
                "Tz" => state.horiz_scaling = first_number(operands).unwrap_or(state.horiz_scaling),
                "TL" => state.leading = first_number(operands).unwrap_or(state.leading),
                "Ts" => state.rise = first_number(operands).unwrap_or(state.rise),
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        text_matrix = m;
                        line_matrix = m;
                    }
                }
                "Td" | "TD" => {
                    if let [tx, ty] = operands {
                        let (tx, ty) = (number(tx).unwrap_or(0.0), number(ty).unwrap_or(0.0));
                        if op.operator == "TD" {
                            state.leading = -ty;
                        }
                        line_matrix = line_matrix.multiply(Matrix::translate(tx, ty));
                        text_matrix = line_matrix;
                    }
                }
                "T*" => {
                    line_matrix = line_matrix.multiply(Matrix::translate(0.0, -state.leading));
                    text_matrix = line_matrix;
                }
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show_text(resources, &state, &mut text_matrix, bytes);
                    }
                }
                "'" | "\"" => {
                    if op.operator == "\"" {
                        if let [aw, ac, ..] = operands {
                            state.word_spacing = number(aw).unwrap_or(state.word_spacing);
                            state.char_spacing = number(ac).unwrap_or(state.char_spacing);
                        }
                    }
                    line_matrix = line_matrix.multiply(Matrix::translate(0.0, -state.leading));
                    text_matrix = line_matrix;
                    if let Some(Object::String(bytes, _)) = operands.last() {
                        self.show_text(resources, &state, &mut text_matrix, bytes);
                    }
                }
                "TJ" => {
                    let Some(Object::Array(items)) = operands.first() else {
                        continue;
                    };
                    for item in items {
                        match item {
                            Object::String(bytes, _) => {
                                self.show_text(resources, &state, &mut text_matrix, bytes);
                            }
                            other => {
                                if let Some(kern) = number(other) {
                                    let adjust = kern / 1000.0 * state.font_size * (state.horiz_scaling / 100.0);
                                    text_matrix = text_matrix.multiply(Matrix::translate(-adjust, 0.0));
                                }
                            }
                        }
                    }
                }
                "Do" => {
                    if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                        self.paint_xobject(resources, name, &state, depth)?;
                    }
                }
                "BI" | "INLINE IMAGE" => self.push_image(&state.ctm),
                _ => {}
            }
        }
        Ok(())
    }

    fn paint_xobject(
        &mut self,
        resources: Option<&'a Dictionary>,
        name: &[u8],
        state: &GraphicsState,
        depth: usize,
    ) -> Result<(), ExtractError> {
        let doc = self.doc;
        let Some(stream) = resources
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|obj| resolve(doc, obj).as_dict().ok())
            .and_then(|xobjects| xobjects.get(name).ok())
            .and_then(|obj| resolve(doc, obj).as_stream().ok())
        else {
            trace!(page = self.page, name = %String::from_utf8_lossy(name), "unresolved XObject");
            return Ok(());
        };

        let subtype = stream.dict.get(b"Subtype").ok().and_then(|o| o.as_name().ok());
        match subtype {
            Some(b"Image") => self.push_image(&state.ctm),
            Some(b"Form") if depth < MAX_FORM_DEPTH => {
                let form_matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|obj| resolve(doc, obj).as_array().ok())
                    .and_then(|arr| Matrix::from_operands(arr))
                    .unwrap_or_else(Matrix::identity);
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|obj| resolve(doc, obj).as_dict().ok())
                    .or(resources);
                let bytes = stream_bytes(stream).map_err(|e| ExtractError::Content {
                    page: self.page,
                    reason: format!("failed to decompress form XObject: {e}"),
                })?;
                let mut inner = state.clone();
                inner.ctm = state.ctm.multiply(form_matrix);
                self.interpret(form_resources, &bytes, inner, depth + 1)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Images occupy the unit square mapped through the CTM.
    fn push_image(&mut self, ctm: &Matrix) {
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        if let Some(bbox) = self.page_bbox(ctm, &corners) {
            self.images.push(bbox);
        }
    }

    fn page_bbox(&self, m: &Matrix, points: &[(f64, f64)]) -> Option<BBox> {
        let converted: Vec<(f64, f64)> = points
            .iter()
            .map(|(x, y)| {
                let (ux, uy) = m.apply_to_point(*x, *y);
                self.frame.to_top_left(ux, uy)
            })
            .collect();
        BBox::from_points(&converted)
    }

    fn font(&mut self, resources: Option<&'a Dictionary>, name: &str) -> Option<FontInfo> {
        let key = (resources.map_or(0, |r| r as *const Dictionary as usize), name.as_bytes().to_vec());
        if let Some(font) = self.fonts.get(&key) {
            return Some(font.clone());
        }
        let doc = self.doc;
        let dict = resources
            .and_then(|res| res.get(b"Font").ok())
            .and_then(|obj| resolve(doc, obj).as_dict().ok())
            .and_then(|fonts| fonts.get(name.as_bytes()).ok())
            .and_then(|obj| resolve(doc, obj).as_dict().ok())?;
        let font = FontInfo::load(doc, dict);
        self.fonts.insert(key, font.clone());
        Some(font)
    }

    fn show_text(
        &mut self,
        resources: Option<&'a Dictionary>,
        state: &GraphicsState,
        text_matrix: &mut Matrix,
        bytes: &[u8],
    ) {
        let font = state
            .font
            .as_deref()
            .and_then(|name| self.font(resources, name))
            .unwrap_or_default();
        let size = state.font_size;
        let hscale = state.horiz_scaling / 100.0;
        let descent = font.descent / 1000.0;

        for glyph in font.decode(bytes) {
            let w = glyph.width / 1000.0;
            let trm = state
                .ctm
                .multiply(text_matrix.multiply(Matrix::new(size * hscale, 0.0, 0.0, size, 0.0, state.rise)));
            let corners = [(0.0, descent), (w, descent), (w, descent + 1.0), (0.0, descent + 1.0)];
            if let Some(bbox) = self.page_bbox(&trm, &corners) {
                self.chars.push(Char {
                    text: glyph.text,
                    size: bbox.height(),
                    bbox,
                    fontname: font.name.clone(),
                    fill: state.fill,
                    stroke: state.stroke,
                });
            }

            let word_space = if !font.two_byte && glyph.code == 32 {
                state.word_spacing
            } else {
                0.0
            };
            let advance = (w * size + state.char_spacing + word_space) * hscale;
            *text_matrix = text_matrix.multiply(Matrix::translate(advance, 0.0));
        }
    }
}

fn first_number(operands: &[Object]) -> Option<f64> {
    operands.first().and_then(number)
}

fn components(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(number).map(|v| v as f32).collect()
}

fn gray(operands: &[Object]) -> Option<Color> {
    first_number(operands).map(|v| Color::Gray(v as f32))
}

/// `sc`/`scn` operands read in the current color space. Named patterns
/// carry no device color.
fn space_color(space: Option<&[u8]>, operands: &[Object]) -> Color {
    if operands.iter().any(|o| o.as_name().is_ok()) || space == Some(b"Pattern") {
        return Color::Other;
    }
    let values = components(operands);
    match (space, values.as_slice()) {
        (Some(b"DeviceGray" | b"CalGray"), [g]) => Color::Gray(*g),
        (Some(b"DeviceRGB" | b"CalRGB"), [r, g, b]) => Color::Rgb([*r, *g, *b]),
        (Some(b"DeviceCMYK"), [c, m, y, k]) => Color::Cmyk([*c, *m, *y, *k]),
        _ => Color::from_components(&values),
    }
}
