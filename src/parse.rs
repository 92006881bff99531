use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use lopdf::content::Operation;
use lopdf::{Document, Encoding, Object, ObjectId, Result as LopdfResult};
use serde::Serialize;
use tracing::trace;

use crate::error::{Error, Result};
use crate::fonts::FontInfo;
use crate::geo::Rect;
use crate::logging::PDF_PARSE;
use crate::scan::DocumentSource;

/// One text-showing run from a page content stream, in stream order.
///
/// Typical producers emit one run per word or per line fragment, which is
/// exactly the granularity code matching works at. The box is in PDF user
/// space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub text: String,
    pub bbox: Rect,
    pub page_number: u32,
    /// 0-based position among the page's tokens, in content-stream order.
    pub order: u32,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" p{} #{} ({:.2}, {:.2}, {:.2}, {:.2})",
            self.text,
            self.page_number,
            self.order,
            self.bbox.x0,
            self.bbox.y0,
            self.bbox.x1,
            self.bbox.y1
        )
    }
}

/// A page's tokens plus their concatenation into plain text.
///
/// Token texts are joined with a single space unless the boundary already
/// has whitespace on either side; each token's byte range in the joined
/// string is kept so raw-text hits can be mapped back onto tokens.
#[derive(Debug, Clone)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
    pub tokens: Vec<Token>,
    spans: Vec<(usize, usize)>,
}

impl PageText {
    pub fn from_tokens(page_number: u32, tokens: Vec<Token>) -> Self {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(tokens.len());
        for (index, token) in tokens.iter().enumerate() {
            if index > 0
                && !text.ends_with(char::is_whitespace)
                && !token.text.starts_with(char::is_whitespace)
            {
                text.push(' ');
            }
            let start = text.len();
            text.push_str(&token.text);
            spans.push((start, text.len()));
        }
        PageText {
            page_number,
            text,
            tokens,
            spans,
        }
    }

    /// Indices of the tokens whose byte span overlaps `[begin, end)` of
    /// the joined text, in order.
    pub fn tokens_in_range(&self, begin: usize, end: usize) -> Vec<usize> {
        self.spans
            .iter()
            .enumerate()
            .filter(|(_, (start, stop))| *start < end && *stop > begin)
            .map(|(index, _)| index)
            .collect()
    }
}

/// Open a PDF from disk. Encrypted documents are rejected.
pub fn load_pdf<P: AsRef<Path>>(path: P) -> Result<Document> {
    let doc = Document::load(path).map_err(|err| Error::InvalidInput(err.to_string()))?;
    reject_encrypted(&doc)?;
    Ok(doc)
}

/// Open a PDF from a byte buffer. Encrypted documents are rejected.
pub fn load_pdf_bytes(bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes).map_err(|err| Error::InvalidInput(err.to_string()))?;
    reject_encrypted(&doc)?;
    Ok(doc)
}

fn reject_encrypted(doc: &Document) -> Result<()> {
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(Error::InvalidInput(
            "document is encrypted and cannot be scanned".to_string(),
        ));
    }
    Ok(())
}

/// Read-only token source over an open document.
pub struct PdfSource<'a> {
    doc: &'a Document,
    pages: Vec<(u32, ObjectId)>,
}

impl<'a> PdfSource<'a> {
    pub fn new(doc: &'a Document) -> Self {
        let pages = doc.get_pages().into_iter().collect();
        PdfSource { doc, pages }
    }
}

impl DocumentSource for PdfSource<'_> {
    fn page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(|(number, _)| *number).collect()
    }

    fn page(&self, page_number: u32) -> Result<PageText> {
        let (_, page_id) = self
            .pages
            .iter()
            .find(|(number, _)| *number == page_number)
            .ok_or_else(|| Error::Extraction {
                page: page_number,
                reason: "page is not in the page tree".to_string(),
            })?;
        let tokens =
            extract_page_tokens(self.doc, page_number, *page_id).map_err(|err| Error::Extraction {
                page: page_number,
                reason: err.to_string(),
            })?;
        Ok(PageText::from_tokens(page_number, tokens))
    }
}

struct PageFont<'a> {
    info: FontInfo,
    encoding: Encoding<'a>,
}

#[derive(Clone)]
struct GraphicsState<'a> {
    ctm: [f32; 6],
    text_state: TextState<'a>,
}

impl Default for GraphicsState<'_> {
    fn default() -> Self {
        GraphicsState {
            ctm: IDENTITY,
            text_state: TextState::default(),
        }
    }
}

#[derive(Clone)]
struct TextState<'a> {
    text_matrix: [f32; 6],      // Tm
    text_line_matrix: [f32; 6], // Tlm
    font: Option<&'a PageFont<'a>>,
    font_size: f32,
    character_spacing: f32,  // Tc
    word_spacing: f32,       // Tw
    horizontal_scaling: f32, // Tz, stored as a fraction (1.0 = 100%)
    leading: f32,            // TL
    rise: f32,               // Ts
}

impl Default for TextState<'_> {
    fn default() -> Self {
        TextState {
            text_matrix: IDENTITY,
            text_line_matrix: IDENTITY,
            font: None,
            font_size: 0.0,
            character_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

impl TextState<'_> {
    fn reset_matrices(&mut self) {
        self.text_matrix = IDENTITY;
        self.text_line_matrix = self.text_matrix;
    }

    /// `T*` and the line-advancing show operators.
    fn next_line(&mut self) {
        self.text_matrix =
            multiply_matrices(&translate_matrix(0.0, -self.leading), &self.text_line_matrix);
        self.text_line_matrix = self.text_matrix;
    }
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn extract_page_tokens(
    doc: &Document,
    page_number: u32,
    page_id: ObjectId,
) -> LopdfResult<Vec<Token>> {
    let content = doc.get_and_decode_page_content(page_id)?;
    let fonts = page_fonts(doc, page_id)?;

    let mut tokens = Vec::new();
    let mut order = 0u32;
    let mut gs_stack = vec![GraphicsState::default()];

    for op in &content.operations {
        handle_operator(&mut gs_stack, op, &fonts, page_number, &mut order, &mut tokens)?;
    }

    trace!(
        target: PDF_PARSE,
        page = page_number,
        tokens = tokens.len(),
        "extracted page tokens"
    );
    Ok(tokens)
}

fn page_fonts(doc: &Document, page_id: ObjectId) -> LopdfResult<BTreeMap<Vec<u8>, PageFont<'_>>> {
    let fonts = doc.get_page_fonts(page_id)?;
    fonts
        .iter()
        .map(|(name, font)| {
            let encoding = font.get_font_encoding(doc)?;
            Ok((
                name.clone(),
                PageFont {
                    info: FontInfo::from_dict(doc, font),
                    encoding,
                },
            ))
        })
        .collect()
}

fn handle_operator<'a>(
    gs_stack: &mut Vec<GraphicsState<'a>>,
    op: &Operation,
    fonts: &'a BTreeMap<Vec<u8>, PageFont<'a>>,
    page_number: u32,
    order: &mut u32,
    tokens: &mut Vec<Token>,
) -> LopdfResult<()> {
    match op.operator.as_ref() {
        "q" => push_graphics_state(gs_stack),
        "Q" => pop_graphics_state(gs_stack),
        operator => {
            let Some(gs) = gs_stack.last_mut() else {
                return Ok(());
            };
            match operator {
                "cm" => gs.ctm = multiply_matrices(&matrix_from_operands(op), &gs.ctm),
                "BT" => gs.text_state.reset_matrices(),
                "ET" => gs.text_state = TextState::default(),
                "Tf" => {
                    if let (Some(Object::Name(font_name)), Some(size)) =
                        (op.operands.first(), op.operands.get(1))
                    {
                        gs.text_state.font = fonts.get(font_name);
                        gs.text_state.font_size = operand_as_float(size);
                        if gs.text_state.font.is_none() {
                            trace!(
                                target: PDF_PARSE,
                                page = page_number,
                                font = %String::from_utf8_lossy(font_name),
                                "font is not in page resources"
                            );
                        }
                    }
                }
                "Tc" => {
                    if let Some(spacing) = op.operands.first() {
                        gs.text_state.character_spacing = operand_as_float(spacing);
                    }
                }
                "Tw" => {
                    if let Some(spacing) = op.operands.first() {
                        gs.text_state.word_spacing = operand_as_float(spacing);
                    }
                }
                "Tz" => {
                    if let Some(scale_percent) = op.operands.first() {
                        gs.text_state.horizontal_scaling = operand_as_float(scale_percent) / 100.0;
                    }
                }
                "TL" => {
                    if let Some(leading) = op.operands.first() {
                        gs.text_state.leading = operand_as_float(leading);
                    }
                }
                "Ts" => {
                    if let Some(rise) = op.operands.first() {
                        gs.text_state.rise = operand_as_float(rise);
                    }
                }
                "Tm" => {
                    let m = matrix_from_operands(op);
                    gs.text_state.text_matrix = m;
                    gs.text_state.text_line_matrix = m;
                }
                "Td" => {
                    if let (Some(tx), Some(ty)) = (op.operands.first(), op.operands.get(1)) {
                        let translate =
                            translate_matrix(operand_as_float(tx), operand_as_float(ty));
                        gs.text_state.text_matrix =
                            multiply_matrices(&translate, &gs.text_state.text_line_matrix);
                        gs.text_state.text_line_matrix = gs.text_state.text_matrix;
                    }
                }
                "TD" => {
                    if let (Some(tx), Some(ty)) = (op.operands.first(), op.operands.get(1)) {
                        let ty = operand_as_float(ty);
                        gs.text_state.leading = -ty;
                        let translate = translate_matrix(operand_as_float(tx), ty);
                        gs.text_state.text_matrix =
                            multiply_matrices(&translate, &gs.text_state.text_line_matrix);
                        gs.text_state.text_line_matrix = gs.text_state.text_matrix;
                    }
                }
                "T*" => gs.text_state.next_line(),
                "Tj" | "TJ" => show_text_run(gs, &op.operands, page_number, order, tokens)?,
                "'" => {
                    gs.text_state.next_line();
                    show_text_run(gs, &op.operands, page_number, order, tokens)?;
                }
                "\"" => {
                    if let (Some(word), Some(character)) =
                        (op.operands.first(), op.operands.get(1))
                    {
                        gs.text_state.word_spacing = operand_as_float(word);
                        gs.text_state.character_spacing = operand_as_float(character);
                    }
                    gs.text_state.next_line();
                    if op.operands.len() > 2 {
                        show_text_run(gs, &op.operands[2..], page_number, order, tokens)?;
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Emit one token for a show operator and advance the text matrix by the
/// run's total displacement.
fn show_text_run(
    gs: &mut GraphicsState<'_>,
    operands: &[Object],
    page_number: u32,
    order: &mut u32,
    tokens: &mut Vec<Token>,
) -> LopdfResult<()> {
    let Some(font) = gs.text_state.font else {
        return Ok(());
    };

    let mut text = String::new();
    let mut advance = 0.0f32;
    accumulate_show(font, &gs.text_state, operands, &mut text, &mut advance)?;

    if !text.is_empty() {
        let size = gs.text_state.font_size;
        let y_low = gs.text_state.rise + font.info.descent / 1000.0 * size;
        let y_high = gs.text_state.rise + font.info.ascent / 1000.0 * size;
        let corners = [
            (0.0, y_low),
            (advance, y_low),
            (0.0, y_high),
            (advance, y_high),
        ]
        .map(|(x, y)| {
            let (tx, ty) = apply_matrix(&gs.text_state.text_matrix, x, y);
            apply_matrix(&gs.ctm, tx, ty)
        });
        if let Some(bbox) = Rect::from_points(corners) {
            tokens.push(Token {
                text,
                bbox,
                page_number,
                order: *order,
            });
            *order += 1;
        }
    }

    gs.text_state.text_matrix =
        multiply_matrices(&translate_matrix(advance, 0.0), &gs.text_state.text_matrix);
    Ok(())
}

/// Accumulate the decoded text and total x displacement of one show
/// operator. `TJ` kern numbers shift the position without adding text.
fn accumulate_show(
    font: &PageFont<'_>,
    state: &TextState<'_>,
    operands: &[Object],
    text: &mut String,
    advance: &mut f32,
) -> LopdfResult<()> {
    for operand in operands {
        match operand {
            Object::String(bytes, _) => {
                let decoded = Document::decode_text(&font.encoding, bytes)?;
                for &code in bytes.iter() {
                    let mut glyph = font.info.glyph_width(code) / 1000.0 * state.font_size
                        + state.character_spacing;
                    if code == b' ' {
                        glyph += state.word_spacing;
                    }
                    *advance += glyph * state.horizontal_scaling;
                }
                text.push_str(&decoded);
            }
            Object::Integer(offset) => {
                *advance -=
                    *offset as f32 / 1000.0 * state.font_size * state.horizontal_scaling;
            }
            Object::Real(offset) => {
                *advance -= *offset / 1000.0 * state.font_size * state.horizontal_scaling;
            }
            Object::Array(items) => accumulate_show(font, state, items, text, advance)?,
            _ => {}
        }
    }
    Ok(())
}

fn push_graphics_state(gs_stack: &mut Vec<GraphicsState>) {
    if let Some(current) = gs_stack.last() {
        gs_stack.push(current.clone());
    }
}

fn pop_graphics_state(gs_stack: &mut Vec<GraphicsState>) {
    if gs_stack.len() > 1 {
        gs_stack.pop();
    }
}

fn matrix_from_operands(op: &Operation) -> [f32; 6] {
    op.operands
        .iter()
        .map(operand_as_float)
        .collect::<Vec<f32>>()
        .try_into()
        .unwrap_or(IDENTITY)
}

fn operand_as_float(object: &Object) -> f32 {
    match object {
        Object::Integer(value) => *value as f32,
        Object::Real(value) => *value,
        _ => 0.0,
    }
}

fn apply_matrix(m: &[f32; 6], x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

pub fn multiply_matrices(a: &[f32; 6], b: &[f32; 6]) -> [f32; 6] {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

pub fn translate_matrix(x: f32, y: f32) -> [f32; 6] {
    [1.0, 0.0, 0.0, 1.0, x, y]
}
