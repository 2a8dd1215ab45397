//! Page line extraction from PDF using lopdf
//!
//! Decodes each page's content stream into positioned text runs and groups
//! them into visual rows, top to bottom. The result is one ordered list of
//! lines per page, which is all the segmenters need.

use crate::PedimentoError;
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use rayon::prelude::*;
use std::path::Path;

/// Options for page extraction
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Maximum number of pages to read from the start of the document
    pub max_pages: usize,
    /// Vertical distance under which two text runs share a line
    pub y_tolerance: f32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_pages: 10,
            y_tolerance: 3.0,
        }
    }
}

/// A text run with position information
#[derive(Debug, Clone)]
pub struct TextItem {
    /// The text content
    pub text: String,
    /// X position on page
    pub x: f32,
    /// Y position on page (PDF coordinates, origin at bottom-left)
    pub y: f32,
    /// Page number (1-indexed)
    pub page: u32,
}

/// A line of text (grouped text items)
#[derive(Debug, Clone)]
pub struct TextLine {
    pub items: Vec<TextItem>,
    pub y: f32,
    pub page: u32,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.items
            .iter()
            .map(|i| i.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Extract the lines of each page from a PDF file
pub fn extract_page_lines<P: AsRef<Path>>(
    path: P,
    options: &ExtractOptions,
) -> Result<Vec<Vec<String>>, PedimentoError> {
    let doc = Document::load(path)?;
    page_lines_from_doc(&doc, options)
}

/// Extract the lines of each page from a PDF memory buffer
pub fn extract_page_lines_mem(
    buffer: &[u8],
    options: &ExtractOptions,
) -> Result<Vec<Vec<String>>, PedimentoError> {
    let doc = Document::load_mem(buffer)?;
    page_lines_from_doc(&doc, options)
}

/// Extract page lines from a loaded document.
///
/// A page that fails to decode, or carries no text, contributes an empty line
/// list so page numbering stays aligned with the document. Content streams
/// are parsed in parallel; results are collected in page order.
fn page_lines_from_doc(
    doc: &Document,
    options: &ExtractOptions,
) -> Result<Vec<Vec<String>>, PedimentoError> {
    let pages: Vec<(u32, ObjectId)> = doc
        .get_pages()
        .into_iter()
        .take(options.max_pages)
        .collect();

    let raw: Vec<Result<Vec<u8>, PedimentoError>> = pages
        .iter()
        .map(|&(_, page_id)| {
            doc.get_page_content(page_id)
                .map_err(|e| PedimentoError::Parse(e.to_string()))
        })
        .collect();

    let decoded: Vec<Result<Content, PedimentoError>> = raw
        .into_par_iter()
        .map(|data| {
            let data = data?;
            Content::decode(&data).map_err(|e| PedimentoError::Parse(e.to_string()))
        })
        .collect();

    let page_items: Vec<Vec<TextItem>> = pages
        .iter()
        .zip(decoded)
        .map(|(&(page_num, page_id), content)| match content {
            Ok(content) => extract_page_text_items(doc, page_id, page_num, &content),
            Err(e) => {
                log::warn!("Failed to extract text from page {}: {}", page_num, e);
                Vec::new()
            }
        })
        .collect();

    let tolerance = options.y_tolerance;
    let lines: Vec<Vec<String>> = page_items
        .into_par_iter()
        .map(|items| {
            group_into_lines(items, tolerance)
                .iter()
                .map(TextLine::text)
                .filter(|t| !t.is_empty())
                .collect()
        })
        .collect();

    for (i, page) in lines.iter().enumerate() {
        if page.is_empty() {
            log::warn!("No text extracted from page {}", i + 1);
        }
    }

    Ok(lines)
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

/// Walk the decoded content of a single page and collect its text items
fn extract_page_text_items(
    doc: &Document,
    page_id: ObjectId,
    page_num: u32,
    content: &Content,
) -> Vec<TextItem> {
    let mut items = Vec::new();

    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();

    let mut ctm = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut ctm_stack: Vec<[f32; 6]> = Vec::new();

    let mut current_font = String::new();
    let mut current_font_size: f32 = 12.0;
    let mut text_matrix = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut line_matrix = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut in_text_block = false;

    // Records a decoded run at the current text position
    let mut push_item = |text: String, text_matrix: &[f32; 6], ctm: &[f32; 6]| {
        if text.trim().is_empty() {
            return;
        }
        let combined = multiply_matrices(text_matrix, ctm);
        items.push(TextItem {
            text,
            x: combined[4],
            y: combined[5],
            page: page_num,
        });
    };

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => ctm_stack.push(ctm),
            "Q" => {
                if let Some(saved) = ctm_stack.pop() {
                    ctm = saved;
                }
            }
            "cm" => {
                if op.operands.len() >= 6 {
                    let new_matrix = [
                        get_number(&op.operands[0]).unwrap_or(1.0),
                        get_number(&op.operands[1]).unwrap_or(0.0),
                        get_number(&op.operands[2]).unwrap_or(0.0),
                        get_number(&op.operands[3]).unwrap_or(1.0),
                        get_number(&op.operands[4]).unwrap_or(0.0),
                        get_number(&op.operands[5]).unwrap_or(0.0),
                    ];
                    ctm = multiply_matrices(&new_matrix, &ctm);
                }
            }
            "BT" => {
                in_text_block = true;
                text_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
                line_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
            }
            "ET" => in_text_block = false,
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let Ok(name) = op.operands[0].as_name() {
                        current_font = String::from_utf8_lossy(name).to_string();
                    }
                    if let Some(size) = get_number(&op.operands[1]) {
                        current_font_size = size;
                    }
                }
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    line_matrix[4] += get_number(&op.operands[0]).unwrap_or(0.0);
                    line_matrix[5] += get_number(&op.operands[1]).unwrap_or(0.0);
                    text_matrix = line_matrix;
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    for (i, operand) in op.operands.iter().take(6).enumerate() {
                        text_matrix[i] =
                            get_number(operand).unwrap_or(if i == 0 || i == 3 { 1.0 } else { 0.0 });
                    }
                    line_matrix = text_matrix;
                }
            }
            "T*" => {
                // Approximate leading
                line_matrix[5] -= current_font_size * 1.2;
                text_matrix = line_matrix;
            }
            "Tj" => {
                if in_text_block && !op.operands.is_empty() {
                    if let Some(text) =
                        extract_text_from_operand(&op.operands[0], doc, &fonts, &current_font)
                    {
                        push_item(text, &text_matrix, &ctm);
                    }
                }
            }
            "TJ" => {
                if in_text_block && !op.operands.is_empty() {
                    if let Ok(array) = op.operands[0].as_array() {
                        let text: String = array
                            .iter()
                            .filter_map(|item| {
                                extract_text_from_operand(item, doc, &fonts, &current_font)
                            })
                            .collect();
                        push_item(text, &text_matrix, &ctm);
                    }
                }
            }
            "'" => {
                line_matrix[5] -= current_font_size * 1.2;
                text_matrix = line_matrix;
                if !op.operands.is_empty() {
                    if let Some(text) =
                        extract_text_from_operand(&op.operands[0], doc, &fonts, &current_font)
                    {
                        push_item(text, &text_matrix, &ctm);
                    }
                }
            }
            _ => {}
        }
    }

    items
}

/// Helper to get f32 from Object
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Extract text from a text operand, handling encoding
fn extract_text_from_operand(
    obj: &Object,
    doc: &Document,
    fonts: &std::collections::BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    current_font: &str,
) -> Option<String> {
    if let Object::String(bytes, _) = obj {
        if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
            if let Ok(encoding) = font_dict.get_font_encoding(doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return Some(text);
                }
            }
        }

        // Fallback: UTF-16BE with BOM, then Latin-1
        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let utf16: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                .collect();
            return Some(String::from_utf16_lossy(&utf16));
        }

        Some(bytes.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}

/// Group the text items of one page into lines, top to bottom.
///
/// Items whose baselines are within `y_tolerance` of a line's first item join
/// that line; items inside a line are ordered left to right.
pub fn group_into_lines(mut items: Vec<TextItem>, y_tolerance: f32) -> Vec<TextLine> {
    if items.is_empty() {
        return Vec::new();
    }

    // PDF y grows upwards, so higher y comes first
    items.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<TextLine> = Vec::new();
    for item in items {
        match lines.last_mut() {
            Some(line) if line.page == item.page && (line.y - item.y).abs() < y_tolerance => {
                line.items.push(item);
            }
            _ => {
                let (y, page) = (item.y, item.page);
                lines.push(TextLine {
                    items: vec![item],
                    y,
                    page,
                });
            }
        }
    }

    for line in &mut lines {
        line.items
            .sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }

    lines
}
