//! Section and partida segmentation for Mexican customs pedimentos
//!
//! This crate provides:
//! - Page line extraction from text-based PDFs
//! - Line classification (footers, section titles, partida numbers)
//! - Segmentation of the document into named sections and partidas
//! - Markdown rendering of the sections

pub mod classifier;
pub mod extractor;
pub mod markdown;
pub mod partidas;
pub mod sections;

pub use classifier::{classify_line, ClassifyContext, LineClass, Region};
pub use extractor::{extract_page_lines, extract_page_lines_mem, ExtractOptions};
pub use markdown::{to_markdown, FormatOptions, SectionDisplay};
pub use partidas::{extract_partidas, render_partidas, segment_items_region, Partida};
pub use sections::{segment_sections, Section, SectionKind, SectionSegmentation};

use std::path::Path;

/// Sections and partidas of one pedimento
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentedDocument {
    /// Non-empty sections in the order they were opened
    pub sections: Vec<Section>,
    /// Partidas found after the partidas marker
    pub partidas: Vec<Partida>,
}

/// Segment page lines into sections, then split the items region into partidas.
///
/// The items region is everything after the partidas marker line: the rest
/// of the marker's page and all following pages. Without a marker there are
/// no partidas.
pub fn segment_document<S: AsRef<str>>(pages: &[Vec<S>]) -> SegmentedDocument {
    let segmentation = segment_sections(pages);

    let partidas = match segmentation.items_start {
        Some(start) => {
            let mut segmenter = partidas::ItemSegmenter::in_items_region();
            for (page_index, lines) in pages.iter().enumerate().skip(start.page) {
                let from = if page_index == start.page { start.line } else { 0 };
                for line in lines.iter().skip(from) {
                    segmenter.push_line(line.as_ref(), page_index);
                }
            }
            segmenter.finish()
        }
        None => Vec::new(),
    };

    SegmentedDocument {
        sections: segmentation.sections,
        partidas,
    }
}

/// High-level pedimento processing result
#[derive(Debug, Clone)]
pub struct PedimentoResult {
    pub sections: Vec<Section>,
    pub partidas: Vec<Partida>,
    /// Rendered sections
    pub markdown: String,
    /// Number of pages read
    pub page_count: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl PedimentoResult {
    /// Lines of a section, if it was retained
    pub fn section(&self, kind: SectionKind) -> Option<&[String]> {
        self.sections
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.lines.as_slice())
    }
}

/// Segment and render already-extracted page lines
pub fn process_pages<S: AsRef<str>>(pages: &[Vec<S>], options: &FormatOptions) -> PedimentoResult {
    let start = std::time::Instant::now();

    let document = segment_document(pages);
    let markdown = to_markdown(&document.sections, options);

    PedimentoResult {
        sections: document.sections,
        partidas: document.partidas,
        markdown,
        page_count: pages.len(),
        processing_time_ms: start.elapsed().as_millis() as u64,
    }
}

/// Process a pedimento PDF file with default options
pub fn process_pedimento<P: AsRef<Path>>(path: P) -> Result<PedimentoResult, PedimentoError> {
    let start = std::time::Instant::now();
    let pages = extract_page_lines(path, &ExtractOptions::default())?;
    let mut result = process_pages(&pages, &FormatOptions::default());
    result.processing_time_ms = start.elapsed().as_millis() as u64;
    Ok(result)
}

/// Process a pedimento PDF from a memory buffer with default options
pub fn process_pedimento_mem(buffer: &[u8]) -> Result<PedimentoResult, PedimentoError> {
    let start = std::time::Instant::now();
    let pages = extract_page_lines_mem(buffer, &ExtractOptions::default())?;
    let mut result = process_pages(&pages, &FormatOptions::default());
    result.processing_time_ms = start.elapsed().as_millis() as u64;
    Ok(result)
}

/// Write the rendered markdown of a result to `path`
pub fn save_pedimento<P: AsRef<Path>>(
    result: &PedimentoResult,
    path: P,
) -> Result<(), PedimentoError> {
    std::fs::write(path, &result.markdown)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PedimentoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Parse(String),
}

impl From<lopdf::Error> for PedimentoError {
    fn from(e: lopdf::Error) -> Self {
        PedimentoError::Parse(e.to_string())
    }
}
