//! Section segmentation
//!
//! Walks the page lines in document order and assigns each line to one of the
//! named pedimento sections. Footer lines are dropped, signature blocks are
//! trimmed when a section is closed, and the walk stops at the partidas marker.

use crate::classifier::{classify_line, trim_at_terminator, ClassifyContext, LineClass};
use std::fmt;

/// The fixed set of pedimento sections, in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    /// Header block before any titled section
    Pedimento,
    ImporterExporter,
    RatesAtPedimento,
    LiquidationTable,
    Annex,
    SupplierBuyer,
    Seals,
    Observations,
    /// Items region holding the partidas
    Partidas,
}

impl SectionKind {
    pub const ALL: [SectionKind; 9] = [
        SectionKind::Pedimento,
        SectionKind::ImporterExporter,
        SectionKind::RatesAtPedimento,
        SectionKind::LiquidationTable,
        SectionKind::Annex,
        SectionKind::SupplierBuyer,
        SectionKind::Seals,
        SectionKind::Observations,
        SectionKind::Partidas,
    ];

    /// Title as printed on the document
    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Pedimento => "PEDIMENTO",
            SectionKind::ImporterExporter => "DATOS DEL IMPORTADOR/EXPORTADOR",
            SectionKind::RatesAtPedimento => "TASAS A NIVEL PEDIMENTO",
            SectionKind::LiquidationTable => "CUADRO DE LIQUIDACION",
            SectionKind::Annex => "ANEXO DEL PEDIMENTO",
            SectionKind::SupplierBuyer => "DATOS DEL PROVEEDOR O COMPRADOR",
            SectionKind::Seals => "CANDADOS",
            SectionKind::Observations => "OBSERVACIONES",
            SectionKind::Partidas => "PARTIDAS",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A named section and its lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub lines: Vec<String>,
}

/// Position of the first line after the partidas marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemsStart {
    /// Zero-based page index
    pub page: usize,
    /// Index of the first line after the marker on that page
    pub line: usize,
}

/// Result of section segmentation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionSegmentation {
    /// Non-empty sections in the order they were first opened
    pub sections: Vec<Section>,
    /// Where the items region begins, if the partidas marker was found
    pub items_start: Option<ItemsStart>,
}

impl SectionSegmentation {
    /// Lines of a section, if it was retained
    pub fn get(&self, kind: SectionKind) -> Option<&[String]> {
        self.sections
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.lines.as_slice())
    }

    pub fn contains(&self, kind: SectionKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmenterState {
    CollectingSection(SectionKind),
    /// The partidas marker was seen; no further input is consumed
    ItemsRegionReached,
}

/// State machine assigning lines to sections
#[derive(Debug)]
pub struct SectionSegmenter {
    state: SegmenterState,
    /// Open order of every section, including ones that may end up empty
    sections: Vec<Section>,
    pending: Vec<String>,
}

impl Default for SectionSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionSegmenter {
    pub fn new() -> Self {
        Self {
            state: SegmenterState::CollectingSection(SectionKind::Pedimento),
            sections: vec![Section {
                kind: SectionKind::Pedimento,
                lines: Vec::new(),
            }],
            pending: Vec::new(),
        }
    }

    /// Section currently collecting lines, `None` once the items region is reached
    pub fn current(&self) -> Option<SectionKind> {
        match self.state {
            SegmenterState::CollectingSection(kind) => Some(kind),
            SegmenterState::ItemsRegionReached => None,
        }
    }

    /// Feed one line. Returns `false` once the partidas marker has been consumed.
    pub fn push_line(&mut self, line: &str, page_index: usize) -> bool {
        let current = match self.state {
            SegmenterState::CollectingSection(kind) => kind,
            SegmenterState::ItemsRegionReached => return false,
        };

        let ctx = ClassifyContext::sections(page_index, current);
        match classify_line(line, &ctx) {
            LineClass::Footer => {
                self.flush();
            }
            LineClass::SectionMarker(SectionKind::Partidas) => {
                self.switch_to(SectionKind::Partidas, line);
                self.flush();
                self.state = SegmenterState::ItemsRegionReached;
                log::debug!("items region reached on page {}", page_index + 1);
                return false;
            }
            LineClass::SectionMarker(kind) if kind != current => {
                self.switch_to(kind, line);
            }
            LineClass::SectionMarker(_) | LineClass::ItemMarker | LineClass::Content => {
                self.pending.push(line.to_string());
            }
        }
        true
    }

    /// Close the open section and return the non-empty sections.
    pub fn finish(mut self) -> Vec<Section> {
        self.flush();
        self.sections.retain(|s| !s.lines.is_empty());
        self.sections
    }

    fn switch_to(&mut self, kind: SectionKind, marker: &str) {
        self.flush();
        log::debug!("section {:?} opened by {:?}", kind, marker);
        if !self.sections.iter().any(|s| s.kind == kind) {
            self.sections.push(Section {
                kind,
                lines: Vec::new(),
            });
        }
        self.state = SegmenterState::CollectingSection(kind);
        self.pending.push(marker.to_string());
    }

    /// Trim the pending lines at the signature block and append them to the
    /// current section.
    fn flush(&mut self) {
        let kind = match self.state {
            SegmenterState::CollectingSection(kind) => kind,
            SegmenterState::ItemsRegionReached => return,
        };
        let mut chunk = std::mem::take(&mut self.pending);
        trim_at_terminator(&mut chunk);
        if let Some(section) = self.sections.iter_mut().find(|s| s.kind == kind) {
            section.lines.extend(chunk);
        }
    }
}

/// Split the pages of a pedimento into named sections.
///
/// Stops at the partidas marker; everything after it belongs to the items
/// region and is reported through [`SectionSegmentation::items_start`].
pub fn segment_sections<S: AsRef<str>>(pages: &[Vec<S>]) -> SectionSegmentation {
    let mut segmenter = SectionSegmenter::new();
    let mut items_start = None;

    'pages: for (page_index, lines) in pages.iter().enumerate() {
        for (line_index, line) in lines.iter().enumerate() {
            if !segmenter.push_line(line.as_ref(), page_index) {
                items_start = Some(ItemsStart {
                    page: page_index,
                    line: line_index + 1,
                });
                break 'pages;
            }
        }
    }

    SectionSegmentation {
        sections: segmenter.finish(),
        items_start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_markers_keeps_default_section() {
        let pages = vec![page(&["NUM. PEDIMENTO 123", "T. OPER IMP"])];
        let result = segment_sections(&pages);
        assert_eq!(result.sections.len(), 1);
        assert_eq!(result.sections[0].kind, SectionKind::Pedimento);
        assert_eq!(result.sections[0].lines.len(), 2);
        assert!(result.items_start.is_none());
    }

    #[test]
    fn test_marker_line_opens_section() {
        let pages = vec![page(&[
            "PEDIMENTO 1",
            "DATOS DEL IMPORTADOR/EXPORTADOR",
            "RFC: XAXX010101000",
            "TASAS A NIVEL PEDIMENTO",
            "DTA 8",
        ])];
        let result = segment_sections(&pages);
        assert_eq!(result.get(SectionKind::Pedimento).unwrap(), ["PEDIMENTO 1"]);
        assert_eq!(
            result.get(SectionKind::ImporterExporter).unwrap(),
            ["DATOS DEL IMPORTADOR/EXPORTADOR", "RFC: XAXX010101000"]
        );
        assert_eq!(
            result.get(SectionKind::RatesAtPedimento).unwrap(),
            ["TASAS A NIVEL PEDIMENTO", "DTA 8"]
        );
    }

    #[test]
    fn test_empty_default_section_is_dropped() {
        let pages = vec![page(&["CUADRO DE LIQUIDACION", "IVA 100"])];
        let result = segment_sections(&pages);
        assert!(!result.contains(SectionKind::Pedimento));
        assert_eq!(result.sections[0].kind, SectionKind::LiquidationTable);
    }

    #[test]
    fn test_signature_block_trimmed_at_switch() {
        let pages = vec![page(&[
            "CUADRO DE LIQUIDACION",
            "IVA 100",
            "AGENTE ADUANAL: JUAN PEREZ",
            "NUMERO DE SERIE DEL CERTIFICADO: 0001",
            "DATOS DEL PROVEEDOR O COMPRADOR",
            "ACME INC",
        ])];
        let result = segment_sections(&pages);
        assert_eq!(
            result.get(SectionKind::LiquidationTable).unwrap(),
            ["CUADRO DE LIQUIDACION", "IVA 100"]
        );
        assert_eq!(
            result.get(SectionKind::SupplierBuyer).unwrap(),
            ["DATOS DEL PROVEEDOR O COMPRADOR", "ACME INC"]
        );
    }

    #[test]
    fn test_footer_keeps_current_section() {
        let pages = vec![
            page(&["DATOS DEL PROVEEDOR O COMPRADOR", "ACME INC"]),
            page(&[
                "ANEXO DEL PEDIMENTO",
                "NUM. PEDIMENTO: 24 47 3429 4001234",
                "ID FISCAL 998877",
                "Página 2 de 3",
            ]),
        ];
        let result = segment_sections(&pages);
        assert_eq!(
            result.get(SectionKind::SupplierBuyer).unwrap(),
            ["DATOS DEL PROVEEDOR O COMPRADOR", "ACME INC", "ID FISCAL 998877"]
        );
    }

    #[test]
    fn test_lowercase_footer_is_dropped() {
        let pages = vec![
            page(&["OBSERVACIONES", "X"]),
            page(&["fecha impresión: 01/02/2024", "Y"]),
        ];
        let result = segment_sections(&pages);
        assert_eq!(
            result.get(SectionKind::Observations).unwrap(),
            ["OBSERVACIONES", "X", "Y"]
        );
    }

    #[test]
    fn test_trim_applies_per_page_chunk() {
        // The signature block on page two is cut by the page footer, so the
        // next page still contributes to the same section.
        let pages = vec![
            page(&["OBSERVACIONES", "LINEA 1"]),
            page(&["LINEA 2", "e.firma: ABC", "Página 2"]),
            page(&["LINEA 3"]),
        ];
        let result = segment_sections(&pages);
        assert_eq!(
            result.get(SectionKind::Observations).unwrap(),
            ["OBSERVACIONES", "LINEA 1", "LINEA 2", "LINEA 3"]
        );
    }

    #[test]
    fn test_repeated_title_does_not_reopen() {
        let pages = vec![page(&["CANDADOS: 2", "CANDADOS: 1A", "X"])];
        let result = segment_sections(&pages);
        assert_eq!(
            result.get(SectionKind::Seals).unwrap(),
            ["CANDADOS: 2", "CANDADOS: 1A", "X"]
        );
    }

    #[test]
    fn test_stops_at_partidas() {
        let pages = vec![
            page(&["OBSERVACIONES", "SIN OBSERVACIONES EXTRA"]),
            page(&["PARTIDAS", "1 WIDGET", "2 GADGET"]),
            page(&["3 THING"]),
        ];
        let result = segment_sections(&pages);
        assert_eq!(result.get(SectionKind::Partidas).unwrap(), ["PARTIDAS"]);
        assert_eq!(result.items_start, Some(ItemsStart { page: 1, line: 1 }));
        assert_eq!(result.sections.last().unwrap().kind, SectionKind::Partidas);
    }

    #[test]
    fn test_sections_keep_open_order() {
        let pages = vec![page(&[
            "OBSERVACIONES",
            "NOTA",
            "DATOS DEL IMPORTADOR/EXPORTADOR",
            "RFC",
        ])];
        let kinds: Vec<_> = segment_sections(&pages)
            .sections
            .iter()
            .map(|s| s.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![SectionKind::Observations, SectionKind::ImporterExporter]
        );
    }

    #[test]
    fn test_segmenter_rejects_input_after_partidas() {
        let mut segmenter = SectionSegmenter::new();
        assert!(segmenter.push_line("RFC", 0));
        assert!(!segmenter.push_line("PARTIDAS", 0));
        assert!(!segmenter.push_line("1 WIDGET", 0));
        assert!(segmenter.current().is_none());
        let sections = segmenter.finish();
        assert_eq!(sections[1].lines, vec!["PARTIDAS"]);
    }
}
