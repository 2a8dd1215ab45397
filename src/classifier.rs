//! Line classification for pedimento text
//!
//! Every extracted line is tagged as page furniture (footer), the title of a
//! section, the start of a partida, or plain content. Classification is a pure
//! function of the line and a small context; both segmenters call it inline.

use crate::sections::SectionKind;
use once_cell::sync::Lazy;
use regex::Regex;

/// Phrases that mark repeated page headers/footers. Matched ignoring case.
pub const FOOTER_PHRASES: &[&str] = &[
    "Página",
    "Pagina",
    "Fecha Impresión",
    "NUM. PEDIMENTO",
    "ANEXO DEL PEDIMENTO",
];

/// Phrases that open the signature block at the bottom of a page.
/// Lines at or after the first match are dropped when a section or partida is closed.
pub const TERMINATOR_PHRASES: &[&str] = &[
    "AGENTE ADUANAL",
    "IMPORTADOR O EXPORTADOR",
    "NUMERO DE SERIE DEL CERTIFICADO",
    "e.firma:",
];

/// The e.firma marker on its own, used by the output formatter.
pub const E_SIGNATURE_PHRASE: &str = "e.firma:";

/// A section title phrase together with the strings that veto it.
#[derive(Debug, Clone, Copy)]
pub struct SectionRule {
    pub kind: SectionKind,
    pub phrase: &'static str,
    /// The title is ignored when the trimmed line ends with this suffix
    pub excluded_suffix: Option<&'static str>,
    /// The title is ignored when the line contains any of these
    pub excluded_phrases: &'static [&'static str],
}

impl SectionRule {
    const fn new(kind: SectionKind, phrase: &'static str) -> Self {
        Self {
            kind,
            phrase,
            excluded_suffix: None,
            excluded_phrases: &[],
        }
    }

    fn matches(&self, line: &str) -> bool {
        if !line.contains(self.phrase) {
            return false;
        }
        if let Some(suffix) = self.excluded_suffix {
            if line.trim().ends_with(suffix) {
                return false;
            }
        }
        !self.excluded_phrases.iter().any(|p| line.contains(p))
    }
}

/// Section titles in match priority order. The first rule that matches wins.
pub const SECTION_RULES: &[SectionRule] = &[
    SectionRule::new(SectionKind::ImporterExporter, "DATOS DEL IMPORTADOR/EXPORTADOR"),
    SectionRule::new(SectionKind::RatesAtPedimento, "TASAS A NIVEL PEDIMENTO"),
    SectionRule::new(SectionKind::LiquidationTable, "CUADRO DE LIQUIDACION"),
    SectionRule::new(SectionKind::SupplierBuyer, "DATOS DEL PROVEEDOR O COMPRADOR"),
    SectionRule {
        kind: SectionKind::Seals,
        phrase: "CANDADOS",
        excluded_suffix: Some("CANDADOS"),
        excluded_phrases: &["CANDADOS DE SEGURIDAD"],
    },
    SectionRule {
        kind: SectionKind::Observations,
        phrase: "OBSERVACIONES",
        excluded_suffix: None,
        excluded_phrases: &["NIVEL PARTIDA"],
    },
    SectionRule::new(SectionKind::Partidas, "PARTIDAS"),
    // Only reachable on the first page; elsewhere the footer check claims it.
    SectionRule::new(SectionKind::Annex, "ANEXO DEL PEDIMENTO"),
];

/// Matches a partida "SEC" number at the start of a line, e.g. "1 " or "68 ".
static ITEM_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s").unwrap());

static FOOTER_PHRASES_LOWER: Lazy<Vec<String>> =
    Lazy::new(|| FOOTER_PHRASES.iter().map(|p| p.to_lowercase()).collect());

/// Which part of the document the caller is walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Named sections before the partidas marker
    Sections,
    /// The partidas region
    Items,
}

/// Context a line is classified in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyContext {
    /// Zero-based page index
    pub page_index: usize,
    pub region: Region,
    /// The section currently being collected. Informational: no rule
    /// depends on it.
    pub current_section: SectionKind,
}

impl ClassifyContext {
    pub fn sections(page_index: usize, current_section: SectionKind) -> Self {
        Self {
            page_index,
            region: Region::Sections,
            current_section,
        }
    }

    pub fn items(page_index: usize) -> Self {
        Self {
            page_index,
            region: Region::Items,
            current_section: SectionKind::Partidas,
        }
    }

    pub fn is_first_page(&self) -> bool {
        self.page_index == 0
    }
}

/// Classification of a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Footer,
    SectionMarker(SectionKind),
    ItemMarker,
    Content,
}

/// Classify a line in the given context.
///
/// Priority: footer phrases first (on non-first pages of the sections region,
/// anywhere in the items region), then section titles or the partida number
/// pattern depending on the region, then content.
pub fn classify_line(line: &str, ctx: &ClassifyContext) -> LineClass {
    let footer_applies = ctx.region == Region::Items || !ctx.is_first_page();
    if footer_applies && is_footer(line) {
        return LineClass::Footer;
    }

    match ctx.region {
        Region::Sections => match section_title(line) {
            Some(kind) => LineClass::SectionMarker(kind),
            None => LineClass::Content,
        },
        Region::Items => {
            if is_item_start(line) {
                LineClass::ItemMarker
            } else {
                LineClass::Content
            }
        }
    }
}

/// Check if a line carries any footer phrase, ignoring case
pub fn is_footer(line: &str) -> bool {
    let lower = line.to_lowercase();
    FOOTER_PHRASES_LOWER.iter().any(|p| lower.contains(p.as_str()))
}

/// Check if a line opens the signature block
pub fn is_terminator(line: &str) -> bool {
    TERMINATOR_PHRASES.iter().any(|p| line.contains(p))
}

/// Check if a line starts a new partida
pub fn is_item_start(line: &str) -> bool {
    ITEM_START_RE.is_match(line)
}

/// Section whose title appears in the line, honoring the exclusion rules
pub fn section_title(line: &str) -> Option<SectionKind> {
    SECTION_RULES
        .iter()
        .find(|rule| rule.matches(line))
        .map(|rule| rule.kind)
}

/// Drop the first terminator line and everything after it.
pub fn trim_at_terminator(lines: &mut Vec<String>) {
    if let Some(pos) = lines.iter().position(|l| is_terminator(l)) {
        lines.truncate(pos);
    }
}
