//! Markdown rendering of pedimento sections
//!
//! Sections are relabeled and reordered through a display table, one section
//! is left out, and one is cut at the e.firma line before rendering.

use crate::classifier::E_SIGNATURE_PHRASE;
use crate::sections::{Section, SectionKind};

/// Label and rank used for sections missing from the display table
pub const UNKNOWN_LABEL: &str = "sec 999";
pub const UNKNOWN_RANK: u32 = 999;

/// How a section is shown in the rendered document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDisplay {
    pub section: SectionKind,
    pub label: String,
    /// Lower ranks are rendered first
    pub rank: u32,
}

impl SectionDisplay {
    pub fn new(section: SectionKind, label: impl Into<String>, rank: u32) -> Self {
        Self {
            section,
            label: label.into(),
            rank,
        }
    }
}

/// The default display table: `sec 1` through `sec 9` in document order
pub fn default_display_table() -> Vec<SectionDisplay> {
    SectionKind::ALL
        .iter()
        .enumerate()
        .map(|(i, &kind)| {
            let rank = i as u32 + 1;
            SectionDisplay::new(kind, format!("sec {}", rank), rank)
        })
        .collect()
}

/// Options for markdown rendering
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Title line at the top of the document
    pub title: String,
    /// Display label and rank per section
    pub sections: Vec<SectionDisplay>,
    /// Section never rendered
    pub excluded: Option<SectionKind>,
    /// Section cut at the first line containing `truncate_phrase`
    pub truncated: Option<SectionKind>,
    pub truncate_phrase: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            title: "# PEDIMENTO INFORMATION".to_string(),
            sections: default_display_table(),
            excluded: Some(SectionKind::LiquidationTable),
            truncated: Some(SectionKind::Seals),
            truncate_phrase: E_SIGNATURE_PHRASE.to_string(),
        }
    }
}

impl FormatOptions {
    /// Label and rank for a section
    fn display(&self, kind: SectionKind) -> (&str, u32) {
        self.sections
            .iter()
            .find(|d| d.section == kind)
            .map(|d| (d.label.as_str(), d.rank))
            .unwrap_or((UNKNOWN_LABEL, UNKNOWN_RANK))
    }
}

/// Render sections as a markdown document.
///
/// Each retained section becomes a `## label` header followed by a fenced
/// block of its lines. Sections are ordered by rank; equal ranks keep the
/// order they were discovered in.
pub fn to_markdown(sections: &[Section], options: &FormatOptions) -> String {
    let mut blocks: Vec<(u32, String)> = Vec::new();

    for section in sections {
        if Some(section.kind) == options.excluded || section.lines.is_empty() {
            continue;
        }

        let (label, rank) = options.display(section.kind);
        let lines: &[String] = if Some(section.kind) == options.truncated {
            truncate_at(&section.lines, &options.truncate_phrase)
        } else {
            &section.lines
        };

        let block = format!("## {}\n```\n{}\n```\n", label, lines.join("\n"));
        blocks.push((rank, block));
    }

    // sort_by_key is stable
    blocks.sort_by_key(|(rank, _)| *rank);

    let mut output = vec![format!("{}\n", options.title)];
    output.extend(blocks.into_iter().map(|(_, block)| block));
    output.join("\n")
}

/// Lines before the first one containing `phrase`
fn truncate_at<'a>(lines: &'a [String], phrase: &str) -> &'a [String] {
    match lines.iter().position(|l| l.contains(phrase)) {
        Some(pos) => &lines[..pos],
        None => lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(kind: SectionKind, lines: &[&str]) -> Section {
        Section {
            kind,
            lines: lines.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_default_display_table() {
        let table = default_display_table();
        assert_eq!(table.len(), 9);
        assert_eq!(table[0], SectionDisplay::new(SectionKind::Pedimento, "sec 1", 1));
        assert_eq!(table[8], SectionDisplay::new(SectionKind::Partidas, "sec 9", 9));
    }

    #[test]
    fn test_block_layout() {
        let md = to_markdown(
            &[section(SectionKind::Pedimento, &["A", "B"])],
            &FormatOptions::default(),
        );
        assert_eq!(md, "# PEDIMENTO INFORMATION\n\n## sec 1\n```\nA\nB\n```\n");
    }

    #[test]
    fn test_excluded_section_and_ordering() {
        let sections = vec![
            section(SectionKind::Observations, &["OBSERVACIONES"]),
            section(SectionKind::LiquidationTable, &["CUADRO DE LIQUIDACION"]),
            section(SectionKind::ImporterExporter, &["DATOS"]),
        ];
        let md = to_markdown(&sections, &FormatOptions::default());
        assert!(!md.contains("CUADRO"));
        let importer = md.find("## sec 2").unwrap();
        let observations = md.find("## sec 8").unwrap();
        assert!(importer < observations);
    }

    #[test]
    fn test_truncated_section() {
        let sections = vec![section(
            SectionKind::Seals,
            &["CANDADOS: 1", "ABC123", "e.firma: XYZ", "tail"],
        )];
        let md = to_markdown(&sections, &FormatOptions::default());
        assert!(md.contains("CANDADOS: 1\nABC123\n```"));
        assert!(!md.contains("e.firma"));
        assert!(!md.contains("tail"));
    }

    #[test]
    fn test_truncation_only_hits_designated_section() {
        let sections = vec![section(SectionKind::Observations, &["X", "e.firma: Y"])];
        let md = to_markdown(&sections, &FormatOptions::default());
        assert!(md.contains("e.firma: Y"));
    }

    #[test]
    fn test_unknown_sections_share_low_rank() {
        let options = FormatOptions {
            sections: vec![SectionDisplay::new(SectionKind::Partidas, "items", 1)],
            excluded: None,
            ..FormatOptions::default()
        };
        let sections = vec![
            section(SectionKind::Annex, &["first"]),
            section(SectionKind::Pedimento, &["second"]),
            section(SectionKind::Partidas, &["PARTIDAS"]),
        ];
        let md = to_markdown(&sections, &options);
        let items = md.find("## items").unwrap();
        let first = md.find("first").unwrap();
        let second = md.find("second").unwrap();
        assert!(items < first && first < second);
        assert_eq!(md.matches(UNKNOWN_LABEL).count(), 2);
    }

    #[test]
    fn test_empty_input_renders_title_only() {
        let md = to_markdown(&[], &FormatOptions::default());
        assert_eq!(md, "# PEDIMENTO INFORMATION\n");
    }
}
