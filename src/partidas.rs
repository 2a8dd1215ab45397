//! Partida segmentation
//!
//! Splits the items region of a pedimento into partidas. A partida starts at
//! a line beginning with its SEC number and runs until the next SEC number or
//! a page footer. Lines between a footer and the next SEC number are page
//! furniture and are discarded.

use crate::classifier::{classify_line, trim_at_terminator, ClassifyContext, LineClass};
use crate::sections::SectionKind;

/// A single line-item record of the pedimento
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partida {
    pub lines: Vec<String>,
}

impl Partida {
    /// Lines joined into one block
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The SEC number the partida opened with
    pub fn sec_number(&self) -> Option<u32> {
        let first = self.lines.first()?;
        first.split_whitespace().next()?.parse().ok()
    }
}

/// Segmenter state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    /// Still before the partidas marker
    AwaitingItemsRegion,
    /// Inside the items region with no partida open
    BetweenItems,
    /// Collecting the lines of an open partida
    CollectingItem(Vec<String>),
}

/// State machine splitting the items region into partidas
#[derive(Debug)]
pub struct ItemSegmenter {
    state: ItemState,
    partidas: Vec<Partida>,
}

impl ItemSegmenter {
    /// Segmenter for input that starts inside the items region
    pub fn in_items_region() -> Self {
        Self {
            state: ItemState::BetweenItems,
            partidas: Vec::new(),
        }
    }

    /// Segmenter that skips everything up to the partidas marker
    pub fn awaiting_marker() -> Self {
        Self {
            state: ItemState::AwaitingItemsRegion,
            partidas: Vec::new(),
        }
    }

    pub fn state(&self) -> &ItemState {
        &self.state
    }

    /// Feed one line of the given page
    pub fn push_line(&mut self, line: &str, page_index: usize) {
        if self.state == ItemState::AwaitingItemsRegion {
            if line.contains(SectionKind::Partidas.title()) {
                log::debug!("items region starts on page {}", page_index + 1);
                self.state = ItemState::BetweenItems;
            }
            return;
        }

        match classify_line(line, &ClassifyContext::items(page_index)) {
            LineClass::Footer => {
                self.close_item();
            }
            LineClass::ItemMarker => {
                self.close_item();
                self.state = ItemState::CollectingItem(vec![line.to_string()]);
            }
            LineClass::SectionMarker(_) | LineClass::Content => {
                if let ItemState::CollectingItem(lines) = &mut self.state {
                    lines.push(line.to_string());
                }
            }
        }
    }

    /// Close any open partida and return all partidas in document order.
    pub fn finish(mut self) -> Vec<Partida> {
        self.close_item();
        log::debug!("{} partidas segmented", self.partidas.len());
        self.partidas
    }

    fn close_item(&mut self) {
        if self.state == ItemState::AwaitingItemsRegion {
            return;
        }
        if let ItemState::CollectingItem(mut lines) =
            std::mem::replace(&mut self.state, ItemState::BetweenItems)
        {
            trim_at_terminator(&mut lines);
            if lines.is_empty() {
                // Still emitted; one record per SEC number
                log::warn!(
                    "partida {} is empty after trimming the signature block",
                    self.partidas.len() + 1
                );
            }
            self.partidas.push(Partida { lines });
        }
    }
}

/// Split lines already known to be inside the items region into partidas.
pub fn segment_items_region<S: AsRef<str>>(pages: &[Vec<S>]) -> Vec<Partida> {
    run(ItemSegmenter::in_items_region(), pages)
}

/// Find the partidas marker in the given pages and split what follows into
/// partidas.
pub fn extract_partidas<S: AsRef<str>>(pages: &[Vec<S>]) -> Vec<Partida> {
    run(ItemSegmenter::awaiting_marker(), pages)
}

fn run<S: AsRef<str>>(mut segmenter: ItemSegmenter, pages: &[Vec<S>]) -> Vec<Partida> {
    for (page_index, lines) in pages.iter().enumerate() {
        for line in lines {
            segmenter.push_line(line.as_ref(), page_index);
        }
    }
    segmenter.finish()
}

/// Render partidas as numbered blocks separated by a rule.
pub fn render_partidas(partidas: &[Partida]) -> String {
    partidas
        .iter()
        .enumerate()
        .map(|(i, p)| format!("Partida {}:\n{}\n{}", i + 1, p.text(), "-".repeat(40)))
        .collect::<Vec<_>>()
        .join("\n")
}
