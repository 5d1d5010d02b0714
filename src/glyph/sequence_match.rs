//! Matching captured glyphs against the known sequences of a given length.

use super::catalog::{Catalog, SequenceEntry};

/// A glyph accepted into a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSymbol {
    pub name: String,
    /// Position among the visible indicator hexagons, `None` when unknown.
    pub slot: Option<usize>,
}

impl CapturedSymbol {
    pub fn new(name: impl Into<String>, slot: Option<usize>) -> Self {
        Self {
            name: name.into(),
            slot,
        }
    }
}

/// Sequences of length `len` that contain `names` in order, not necessarily
/// contiguously. An empty `names` matches every sequence of that length.
pub fn match_by_name<'a, S: AsRef<str>>(
    catalog: &'a Catalog,
    len: usize,
    names: &[S],
) -> Vec<&'a SequenceEntry> {
    catalog
        .sequences_of_len(len)
        .iter()
        .filter(|entry| contains_ordered(entry, names))
        .collect()
}

/// Like [`match_by_name`], but a captured glyph with a slot only matches the
/// sequence element at that position.
///
/// The scan is a single left-to-right pass with no backtracking: a name that
/// matches at the wrong position is skipped and a later occurrence is looked
/// for instead. Some orderings with repeated names therefore fail to match.
pub fn match_by_name_and_index<'a>(
    catalog: &'a Catalog,
    len: usize,
    captured: &[CapturedSymbol],
) -> Vec<&'a SequenceEntry> {
    catalog
        .sequences_of_len(len)
        .iter()
        .filter(|entry| contains_ordered_at_slots(entry, captured))
        .collect()
}

fn contains_ordered<S: AsRef<str>>(entry: &SequenceEntry, names: &[S]) -> bool {
    if names.is_empty() {
        return true;
    }
    let mut idx = 0;
    for glyph in &entry.glyphs {
        if glyph == names[idx].as_ref() {
            idx += 1;
            if idx == names.len() {
                return true;
            }
        }
    }
    false
}

fn contains_ordered_at_slots(entry: &SequenceEntry, captured: &[CapturedSymbol]) -> bool {
    if captured.is_empty() {
        return true;
    }
    let mut idx = 0;
    for (pos, glyph) in entry.glyphs.iter().enumerate() {
        let expected = &captured[idx];
        if *glyph == expected.name && expected.slot.is_none_or(|slot| slot == pos) {
            idx += 1;
            if idx == captured.len() {
                return true;
            }
        }
    }
    false
}
