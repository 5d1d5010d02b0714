//! Static glyph and sequence catalogs.
//!
//! Two line formats, both loaded once and never mutated afterwards:
//! - glyph lines: `name,strokePath` where the path is a run of anchor ids (`0159a`)
//! - sequence lines: comma-joined glyph names, one sequence per line

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use super::anchor::{parse_stroke_path, StrokePair};
use super::canonical::canonicalize;
use crate::error::ConfigError;

/// Glyph definitions shipped with the binary.
pub const EMBEDDED_GLYPH_LINES: &str = include_str!("../../resources/glyph_line.csv");

/// Sequence definitions shipped with the binary.
pub const EMBEDDED_SEQUENCES: &str = include_str!("../../resources/glyph.csv");

/// A named glyph and its canonical stroke set.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    /// Stroke path as written in the catalog.
    pub path: String,
    pub strokes: BTreeSet<StrokePair>,
}

/// One known glyph sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceEntry {
    pub glyphs: Vec<String>,
}

impl SequenceEntry {
    pub fn new<S: Into<String>>(glyphs: impl IntoIterator<Item = S>) -> Self {
        Self {
            glyphs: glyphs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// Immutable glyph and sequence data shared by every analysis.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    symbols: Vec<Symbol>,
    sequences: BTreeMap<usize, Vec<SequenceEntry>>,
}

impl Catalog {
    /// Builds a catalog from the two text formats.
    pub fn from_text(glyph_lines: &str, sequence_lines: &str) -> Result<Self, ConfigError> {
        let mut catalog = Catalog::default();

        for (line_num, line) in glyph_lines.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (name, path) = line.split_once(',').ok_or_else(|| {
                ConfigError::MalformedCatalogLine {
                    line: line_num + 1,
                    reason: "expected name,strokePath".to_string(),
                }
            })?;
            let (name, path) = (name.trim(), path.trim());
            if name.is_empty() || path.chars().count() < 2 {
                return Err(ConfigError::MalformedCatalogLine {
                    line: line_num + 1,
                    reason: format!("glyph '{}' needs a name and at least one stroke", name),
                });
            }

            let strokes = canonicalize(parse_stroke_path(path)?);
            let symbol = Symbol {
                name: name.to_string(),
                path: path.to_string(),
                strokes,
            };

            match catalog.symbols.iter_mut().find(|s| s.name == symbol.name) {
                Some(existing) => {
                    crate::log(&format!(
                        "Warning: glyph '{}' defined twice (line {}), using {} instead of {}",
                        name,
                        line_num + 1,
                        symbol.path,
                        existing.path
                    ));
                    *existing = symbol;
                }
                None => catalog.symbols.push(symbol),
            }
        }

        for line in sequence_lines.lines() {
            let entry = SequenceEntry::new(line.split(',').map(str::trim).filter(|g| !g.is_empty()));
            if entry.is_empty() {
                continue;
            }
            catalog.sequences.entry(entry.len()).or_default().push(entry);
        }

        Ok(catalog)
    }

    /// The catalog compiled into the binary.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_text(EMBEDDED_GLYPH_LINES, EMBEDDED_SEQUENCES)
    }

    /// Loads the catalog, reading either file from disk when a path is given.
    pub fn load(glyph_path: Option<&Path>, sequence_path: Option<&Path>) -> Result<Self> {
        let catalog = if glyph_path.is_none() && sequence_path.is_none() {
            Self::embedded()?
        } else {
            let glyph_text = match glyph_path {
                Some(path) => fs::read_to_string(path)
                    .with_context(|| format!("Failed to read glyph catalog: {}", path.display()))?,
                None => EMBEDDED_GLYPH_LINES.to_string(),
            };
            let sequence_text = match sequence_path {
                Some(path) => fs::read_to_string(path)
                    .with_context(|| format!("Failed to read sequence catalog: {}", path.display()))?,
                None => EMBEDDED_SEQUENCES.to_string(),
            };
            Self::from_text(&glyph_text, &sequence_text)?
        };

        let lengths: Vec<String> = catalog.sequence_lengths().map(|l| l.to_string()).collect();
        crate::log(&format!(
            "Catalog loaded: {} glyphs, {} sequences (lengths {})",
            catalog.symbols.len(),
            catalog.sequence_count(),
            lengths.join("/")
        ));
        Ok(catalog)
    }

    /// Fails when either half of the catalog is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::EmptySymbolCatalog);
        }
        if self.sequences.is_empty() {
            return Err(ConfigError::EmptySequenceCatalog);
        }
        Ok(())
    }

    /// Glyphs in catalog order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    /// Canonical strokes for a glyph name, empty if unknown.
    pub fn strokes_for(&self, name: &str) -> BTreeSet<StrokePair> {
        self.symbol(name)
            .map(|s| s.strokes.clone())
            .unwrap_or_default()
    }

    /// Sequences with exactly `len` glyphs.
    pub fn sequences_of_len(&self, len: usize) -> &[SequenceEntry] {
        self.sequences.get(&len).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sequence_lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.sequences.keys().copied()
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.values().map(Vec::len).sum()
    }
}
