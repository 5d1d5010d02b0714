//! Glyph model: anchor topology, stroke canonicalisation, catalogs and matching.

pub mod anchor;
pub mod canonical;
pub mod catalog;
pub mod sequence_match;
pub mod symbol_match;

pub use anchor::{AnchorPoint, StrokePair, ANCHOR_COUNT};
pub use canonical::canonicalize;
pub use catalog::Catalog;
pub use sequence_match::{match_by_name, match_by_name_and_index, CapturedSymbol};
pub use symbol_match::{best_match, match_stroke_set, DEFAULT_MATCH_RATIO};
