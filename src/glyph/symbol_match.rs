//! Matching a canonical stroke set against the glyph catalog.

use std::collections::BTreeSet;

use super::anchor::StrokePair;
use super::catalog::Catalog;

/// Minimum share of a glyph's strokes that must be present.
pub const DEFAULT_MATCH_RATIO: f64 = 0.95;

/// Returns the names of every glyph whose stroke set has the same size as
/// `strokes` and overlaps it by at least `min_ratio`, in catalog order.
pub fn match_stroke_set(
    catalog: &Catalog,
    strokes: &BTreeSet<StrokePair>,
    min_ratio: f64,
) -> Vec<String> {
    if strokes.is_empty() {
        return Vec::new();
    }

    catalog
        .symbols()
        .iter()
        .filter(|symbol| symbol.strokes.len() == strokes.len())
        .filter(|symbol| {
            let common = symbol.strokes.intersection(strokes).count();
            common as f64 / symbol.strokes.len() as f64 >= min_ratio
        })
        .map(|symbol| symbol.name.clone())
        .collect()
}

/// Picks the glyph reported for a frame: the first match in catalog order.
///
/// Several names passing the threshold means the catalog has near-duplicate
/// glyphs; that case is logged and the first one is still used.
pub fn best_match(catalog: &Catalog, strokes: &BTreeSet<StrokePair>, min_ratio: f64) -> Option<String> {
    let mut names = match_stroke_set(catalog, strokes, min_ratio);
    if names.len() > 1 {
        crate::log(&format!(
            "Ambiguous glyph match {:?}, using '{}'",
            names, names[0]
        ));
    }
    if names.is_empty() {
        None
    } else {
        Some(names.swap_remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::anchor::parse_stroke_path;
    use crate::glyph::canonical::canonicalize;

    fn strokes(path: &str) -> BTreeSet<StrokePair> {
        canonicalize(parse_stroke_path(path).unwrap())
    }

    #[test]
    fn test_every_glyph_matches_itself() {
        let catalog = Catalog::embedded().unwrap();
        for symbol in catalog.symbols() {
            let names = match_stroke_set(&catalog, &symbol.strokes, DEFAULT_MATCH_RATIO);
            assert!(names.contains(&symbol.name), "{} did not match itself", symbol.name);
        }
    }

    #[test]
    fn test_every_glyph_is_its_own_unique_best_match() {
        let catalog = Catalog::embedded().unwrap();
        for symbol in catalog.symbols() {
            let stored = catalog.strokes_for(&symbol.name);
            let recanonical = canonicalize(stored.clone());
            assert_eq!(recanonical, stored, "{} is not stored canonically", symbol.name);
            assert_eq!(canonicalize(recanonical.clone()), recanonical);

            assert_eq!(
                best_match(&catalog, &recanonical, 1.0).as_deref(),
                Some(symbol.name.as_str())
            );
            assert_eq!(
                match_stroke_set(&catalog, &recanonical, DEFAULT_MATCH_RATIO),
                vec![symbol.name.clone()],
                "{} is ambiguous",
                symbol.name
            );
        }
    }

    #[test]
    fn test_detected_shortcut_matches_decomposed_glyph() {
        let catalog = Catalog::embedded().unwrap();
        // "clear" is written 0a; detection only ever sees 0-5 and 5-a
        let names = match_stroke_set(&catalog, &strokes("05a"), DEFAULT_MATCH_RATIO);
        assert_eq!(names, vec!["clear".to_string()]);
    }

    #[test]
    fn test_size_mismatch_never_matches() {
        let catalog = Catalog::from_text("gain,813\n", "gain\n").unwrap();
        // superset of gain's strokes
        assert!(match_stroke_set(&catalog, &strokes("8134"), DEFAULT_MATCH_RATIO).is_empty());
        // one stroke missing
        assert!(match_stroke_set(&catalog, &strokes("81"), DEFAULT_MATCH_RATIO).is_empty());
        assert!(match_stroke_set(&catalog, &BTreeSet::new(), DEFAULT_MATCH_RATIO).is_empty());
    }

    #[test]
    fn test_lower_ratio_tolerates_one_wrong_stroke() {
        let catalog = Catalog::from_text("long,0291a8\n", "long\n").unwrap();
        // eight strokes, one of them replaced
        let noisy = strokes("02918a");
        assert!(match_stroke_set(&catalog, &noisy, DEFAULT_MATCH_RATIO).is_empty());
        assert_eq!(match_stroke_set(&catalog, &noisy, 0.6), vec!["long".to_string()]);
    }

    #[test]
    fn test_best_match_takes_first_in_catalog_order() {
        let catalog = Catalog::from_text("first,012\nsecond,021\n", "first\n").unwrap();
        let set = strokes("012");
        assert_eq!(
            match_stroke_set(&catalog, &set, 0.5),
            vec!["first".to_string(), "second".to_string()]
        );
        assert_eq!(best_match(&catalog, &set, 0.5), Some("first".to_string()));
        assert_eq!(best_match(&catalog, &strokes("34"), 0.5), None);
    }
}
