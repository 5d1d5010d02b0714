//! Canonicalisation of detected stroke pairs.

use std::collections::BTreeSet;

use super::anchor::{decomposition, StrokePair};

/// Replaces every shortcut pair with the adjacent segments it covers.
///
/// The result is a set, so segments produced by several decompositions collapse.
pub fn canonicalize<I>(raw: I) -> BTreeSet<StrokePair>
where
    I: IntoIterator<Item = StrokePair>,
{
    let mut result = BTreeSet::new();
    for pair in raw {
        match decomposition(pair) {
            Some(parts) => result.extend(parts),
            None => {
                result.insert(pair);
            }
        }
    }
    result
}
