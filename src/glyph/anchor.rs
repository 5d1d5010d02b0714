//! Anchor topology of the glyph panel.
//!
//! The panel has 11 anchor points: an outer hexagon (0, 2, 9, a, 8, 1 clockwise
//! from the top), four inner points (3, 4, 6, 7) and the centre (5). Calibration
//! lists them in reading order (top to bottom, then left to right), which is
//! exactly the id order below.
//!
//! Three straight lines cross the centre: 0-5-a, 1-3-5-7-9 and 2-4-5-6-8. A stroke
//! drawn between two points on one of those lines covers the shorter segments in
//! between, so such pairs are never sampled directly and are always decomposed.

use std::fmt;

use crate::error::ConfigError;

/// Number of anchors on the panel.
pub const ANCHOR_COUNT: usize = 11;

/// One of the 11 fixed anchor points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnchorPoint {
    P0,
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
    P7,
    P8,
    P9,
    Pa,
}

impl AnchorPoint {
    /// All anchors in calibration order.
    pub const ALL: [AnchorPoint; ANCHOR_COUNT] = [
        AnchorPoint::P0,
        AnchorPoint::P1,
        AnchorPoint::P2,
        AnchorPoint::P3,
        AnchorPoint::P4,
        AnchorPoint::P5,
        AnchorPoint::P6,
        AnchorPoint::P7,
        AnchorPoint::P8,
        AnchorPoint::P9,
        AnchorPoint::Pa,
    ];

    /// Position of this anchor in the calibration list.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Single-character id used by the catalog files.
    pub fn id(self) -> char {
        match self {
            AnchorPoint::Pa => 'a',
            other => char::from(b'0' + other as u8),
        }
    }

    pub fn from_id(id: char) -> Result<Self, ConfigError> {
        match id {
            '0'..='9' => Ok(Self::ALL[(id as u8 - b'0') as usize]),
            'a' | 'A' => Ok(AnchorPoint::Pa),
            other => Err(ConfigError::UnknownAnchor(other)),
        }
    }
}

impl fmt::Display for AnchorPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// An undirected stroke between two anchors, stored smaller id first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrokePair {
    lo: AnchorPoint,
    hi: AnchorPoint,
}

impl StrokePair {
    /// Builds a pair in canonical order. Returns `None` for a degenerate pair.
    pub fn new(a: AnchorPoint, b: AnchorPoint) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { lo: a, hi: b }),
            std::cmp::Ordering::Greater => Some(Self { lo: b, hi: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn lo(&self) -> AnchorPoint {
        self.lo
    }

    pub fn hi(&self) -> AnchorPoint {
        self.hi
    }

    /// True if this pair is sampled directly during stroke detection.
    pub fn is_legal(&self) -> bool {
        decomposition(*self).is_none()
    }
}

impl fmt::Display for StrokePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.lo, self.hi)
    }
}

use AnchorPoint::*;

/// Pairs that lie on a longer straight line through skipped anchors, with the
/// adjacent segments they visually cover.
const DECOMPOSITIONS: [((AnchorPoint, AnchorPoint), &[(AnchorPoint, AnchorPoint)]); 13] = [
    // 0-5-a
    ((P0, Pa), &[(P0, P5), (P5, Pa)]),
    // 1-3-5-7-9
    ((P1, P9), &[(P1, P3), (P3, P5), (P5, P7), (P7, P9)]),
    ((P1, P7), &[(P1, P3), (P3, P5), (P5, P7)]),
    ((P1, P5), &[(P1, P3), (P3, P5)]),
    ((P3, P9), &[(P3, P5), (P5, P7), (P7, P9)]),
    ((P3, P7), &[(P3, P5), (P5, P7)]),
    ((P5, P9), &[(P5, P7), (P7, P9)]),
    // 2-4-5-6-8
    ((P2, P8), &[(P2, P4), (P4, P5), (P5, P6), (P6, P8)]),
    ((P2, P6), &[(P2, P4), (P4, P5), (P5, P6)]),
    ((P2, P5), &[(P2, P4), (P4, P5)]),
    ((P4, P8), &[(P4, P5), (P5, P6), (P6, P8)]),
    ((P4, P6), &[(P4, P5), (P5, P6)]),
    ((P5, P8), &[(P5, P6), (P6, P8)]),
];

/// Returns the adjacent segments covered by `pair`, or `None` if it is already
/// a legal edge.
pub fn decomposition(pair: StrokePair) -> Option<Vec<StrokePair>> {
    DECOMPOSITIONS
        .iter()
        .find(|((a, b), _)| *a == pair.lo && *b == pair.hi)
        .map(|(_, parts)| {
            parts
                .iter()
                .filter_map(|(a, b)| StrokePair::new(*a, *b))
                .collect()
        })
}

/// Every pair of anchors that can be sampled on its own.
pub fn legal_pairs() -> Vec<StrokePair> {
    let mut pairs = Vec::new();
    for (i, &a) in AnchorPoint::ALL.iter().enumerate() {
        for &b in &AnchorPoint::ALL[i + 1..] {
            if let Some(pair) = StrokePair::new(a, b) {
                if pair.is_legal() {
                    pairs.push(pair);
                }
            }
        }
    }
    pairs
}

/// Parses a catalog stroke path ("0159a") into consecutive pairs.
///
/// Pairs are returned raw; run them through `canonicalize` before comparing.
pub fn parse_stroke_path(path: &str) -> Result<Vec<StrokePair>, ConfigError> {
    let points = path
        .trim()
        .chars()
        .map(AnchorPoint::from_id)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(points
        .windows(2)
        .filter_map(|w| StrokePair::new(w[0], w[1]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_ids_round_trip() {
        for anchor in AnchorPoint::ALL {
            assert_eq!(AnchorPoint::from_id(anchor.id()).unwrap(), anchor);
        }
        assert_eq!(AnchorPoint::Pa.index(), 10);
        assert!(AnchorPoint::from_id('b').is_err());
    }

    #[test]
    fn test_pair_is_ordered() {
        let pair = StrokePair::new(P9, P2).unwrap();
        assert_eq!(pair.lo(), P2);
        assert_eq!(pair.hi(), P9);
        assert_eq!(pair, StrokePair::new(P2, P9).unwrap());
        assert!(StrokePair::new(P4, P4).is_none());
    }

    #[test]
    fn test_legal_pairs_exclude_shortcuts() {
        let pairs = legal_pairs();
        // 55 pairs in the complete graph, 13 of them are shortcuts
        assert_eq!(pairs.len(), 42);
        assert!(!pairs.contains(&StrokePair::new(P0, Pa).unwrap()));
        assert!(pairs.contains(&StrokePair::new(P0, P5).unwrap()));
    }

    #[test]
    fn test_decomposition_segments_are_legal() {
        for ((a, b), _) in DECOMPOSITIONS {
            let parts = decomposition(StrokePair::new(a, b).unwrap()).unwrap();
            assert!((2..=4).contains(&parts.len()));
            assert!(parts.iter().all(|p| p.is_legal()));
        }
    }

    #[test]
    fn test_parse_stroke_path() {
        let pairs = parse_stroke_path("0a9").unwrap();
        assert_eq!(
            pairs,
            vec![StrokePair::new(P0, Pa).unwrap(), StrokePair::new(P9, Pa).unwrap()]
        );
        assert!(parse_stroke_path("0x").is_err());
    }
}
