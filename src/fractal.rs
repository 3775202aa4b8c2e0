//! Fractal (top/bottom extremum) detection over merged bars.

use chrono::{DateTime, Utc};

use crate::MergedBar;

/// Which side of the price a fractal marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FractalKind {
    Top,
    Bottom,
}

impl FractalKind {
    #[inline]
    pub fn is_top(self) -> bool {
        matches!(self, FractalKind::Top)
    }
}

/// A 3-bar local extremum on the merged sequence.
///
/// `price` is the high for a top and the low for a bottom; `merged_index`
/// points at the middle bar in the merged sequence.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Fractal {
    pub kind: FractalKind,
    pub merged_index: usize,
    pub price: f64,
    pub high: f64,
    pub low: f64,
    pub timestamp: DateTime<Utc>,
}

/// Scan interior merged bars for strict tops and bottoms.
///
/// A top requires the middle bar's high AND low to sit strictly above both
/// neighbours'; a bottom is the mirror. Ties fail the strict comparison and
/// produce nothing, as does a sequence shorter than three bars.
pub fn find_fractals(merged: &[MergedBar]) -> Vec<Fractal> {
    let mut fractals = Vec::new();
    if merged.len() < 3 {
        return fractals;
    }

    for i in 1..merged.len() - 1 {
        let left = &merged[i - 1];
        let curr = &merged[i];
        let right = &merged[i + 1];

        let kind = if curr.high > left.high
            && curr.high > right.high
            && curr.low > left.low
            && curr.low > right.low
        {
            FractalKind::Top
        } else if curr.low < left.low
            && curr.low < right.low
            && curr.high < left.high
            && curr.high < right.high
        {
            FractalKind::Bottom
        } else {
            continue;
        };

        fractals.push(Fractal {
            kind,
            merged_index: i,
            price: if kind.is_top() { curr.high } else { curr.low },
            high: curr.high,
            low: curr.low,
            timestamp: curr.timestamp,
        });
    }

    tracing::debug!(count = fractals.len(), "fractal scan complete");
    fractals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::merged_from_hl;

    fn fractals_of(hl: &[(f64, f64)]) -> Vec<Fractal> {
        // Merged bars are built directly; containment handling is the
        // merger's concern, not this stage's.
        find_fractals(&merged_from_hl(hl))
    }

    #[test]
    fn test_top_fractal() {
        let fx = fractals_of(&[(10.0, 8.0), (12.0, 9.0), (11.0, 8.5)]);
        assert_eq!(fx.len(), 1);
        assert_eq!(fx[0].kind, FractalKind::Top);
        assert_eq!(fx[0].merged_index, 1);
        assert_eq!(fx[0].price, 12.0);
    }

    #[test]
    fn test_bottom_fractal() {
        let fx = fractals_of(&[(12.0, 9.0), (10.0, 7.0), (11.0, 8.0)]);
        assert_eq!(fx.len(), 1);
        assert_eq!(fx[0].kind, FractalKind::Bottom);
        assert_eq!(fx[0].price, 7.0);
    }

    #[test]
    fn test_tie_on_high_is_not_a_top() {
        // Equal highs on the right side fail the strict comparison.
        let fx = fractals_of(&[(10.0, 8.0), (12.0, 9.0), (12.0, 8.5)]);
        assert!(fx.is_empty());
    }

    #[test]
    fn test_high_only_dominance_is_not_a_top() {
        // Higher high but lower low than the left neighbour: no fractal.
        let fx = fractals_of(&[(10.0, 9.0), (12.0, 8.0), (11.0, 7.0)]);
        assert!(fx.is_empty());
    }

    #[test]
    fn test_too_few_bars() {
        assert!(fractals_of(&[(10.0, 8.0), (12.0, 9.0)]).is_empty());
    }

    #[test]
    fn test_order_preserved() {
        let fx = fractals_of(&[
            (10.0, 8.0),
            (12.0, 9.0), // top
            (9.0, 6.0),  // bottom
            (11.0, 7.0),
        ]);
        assert_eq!(fx.len(), 2);
        assert!(fx[0].merged_index < fx[1].merged_index);
        assert_eq!(fx[0].kind, FractalKind::Top);
        assert_eq!(fx[1].kind, FractalKind::Bottom);
    }
}
