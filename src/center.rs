//! Center (ZhongShu) detection: overlap bands of three or more strokes.

use crate::{Stroke, Trend};

/// A price band where at least three consecutive strokes overlap.
///
/// `zg`/`zd` are the overlap bounds fixed by the three defining strokes
/// (min of their highs / max of their lows); `gg`/`dd` track the extreme
/// prices seen across every absorbed stroke, including extensions.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Center {
    pub start_stroke: usize,
    pub end_stroke: usize,
    pub zg: f64,
    pub zd: f64,
    pub gg: f64,
    pub dd: f64,
    /// Direction of the stroke entering the center.
    pub direction: Trend,
}

impl Center {
    #[inline]
    pub fn height(&self) -> f64 {
        self.zg - self.zd
    }

    /// Number of strokes absorbed into the center.
    #[inline]
    pub fn stroke_count(&self) -> usize {
        self.end_stroke - self.start_stroke + 1
    }

    /// True if the interval `[low, high]` intersects the overlap band.
    #[inline]
    pub fn overlaps(&self, low: f64, high: f64) -> bool {
        !(high < self.zd || low > self.zg)
    }
}

/// Scan the stroke sequence for centers.
///
/// Three consecutive strokes whose ranges share a band (`zg > zd`) open a
/// center; subsequent strokes are absorbed greedily while they keep touching
/// the band. The first non-overlapping stroke terminates the center and the
/// outer scan resumes at its index, so no stroke is consumed twice. A window
/// with no overlap just advances by one. Emitted centers are never revisited
/// or split.
pub fn find_centers(strokes: &[Stroke]) -> Vec<Center> {
    let mut centers = Vec::new();
    if strokes.len() < 3 {
        return centers;
    }

    let mut i = 0;
    while i + 2 < strokes.len() {
        let (a, b, c) = (&strokes[i], &strokes[i + 1], &strokes[i + 2]);
        let zg = a.high().min(b.high()).min(c.high());
        let zd = a.low().max(b.low()).max(c.low());

        if zg <= zd {
            i += 1;
            continue;
        }

        let mut center = Center {
            start_stroke: i,
            end_stroke: i + 2,
            zg,
            zd,
            gg: a.high().max(b.high()).max(c.high()),
            dd: a.low().min(b.low()).min(c.low()),
            direction: a.direction,
        };

        let mut j = i + 3;
        while j < strokes.len() && center.overlaps(strokes[j].low(), strokes[j].high()) {
            center.end_stroke = j;
            center.gg = center.gg.max(strokes[j].high());
            center.dd = center.dd.min(strokes[j].low());
            j += 1;
        }

        centers.push(center);
        i = j;
    }

    tracing::debug!(count = centers.len(), "center scan complete");
    centers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::stroke_with_range;

    #[test]
    fn test_three_stroke_center() {
        // Highs [110, 108, 112], lows [100, 103, 101]: zg = 108, zd = 103.
        let strokes = vec![
            stroke_with_range(Trend::Up, 100.0, 110.0),
            stroke_with_range(Trend::Down, 103.0, 108.0),
            stroke_with_range(Trend::Up, 101.0, 112.0),
        ];
        let centers = find_centers(&strokes);
        assert_eq!(centers.len(), 1);
        assert_eq!(centers[0].zg, 108.0);
        assert_eq!(centers[0].zd, 103.0);
        assert_eq!(centers[0].gg, 112.0);
        assert_eq!(centers[0].dd, 100.0);
        assert_eq!(centers[0].direction, Trend::Up);
    }

    #[test]
    fn test_no_overlap_advances_by_one() {
        let strokes = vec![
            stroke_with_range(Trend::Up, 100.0, 110.0),
            stroke_with_range(Trend::Down, 120.0, 130.0),
            stroke_with_range(Trend::Up, 140.0, 150.0),
        ];
        assert!(find_centers(&strokes).is_empty());
    }

    #[test]
    fn test_extension_absorbs_overlapping_stroke() {
        let strokes = vec![
            stroke_with_range(Trend::Up, 100.0, 110.0),
            stroke_with_range(Trend::Down, 103.0, 108.0),
            stroke_with_range(Trend::Up, 101.0, 112.0),
            stroke_with_range(Trend::Down, 104.0, 109.0), // overlaps [103, 108]
        ];
        let centers = find_centers(&strokes);
        assert_eq!(centers.len(), 1);
        assert_eq!(centers[0].end_stroke, 3);
        assert_eq!(centers[0].stroke_count(), 4);
    }

    #[test]
    fn test_disjoint_stroke_terminates_extension() {
        let strokes = vec![
            stroke_with_range(Trend::Up, 100.0, 110.0),
            stroke_with_range(Trend::Down, 103.0, 108.0),
            stroke_with_range(Trend::Up, 101.0, 112.0),
            stroke_with_range(Trend::Down, 90.0, 95.0), // below [103, 108]
        ];
        let centers = find_centers(&strokes);
        assert_eq!(centers.len(), 1);
        assert_eq!(centers[0].end_stroke, 2);
    }

    #[test]
    fn test_scan_resumes_at_breaking_stroke() {
        // After the first center terminates at stroke 3, strokes 3..6 form a
        // second center without re-reading strokes 0..3.
        let strokes = vec![
            stroke_with_range(Trend::Up, 100.0, 110.0),
            stroke_with_range(Trend::Down, 103.0, 108.0),
            stroke_with_range(Trend::Up, 101.0, 112.0),
            stroke_with_range(Trend::Down, 60.0, 70.0),
            stroke_with_range(Trend::Up, 63.0, 68.0),
            stroke_with_range(Trend::Down, 61.0, 72.0),
        ];
        let centers = find_centers(&strokes);
        assert_eq!(centers.len(), 2);
        assert_eq!(centers[1].start_stroke, 3);
    }

    #[test]
    fn test_validity_invariant() {
        let strokes = vec![
            stroke_with_range(Trend::Up, 100.0, 110.0),
            stroke_with_range(Trend::Down, 103.0, 108.0),
            stroke_with_range(Trend::Up, 101.0, 112.0),
            stroke_with_range(Trend::Down, 90.0, 95.0),
            stroke_with_range(Trend::Up, 92.0, 97.0),
            stroke_with_range(Trend::Down, 91.0, 96.0),
        ];
        for c in find_centers(&strokes) {
            assert!(c.zg > c.zd);
            assert!(c.stroke_count() >= 3);
        }
    }

    #[test]
    fn test_too_few_strokes() {
        let strokes = vec![
            stroke_with_range(Trend::Up, 100.0, 110.0),
            stroke_with_range(Trend::Down, 103.0, 108.0),
        ];
        assert!(find_centers(&strokes).is_empty());
    }
}
