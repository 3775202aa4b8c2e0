//! K-line inclusion merging.
//!
//! Two adjacent bars are "mutually inclusive" when one bar's high-low range
//! fully encloses the other's. Chan analysis collapses such bars into a
//! single composite bar before any fractal can be read from the sequence.
//!
//! Folding direction depends on the running trend: in an uptrend the
//! composite keeps the higher high and the higher low, in a downtrend the
//! lower of each. The trend itself flips only on a non-inclusive bar whose
//! high and low are both above (or both below) the current composite.

use chrono::{DateTime, Utc};

use crate::{Ohlcv, Trend};

/// A bar after inclusion handling.
///
/// `start_index..=end_index` is the contiguous range of raw bars folded into
/// this composite. Open comes from the first constituent, close and
/// timestamp from the last.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MergedBar {
    pub start_index: usize,
    pub end_index: usize,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl MergedBar {
    fn from_bar<T: Ohlcv>(bar: &T, index: usize) -> Self {
        Self {
            start_index: index,
            end_index: index,
            timestamp: bar.timestamp(),
            open: bar.open(),
            high: bar.high(),
            low: bar.low(),
            close: bar.close(),
        }
    }

    /// Indices of the raw bars folded into this composite.
    #[inline]
    pub fn constituents(&self) -> std::ops::RangeInclusive<usize> {
        self.start_index..=self.end_index
    }

    /// Number of raw bars folded into this composite.
    #[inline]
    pub fn width(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    /// True if `self` and the candidate ranges mutually include one another.
    #[inline]
    fn includes<T: Ohlcv>(&self, bar: &T) -> bool {
        (bar.high() <= self.high && bar.low() >= self.low)
            || (self.high <= bar.high() && self.low >= bar.low())
    }
}

/// Collapse mutually inclusive bars into [`MergedBar`]s.
///
/// The running trend is an explicit fold accumulator seeded `Up`; it is
/// re-evaluated on every non-inclusive bar. Bars carrying NaN or infinite
/// prices are skipped outright — this stage never fails, it only produces
/// fewer bars from degenerate input.
pub fn merge_bars<T: Ohlcv>(bars: &[T]) -> Vec<MergedBar> {
    let mut merged: Vec<MergedBar> = Vec::with_capacity(bars.len());
    let mut trend = Trend::Up;

    for (i, bar) in bars.iter().enumerate() {
        if !bar_is_finite(bar) {
            tracing::debug!(index = i, "skipping bar with non-finite prices");
            continue;
        }

        let Some(prev) = merged.last_mut() else {
            merged.push(MergedBar::from_bar(bar, i));
            continue;
        };

        if prev.includes(bar) {
            // Fold into the open composite: higher-high/higher-low under an
            // uptrend, lower-high/lower-low under a downtrend.
            let (high, low) = match trend {
                Trend::Up => (prev.high.max(bar.high()), prev.low.max(bar.low())),
                Trend::Down => (prev.high.min(bar.high()), prev.low.min(bar.low())),
            };
            prev.high = high;
            prev.low = low;
            prev.close = bar.close();
            prev.timestamp = bar.timestamp();
            prev.end_index = i;
        } else {
            if bar.high() > prev.high && bar.low() > prev.low {
                trend = Trend::Up;
            } else if bar.high() < prev.high && bar.low() < prev.low {
                trend = Trend::Down;
            }
            // A non-inclusive bar that is neither fully higher nor fully
            // lower cannot occur; if the input is malformed the trend is
            // simply left unchanged and the bar appended as-is.
            merged.push(MergedBar::from_bar(bar, i));
        }
    }

    merged
}

/// Merged bars can be fed back through any stage that reads raw bars.
/// Volume is not tracked at this level and reads as zero.
impl Ohlcv for MergedBar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        0.0
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[inline]
fn bar_is_finite<T: Ohlcv>(bar: &T) -> bool {
    bar.open().is_finite()
        && bar.high().is_finite()
        && bar.low().is_finite()
        && bar.close().is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{bar, bars_from_hl};

    #[test]
    fn test_single_bar_passthrough() {
        let bars = vec![bar(0, 10.0, 12.0, 9.0, 11.0)];
        let merged = merge_bars(&bars);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].constituents(), 0..=0);
    }

    #[test]
    fn test_contained_bar_folds_up() {
        // Second bar sits inside the first; trend starts Up so the fold
        // keeps the higher high and higher low.
        let bars = bars_from_hl(&[(12.0, 9.0), (11.0, 10.0)]);
        let merged = merge_bars(&bars);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].high, 12.0);
        assert_eq!(merged[0].low, 10.0);
        assert_eq!(merged[0].end_index, 1);
        assert_eq!(merged[0].width(), 2);
    }

    #[test]
    fn test_contained_bar_folds_down() {
        // A lower bar flips the trend to Down, then a contained bar folds
        // lower-high/lower-low.
        let bars = bars_from_hl(&[(12.0, 9.0), (11.0, 8.0), (10.5, 8.5)]);
        let merged = merge_bars(&bars);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].high, 10.5);
        assert_eq!(merged[1].low, 8.0);
    }

    #[test]
    fn test_enclosing_bar_folds_too() {
        // Containment is symmetric: a bar that engulfs the composite merges.
        let bars = bars_from_hl(&[(11.0, 10.0), (12.0, 9.0)]);
        let merged = merge_bars(&bars);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].high, 12.0);
        assert_eq!(merged[0].low, 10.0);
    }

    #[test]
    fn test_non_inclusive_appends() {
        let bars = bars_from_hl(&[(12.0, 9.0), (14.0, 10.0), (11.0, 8.0)]);
        let merged = merge_bars(&bars);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_close_and_open_tracking() {
        let bars = vec![
            bar(0, 10.0, 12.0, 9.0, 11.0),
            bar(1, 10.5, 11.5, 9.5, 10.0), // contained
        ];
        let merged = merge_bars(&bars);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].open, 10.0);
        assert_eq!(merged[0].close, 10.0);
        assert_eq!(merged[0].timestamp, bars[1].timestamp());
    }

    #[test]
    fn test_nan_bar_skipped() {
        let bars = vec![
            bar(0, 10.0, 12.0, 9.0, 11.0),
            bar(1, f64::NAN, 13.0, 10.0, 12.0),
            bar(2, 12.0, 14.0, 11.0, 13.0),
        ];
        let merged = merge_bars(&bars);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].start_index, 2);
    }

    #[test]
    fn test_empty_input() {
        let bars: Vec<crate::Bar> = Vec::new();
        assert!(merge_bars(&bars).is_empty());
    }

    #[test]
    fn test_idempotent_on_own_output() {
        // Re-running the merger on its own output must not merge further.
        let bars = bars_from_hl(&[
            (12.0, 9.0),
            (11.5, 10.0),
            (14.0, 10.5),
            (13.0, 11.0),
            (10.0, 7.0),
            (11.0, 8.0),
        ]);
        let merged = merge_bars(&bars);
        let again = merge_bars(&merged);
        assert_eq!(again.len(), merged.len());
        for (a, b) in merged.iter().zip(&again) {
            assert_eq!(a.high, b.high);
            assert_eq!(a.low, b.low);
        }
    }
}
