//! Stroke (Bi) construction from alternating fractals.
//!
//! A stroke joins a bottom fractal to a top fractal (or the reverse) when
//! the two are far enough apart on the merged sequence and the price
//! ordering is sane. Construction is a one-pass state machine over the
//! fractal list: a same-kind fractal can only displace the open anchor by
//! being strictly more extreme, an opposite-kind fractal either closes a
//! stroke or is skipped.

use crate::indicators::MacdSeries;
use crate::{Fractal, FractalKind, MergedBar, Ohlcv, Trend};

/// Minimum merged-bar gap between a stroke's two fractals.
///
/// A fractal occupies three merged bars; a gap of four leaves at least one
/// independent bar strictly between the two fractal windows.
pub const MIN_FRACTAL_GAP: usize = 4;

/// A directional swing between two alternating fractals.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stroke {
    pub start: Fractal,
    pub end: Fractal,
    pub direction: Trend,
    /// Sum of |oscillator histogram| over the underlying raw-bar span.
    pub momentum_area: f64,
    /// Signed oscillator-line extreme over the span: max for an up stroke,
    /// min for a down stroke.
    pub momentum_peak: f64,
    /// Raw volume summed over the span.
    pub volume: f64,
    /// Underlying raw-bar span, resolved from the endpoint merged bars.
    pub raw_start: usize,
    pub raw_end: usize,
}

impl Stroke {
    #[inline]
    pub fn high(&self) -> f64 {
        self.start.high.max(self.end.high)
    }

    #[inline]
    pub fn low(&self) -> f64 {
        self.start.low.min(self.end.low)
    }

    /// Absolute price travel between the two fractal extremes.
    #[inline]
    pub fn amplitude(&self) -> f64 {
        (self.end.price - self.start.price).abs()
    }

    /// Raw bars covered by the stroke.
    #[inline]
    pub fn bar_count(&self) -> usize {
        self.raw_end.saturating_sub(self.raw_start) + 1
    }
}

/// Fold alternating fractals into strokes.
///
/// `min_gap` is the merged-index separation required to close a stroke
/// (see [`MIN_FRACTAL_GAP`]); `min_amplitude` optionally rejects closings
/// whose price travel is below an absolute threshold (0 disables the gate).
/// Momentum fields are left zeroed; see [`attach_momentum`].
pub fn build_strokes(fractals: &[Fractal], min_gap: usize, min_amplitude: f64) -> Vec<Stroke> {
    let mut strokes = Vec::new();
    let Some(first) = fractals.first() else {
        return strokes;
    };
    let mut anchor = *first;

    for fx in &fractals[1..] {
        if fx.kind == anchor.kind {
            // Same kind: absorb noise by keeping the more extreme fractal.
            let more_extreme = match fx.kind {
                FractalKind::Top => fx.high > anchor.high,
                FractalKind::Bottom => fx.low < anchor.low,
            };
            if more_extreme {
                anchor = *fx;
            }
            continue;
        }

        if fx.merged_index - anchor.merged_index < min_gap {
            continue;
        }
        if min_amplitude > 0.0 && (fx.price - anchor.price).abs() < min_amplitude {
            continue;
        }

        // Opposite kind at sufficient distance: the price ordering must
        // still hold (an up stroke ends above where it starts).
        let direction = match anchor.kind {
            FractalKind::Bottom => {
                if fx.price <= anchor.price {
                    continue;
                }
                Trend::Up
            }
            FractalKind::Top => {
                if fx.price >= anchor.price {
                    continue;
                }
                Trend::Down
            }
        };

        strokes.push(Stroke {
            start: anchor,
            end: *fx,
            direction,
            momentum_area: 0.0,
            momentum_peak: 0.0,
            volume: 0.0,
            raw_start: 0,
            raw_end: 0,
        });
        anchor = *fx;
    }

    tracing::debug!(count = strokes.len(), "stroke construction complete");
    strokes
}

/// Attach momentum metrics to freshly built strokes.
///
/// Each stroke's fractal span is mapped back to raw-bar indices through its
/// endpoint merged bars (first constituent of the start bar, last
/// constituent of the end bar), then the oscillator histogram is integrated
/// over that range. Out-of-range spans are left zeroed rather than erroring.
pub fn attach_momentum<T: Ohlcv>(
    strokes: &mut [Stroke],
    merged: &[MergedBar],
    bars: &[T],
    macd: &MacdSeries,
) {
    for stroke in strokes.iter_mut() {
        let (Some(start_bar), Some(end_bar)) = (
            merged.get(stroke.start.merged_index),
            merged.get(stroke.end.merged_index),
        ) else {
            continue;
        };

        let s = start_bar.start_index;
        let e = end_bar.end_index;
        stroke.raw_start = s;
        stroke.raw_end = e;

        if s > e || e >= macd.hist.len() {
            continue;
        }

        stroke.momentum_area = macd.hist[s..=e].iter().map(|h| h.abs()).sum();
        let dif = &macd.dif[s..=e];
        stroke.momentum_peak = match stroke.direction {
            Trend::Up => dif.iter().copied().fold(f64::MIN, f64::max),
            Trend::Down => dif.iter().copied().fold(f64::MAX, f64::min),
        };
        if e < bars.len() {
            stroke.volume = bars[s..=e].iter().map(|b| b.volume()).sum();
        }
    }
}
