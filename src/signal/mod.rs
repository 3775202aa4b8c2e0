//! Buy/sell point classification.
//!
//! For every candidate stroke the three class detectors run independently
//! against the typed context (strokes, centers, previously emitted signals,
//! ATR). Classes inspect disjoint stroke windows, so one stroke may emit
//! more than one signal. A failed center or anchor lookup means "not
//! applicable" — never an error.

mod first;
mod second;
mod third;

use chrono::{DateTime, Utc};

use crate::config::AnalyzerConfig;
use crate::position::{PositionAdvice, PositionSizer};
use crate::score::{self, ScoreBreakdown, SignalFeatures};
use crate::{Center, Fractal, FractalKind, MergedBar, Ohlcv, Stroke, Trend};

/// Momentum-area shrinkage required for a class-1 divergence: the departing
/// stroke must carry less than 70% of the entering stroke's area.
pub const DIVERGENCE_RATIO: f64 = 0.7;

/// Trade side of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// A down stroke ends at a bottom and is a buy candidate; an up stroke
    /// is the mirror.
    #[inline]
    pub(crate) fn of_stroke(direction: Trend) -> Self {
        match direction {
            Trend::Down => Side::Buy,
            Trend::Up => Side::Sell,
        }
    }
}

/// The three canonical entry-point classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SignalClass {
    /// Trend-divergence reversal.
    First,
    /// Pullback that fails to retest the prior extreme.
    Second,
    /// Center departure whose retest never re-enters the band.
    Third,
}

impl SignalClass {
    #[inline]
    pub fn number(self) -> u8 {
        match self {
            SignalClass::First => 1,
            SignalClass::Second => 2,
            SignalClass::Third => 3,
        }
    }
}

/// Class and side together identify a signal type ("1B", "3S", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SignalKind {
    pub class: SignalClass,
    pub side: Side,
}

impl SignalKind {
    pub fn label(self) -> &'static str {
        match (self.class, self.side) {
            (SignalClass::First, Side::Buy) => "1B",
            (SignalClass::First, Side::Sell) => "1S",
            (SignalClass::Second, Side::Buy) => "2B",
            (SignalClass::Second, Side::Sell) => "2S",
            (SignalClass::Third, Side::Buy) => "3B",
            (SignalClass::Third, Side::Sell) => "3S",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified, scored buy/sell point.
///
/// Signals reference strokes and centers by index into the analysis arenas;
/// they never own or mutate them.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    /// Index of the stroke that fired the signal.
    pub stroke: usize,
    /// Index of the supporting center; class-2 signals carry none.
    pub center: Option<usize>,
    pub description: String,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub advice: Option<PositionAdvice>,
    pub features: SignalFeatures,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// Extreme of the departing stroke, kept for class-3 confirmation.
    pub leave_extreme: Option<f64>,
    /// Set by the point-in-time filter.
    pub accepted: bool,
    /// Set by the post-hoc confirmation check.
    pub confirmed: bool,
}

/// Everything a class detector may read, assembled once per stroke.
pub(crate) struct ClassifyContext<'a, T: Ohlcv> {
    pub bars: &'a [T],
    pub merged: &'a [MergedBar],
    pub strokes: &'a [Stroke],
    pub centers: &'a [Center],
    /// Signals emitted for earlier strokes (class 2 anchors on these).
    pub emitted: &'a [Signal],
    pub atr: f64,
}

/// Class-detector output before features and scoring are attached.
pub(crate) struct Candidate {
    pub kind: SignalKind,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub stroke: usize,
    pub center: Option<usize>,
    pub description: String,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub leave_extreme: Option<f64>,
    pub structure_quality: f64,
    pub divergence: f64,
}

/// Window-level aggregates shared by all feature records of one run.
struct WindowStats {
    avg_volume: f64,
    low: f64,
    high: f64,
    mean_area: f64,
}

impl WindowStats {
    fn compute<T: Ohlcv>(bars: &[T], strokes: &[Stroke]) -> Self {
        let n = bars.len().max(1) as f64;
        let avg_volume = bars.iter().map(|b| b.volume()).sum::<f64>() / n;
        let low = bars.iter().map(|b| b.low()).fold(f64::MAX, f64::min);
        let high = bars.iter().map(|b| b.high()).fold(f64::MIN, f64::max);
        let mean_area = if strokes.is_empty() {
            0.0
        } else {
            strokes.iter().map(|s| s.momentum_area).sum::<f64>() / strokes.len() as f64
        };
        Self {
            avg_volume,
            low,
            high,
            mean_area,
        }
    }
}

/// Run all three class detectors over every candidate stroke, score the
/// results and keep those clearing the scorer floor.
pub(crate) fn classify<T: Ohlcv>(
    bars: &[T],
    merged: &[MergedBar],
    strokes: &[Stroke],
    centers: &[Center],
    atr: f64,
    config: &AnalyzerConfig,
    sizer: &PositionSizer,
) -> Vec<Signal> {
    let mut signals: Vec<Signal> = Vec::new();
    if strokes.len() < 3 {
        return signals;
    }

    let window = WindowStats::compute(bars, strokes);

    for i in 2..strokes.len() {
        let candidates: Vec<Candidate> = {
            let ctx = ClassifyContext {
                bars,
                merged,
                strokes,
                centers,
                emitted: &signals,
                atr,
            };
            [
                first::detect(i, &ctx),
                second::detect(i, &ctx),
                third::detect(i, &ctx),
            ]
            .into_iter()
            .flatten()
            .collect()
        };

        for candidate in candidates {
            let features = build_features(&candidate, bars, merged, strokes, centers, &window);
            let (total, breakdown) =
                score::score(&features, candidate.kind.side, &config.scorer.weights);

            if total < config.scorer.min_score {
                tracing::debug!(
                    kind = candidate.kind.label(),
                    stroke = candidate.stroke,
                    score = total,
                    "signal below scorer floor, dropped"
                );
                continue;
            }

            tracing::info!(
                kind = candidate.kind.label(),
                price = candidate.price,
                score = total,
                "signal emitted"
            );

            signals.push(Signal {
                advice: Some(sizer.advise(candidate.kind)),
                kind: candidate.kind,
                price: candidate.price,
                timestamp: candidate.timestamp,
                stroke: candidate.stroke,
                center: candidate.center,
                description: candidate.description,
                stop_loss: candidate.stop_loss,
                take_profit: candidate.take_profit,
                features,
                score: total,
                breakdown,
                leave_extreme: candidate.leave_extreme,
                accepted: false,
                confirmed: false,
            });
        }
    }

    signals
}

fn build_features<T: Ohlcv>(
    candidate: &Candidate,
    bars: &[T],
    merged: &[MergedBar],
    strokes: &[Stroke],
    centers: &[Center],
    window: &WindowStats,
) -> SignalFeatures {
    let stroke = &strokes[candidate.stroke];
    let side = candidate.kind.side;

    let volume = stroke.volume / stroke.bar_count() as f64;

    // Duration runs from the structure's first stroke (the supporting
    // center's opening stroke, or four strokes back for centerless class-2
    // signals) to the end of the signal stroke, in raw bars.
    let origin_stroke = candidate
        .center
        .and_then(|c| centers.get(c))
        .map(|c| c.start_stroke)
        .unwrap_or_else(|| candidate.stroke.saturating_sub(4));
    let trend_duration =
        (stroke.raw_end.saturating_sub(strokes[origin_stroke].raw_start) + 1) as f64;

    let range = window.high - window.low;
    let position_level = if range > 0.0 {
        ((candidate.price - window.low) / range * 100.0).clamp(0.0, 100.0)
    } else {
        50.0
    };

    let momentum = if window.mean_area > 0.0 {
        (stroke.momentum_area / window.mean_area * 50.0).min(100.0)
    } else {
        50.0
    };

    SignalFeatures {
        structure_complete: true,
        structure_quality: candidate.structure_quality,
        divergence: candidate.divergence,
        volume,
        avg_volume: window.avg_volume,
        trend_duration,
        position_level,
        sub_level_structure: has_sub_level_structure(bars, stroke, side),
        momentum,
        fractal_confirmed: fractal_confirmed(merged, &stroke.end, side),
    }
}

/// Sub-level structure inside the signal stroke: the last raw bar of the
/// span already turns in the signal direction (favorable close or a long
/// shadow on the signal side). Spans shorter than four bars carry no
/// readable sub-level structure.
fn has_sub_level_structure<T: Ohlcv>(bars: &[T], stroke: &Stroke, side: Side) -> bool {
    if stroke.raw_end >= bars.len() || stroke.raw_end < stroke.raw_start {
        return false;
    }
    let span = &bars[stroke.raw_start..=stroke.raw_end];
    if span.len() < 4 {
        return false;
    }
    let last = &span[span.len() - 1];
    let range = last.high() - last.low();
    if range <= 0.0 {
        return false;
    }
    match side {
        Side::Buy => {
            let lower_shadow = last.open().min(last.close()) - last.low();
            last.close() > last.open() || lower_shadow > range * 0.4
        }
        Side::Sell => {
            let upper_shadow = last.high() - last.open().max(last.close());
            last.close() < last.open() || upper_shadow > range * 0.4
        }
    }
}

/// The fractal-pause rule: the merged bar after the closing fractal must
/// close beyond the fractal bar's extreme in the signal direction.
fn fractal_confirmed(merged: &[MergedBar], fx: &Fractal, side: Side) -> bool {
    let Some(next) = merged.get(fx.merged_index + 1) else {
        return false;
    };
    match side {
        Side::Buy => {
            debug_assert_eq!(fx.kind, FractalKind::Bottom);
            next.close > fx.high
        }
        Side::Sell => {
            debug_assert_eq!(fx.kind, FractalKind::Top);
            next.close < fx.low
        }
    }
}
