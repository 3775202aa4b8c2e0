//! # chanscan - Chan Theory structural analysis
//!
//! Identifies recurring price-structure patterns in an ordered bar series
//! and classifies bar transitions into class 1/2/3 buy/sell points:
//! inclusion merging, fractal detection, stroke (Bi) construction, center
//! (ZhongShu) detection, divergence-based classification, multi-dimensional
//! scoring, and filtering/confirmation.
//!
//! ## Quick Start
//!
//! ```rust
//! use chanscan::prelude::*;
//! use chrono::{TimeZone, Utc};
//!
//! // Any type implementing `Ohlcv` works; `Bar` is provided.
//! let bars: Vec<Bar> = (0..120)
//!     .map(|i| {
//!         let t = Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap();
//!         let phase = (i % 20) as f64;
//!         let mid = 100.0 + if phase < 10.0 { phase } else { 20.0 - phase } * 3.0;
//!         Bar::new(t, mid - 0.2, mid + 1.0, mid - 1.0, mid + 0.2, 1_000.0)
//!     })
//!     .collect();
//!
//! let analyzer = Analyzer::new();
//! let analysis = analyzer.analyze(&bars);
//! for signal in analysis.accepted_signals() {
//!     println!("{} at {} ({})", signal.kind, signal.price, signal.description);
//! }
//! ```
//!
//! Each analysis run is self-contained: no state is shared between runs or
//! symbols, so one [`Analyzer`] can serve many independent series (see
//! [`analyze_parallel`]).

pub mod center;
pub mod config;
pub mod filter;
pub mod fractal;
pub mod indicators;
pub mod merge;
pub mod position;
pub mod score;
pub mod signal;
pub mod stroke;

pub use center::{find_centers, Center};
pub use fractal::{find_fractals, Fractal, FractalKind};
pub use merge::{merge_bars, MergedBar};
pub use stroke::{attach_momentum, build_strokes, Stroke, MIN_FRACTAL_GAP};

use chrono::{DateTime, Utc};

use config::AnalyzerConfig;
use filter::{MarketState, SignalFilter};
use indicators::MacdSeries;
use position::PositionSizer;
use signal::Signal;

pub mod prelude {
    pub use crate::{
        // Stages
        attach_momentum,
        build_strokes,
        // Parallel
        analyze_parallel,
        find_centers,
        find_fractals,
        merge_bars,
        validate_series,
        // Engine
        Analysis,
        Analyzer,
        AnalyzerBuilder,
        // Types
        Bar,
        Center,
        // Errors
        ChanError,
        Fractal,
        FractalKind,
        MergedBar,
        Ohlcv,
        OhlcvExt,
        Result,
        Stroke,
        SymbolAnalysis,
        Trend,
    };

    pub use crate::config::{
        AnalyzerConfig, FilterConfig, MacdParams, ScoreWeights, ScorerConfig,
    };
    pub use crate::filter::{ConfirmContext, MarketState, SignalFilter};
    pub use crate::indicators::MacdSeries;
    pub use crate::position::{PositionAdvice, PositionSizer};
    pub use crate::score::{ScoreBreakdown, SignalFeatures};
    pub use crate::signal::{Side, Signal, SignalClass, SignalKind};
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, ChanError>;

/// Errors surfaced by configuration loading and input validation. The
/// pipeline stages themselves never fail; degenerate input just produces
/// fewer structures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChanError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Scoring weights must sum to 100, got {total}")]
    WeightSum { total: f64 },

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },
}

// ============================================================
// CORE TYPES
// ============================================================

/// Swing direction, also the inclusion merger's running trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    #[inline]
    pub fn is_up(self) -> bool {
        matches!(self, Trend::Up)
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Trend::Up => Trend::Down,
            Trend::Down => Trend::Up,
        }
    }
}

/// Core OHLCV input trait. Timestamps must be strictly increasing across a
/// series (see [`validate_series`]).
pub trait Ohlcv {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Extension trait with computed bar properties.
pub trait OhlcvExt: Ohlcv {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Validate price consistency for this bar.
    fn validate(&self) -> Result<()> {
        if self.high() < self.low() {
            return Err(ChanError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
        {
            return Err(ChanError::InvalidBar {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(ChanError::InvalidBar {
                index: 0,
                reason: "infinite value in OHLCV",
            });
        }
        Ok(())
    }
}

impl<T: Ohlcv> OhlcvExt for T {}

/// Concrete bar type for callers without their own.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl Ohlcv for Bar {
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
        self.volume
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Validate a whole series upfront: consistent prices and strictly
/// increasing timestamps. Optional — the pipeline degrades gracefully on
/// malformed input — but useful at ingestion boundaries.
pub fn validate_series<T: Ohlcv>(bars: &[T]) -> Result<()> {
    let mut prev_ts: Option<DateTime<Utc>> = None;
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            ChanError::InvalidBar { reason, .. } => ChanError::InvalidBar { index: i, reason },
            other => other,
        })?;
        if let Some(prev) = prev_ts {
            if bar.timestamp() <= prev {
                return Err(ChanError::InvalidBar {
                    index: i,
                    reason: "non-increasing timestamp",
                });
            }
        }
        prev_ts = Some(bar.timestamp());
    }
    Ok(())
}

// ============================================================
// ANALYZER
// ============================================================

/// Output of one analysis run. All sequences preserve input time order and
/// signals reference strokes/centers by index into these arenas.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Analysis {
    pub merged: Vec<MergedBar>,
    pub fractals: Vec<Fractal>,
    pub strokes: Vec<Stroke>,
    pub centers: Vec<Center>,
    pub signals: Vec<Signal>,
}

impl Analysis {
    /// Signals that passed the point-in-time filter.
    pub fn accepted_signals(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|s| s.accepted)
    }
}

/// The analysis engine. Owns validated configuration; carries no per-run
/// state, so a single instance can analyze any number of independent
/// series.
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
    sizer: PositionSizer,
    filter: SignalFilter,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// Engine with default configuration.
    pub fn new() -> Self {
        let config = AnalyzerConfig::default();
        Self {
            sizer: PositionSizer::new(config.capital),
            filter: SignalFilter::new(config.filter.clone()),
            config,
        }
    }

    /// Engine with a custom configuration, validated up front.
    pub fn with_config(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sizer: PositionSizer::new(config.capital),
            filter: SignalFilter::new(config.filter.clone()),
            config,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// The configured filter, for post-hoc confirmation calls.
    pub fn filter(&self) -> &SignalFilter {
        &self.filter
    }

    /// Run the full pipeline, computing the oscillator series and ATR from
    /// the bars themselves.
    pub fn analyze<T: Ohlcv>(&self, bars: &[T]) -> Analysis {
        let macd = indicators::macd(
            bars,
            self.config.macd.fast,
            self.config.macd.slow,
            self.config.macd.signal,
        );
        let atr = indicators::atr(bars, self.config.atr_period);
        self.analyze_with(bars, &macd, atr)
    }

    /// Run the full pipeline against an externally computed oscillator
    /// series (aligned index-for-index with `bars`) and ATR.
    pub fn analyze_with<T: Ohlcv>(&self, bars: &[T], macd: &MacdSeries, atr: f64) -> Analysis {
        let merged = merge::merge_bars(bars);
        let fractals = fractal::find_fractals(&merged);
        let mut strokes = stroke::build_strokes(
            &fractals,
            self.config.min_fractal_gap,
            self.config.min_stroke_amplitude,
        );
        stroke::attach_momentum(&mut strokes, &merged, bars, macd);
        let centers = center::find_centers(&strokes);
        let mut signals = signal::classify(
            bars,
            &merged,
            &strokes,
            &centers,
            atr,
            &self.config,
            &self.sizer,
        );

        let market = MarketState::from_window(bars, atr);
        for sig in &mut signals {
            sig.accepted = self.filter.accept(sig, &market);
        }

        tracing::debug!(
            bars = bars.len(),
            merged = merged.len(),
            fractals = fractals.len(),
            strokes = strokes.len(),
            centers = centers.len(),
            signals = signals.len(),
            "analysis complete"
        );

        Analysis {
            merged,
            fractals,
            strokes,
            centers,
            signals,
        }
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`Analyzer`] instances.
pub struct AnalyzerBuilder {
    config: AnalyzerConfig,
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            config: AnalyzerConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the scoring weights.
    pub fn weights(mut self, weights: config::ScoreWeights) -> Self {
        self.config.scorer.weights = weights;
        self
    }

    /// Scorer floor: signals below this never reach the filter.
    pub fn min_score(mut self, min_score: f64) -> Self {
        self.config.scorer.min_score = min_score;
        self
    }

    /// Replace the filter configuration.
    pub fn filter_config(mut self, filter: config::FilterConfig) -> Self {
        self.config.filter = filter;
        self
    }

    /// Absolute amplitude floor for closing a stroke (0 disables).
    pub fn min_stroke_amplitude(mut self, amplitude: f64) -> Self {
        self.config.min_stroke_amplitude = amplitude;
        self
    }

    /// Capital base for position advisories.
    pub fn capital(mut self, capital: f64) -> Self {
        self.config.capital = capital;
        self
    }

    /// Build the engine, validating the assembled configuration.
    pub fn build(self) -> Result<Analyzer> {
        Analyzer::with_config(self.config)
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Result of analyzing a single instrument.
#[derive(Debug)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub analysis: Analysis,
}

/// Analyze multiple instruments in parallel. Each series runs through a
/// fresh pipeline pass; no state leaks between symbols.
pub fn analyze_parallel<'a, T, I>(analyzer: &Analyzer, instruments: I) -> Vec<SymbolAnalysis>
where
    T: Ohlcv + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    instruments
        .into_par_iter()
        .map(|(symbol, bars)| SymbolAnalysis {
            symbol: symbol.to_string(),
            analysis: analyzer.analyze(bars),
        })
        .collect()
}

// ============================================================
// TEST SUPPORT
// ============================================================

#[cfg(test)]
pub(crate) mod test_util {
    use chrono::{DateTime, TimeZone, Utc};

    use crate::{Bar, Fractal, FractalKind, MergedBar, Stroke, Trend};

    pub fn ts(i: usize) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap()
    }

    pub fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(ts(i), open, high, low, close, 1_000.0)
    }

    /// Bars from (high, low) pairs; open/close sit at the midpoint.
    pub fn bars_from_hl(hl: &[(f64, f64)]) -> Vec<Bar> {
        hl.iter()
            .enumerate()
            .map(|(i, &(high, low))| {
                let mid = (high + low) / 2.0;
                bar(i, mid, high, low, mid)
            })
            .collect()
    }

    /// Merged bars built directly from (high, low) pairs, bypassing the
    /// merger.
    pub fn merged_from_hl(hl: &[(f64, f64)]) -> Vec<MergedBar> {
        hl.iter()
            .enumerate()
            .map(|(i, &(high, low))| MergedBar {
                start_index: i,
                end_index: i,
                timestamp: ts(i),
                open: (high + low) / 2.0,
                high,
                low,
                close: (high + low) / 2.0,
            })
            .collect()
    }

    pub fn fractal(kind: FractalKind, merged_index: usize, price: f64) -> Fractal {
        Fractal {
            kind,
            merged_index,
            price,
            high: price,
            low: price,
            timestamp: ts(merged_index),
        }
    }

    /// A fabricated stroke with momentum already attached; `seq` spaces the
    /// fractal and raw indices so sequences stay ordered.
    pub fn stroke_with(
        direction: Trend,
        start_price: f64,
        end_price: f64,
        area: f64,
        seq: usize,
    ) -> Stroke {
        let (start_kind, end_kind) = match direction {
            Trend::Up => (FractalKind::Bottom, FractalKind::Top),
            Trend::Down => (FractalKind::Top, FractalKind::Bottom),
        };
        Stroke {
            start: fractal(start_kind, seq * 5, start_price),
            end: fractal(end_kind, seq * 5 + 5, end_price),
            direction,
            momentum_area: area,
            momentum_peak: if direction.is_up() { area } else { -area },
            volume: 5_000.0,
            raw_start: seq * 5,
            raw_end: seq * 5 + 5,
        }
    }

    /// A stroke occupying the price range `[low, high]`.
    pub fn stroke_with_range(direction: Trend, low: f64, high: f64) -> Stroke {
        match direction {
            Trend::Up => stroke_with(Trend::Up, low, high, 1.0, 0),
            Trend::Down => stroke_with(Trend::Down, high, low, 1.0, 0),
        }
    }

    /// Identical bars around a constant price.
    pub fn flat_bars(n: usize, price: f64) -> Vec<Bar> {
        (0..n)
            .map(|i| bar(i, price, price + 1.0, price - 1.0, price))
            .collect()
    }

    /// Triangle-wave bars: ten-bar period, never mutually inclusive.
    pub fn zigzag_bars(n: usize, base: f64, amp: f64) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let phase = (i % 10) as f64;
                let tri = if phase < 5.0 { phase } else { 10.0 - phase };
                let mid = base + tri * amp;
                bar(i, mid - 0.2, mid + 1.0, mid - 1.0, mid + 0.2)
            })
            .collect()
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{bar, ts, zigzag_bars};

    #[test]
    fn test_builder_defaults() {
        assert!(AnalyzerBuilder::new().build().is_ok());
    }

    #[test]
    fn test_builder_rejects_bad_weights() {
        let weights = config::ScoreWeights {
            structure: 99.0,
            ..config::ScoreWeights::default()
        };
        assert!(matches!(
            AnalyzerBuilder::new().weights(weights).build(),
            Err(ChanError::WeightSum { .. })
        ));
    }

    #[test]
    fn test_empty_series() {
        let analysis = Analyzer::new().analyze(&Vec::<Bar>::new());
        assert!(analysis.merged.is_empty());
        assert!(analysis.signals.is_empty());
    }

    #[test]
    fn test_short_series_produces_empty_stages() {
        let bars = vec![bar(0, 10.0, 11.0, 9.0, 10.0), bar(1, 12.0, 13.0, 11.0, 12.0)];
        let analysis = Analyzer::new().analyze(&bars);
        assert!(analysis.fractals.is_empty());
        assert!(analysis.strokes.is_empty());
        assert!(analysis.centers.is_empty());
    }

    #[test]
    fn test_zigzag_produces_structures() {
        let bars = zigzag_bars(120, 100.0, 5.0);
        let analysis = Analyzer::new().analyze(&bars);
        assert!(!analysis.fractals.is_empty());
        assert!(analysis.strokes.len() >= 2);
        // Stroke alternation: each stroke starts at the previous one's end.
        for pair in analysis.strokes.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        for c in &analysis.centers {
            assert!(c.zg > c.zd);
        }
    }

    #[test]
    fn test_validate_series() {
        let good = vec![bar(0, 10.0, 11.0, 9.0, 10.0), bar(1, 10.0, 11.0, 9.0, 10.0)];
        assert!(validate_series(&good).is_ok());

        let bad_price = vec![bar(0, 10.0, 9.0, 11.0, 10.0)];
        assert!(matches!(
            validate_series(&bad_price),
            Err(ChanError::InvalidBar { index: 0, .. })
        ));

        let mut bad_ts = good.clone();
        bad_ts[1].timestamp = ts(0);
        assert!(matches!(
            validate_series(&bad_ts),
            Err(ChanError::InvalidBar { index: 1, .. })
        ));
    }

    #[test]
    fn test_parallel_analysis() {
        let analyzer = Analyzer::new();
        let a = zigzag_bars(100, 100.0, 5.0);
        let b = zigzag_bars(100, 200.0, 3.0);
        let instruments: Vec<(&str, &[Bar])> = vec![("RB", &a), ("HC", &b)];

        let mut results = analyze_parallel(&analyzer, instruments);
        results.sort_by(|x, y| x.symbol.cmp(&y.symbol));
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].symbol, "HC");
        assert!(!results[1].analysis.strokes.is_empty());
    }

    #[test]
    fn test_external_oscillator_matches_internal() {
        let bars = zigzag_bars(100, 100.0, 5.0);
        let analyzer = Analyzer::new();
        let macd = indicators::macd(&bars, 12, 26, 9);
        let atr = indicators::atr(&bars, 14);
        let internal = analyzer.analyze(&bars);
        let external = analyzer.analyze_with(&bars, &macd, atr);
        assert_eq!(internal, external);
    }
}
