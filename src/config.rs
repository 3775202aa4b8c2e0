//! Configuration for the scorer, filter and engine parameters.
//!
//! Configs load from TOML with serde: unknown keys are ignored, missing keys
//! fall back to their defaults, and structural invariants (the scoring
//! weights summing to 100) are validated once at load time — never silently
//! normalized and never re-checked at score time.

use std::path::Path;

use crate::{ChanError, Result};

/// Named weights for the eight scoring dimensions. Must sum to 100.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub structure: f64,
    pub divergence: f64,
    pub volume_price: f64,
    pub time: f64,
    pub position: f64,
    pub sub_level: f64,
    pub strength: f64,
    pub confirmation: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            structure: 20.0,
            divergence: 20.0,
            volume_price: 10.0,
            time: 10.0,
            position: 10.0,
            sub_level: 10.0,
            strength: 10.0,
            confirmation: 10.0,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.structure
            + self.divergence
            + self.volume_price
            + self.time
            + self.position
            + self.sub_level
            + self.strength
            + self.confirmation
    }

    pub fn validate(&self) -> Result<()> {
        let total = self.total();
        if (total - 100.0).abs() > 0.01 {
            return Err(ChanError::WeightSum { total });
        }
        Ok(())
    }
}

/// Scoring configuration: dimension weights plus the pre-filter floor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub weights: ScoreWeights,
    /// Signals scoring below this are dropped before the filter stage.
    pub min_score: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            min_score: 60.0,
        }
    }
}

impl ScorerConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        if !(0.0..=100.0).contains(&self.min_score) {
            return Err(ChanError::OutOfRange {
                field: "scorer.min_score",
                value: self.min_score,
                min: 0.0,
                max: 100.0,
            });
        }
        Ok(())
    }
}

/// Filtering configuration: hard-condition toggles, exclusion thresholds and
/// acceptance floors.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub check_structure_complete: bool,
    pub check_position_clear: bool,
    pub check_fractal_confirmation: bool,
    /// Reject when the bar-to-bar move reaches this percentage of price
    /// (proximity to a limit move). 0 disables the check.
    pub limit_move_percent: f64,
    /// Width of the low-liquidity session window, in minutes. Informational
    /// for callers building a [`MarketState`](crate::filter::MarketState);
    /// the filter itself reacts to the session flag.
    pub low_liquidity_window_minutes: u32,
    pub min_score: f64,
    /// Reject when the stop distance exceeds this percentage of price.
    pub max_stop_percent: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            check_structure_complete: true,
            check_position_clear: true,
            check_fractal_confirmation: true,
            limit_move_percent: 2.0,
            low_liquidity_window_minutes: 30,
            min_score: 70.0,
            max_stop_percent: 2.0,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.limit_move_percent < 0.0 {
            return Err(ChanError::InvalidValue(
                "filter.limit_move_percent must be >= 0",
            ));
        }
        if self.max_stop_percent <= 0.0 {
            return Err(ChanError::InvalidValue(
                "filter.max_stop_percent must be > 0",
            ));
        }
        Ok(())
    }
}

/// MACD spans used when the engine computes its own oscillator series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub scorer: ScorerConfig,
    pub filter: FilterConfig,
    /// Minimum merged-bar gap between a stroke's fractals.
    pub min_fractal_gap: usize,
    /// Absolute price-amplitude floor for closing a stroke (0 disables).
    pub min_stroke_amplitude: f64,
    pub macd: MacdParams,
    pub atr_period: usize,
    /// Capital base for position advisories.
    pub capital: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            scorer: ScorerConfig::default(),
            filter: FilterConfig::default(),
            min_fractal_gap: crate::stroke::MIN_FRACTAL_GAP,
            min_stroke_amplitude: 0.0,
            macd: MacdParams::default(),
            atr_period: 14,
            capital: 100_000.0,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        self.scorer.validate()?;
        self.filter.validate()?;
        if self.min_fractal_gap == 0 {
            return Err(ChanError::InvalidValue("min_fractal_gap must be > 0"));
        }
        if self.macd.fast == 0 || self.macd.slow == 0 || self.macd.signal == 0 {
            return Err(ChanError::InvalidValue("macd spans must be > 0"));
        }
        if self.atr_period == 0 {
            return Err(ChanError::InvalidValue("atr_period must be > 0"));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| ChanError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ChanError::InvalidConfig(e.to_string()))?;
        Self::from_toml_str(&text)
    }
}
