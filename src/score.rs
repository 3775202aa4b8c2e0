//! Multi-dimensional signal scoring.
//!
//! Eight independent dimensions, each scored into [0, 100], combined as a
//! weighted average. The weight table is validated at configuration load
//! (sum = 100); by the time scoring runs it is trusted.

use crate::config::ScoreWeights;
use crate::signal::Side;

/// Per-signal feature record consumed by the scorer.
///
/// Built by the classifier from the structures that fired the signal plus
/// window-level context (volumes, price range).
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct SignalFeatures {
    /// The class-specific geometry held in full.
    pub structure_complete: bool,
    /// Geometry quality, 0-100 (trend depth, departure strength, ...).
    pub structure_quality: f64,
    /// Ratio-derived divergence strength, 0-100.
    pub divergence: f64,
    /// Per-bar volume over the signal stroke.
    pub volume: f64,
    /// Per-bar volume over the whole analysis window.
    pub avg_volume: f64,
    /// Raw bars spanned by the structure leading into the signal.
    pub trend_duration: f64,
    /// Relative position of the signal price in the window range, 0 (low)
    /// to 100 (high).
    pub position_level: f64,
    /// Sub-level structure visible inside the signal stroke.
    pub sub_level_structure: bool,
    /// Raw momentum value, 0-100.
    pub momentum: f64,
    /// The closing fractal was confirmed by the following merged bar.
    pub fractal_confirmed: bool,
}

/// Per-dimension score breakdown, each entry already clamped to [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ScoreBreakdown {
    pub structure: f64,
    pub divergence: f64,
    pub volume_price: f64,
    pub time: f64,
    pub position: f64,
    pub sub_level: f64,
    pub strength: f64,
    pub confirmation: f64,
}

/// Score a feature record. Returns the weighted total and the breakdown.
pub fn score(features: &SignalFeatures, side: Side, weights: &ScoreWeights) -> (f64, ScoreBreakdown) {
    let breakdown = ScoreBreakdown {
        structure: clamp(score_structure(features)),
        divergence: clamp(features.divergence),
        volume_price: clamp(score_volume_price(features)),
        time: clamp(score_time(features)),
        position: clamp(score_position(features, side)),
        sub_level: if features.sub_level_structure { 100.0 } else { 0.0 },
        strength: clamp(features.momentum),
        confirmation: if features.fractal_confirmed { 100.0 } else { 0.0 },
    };

    let pairs = [
        (breakdown.structure, weights.structure),
        (breakdown.divergence, weights.divergence),
        (breakdown.volume_price, weights.volume_price),
        (breakdown.time, weights.time),
        (breakdown.position, weights.position),
        (breakdown.sub_level, weights.sub_level),
        (breakdown.strength, weights.strength),
        (breakdown.confirmation, weights.confirmation),
    ];

    let mut total = 0.0;
    let mut total_weight = 0.0;
    for (value, weight) in pairs {
        if weight > 0.0 {
            total += value * weight;
            total_weight += weight;
        }
    }

    let final_score = if total_weight > 0.0 {
        total / total_weight
    } else {
        0.0
    };
    (final_score, breakdown)
}

#[inline]
fn clamp(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

fn score_structure(features: &SignalFeatures) -> f64 {
    let mut s = 0.0;
    if features.structure_complete {
        s += 50.0;
    }
    s + features.structure_quality.clamp(0.0, 100.0) * 0.5
}

fn score_volume_price(features: &SignalFeatures) -> f64 {
    if features.avg_volume <= 0.0 {
        return 50.0;
    }
    let ratio = features.volume / features.avg_volume;
    if ratio > 2.0 {
        100.0
    } else if ratio > 1.5 {
        80.0
    } else if ratio > 1.0 {
        60.0
    } else {
        40.0
    }
}

fn score_time(features: &SignalFeatures) -> f64 {
    if features.trend_duration > 100.0 {
        90.0
    } else if features.trend_duration > 50.0 {
        70.0
    } else {
        50.0
    }
}

fn score_position(features: &SignalFeatures, side: Side) -> f64 {
    // Buys score higher when the signal sits low in the window range,
    // sells the opposite.
    match side {
        Side::Buy => 100.0 - features.position_level,
        Side::Sell => features.position_level,
    }
}
