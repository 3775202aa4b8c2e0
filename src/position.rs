//! Position sizing advisories and structural stop placement.

use crate::signal::{Side, SignalClass, SignalKind};

/// A sizing suggestion attached to an accepted signal.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PositionAdvice {
    /// Fraction of capital to commit.
    pub ratio: f64,
    /// Capital amount at the configured base.
    pub amount: f64,
    pub description: String,
}

/// Maps signal kinds to base/max exposure fractions.
#[derive(Debug, Clone, Copy)]
pub struct PositionSizer {
    pub capital: f64,
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self { capital: 100_000.0 }
    }
}

impl PositionSizer {
    pub fn new(capital: f64) -> Self {
        Self { capital }
    }

    /// Base exposure per class: divergence entries carry the most size,
    /// continuation entries the least.
    pub fn advise(&self, kind: SignalKind) -> PositionAdvice {
        let (base, label) = match kind.class {
            SignalClass::First => (0.10, "trend divergence"),
            SignalClass::Second => (0.07, "pullback entry"),
            SignalClass::Third => (0.05, "trend continuation"),
        };
        let side = match kind.side {
            Side::Buy => "buy",
            Side::Sell => "sell",
        };
        PositionAdvice {
            ratio: base,
            amount: self.capital * base,
            description: format!("{label} {side} - base {}%", (base * 100.0) as u32),
        }
    }
}

/// Stop buffer below/above the structural extreme: half an ATR, falling back
/// to 0.2% of price when no ATR is available.
#[inline]
pub fn stop_buffer(price: f64, atr: f64) -> f64 {
    if atr > 0.0 {
        0.5 * atr
    } else {
        price * 0.002
    }
}

/// Structural stop: the signal stroke's extreme, buffered away from price.
#[inline]
pub fn structural_stop(side: Side, extreme: f64, price: f64, atr: f64) -> f64 {
    let buffer = stop_buffer(price, atr);
    match side {
        Side::Buy => extreme - buffer,
        Side::Sell => extreme + buffer,
    }
}
