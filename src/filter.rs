//! Signal filtering and post-hoc confirmation.
//!
//! The filter is a point-in-time gate chain evaluated on the signal bar:
//! hard conditions, exclusion rules, the score floor, market state, then
//! risk. It short-circuits on the first failure. Confirmation is a separate,
//! idempotent checklist evaluated on any later bar until the caller either
//! confirms or abandons the signal.

use crate::config::FilterConfig;
use crate::signal::{Side, Signal, SignalClass};

/// Market context at filter time. Callers supply real session/limit data;
/// [`MarketState::from_window`](MarketState::from_window) derives a
/// best-effort state from the analyzed bars themselves.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarketState {
    pub current_price: f64,
    /// Bar-to-bar move as a percentage of price, for the limit-move gate.
    pub range_percent: f64,
    pub low_liquidity: bool,
    pub atr: f64,
    /// Volatility floor; 0 disables the market-state gate.
    pub min_atr: f64,
}

impl MarketState {
    /// Derive a market state from the tail of a bar window.
    pub fn from_window<T: crate::Ohlcv>(bars: &[T], atr: f64) -> Self {
        let current_price = bars.last().map(|b| b.close()).unwrap_or(0.0);
        let range_percent = match bars.len() {
            0 | 1 => 0.0,
            n => {
                let prev = bars[n - 2].close();
                if prev > 0.0 {
                    ((bars[n - 1].close() - prev) / prev * 100.0).abs()
                } else {
                    0.0
                }
            }
        };
        Self {
            current_price,
            range_percent,
            low_liquidity: false,
            atr,
            min_atr: 0.0,
        }
    }
}

/// Context for the post-hoc confirmation checklist, assembled by the caller
/// from bars after the signal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfirmContext {
    pub current_price: f64,
    /// A fractal in the signal direction printed after the signal bar.
    pub fractal_confirmed: bool,
    pub volume_increase: bool,
    /// Volume contracted during the pullback.
    pub volume_shrink: bool,
    pub sub_level_buy: bool,
    pub sub_level_sell: bool,
}

/// Applies the configured gates to scored signals.
#[derive(Debug, Clone)]
pub struct SignalFilter {
    config: FilterConfig,
}

impl SignalFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Point-in-time accept/reject. All gates must pass.
    pub fn accept(&self, signal: &Signal, market: &MarketState) -> bool {
        if !self.hard_conditions(signal) {
            tracing::debug!(kind = signal.kind.label(), "rejected: hard conditions");
            return false;
        }
        if !self.exclusion_conditions(market) {
            tracing::debug!(kind = signal.kind.label(), "rejected: exclusion rule");
            return false;
        }
        if signal.score < self.config.min_score {
            tracing::debug!(
                kind = signal.kind.label(),
                score = signal.score,
                "rejected: below filter score floor"
            );
            return false;
        }
        if !self.market_state_ok(market) {
            tracing::debug!(kind = signal.kind.label(), "rejected: market state");
            return false;
        }
        if !self.risk_ok(signal) {
            tracing::debug!(kind = signal.kind.label(), "rejected: stop distance");
            return false;
        }
        true
    }

    fn hard_conditions(&self, signal: &Signal) -> bool {
        if self.config.check_structure_complete && !signal.features.structure_complete {
            return false;
        }
        if self.config.check_fractal_confirmation && !signal.features.fractal_confirmed {
            return false;
        }
        if self.config.check_position_clear {
            let level = signal.features.position_level;
            if !level.is_finite() || !(0.0..=100.0).contains(&level) {
                return false;
            }
        }
        true
    }

    fn exclusion_conditions(&self, market: &MarketState) -> bool {
        if self.config.limit_move_percent > 0.0
            && market.range_percent >= self.config.limit_move_percent
        {
            return false;
        }
        if market.low_liquidity {
            return false;
        }
        true
    }

    fn market_state_ok(&self, market: &MarketState) -> bool {
        market.min_atr <= 0.0 || market.atr >= market.min_atr
    }

    fn risk_ok(&self, signal: &Signal) -> bool {
        let Some(stop) = signal.stop_loss else {
            return true;
        };
        if signal.price <= 0.0 {
            return false;
        }
        let stop_percent = (signal.price - stop).abs() / signal.price * 100.0;
        stop_percent <= self.config.max_stop_percent
    }

    /// Post-hoc confirmation. Class 1 requires at least 3 of its 4
    /// conditions; classes 2 and 3 require at least 2. Safe to re-evaluate
    /// on every new bar.
    pub fn confirm(&self, signal: &Signal, ctx: &ConfirmContext) -> bool {
        let favorable = match signal.kind.side {
            Side::Buy => ctx.current_price > signal.price,
            Side::Sell => ctx.current_price < signal.price,
        };
        let sub_level = match signal.kind.side {
            Side::Buy => ctx.sub_level_buy,
            Side::Sell => ctx.sub_level_sell,
        };

        let (satisfied, required) = match signal.kind.class {
            SignalClass::First => (
                count(&[
                    favorable,
                    ctx.fractal_confirmed,
                    ctx.volume_increase,
                    sub_level,
                ]),
                3,
            ),
            SignalClass::Second => {
                (count(&[favorable, ctx.fractal_confirmed, ctx.volume_shrink]), 2)
            }
            SignalClass::Third => {
                let broke_leave = match (signal.leave_extreme, signal.kind.side) {
                    (Some(extreme), Side::Buy) => ctx.current_price > extreme,
                    (Some(extreme), Side::Sell) => ctx.current_price < extreme,
                    (None, _) => false,
                };
                let volume_pattern = ctx.volume_increase || ctx.volume_shrink;
                (
                    count(&[favorable, sub_level, volume_pattern, broke_leave]),
                    2,
                )
            }
        };

        satisfied >= required
    }
}

#[inline]
fn count(conditions: &[bool]) -> usize {
    conditions.iter().filter(|c| **c).count()
}
