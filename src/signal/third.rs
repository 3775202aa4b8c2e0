//! Class-3 detection: a center departure whose immediate retest never
//! re-enters the overlap band.
//!
//! The leave stroke (one before the candidate) must break out of the band
//! from inside it, and the candidate pullback must hold entirely on the far
//! side of the broken boundary.

use crate::position::structural_stop;
use crate::signal::{Candidate, ClassifyContext, Side, SignalClass, SignalKind};
use crate::{Ohlcv, Trend};

pub(crate) fn detect<T: Ohlcv>(i: usize, ctx: &ClassifyContext<'_, T>) -> Option<Candidate> {
    let stroke = &ctx.strokes[i];
    let side = Side::of_stroke(stroke.direction);

    // The leave stroke starts inside the band, so extension absorbs it and
    // it sits at the center's end index; the pullback is the stroke that
    // broke the overlap by holding beyond the boundary.
    let center_idx = ctx.centers.iter().rposition(|c| c.end_stroke + 1 == i)?;
    let center = &ctx.centers[center_idx];
    let leave = &ctx.strokes[i - 1];

    let geometry = match side {
        Side::Buy => {
            leave.direction == Trend::Up
                && leave.start.price <= center.zg
                && leave.high() > center.zg
                && stroke.low() > center.zg
        }
        Side::Sell => {
            leave.direction == Trend::Down
                && leave.start.price >= center.zd
                && leave.low() < center.zd
                && stroke.high() < center.zd
        }
    };
    if !geometry {
        return None;
    }

    // Quality: how far the departure carried relative to the band height,
    // and how shallow the retest stayed relative to the departure.
    let height = center.height();
    let (departure, retest) = match side {
        Side::Buy => (leave.high() - center.zg, leave.high() - stroke.low()),
        Side::Sell => (center.zd - leave.low(), stroke.high() - leave.low()),
    };

    let leave_score = if departure > height * 0.5 {
        100.0
    } else if departure > height * 0.3 {
        83.3
    } else if departure > height * 0.1 {
        66.7
    } else {
        33.3
    };

    let depth = if departure > 0.0 {
        retest / departure
    } else {
        1.0
    };
    let retest_score = if depth < 0.5 {
        100.0
    } else if depth < 0.7 {
        83.3
    } else if depth < 0.9 {
        66.7
    } else {
        33.3
    };

    let structure_quality = (leave_score + retest_score) / 2.0;

    let price = stroke.end.price;
    let (extreme, take_profit, leave_extreme) = match side {
        Side::Buy => (
            stroke.low(),
            price + 2.0 * (price - center.zg),
            leave.high(),
        ),
        Side::Sell => (
            stroke.high(),
            price - 2.0 * (center.zd - price),
            leave.low(),
        ),
    };
    let kind = SignalKind {
        class: SignalClass::Third,
        side,
    };

    let description = match side {
        Side::Buy => format!(
            "{kind}: pullback low {:.2} holds over zg {:.2}",
            stroke.low(),
            center.zg,
        ),
        Side::Sell => format!(
            "{kind}: pullback high {:.2} holds under zd {:.2}",
            stroke.high(),
            center.zd,
        ),
    };

    Some(Candidate {
        kind,
        price,
        timestamp: stroke.end.timestamp,
        stroke: i,
        center: Some(center_idx),
        description,
        stop_loss: Some(structural_stop(side, extreme, price, ctx.atr)),
        take_profit: Some(take_profit),
        leave_extreme: Some(leave_extreme),
        structure_quality,
        divergence: 50.0,
    })
}
