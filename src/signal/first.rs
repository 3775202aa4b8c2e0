//! Class-1 detection: trend divergence at a new extreme.
//!
//! The candidate stroke must be the one departing the most recent completed
//! center, push past both the center band and the entering stroke's extreme,
//! and do so on materially less oscillator area than the entering stroke.

use crate::position::structural_stop;
use crate::signal::{Candidate, ClassifyContext, Side, SignalClass, SignalKind, DIVERGENCE_RATIO};
use crate::Ohlcv;

pub(crate) fn detect<T: Ohlcv>(i: usize, ctx: &ClassifyContext<'_, T>) -> Option<Candidate> {
    let stroke = &ctx.strokes[i];
    let side = Side::of_stroke(stroke.direction);

    // The current stroke must be the center's departure. The departing
    // stroke still overlaps the band (it starts inside it), so extension
    // absorbs it and it sits at the center's end index; the stroke after it
    // is the one that broke the overlap.
    let center_idx = ctx.centers.iter().rposition(|c| c.end_stroke == i)?;
    let center = &ctx.centers[center_idx];

    // The entering stroke: the center's opening impulse when it shares the
    // candidate's direction, otherwise the stroke just before the center.
    let first_idx = center.start_stroke;
    let enter = if ctx.strokes[first_idx].direction == stroke.direction {
        &ctx.strokes[first_idx]
    } else if first_idx > 0 && ctx.strokes[first_idx - 1].direction == stroke.direction {
        &ctx.strokes[first_idx - 1]
    } else {
        return None;
    };

    // A genuine new extreme beyond both the band and the entering stroke.
    let new_extreme = match side {
        Side::Buy => stroke.low() < center.zd && stroke.low() < enter.low(),
        Side::Sell => stroke.high() > center.zg && stroke.high() > enter.high(),
    };
    if !new_extreme {
        return None;
    }

    // The divergence test proper: >= 30% area shrinkage.
    if stroke.momentum_area >= enter.momentum_area * DIVERGENCE_RATIO {
        return None;
    }

    // Trend context only shapes the quality score; a missing trend does not
    // block the signal.
    let prior = &ctx.centers[..center_idx];
    let (strict, loose) = match side {
        Side::Buy => (
            prior.iter().any(|p| p.zd > center.zg),
            prior.iter().any(|p| p.zd > center.zd),
        ),
        Side::Sell => (
            prior.iter().any(|p| p.zg < center.zd),
            prior.iter().any(|p| p.zg < center.zg),
        ),
    };
    let structure_quality = if strict {
        100.0
    } else if loose {
        80.0
    } else {
        50.0
    };

    let ratio = if enter.momentum_area > 0.0 {
        stroke.momentum_area / enter.momentum_area
    } else {
        1.0
    };
    let divergence = if ratio >= 1.0 {
        0.0
    } else {
        ((1.0 - ratio) * 1.2).min(1.0) * 100.0
    };

    let price = stroke.end.price;
    let (extreme, take_profit) = match side {
        Side::Buy => (stroke.low(), center.zg),
        Side::Sell => (stroke.high(), center.zd),
    };
    let kind = SignalKind {
        class: SignalClass::First,
        side,
    };

    let description = match side {
        Side::Buy => format!(
            "{kind}: new low {:.2} under zd {:.2}, area {:.2} vs {:.2}",
            stroke.low(),
            center.zd,
            stroke.momentum_area,
            enter.momentum_area,
        ),
        Side::Sell => format!(
            "{kind}: new high {:.2} over zg {:.2}, area {:.2} vs {:.2}",
            stroke.high(),
            center.zg,
            stroke.momentum_area,
            enter.momentum_area,
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
        leave_extreme: None,
        structure_quality,
        divergence,
    })
}
