//! Class-2 detection: the first pullback after a class-1 point that fails
//! to retest the class-1 extreme.
//!
//! The anchor is the most recent same-side class-1 signal, and it must sit
//! exactly two strokes back (class-1 stroke, reaction stroke, this
//! pullback). No center membership is required.

use crate::position::structural_stop;
use crate::signal::{Candidate, ClassifyContext, Side, SignalClass, SignalKind};
use crate::Ohlcv;

pub(crate) fn detect<T: Ohlcv>(i: usize, ctx: &ClassifyContext<'_, T>) -> Option<Candidate> {
    let stroke = &ctx.strokes[i];
    let side = Side::of_stroke(stroke.direction);

    let anchor = ctx
        .emitted
        .iter()
        .rev()
        .find(|s| s.kind.class == SignalClass::First && s.kind.side == side)?;
    if anchor.stroke + 2 != i {
        return None;
    }

    // The pullback must hold strictly inside the class-1 extreme.
    let holds = match side {
        Side::Buy => stroke.low() > anchor.price,
        Side::Sell => stroke.high() < anchor.price,
    };
    if !holds {
        return None;
    }

    // Retracement of the reaction swing grades the geometry: a 30-60%
    // pullback is ideal, beyond 20-70% it degrades fast.
    let reaction = &ctx.strokes[i - 1];
    let (swing, retracement) = match side {
        Side::Buy => (
            reaction.high() - anchor.price,
            reaction.high() - stroke.low(),
        ),
        Side::Sell => (
            anchor.price - reaction.low(),
            stroke.high() - reaction.low(),
        ),
    };
    let structure_quality = if swing > 0.0 {
        let ratio = retracement / swing;
        if (0.3..=0.6).contains(&ratio) {
            100.0
        } else if (0.2..=0.7).contains(&ratio) {
            66.7
        } else {
            33.3
        }
    } else {
        33.3
    };

    let price = stroke.end.price;
    let extreme = match side {
        Side::Buy => stroke.low(),
        Side::Sell => stroke.high(),
    };
    let kind = SignalKind {
        class: SignalClass::Second,
        side,
    };

    let description = match side {
        Side::Buy => format!(
            "{kind}: higher low {:.2} over 1B at {:.2}",
            stroke.low(),
            anchor.price,
        ),
        Side::Sell => format!(
            "{kind}: lower high {:.2} under 1S at {:.2}",
            stroke.high(),
            anchor.price,
        ),
    };

    Some(Candidate {
        kind,
        price,
        timestamp: stroke.end.timestamp,
        stroke: i,
        center: None,
        description,
        stop_loss: Some(structural_stop(side, extreme, price, ctx.atr)),
        take_profit: None,
        leave_extreme: None,
        structure_quality,
        // No divergence test applies; the dimension scores neutral.
        divergence: 50.0,
    })
}
