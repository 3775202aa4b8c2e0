//! Oscillator helpers feeding stroke momentum and signal scoring.
//!
//! The pipeline itself treats the oscillator series as an input aligned
//! index-for-index with the raw bars; these helpers produce one for callers
//! that do not bring their own.

use crate::Ohlcv;

/// MACD-style oscillator series aligned with the raw bar sequence.
///
/// `dif` is the fast-minus-slow EMA spread, `dea` its signal-line EMA, and
/// `hist` twice their difference.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MacdSeries {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub hist: Vec<f64>,
}

impl MacdSeries {
    #[inline]
    pub fn len(&self) -> usize {
        self.hist.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hist.is_empty()
    }
}

/// Exponential moving average with the standard `2 / (span + 1)` smoothing,
/// seeded from the first value.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let Some(&first) = values.first() else {
        return out;
    };
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut acc = first;
    out.push(acc);
    for &v in &values[1..] {
        acc = alpha * v + (1.0 - alpha) * acc;
        out.push(acc);
    }
    out
}

/// Compute a MACD series over bar closes. Spans default to 12/26/9 at the
/// engine level.
pub fn macd<T: Ohlcv>(bars: &[T], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close()).collect();
    let ema_fast = ema(&closes, fast);
    let ema_slow = ema(&closes, slow);

    let dif: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let dea = ema(&dif, signal);
    let hist: Vec<f64> = dif.iter().zip(&dea).map(|(d, e)| (d - e) * 2.0).collect();

    MacdSeries { dif, dea, hist }
}

/// Average true range over the full window (EMA of true range).
///
/// Returns 0.0 for an empty window.
pub fn atr<T: Ohlcv>(bars: &[T], period: usize) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    let mut trs = Vec::with_capacity(bars.len());
    trs.push(bars[0].high() - bars[0].low());
    for w in bars.windows(2) {
        let prev_close = w[0].close();
        let tr = (w[1].high() - w[1].low())
            .max((w[1].high() - prev_close).abs())
            .max((w[1].low() - prev_close).abs());
        trs.push(tr);
    }
    ema(&trs, period).last().copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::bar;

    #[test]
    fn test_ema_constant_series() {
        let values = vec![5.0; 10];
        let out = ema(&values, 3);
        assert_eq!(out.len(), 10);
        for v in out {
            assert!((v - 5.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_ema_empty() {
        assert!(ema(&[], 3).is_empty());
    }

    #[test]
    fn test_macd_alignment() {
        let bars: Vec<_> = (0..50)
            .map(|i| {
                let p = 100.0 + (i as f64) * 0.5;
                bar(i, p, p + 1.0, p - 1.0, p)
            })
            .collect();
        let m = macd(&bars, 12, 26, 9);
        assert_eq!(m.len(), bars.len());
        assert_eq!(m.dif.len(), m.dea.len());
        // A steady uptrend keeps the fast EMA above the slow one.
        assert!(m.dif[49] > 0.0);
    }

    #[test]
    fn test_atr_flat_series() {
        let bars: Vec<_> = (0..20).map(|i| bar(i, 100.0, 101.0, 99.0, 100.0)).collect();
        let a = atr(&bars, 14);
        assert!((a - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_atr_empty() {
        let bars: Vec<crate::Bar> = Vec::new();
        assert_eq!(atr(&bars, 14), 0.0);
    }
}
