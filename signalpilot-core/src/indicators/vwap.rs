//! Rolling volume-weighted average price.
//!
//! Kraken reports a per-bar vwap, but the planner wants a trailing reference
//! level, so this recomputes VWAP over a rolling window from typical price.

use crate::domain::PriceBar;

/// Rolling VWAP over `period` bars using typical price (H+L+C)/3.
/// NaN for the first `period - 1` outputs and wherever window volume is zero.
pub fn rolling_vwap(bars: &[PriceBar], period: usize) -> Vec<f64> {
    assert!(period >= 1, "vwap period must be >= 1");
    let n = bars.len();
    let mut result = vec![f64::NAN; n];
    if n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &bars[i + 1 - period..=i];
        let volume: f64 = window.iter().map(|bar| bar.volume).sum();
        if volume <= 0.0 {
            continue;
        }
        let weighted: f64 = window
            .iter()
            .map(|bar| (bar.high + bar.low + bar.close) / 3.0 * bar.volume)
            .sum();
        result[i] = weighted / volume;
    }
    result
}
