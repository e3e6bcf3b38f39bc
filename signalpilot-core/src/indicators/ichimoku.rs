//! Ichimoku lines (9/26/52 midpoints).
//!
//! Only the line values are produced; the snapshot carries them unshifted and
//! the analyst agent reasons about displacement itself.

use serde::{Deserialize, Serialize};

use crate::domain::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IchimokuPoint {
    pub conversion: f64,
    pub base: f64,
    pub span_a: f64,
    pub span_b: f64,
}

impl IchimokuPoint {
    pub fn is_nan(&self) -> bool {
        self.conversion.is_nan() || self.base.is_nan() || self.span_a.is_nan() || self.span_b.is_nan()
    }
}

/// Conversion (9), base (26), span A = midpoint of those two, span B (52).
pub fn ichimoku(bars: &[PriceBar]) -> Vec<IchimokuPoint> {
    let n = bars.len();
    let mut result = vec![
        IchimokuPoint {
            conversion: f64::NAN,
            base: f64::NAN,
            span_a: f64::NAN,
            span_b: f64::NAN,
        };
        n
    ];

    for i in 0..n {
        let conversion = midpoint(bars, i, 9);
        let base = midpoint(bars, i, 26);
        let span_b = midpoint(bars, i, 52);
        let span_a = if conversion.is_nan() || base.is_nan() {
            f64::NAN
        } else {
            (conversion + base) / 2.0
        };
        result[i] = IchimokuPoint {
            conversion,
            base,
            span_a,
            span_b,
        };
    }
    result
}

/// Midpoint of the high-low range over the trailing `period` bars ending at `i`.
fn midpoint(bars: &[PriceBar], i: usize, period: usize) -> f64 {
    if i + 1 < period {
        return f64::NAN;
    }
    let window = &bars[i + 1 - period..=i];
    let high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let low = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    (high + low) / 2.0
}
