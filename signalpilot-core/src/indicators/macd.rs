//! MACD — fast EMA minus slow EMA, with a signal EMA over the MACD line.

use serde::{Deserialize, Serialize};

use super::ema::ema;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Standard MACD (defaults elsewhere: 12/26/9). The signal line is seeded once
/// `signal_period` MACD values exist, so the warmup is
/// `slow + signal_period - 2` bars.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> Vec<MacdPoint> {
    assert!(fast < slow, "macd fast period must be < slow period");
    let n = closes.len();
    let nan = MacdPoint {
        macd: f64::NAN,
        signal: f64::NAN,
        histogram: f64::NAN,
    };
    let mut result = vec![nan; n];
    if n < slow {
        return result;
    }

    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();

    // Signal EMA over the defined part of the MACD line.
    let defined = &macd_line[slow - 1..];
    let signal_line = ema(defined, signal_period);

    for i in (slow - 1)..n {
        let sig = signal_line[i - (slow - 1)];
        result[i] = MacdPoint {
            macd: macd_line[i],
            signal: sig,
            histogram: macd_line[i] - sig,
        };
    }
    result
}
