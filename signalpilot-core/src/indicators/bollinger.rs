//! Bollinger Bands — SMA(close) +/- multiplier * population stddev.

use serde::{Deserialize, Serialize};

/// One bar's band values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub lower: f64,
    pub middle: f64,
    pub upper: f64,
}

impl BollingerBands {
    pub fn is_nan(&self) -> bool {
        self.lower.is_nan() || self.middle.is_nan() || self.upper.is_nan()
    }
}

/// Bollinger bands over closes. Uses population stddev (divide by N).
/// All-NaN bands for the first `period - 1` outputs.
pub fn bollinger(closes: &[f64], period: usize, multiplier: f64) -> Vec<BollingerBands> {
    assert!(period >= 1, "bollinger period must be >= 1");
    let n = closes.len();
    let nan = BollingerBands {
        lower: f64::NAN,
        middle: f64::NAN,
        upper: f64::NAN,
    };
    let mut result = vec![nan; n];
    if n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &closes[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance =
            window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / period as f64;
        let dev = variance.sqrt() * multiplier;
        result[i] = BollingerBands {
            lower: mean - dev,
            middle: mean,
            upper: mean + dev,
        };
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_collapse_on_flat_series() {
        let out = bollinger(&[100.0; 5], 3, 2.0);
        let last = out[4];
        assert_eq!(last.lower, 100.0);
        assert_eq!(last.middle, 100.0);
        assert_eq!(last.upper, 100.0);
    }

    #[test]
    fn bands_bracket_the_mean() {
        let out = bollinger(&[98.0, 100.0, 102.0], 3, 2.0);
        let last = out[2];
        assert_eq!(last.middle, 100.0);
        assert!(last.lower < 100.0);
        assert!(last.upper > 100.0);
        assert!((last.upper - 100.0 - (100.0 - last.lower)).abs() < 1e-12);
    }

    #[test]
    fn warmup_is_nan() {
        let out = bollinger(&[1.0, 2.0, 3.0], 3, 2.0);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert!(!out[2].is_nan());
    }
}
