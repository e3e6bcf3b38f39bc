//! Rate of change — percentage move over a lookback window.

/// ROC as a percentage: `(close[i] - close[i - period]) / close[i - period] * 100`.
/// NaN for the first `period` outputs.
pub fn roc(closes: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "roc period must be >= 1");
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    for i in period..n {
        let base = closes[i - period];
        if base != 0.0 {
            result[i] = (closes[i] - base) / base * 100.0;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roc_measures_percent_change() {
        let out = roc(&[100.0, 101.0, 102.0, 110.0], 2);
        assert!(out[1].is_nan());
        assert!((out[2] - 2.0).abs() < 1e-12);
        assert!((out[3] - 8.910_891_089_108_91).abs() < 1e-9);
    }

    #[test]
    fn roc_is_zero_for_flat_series() {
        let out = roc(&[50.0; 5], 3);
        assert_eq!(out[4], 0.0);
    }
}
