//! Exponential moving average.

/// EMA with smoothing `2 / (period + 1)`, seeded with the SMA of the first
/// `period` values. NaN for the first `period - 1` outputs.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "ema period must be >= 1");
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < period {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;
    result[period - 1] = seed;
    let mut prev = seed;
    for i in period..n {
        prev = values[i] * alpha + prev * (1.0 - alpha);
        result[i] = prev;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_seeds_with_sma() {
        let out = ema(&[2.0, 4.0, 6.0, 8.0], 3);
        assert!(out[1].is_nan());
        assert_eq!(out[2], 4.0);
        // alpha = 0.5: 8 * 0.5 + 4 * 0.5 = 6
        assert_eq!(out[3], 6.0);
    }

    #[test]
    fn ema_tracks_constant_series() {
        let out = ema(&[5.0; 10], 4);
        assert_eq!(out[9], 5.0);
    }
}
