//! Average true range (Wilder smoothing).

use crate::domain::PriceBar;

/// ATR over `period` bars. True range uses the previous close; the first bar's
/// TR is its high-low range. NaN for the first `period - 1` outputs.
pub fn atr(bars: &[PriceBar], period: usize) -> Vec<f64> {
    assert!(period >= 1, "atr period must be >= 1");
    let n = bars.len();
    let mut result = vec![f64::NAN; n];
    if n < period {
        return result;
    }

    let tr: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                true_range(bar, bars[i - 1].close)
            }
        })
        .collect();

    let mut value: f64 = tr[..period].iter().sum::<f64>() / period as f64;
    result[period - 1] = value;
    for i in period..n {
        value = (value * (period as f64 - 1.0) + tr[i]) / period as f64;
        result[i] = value;
    }
    result
}

fn true_range(bar: &PriceBar, prev_close: f64) -> f64 {
    let high_low = bar.high - bar.low;
    let high_prev = (bar.high - prev_close).abs();
    let low_prev = (bar.low - prev_close).abs();
    high_low.max(high_prev).max(low_prev)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(time: i64, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar {
            time,
            open: close,
            high,
            low,
            close,
            vwap: close,
            volume: 1000.0,
        }
    }

    #[test]
    fn atr_seed_is_mean_true_range() {
        let bars = vec![
            bar(0, 103.0, 97.0, 100.0),  // TR = 6
            bar(60, 105.0, 99.0, 102.0), // TR = 6
            bar(120, 104.0, 100.0, 101.0), // TR = 4
        ];
        let out = atr(&bars, 3);
        assert!(out[1].is_nan());
        assert!((out[2] - 16.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn atr_gap_uses_previous_close() {
        let bars = vec![
            bar(0, 101.0, 99.0, 100.0),
            // Gap up: TR = high - prev_close = 10
            bar(60, 110.0, 108.0, 109.0),
        ];
        let out = atr(&bars, 2);
        assert!((out[1] - 6.0).abs() < 1e-12); // (2 + 10) / 2
    }
}
