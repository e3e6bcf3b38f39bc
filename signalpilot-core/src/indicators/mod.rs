//! Indicator functions feeding the snapshot builder and the entry planner.
//!
//! Every function returns a `Vec` aligned with its input: one output element
//! per input bar, with `NaN` during the warmup window. Callers that need the
//! latest reading use [`latest`], which skips trailing NaNs.

mod atr;
mod bollinger;
mod ema;
mod ichimoku;
mod macd;
mod roc;
mod rsi;
mod sma;
mod vwap;

pub use atr::atr;
pub use bollinger::{bollinger, BollingerBands};
pub use ema::ema;
pub use ichimoku::{ichimoku, IchimokuPoint};
pub use macd::{macd, MacdPoint};
pub use roc::roc;
pub use rsi::rsi;
pub use sma::sma;
pub use vwap::rolling_vwap;

/// Last non-NaN value of an indicator series, if any.
pub fn latest(values: &[f64]) -> Option<f64> {
    values.iter().rev().copied().find(|v| !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_skips_nan_tail() {
        assert_eq!(latest(&[f64::NAN, 1.0, 2.0, f64::NAN]), Some(2.0));
        assert_eq!(latest(&[f64::NAN, f64::NAN]), None);
        assert_eq!(latest(&[]), None);
    }
}
