//! Per-family indicator snapshots — the typed inputs handed to analyst agents.
//!
//! A snapshot bundles a family's current values with a bounded trailing
//! history so the agent can see how the numbers evolved without receiving the
//! whole price series. Built once per analysis cycle and read-only afterward.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{AgentFamily, Interval, PriceSeries};
use crate::indicators;

/// Trailing history points kept per field.
pub const HISTORY_WINDOW: usize = 30;

/// One indicator family's current values plus bounded history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub name: String,
    pub symbol: String,
    pub interval: Interval,
    /// Latest value per field.
    pub current: BTreeMap<String, f64>,
    /// Trailing `(epoch_secs, value)` points per field, oldest first.
    pub history: BTreeMap<String, Vec<(i64, f64)>>,
}

impl IndicatorSnapshot {
    fn new(family: AgentFamily, symbol: &str, interval: Interval) -> Self {
        Self {
            name: family.name().to_string(),
            symbol: symbol.to_string(),
            interval,
            current: BTreeMap::new(),
            history: BTreeMap::new(),
        }
    }

    /// Record a field from an aligned indicator series: latest non-NaN value
    /// as `current`, the trailing window of defined points as history.
    fn push_series(&mut self, field: &str, times: &[i64], values: &[f64]) {
        let points: Vec<(i64, f64)> = times
            .iter()
            .zip(values)
            .filter(|(_, v)| !v.is_nan())
            .map(|(t, v)| (*t, *v))
            .collect();
        if let Some(last) = indicators::latest(values) {
            self.current.insert(field.to_string(), last);
        }
        let start = points.len().saturating_sub(HISTORY_WINDOW);
        self.history.insert(field.to_string(), points[start..].to_vec());
    }

    pub fn current_value(&self, field: &str) -> Option<f64> {
        self.current.get(field).copied()
    }
}

/// Build one snapshot per analyst family from a price series.
///
/// The `Entry` family has no snapshot: its input is the derived trade plan,
/// not an indicator reading.
pub fn build_snapshots(
    series: &PriceSeries,
    symbol: &str,
    interval: Interval,
) -> BTreeMap<AgentFamily, IndicatorSnapshot> {
    let bars = series.bars();
    let times: Vec<i64> = bars.iter().map(|bar| bar.time).collect();
    let closes = series.closes();

    let mut snapshots = BTreeMap::new();

    // Candlestick: raw OHLCV.
    let mut candle = IndicatorSnapshot::new(AgentFamily::Candlestick, symbol, interval);
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    candle.push_series("open", &times, &opens);
    candle.push_series("high", &times, &highs);
    candle.push_series("low", &times, &lows);
    candle.push_series("close", &times, &closes);
    candle.push_series("volume", &times, &volumes);
    snapshots.insert(AgentFamily::Candlestick, candle);

    // Momentum: RSI, ROC, MACD.
    let mut momentum = IndicatorSnapshot::new(AgentFamily::Momentum, symbol, interval);
    momentum.push_series("rsi", &times, &indicators::rsi(&closes, 14));
    momentum.push_series("roc", &times, &indicators::roc(&closes, 10));
    let macd = indicators::macd(&closes, 12, 26, 9);
    let macd_line: Vec<f64> = macd.iter().map(|p| p.macd).collect();
    let macd_signal: Vec<f64> = macd.iter().map(|p| p.signal).collect();
    let macd_hist: Vec<f64> = macd.iter().map(|p| p.histogram).collect();
    momentum.push_series("macd", &times, &macd_line);
    momentum.push_series("macd_signal", &times, &macd_signal);
    momentum.push_series("macd_histogram", &times, &macd_hist);
    snapshots.insert(AgentFamily::Momentum, momentum);

    // Trend: EMAs and a long SMA.
    let mut trend = IndicatorSnapshot::new(AgentFamily::Trend, symbol, interval);
    trend.push_series("ema_9", &times, &indicators::ema(&closes, 9));
    trend.push_series("ema_21", &times, &indicators::ema(&closes, 21));
    trend.push_series("ema_50", &times, &indicators::ema(&closes, 50));
    trend.push_series("sma_200", &times, &indicators::sma(&closes, 200));
    snapshots.insert(AgentFamily::Trend, trend);

    // Volatility: Bollinger bands.
    let mut volatility = IndicatorSnapshot::new(AgentFamily::Volatility, symbol, interval);
    let bands = indicators::bollinger(&closes, 20, 2.0);
    let lower: Vec<f64> = bands.iter().map(|b| b.lower).collect();
    let middle: Vec<f64> = bands.iter().map(|b| b.middle).collect();
    let upper: Vec<f64> = bands.iter().map(|b| b.upper).collect();
    volatility.push_series("bollinger_lower", &times, &lower);
    volatility.push_series("bollinger_middle", &times, &middle);
    volatility.push_series("bollinger_upper", &times, &upper);
    snapshots.insert(AgentFamily::Volatility, volatility);

    // Volume: raw volume, volume SMA, rolling VWAP.
    let mut volume = IndicatorSnapshot::new(AgentFamily::Volume, symbol, interval);
    volume.push_series("volume", &times, &volumes);
    volume.push_series("volume_sma", &times, &indicators::sma(&volumes, 20));
    volume.push_series("vwap", &times, &indicators::rolling_vwap(bars, 20));
    snapshots.insert(AgentFamily::Volume, volume);

    // Ichimoku lines.
    let mut ichimoku = IndicatorSnapshot::new(AgentFamily::Ichimoku, symbol, interval);
    let points = indicators::ichimoku(bars);
    let conversion: Vec<f64> = points.iter().map(|p| p.conversion).collect();
    let base: Vec<f64> = points.iter().map(|p| p.base).collect();
    let span_a: Vec<f64> = points.iter().map(|p| p.span_a).collect();
    let span_b: Vec<f64> = points.iter().map(|p| p.span_b).collect();
    ichimoku.push_series("conversion", &times, &conversion);
    ichimoku.push_series("base", &times, &base);
    ichimoku.push_series("span_a", &times, &span_a);
    ichimoku.push_series("span_b", &times, &span_b);
    snapshots.insert(AgentFamily::Ichimoku, ichimoku);

    // ATR.
    let mut atr = IndicatorSnapshot::new(AgentFamily::Atr, symbol, interval);
    atr.push_series("atr", &times, &indicators::atr(bars, 14));
    atr.push_series("close", &times, &closes);
    snapshots.insert(AgentFamily::Atr, atr);

    snapshots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceBar;

    fn series(count: usize) -> PriceSeries {
        let bars: Vec<PriceBar> = (0..count)
            .map(|i| {
                let close = 100.0 + (i % 7) as f64;
                PriceBar {
                    time: 1_700_000_000 + i as i64 * 900,
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    vwap: close,
                    volume: 1000.0 + i as f64,
                }
            })
            .collect();
        PriceSeries::new(bars, 2_000_000_000).unwrap()
    }

    #[test]
    fn builds_one_snapshot_per_indicator_family() {
        let snapshots = build_snapshots(&series(60), "XBTUSDT", Interval::Min15);
        assert_eq!(snapshots.len(), 7);
        assert!(!snapshots.contains_key(&AgentFamily::Entry));
        for family in [
            AgentFamily::Candlestick,
            AgentFamily::Momentum,
            AgentFamily::Volatility,
            AgentFamily::Atr,
        ] {
            assert!(snapshots.contains_key(&family), "missing {family}");
        }
    }

    #[test]
    fn history_is_bounded_and_oldest_first() {
        let snapshots = build_snapshots(&series(120), "XBTUSDT", Interval::Min15);
        let candle = &snapshots[&AgentFamily::Candlestick];
        let closes = &candle.history["close"];
        assert_eq!(closes.len(), HISTORY_WINDOW);
        assert!(closes.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn warmup_fields_absent_on_short_series() {
        // 10 bars: RSI(14) and Bollinger(20) never warm up.
        let snapshots = build_snapshots(&series(10), "XBTUSDT", Interval::Min15);
        assert!(snapshots[&AgentFamily::Momentum].current_value("rsi").is_none());
        assert!(snapshots[&AgentFamily::Volatility]
            .current_value("bollinger_lower")
            .is_none());
        assert!(snapshots[&AgentFamily::Candlestick]
            .current_value("close")
            .is_some());
    }
}
