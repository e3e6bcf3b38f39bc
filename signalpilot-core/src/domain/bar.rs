//! PriceBar and PriceSeries — the fundamental market data units.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured validation failures for market data and analysis inputs.
///
/// These name the violated field so callers can report the exact problem
/// without string-matching messages.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("bar at {time}: {field} violates '{rule}'")]
    Bar {
        time: i64,
        field: &'static str,
        rule: &'static str,
    },

    #[error("bar at {time} is timestamped in the future (now = {now})")]
    FutureBar { time: i64, now: i64 },

    #[error("series out of order at index {index}: {time} follows {prev}")]
    OutOfOrder { index: usize, time: i64, prev: i64 },

    #[error("duplicate timestamp {time} at index {index}")]
    DuplicateTimestamp { time: i64, index: usize },

    #[error("empty price series")]
    EmptySeries,

    #[error("confidence {value} outside the {scale} scale")]
    ConfidenceRange { value: f64, scale: &'static str },

    #[error("invalid interval: {0} minutes is not a supported timeframe")]
    InvalidInterval(u32),
}

/// OHLCV bar for a single symbol over one interval.
///
/// `time` is epoch seconds (Kraken OHLC convention). `vwap` is the
/// volume-weighted average price the exchange reports for the interval.
/// Bars are immutable once fetched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub vwap: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Validate OHLC relations and positivity.
    ///
    /// `now` is the caller's clock (epoch seconds); a bar stamped after it is
    /// rejected rather than silently kept.
    pub fn validate(&self, now: i64) -> Result<(), ValidationError> {
        let bar = |field, rule| ValidationError::Bar {
            time: self.time,
            field,
            rule,
        };

        if self.time > now {
            return Err(ValidationError::FutureBar {
                time: self.time,
                now,
            });
        }
        if !(self.open > 0.0 && self.high > 0.0 && self.low > 0.0 && self.close > 0.0) {
            return Err(bar("ohlc", "all prices must be positive"));
        }
        if self.high < self.low {
            return Err(bar("high", "high >= low"));
        }
        if self.high < self.open.max(self.close) {
            return Err(bar("high", "high >= max(open, close)"));
        }
        if self.low > self.open.min(self.close) {
            return Err(bar("low", "low <= min(open, close)"));
        }
        if self.volume < 0.0 {
            return Err(bar("volume", "volume must be non-negative"));
        }
        Ok(())
    }
}

/// Validated, ascending, duplicate-free sequence of bars.
///
/// Constructed fresh per fetch and never mutated — downstream consumers only
/// slice it. The constructor is the single validation chokepoint: once a
/// `PriceSeries` exists, every bar in it is sane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series, enforcing per-bar sanity plus ordering and uniqueness.
    pub fn new(bars: Vec<PriceBar>, now: i64) -> Result<Self, ValidationError> {
        if bars.is_empty() {
            return Err(ValidationError::EmptySeries);
        }
        for (index, pair) in bars.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.time < prev.time {
                return Err(ValidationError::OutOfOrder {
                    index: index + 1,
                    time: next.time,
                    prev: prev.time,
                });
            }
            if next.time == prev.time {
                return Err(ValidationError::DuplicateTimestamp {
                    time: next.time,
                    index: index + 1,
                });
            }
        }
        for bar in &bars {
            bar.validate(now)?;
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Bars strictly after `time` — the forward window the evaluator scans.
    pub fn bars_after(&self, time: i64) -> &[PriceBar] {
        let start = self.bars.partition_point(|bar| bar.time <= time);
        &self.bars[start..]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }
}
