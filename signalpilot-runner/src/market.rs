//! Kraken market-data provider.
//!
//! Fetches OHLC bars and order-book depth from Kraken's public REST API with
//! a blocking client and an explicit timeout. Kraken reports errors as a
//! non-empty `error` array alongside a `result` object, and keys the result
//! by its own internal pair name, so the pair entry is located dynamically.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use signalpilot_core::domain::{Interval, PriceBar, PriceSeries, ValidationError};
use signalpilot_core::planner::TopOfBook;

/// Market-data failures. `Exchange` carries Kraken's own error strings
/// (e.g. `EQuery:Unknown asset pair`) verbatim.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("exchange error: {0}")]
    Exchange(String),

    #[error("unexpected response shape: {0}")]
    ResponseFormat(String),

    #[error("rejected price data: {0}")]
    BadData(#[from] ValidationError),
}

/// Source of bars and quotes for the pipeline.
///
/// Abstracted behind a trait so tests can inject canned series without a
/// network. `fetch_top_of_book` is an optional capability: `Ok(None)` means
/// the venue exposes no depth for the pair, and the planner falls back to
/// indicator-only entry levels.
pub trait MarketDataProvider: Send + Sync {
    fn fetch_ohlc(&self, symbol: &str, interval: Interval) -> Result<PriceSeries, MarketDataError>;

    fn fetch_top_of_book(&self, symbol: &str) -> Result<Option<TopOfBook>, MarketDataError>;
}

/// Envelope common to every Kraken public endpoint.
#[derive(Debug, Deserialize)]
struct KrakenEnvelope {
    error: Vec<String>,
    result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DepthSide {
    asks: Vec<(String, String, i64)>,
    bids: Vec<(String, String, i64)>,
}

/// Kraken REST provider.
pub struct KrakenProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    timeout_secs: u64,
}

const DEFAULT_BASE_URL: &str = "https://api.kraken.com";

impl KrakenProvider {
    pub fn new(timeout_secs: u64) -> Result<Self, MarketDataError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout_secs)
    }

    /// Point the provider at a different host. Tests use this to hit a local
    /// stub server.
    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> Result<Self, MarketDataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| MarketDataError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    fn get(&self, url: &str) -> Result<serde_json::Value, MarketDataError> {
        debug!(url, "kraken request");
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.http_error(&e))?;
        let envelope: KrakenEnvelope = response.json().map_err(|e| self.http_error(&e))?;

        if !envelope.error.is_empty() {
            return Err(MarketDataError::Exchange(envelope.error.join("; ")));
        }
        envelope
            .result
            .ok_or_else(|| MarketDataError::ResponseFormat("no result object".into()))
    }

    fn http_error(&self, err: &reqwest::Error) -> MarketDataError {
        if err.is_timeout() {
            MarketDataError::Timeout(self.timeout_secs)
        } else {
            MarketDataError::Http(err.to_string())
        }
    }

    /// Pull the pair entry out of a result object. Kraken keys results by its
    /// internal pair name (e.g. `XXBTZUSD` for a `XBTUSD` request), so the
    /// entry is found by skipping known metadata keys rather than by name.
    fn pair_entry(result: &serde_json::Value) -> Result<&serde_json::Value, MarketDataError> {
        let object = result
            .as_object()
            .ok_or_else(|| MarketDataError::ResponseFormat("result is not an object".into()))?;
        object
            .iter()
            .find(|(key, _)| *key != "last")
            .map(|(_, value)| value)
            .ok_or_else(|| MarketDataError::ResponseFormat("result has no pair entry".into()))
    }

    fn parse_bar(row: &serde_json::Value) -> Result<PriceBar, MarketDataError> {
        let fields = row
            .as_array()
            .ok_or_else(|| MarketDataError::ResponseFormat("OHLC row is not an array".into()))?;
        if fields.len() < 7 {
            return Err(MarketDataError::ResponseFormat(format!(
                "OHLC row has {} fields, expected at least 7",
                fields.len()
            )));
        }

        let time = fields[0]
            .as_i64()
            .ok_or_else(|| MarketDataError::ResponseFormat("bar time is not an integer".into()))?;
        Ok(PriceBar {
            time,
            open: decimal_field(&fields[1], "open")?,
            high: decimal_field(&fields[2], "high")?,
            low: decimal_field(&fields[3], "low")?,
            close: decimal_field(&fields[4], "close")?,
            vwap: decimal_field(&fields[5], "vwap")?,
            volume: decimal_field(&fields[6], "volume")?,
        })
    }
}

/// Kraken encodes prices as decimal strings to avoid float wire formats.
fn decimal_field(value: &serde_json::Value, name: &str) -> Result<f64, MarketDataError> {
    let text = value
        .as_str()
        .ok_or_else(|| MarketDataError::ResponseFormat(format!("{name} is not a string")))?;
    text.parse::<f64>()
        .map_err(|_| MarketDataError::ResponseFormat(format!("{name} is not a decimal: {text}")))
}

impl MarketDataProvider for KrakenProvider {
    fn fetch_ohlc(&self, symbol: &str, interval: Interval) -> Result<PriceSeries, MarketDataError> {
        let url = format!(
            "{}/0/public/OHLC?pair={}&interval={}",
            self.base_url,
            symbol,
            interval.minutes()
        );
        let result = self.get(&url)?;
        let rows = Self::pair_entry(&result)?
            .as_array()
            .ok_or_else(|| MarketDataError::ResponseFormat("pair entry is not an array".into()))?;

        let bars = rows
            .iter()
            .map(Self::parse_bar)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(symbol, bars = bars.len(), "kraken OHLC parsed");

        let now = chrono::Utc::now().timestamp();
        Ok(PriceSeries::new(bars, now)?)
    }

    fn fetch_top_of_book(&self, symbol: &str) -> Result<Option<TopOfBook>, MarketDataError> {
        let url = format!("{}/0/public/Depth?pair={}&count=1", self.base_url, symbol);
        let result = self.get(&url)?;
        let side: DepthSide = serde_json::from_value(Self::pair_entry(&result)?.clone())
            .map_err(|e| MarketDataError::ResponseFormat(e.to_string()))?;

        let (Some(ask), Some(bid)) = (side.asks.first(), side.bids.first()) else {
            // Thin book with one empty side: no usable quote.
            return Ok(None);
        };
        let ask = ask
            .0
            .parse::<f64>()
            .map_err(|_| MarketDataError::ResponseFormat(format!("bad ask price: {}", ask.0)))?;
        let bid = bid
            .0
            .parse::<f64>()
            .map_err(|_| MarketDataError::ResponseFormat(format!("bad bid price: {}", bid.0)))?;
        if ask <= 0.0 || bid <= 0.0 || bid > ask {
            return Ok(None);
        }
        Ok(Some(TopOfBook { ask, bid }))
    }
}
