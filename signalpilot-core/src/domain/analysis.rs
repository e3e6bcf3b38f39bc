//! Analysis types — per-family verdicts and the persisted analysis record.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::planner::EntryPosition;

use super::bar::ValidationError;
use super::interval::Interval;
use super::signal::Signal;

/// Persisted records expire 90 days after creation; the storage layer is
/// responsible for actually deleting them.
pub const RECORD_TTL_DAYS: i64 = 90;

/// Indicator families, one analyst agent each.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AgentFamily {
    Candlestick,
    Momentum,
    Trend,
    Volatility,
    Volume,
    Ichimoku,
    Atr,
    Entry,
}

impl AgentFamily {
    pub const ALL: [AgentFamily; 8] = [
        AgentFamily::Candlestick,
        AgentFamily::Momentum,
        AgentFamily::Trend,
        AgentFamily::Volatility,
        AgentFamily::Volume,
        AgentFamily::Ichimoku,
        AgentFamily::Atr,
        AgentFamily::Entry,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AgentFamily::Candlestick => "candlestick",
            AgentFamily::Momentum => "momentum",
            AgentFamily::Trend => "trend",
            AgentFamily::Volatility => "volatility",
            AgentFamily::Volume => "volume",
            AgentFamily::Ichimoku => "ichimoku",
            AgentFamily::Atr => "atr",
            AgentFamily::Entry => "entry",
        }
    }
}

impl fmt::Display for AgentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Confidence on the canonical 0–1 scale.
///
/// Agents emit confidence on different scales (0–1 or 1–10 depending on the
/// family's prompt contract); the explicit constructors here are the only way
/// in, so differing scales never leak into aggregation logic.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// From the canonical 0–1 scale.
    pub fn from_unit(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::ConfidenceRange {
                value,
                scale: "0-1",
            });
        }
        Ok(Self(value))
    }

    /// From the 1–10 scale some families use; 1 maps to 0.0 and 10 to 1.0.
    pub fn from_ten(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() || !(1.0..=10.0).contains(&value) {
            return Err(ValidationError::ConfidenceRange {
                value,
                scale: "1-10",
            });
        }
        Ok(Self((value - 1.0) / 9.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Cap at `ceiling` (used when a degraded cycle lowers final confidence).
    pub fn capped(self, ceiling: f64) -> Self {
        Self(self.0.min(ceiling))
    }
}

/// One family's reading: recommendation, normalized confidence, rationale.
///
/// Produced by an external reasoning call — an opaque, possibly-wrong oracle.
/// Beyond type shape and the confidence range there is nothing to verify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorAnalysis {
    pub recommendation: Signal,
    pub confidence: Confidence,
    pub rationale: String,
}

/// The consolidated, persisted output of one analysis cycle. Immutable;
/// written at most once (duplicate uuids are rejected by the repository).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub uuid: Uuid,
    pub symbol: String,
    pub interval: Interval,
    pub timestamp: DateTime<Utc>,
    pub current_price: f64,
    pub analyses: BTreeMap<AgentFamily, IndicatorAnalysis>,
    pub final_analysis: IndicatorAnalysis,
    pub recommendation: Signal,
    pub confidence: Confidence,
    pub entry_position: Option<EntryPosition>,
    pub expires_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Assemble a record. `recommendation` and `confidence` are derived from
    /// the final analysis; they are duplicated at the top level because they
    /// participate in the repository sort key.
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        timestamp: DateTime<Utc>,
        current_price: f64,
        analyses: BTreeMap<AgentFamily, IndicatorAnalysis>,
        final_analysis: IndicatorAnalysis,
        entry_position: Option<EntryPosition>,
    ) -> Self {
        let recommendation = final_analysis.recommendation;
        let confidence = final_analysis.confidence;
        Self {
            uuid: Uuid::new_v4(),
            symbol: symbol.into(),
            interval,
            timestamp,
            current_price,
            analyses,
            final_analysis,
            recommendation,
            confidence,
            entry_position,
            expires_at: timestamp + Duration::days(RECORD_TTL_DAYS),
        }
    }

    /// Record timestamp as epoch seconds, for slicing price series.
    pub fn epoch_secs(&self) -> i64 {
        self.timestamp.timestamp()
    }
}
