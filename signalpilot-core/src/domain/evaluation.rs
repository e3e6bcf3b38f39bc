//! Evaluation types — graded outcomes and the aggregated summary.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::{Confidence, RECORD_TTL_DAYS};
use super::interval::Interval;
use super::signal::Signal;

/// How a historical recommendation played out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationOutcome {
    Success,
    Failure,
    Neutral,
}

impl fmt::Display for EvaluationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationOutcome::Success => write!(f, "success"),
            EvaluationOutcome::Failure => write!(f, "failure"),
            EvaluationOutcome::Neutral => write!(f, "neutral"),
        }
    }
}

/// Graded outcome of one historical record. Shares the record's uuid so a
/// re-run of the evaluator hits the idempotency guard instead of
/// double-counting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub uuid: Uuid,
    pub symbol: String,
    pub interval: Interval,
    pub recommendation: Signal,
    pub confidence: Confidence,
    pub current_price: f64,
    pub timestamp: DateTime<Utc>,
    pub outcome: EvaluationOutcome,
    pub details: String,
    pub expires_at: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn expires_from(timestamp: DateTime<Utc>) -> DateTime<Utc> {
        timestamp + Duration::days(RECORD_TTL_DAYS)
    }
}

/// Per-signal outcome counts.
///
/// `total` counts decided outcomes only (success + failure); neutral results
/// are tracked but excluded from the success-rate denominator.
/// `success_rate` is a percentage, with `-1.0` as the "no decided outcomes"
/// sentinel — never NaN.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SignalStats {
    pub success: u32,
    pub failure: u32,
    pub neutral: u32,
    pub total: u32,
    pub success_rate: f64,
}

impl SignalStats {
    pub fn record(&mut self, outcome: EvaluationOutcome) {
        match outcome {
            EvaluationOutcome::Success => self.success += 1,
            EvaluationOutcome::Failure => self.failure += 1,
            EvaluationOutcome::Neutral => self.neutral += 1,
        }
    }

    /// Fill in the derived fields after counting.
    pub fn finalize(&mut self) {
        self.total = self.success + self.failure;
        self.success_rate = if self.total == 0 {
            -1.0
        } else {
            f64::from(self.success) / f64::from(self.total) * 100.0
        };
    }
}

/// Time window an evaluation run covered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EvaluationRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Aggregated outcome statistics for one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub uuid: Uuid,
    pub symbol: String,
    pub interval: Interval,
    pub timestamp: DateTime<Utc>,
    pub range: EvaluationRange,
    /// Count of all graded results, neutral included.
    pub total: u32,
    pub per_signal: BTreeMap<Signal, SignalStats>,
    pub formatted_summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_exclude_neutral_from_rate_denominator() {
        let mut stats = SignalStats::default();
        for _ in 0..6 {
            stats.record(EvaluationOutcome::Success);
        }
        for _ in 0..3 {
            stats.record(EvaluationOutcome::Failure);
        }
        stats.record(EvaluationOutcome::Neutral);
        stats.finalize();
        assert_eq!(stats.total, 9);
        assert_eq!(stats.neutral, 1);
        assert!((stats.success_rate - 66.666_666_666_666_67).abs() < 1e-9);
    }

    #[test]
    fn stats_use_sentinel_when_nothing_decided() {
        let mut stats = SignalStats::default();
        stats.record(EvaluationOutcome::Neutral);
        stats.finalize();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate, -1.0);
    }
}
