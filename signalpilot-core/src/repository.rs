//! Repository contract — append-only persistence for analysis records,
//! evaluation results, and summaries.
//!
//! Key scheme (shared with the production store):
//! - partition: `{prefix}#{symbol}#{interval}`
//! - sort:      `{timestamp}#{recommendation}` (RFC 3339 with seconds, so
//!   lexicographic order is chronological)
//! - lookup:    `{prefix}#{uuid}` for direct-by-id retrieval
//!
//! Writes are at-most-once: a duplicate uuid is a [`RepositoryError::Conflict`],
//! never a silent overwrite. That idempotency condition is the only guard
//! against concurrent evaluation runs double-counting — there are no locks.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{AnalysisRecord, EvaluationResult, EvaluationSummary, Interval, Signal};

/// Which table a key addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Analysis,
    Evaluation,
}

impl RecordKind {
    pub fn prefix(self) -> &'static str {
        match self {
            RecordKind::Analysis => "analysis",
            RecordKind::Evaluation => "evaluation",
        }
    }
}

pub fn partition_key(kind: RecordKind, symbol: &str, interval: Interval) -> String {
    format!("{}#{}#{}", kind.prefix(), symbol, interval)
}

pub fn sort_key(timestamp: &DateTime<Utc>, recommendation: Signal) -> String {
    format!(
        "{}#{}",
        timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        recommendation
    )
}

pub fn lookup_key(kind: RecordKind, uuid: &Uuid) -> String {
    format!("{}#{}", kind.prefix(), uuid)
}

/// Scan direction for time-range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryDirection {
    Forward,
    Backward,
}

/// Opaque continuation token.
///
/// Base64 of the backing store's cursor. Callers round-trip it verbatim and
/// never parse its contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    /// Encode a store cursor. Store-side only.
    pub fn encode(cursor: &str) -> Self {
        Self(BASE64.encode(cursor))
    }

    /// Decode back into the store cursor. Store-side only.
    pub fn decode(&self) -> Result<String, RepositoryError> {
        let bytes = BASE64.decode(&self.0).map_err(|_| RepositoryError::BadToken)?;
        String::from_utf8(bytes).map_err(|_| RepositoryError::BadToken)
    }
}

/// Time-range query over analysis records.
#[derive(Debug, Clone)]
pub struct TimeRangeQuery {
    pub symbol: String,
    pub interval: Interval,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub direction: QueryDirection,
    pub recommendation: Option<Signal>,
    pub limit: usize,
    pub token: Option<PageToken>,
}

/// One page of records plus the continuation token, if more remain.
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<AnalysisRecord>,
    pub next: Option<PageToken>,
}

/// Persistence failures. `Conflict` and `NotFound` are distinct from storage
/// faults so callers can branch without string-matching.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("duplicate write rejected for {kind} record {uuid}")]
    Conflict { kind: &'static str, uuid: Uuid },

    #[error("{kind} record {uuid} not found")]
    NotFound { kind: &'static str, uuid: Uuid },

    #[error("invalid continuation token")]
    BadToken,

    #[error("storage error: {0}")]
    Storage(String),
}

/// Store contract required by the pipeline and the evaluator.
///
/// Implementations guard every write with the uuid idempotency condition.
pub trait AnalysisRepository: Send + Sync {
    fn put_record(&self, record: &AnalysisRecord) -> Result<(), RepositoryError>;

    fn put_evaluation(&self, result: &EvaluationResult) -> Result<(), RepositoryError>;

    fn put_summary(&self, summary: &EvaluationSummary) -> Result<(), RepositoryError>;

    /// Records in strict timestamp order for the requested direction.
    fn query_records(&self, query: &TimeRangeQuery) -> Result<RecordPage, RepositoryError>;

    fn get_record(&self, uuid: &Uuid) -> Result<AnalysisRecord, RepositoryError>;

    /// Most recently written summary for a symbol/interval, if any.
    fn latest_summary(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Option<EvaluationSummary>, RepositoryError>;
}
