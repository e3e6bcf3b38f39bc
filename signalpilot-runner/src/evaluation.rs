//! The evaluation run — grade every record in the lookback window against
//! the price action that followed it.
//!
//! Records are paged out of the repository, the forward price series is
//! fetched once, and each graded result is persisted individually. Re-running
//! the evaluation is safe: results reuse the record's uuid, so the
//! repository's at-most-once write guard turns a re-grade into a logged skip
//! instead of a double count.

use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

use signalpilot_core::domain::{EvaluationRange, EvaluationSummary, Interval};
use signalpilot_core::evaluate::{evaluate_records, summarize, EvaluatorConfig};
use signalpilot_core::repository::{
    AnalysisRepository, QueryDirection, RepositoryError, TimeRangeQuery,
};

use crate::market::{MarketDataError, MarketDataProvider};

const PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("market data: {0}")]
    Market(#[from] MarketDataError),

    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
}

/// Run one evaluation pass over the lookback window and persist the summary.
///
/// An empty window is a valid terminal state: the returned summary reports
/// zero graded records and nothing is persisted.
pub fn run_evaluation(
    symbol: &str,
    interval: Interval,
    provider: &dyn MarketDataProvider,
    repository: &dyn AnalysisRepository,
    config: &EvaluatorConfig,
) -> Result<EvaluationSummary, EvaluationError> {
    let now = Utc::now();
    let range = EvaluationRange {
        from: now - Duration::hours(config.timeframe_hours),
        to: now,
    };

    let mut records = Vec::new();
    let mut token = None;
    loop {
        let page = repository.query_records(&TimeRangeQuery {
            symbol: symbol.to_string(),
            interval,
            start: range.from,
            end: Some(range.to),
            direction: QueryDirection::Forward,
            recommendation: None,
            limit: PAGE_SIZE,
            token,
        })?;
        records.extend(page.records);
        match page.next {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    info!(symbol, %interval, records = records.len(), "lookback window collected");

    if records.is_empty() {
        info!(symbol, "no records to evaluate in the window");
        return Ok(summarize(symbol, interval, &[], range, now));
    }

    let series = provider.fetch_ohlc(symbol, interval)?;
    let batch = evaluate_records(&records, series.bars(), config, now);
    for (uuid, reason) in &batch.skipped {
        warn!(%uuid, reason, "record skipped");
    }

    let mut persisted = 0usize;
    for result in &batch.results {
        match repository.put_evaluation(result) {
            Ok(()) => persisted += 1,
            Err(RepositoryError::Conflict { uuid, .. }) => {
                info!(%uuid, "already evaluated; skipping");
            }
            Err(err) => return Err(err.into()),
        }
    }
    info!(
        graded = batch.results.len(),
        persisted,
        skipped = batch.skipped.len(),
        "evaluation pass complete"
    );

    let summary = summarize(symbol, interval, &batch.results, range, now);
    repository.put_summary(&summary)?;
    Ok(summary)
}
