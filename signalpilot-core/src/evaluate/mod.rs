//! Performance evaluator — grades historical recommendations against the
//! price action that followed them.
//!
//! The classifier is a single-threaded, in-memory forward scan over the bars
//! strictly after each record's timestamp. No I/O happens inside the loop;
//! callers fetch the price series up front.

mod summary;

pub use summary::{format_summary, summarize};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    AnalysisRecord, EvaluationOutcome, EvaluationResult, PriceBar, Signal,
};

/// Evaluator tunables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Band half-width (percent of record price) for SELL targets and HOLD
    /// drift checks.
    pub sell_threshold_pct: f64,
    /// Lookback window for selecting records to evaluate, in hours.
    pub timeframe_hours: i64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            sell_threshold_pct: 1.2,
            timeframe_hours: 24,
        }
    }
}

/// Classification of one record: outcome plus the audit detail line.
#[derive(Debug, Clone)]
pub struct Classified {
    pub outcome: EvaluationOutcome,
    pub details: String,
}

/// A graded batch. `skipped` carries records that could not be graded and the
/// reason — an inability to evaluate is reported, never turned into a
/// fabricated outcome.
#[derive(Debug, Clone, Default)]
pub struct EvaluatedBatch {
    pub results: Vec<EvaluationResult>,
    pub skipped: Vec<(Uuid, String)>,
}

/// Grade a BUY record by first-touch scanning its forward bars.
///
/// `hit_exit` latches the first bar whose *high* reaches the exit price;
/// `hit_stop` latches the first bar whose *close* breaches the stop. First
/// touch wins and is never reconsidered. When both latch on the same bar the
/// comparison `exit_index <= stop_index` resolves in favor of the exit — this
/// asymmetry is intentional and load-bearing for historical compatibility.
fn classify_buy(record: &AnalysisRecord, bars: &[PriceBar]) -> Option<Classified> {
    let plan = record.entry_position.as_ref()?;

    let mut hit_exit: Option<usize> = None;
    let mut hit_stop: Option<usize> = None;
    for (index, bar) in bars.iter().enumerate() {
        if hit_exit.is_none() && bar.high >= plan.exit_price {
            hit_exit = Some(index);
        }
        if hit_stop.is_none() && bar.close <= plan.stop_loss {
            hit_stop = Some(index);
        }
        if hit_exit.is_some() && hit_stop.is_some() {
            break;
        }
    }

    let classified = match (hit_exit, hit_stop) {
        (Some(exit_index), Some(stop_index)) if exit_index <= stop_index => Classified {
            outcome: EvaluationOutcome::Success,
            details: format!(
                "Exit price of {} reached before stoploss of {}",
                plan.exit_price, plan.stop_loss
            ),
        },
        (Some(_), None) => Classified {
            outcome: EvaluationOutcome::Success,
            details: format!(
                "Exit price of {} reached before stoploss of {}",
                plan.exit_price, plan.stop_loss
            ),
        },
        (None, Some(_)) | (Some(_), Some(_)) => Classified {
            outcome: EvaluationOutcome::Failure,
            details: format!(
                "Stoploss of {} hit before exit price of {}",
                plan.stop_loss, plan.exit_price
            ),
        },
        (None, None) => Classified {
            outcome: EvaluationOutcome::Neutral,
            details: format!(
                "Neither exit price of {} nor stoploss of {} reached",
                plan.exit_price, plan.stop_loss
            ),
        },
    };
    Some(classified)
}

/// Grade a SELL record against a drop target and a rise trigger.
///
/// The target check runs first: if both conditions were eventually true on
/// different bars, the drop to target still counts as success.
fn classify_sell(record: &AnalysisRecord, bars: &[PriceBar], config: &EvaluatorConfig) -> Classified {
    let threshold = config.sell_threshold_pct / 100.0;
    let target = record.current_price * (1.0 - threshold);
    let trigger = record.current_price * (1.0 + threshold);

    let hit_target = bars.iter().any(|bar| bar.close <= target);
    let hit_trigger = bars.iter().any(|bar| bar.close >= trigger);

    if hit_target {
        Classified {
            outcome: EvaluationOutcome::Success,
            details: format!("Price dropped to target of {target:.4} after SELL"),
        }
    } else if hit_trigger {
        Classified {
            outcome: EvaluationOutcome::Failure,
            details: format!("Price rose to {trigger:.4} after SELL"),
        }
    } else {
        Classified {
            outcome: EvaluationOutcome::Neutral,
            details: format!("Target of {target:.4} not reached"),
        }
    }
}

/// Grade a HOLD record: success when price stayed inside the band, checked
/// upper-first — a break above is neutral, a break below is failure.
fn classify_hold(record: &AnalysisRecord, bars: &[PriceBar], config: &EvaluatorConfig) -> Classified {
    let threshold = config.sell_threshold_pct / 100.0;
    let upper = record.current_price * (1.0 + threshold);
    let lower = record.current_price * (1.0 - threshold);

    if bars.iter().any(|bar| bar.close > upper) {
        Classified {
            outcome: EvaluationOutcome::Neutral,
            details: format!("Price drifted above {upper:.4} during HOLD"),
        }
    } else if bars.iter().any(|bar| bar.close < lower) {
        Classified {
            outcome: EvaluationOutcome::Failure,
            details: format!("Price fell below {lower:.4} during HOLD"),
        }
    } else {
        Classified {
            outcome: EvaluationOutcome::Success,
            details: format!("Price held within {lower:.4}..{upper:.4}"),
        }
    }
}

/// Classify one record against the bars that followed it.
///
/// Returns `None` for a BUY record without an entry position — that record
/// cannot be graded and must be skipped, not defaulted.
pub fn classify(
    record: &AnalysisRecord,
    bars: &[PriceBar],
    config: &EvaluatorConfig,
) -> Option<Classified> {
    match record.recommendation {
        Signal::Buy => classify_buy(record, bars),
        Signal::Sell => Some(classify_sell(record, bars, config)),
        Signal::Hold => Some(classify_hold(record, bars, config)),
    }
}

/// Grade a batch of records against one fresh price series.
///
/// HOLD records are classified (the logic above supports them) but excluded
/// from the emitted result list — only BUY and SELL outcomes are persisted.
/// Records with no forward bars, and BUY records without a plan, are skipped
/// with a reason.
pub fn evaluate_records(
    records: &[AnalysisRecord],
    series_bars: &[PriceBar],
    config: &EvaluatorConfig,
    evaluated_at: chrono::DateTime<chrono::Utc>,
) -> EvaluatedBatch {
    let mut batch = EvaluatedBatch::default();

    for record in records {
        let start = series_bars.partition_point(|bar| bar.time <= record.epoch_secs());
        let forward = &series_bars[start..];
        if forward.is_empty() {
            batch
                .skipped
                .push((record.uuid, "no price bars after record timestamp".into()));
            continue;
        }

        let Some(classified) = classify(record, forward, config) else {
            batch
                .skipped
                .push((record.uuid, "BUY record has no entry position".into()));
            continue;
        };

        if record.recommendation == Signal::Hold {
            // Classified for completeness, deliberately not persisted.
            continue;
        }

        batch.results.push(EvaluationResult {
            uuid: record.uuid,
            symbol: record.symbol.clone(),
            interval: record.interval,
            recommendation: record.recommendation,
            confidence: record.confidence,
            current_price: record.current_price,
            timestamp: evaluated_at,
            outcome: classified.outcome,
            details: classified.details,
            expires_at: EvaluationResult::expires_from(evaluated_at),
        });
    }

    batch
}
