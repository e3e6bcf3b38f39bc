//! The analysis cycle — one end-to-end pass from market data to a persisted
//! record.
//!
//! Stages: fetch OHLC → build indicator snapshots → derive the entry plan →
//! fan the family agents out in parallel → apply the failure policy →
//! synthesize the final verdict → persist. A risk-policy rejection from the
//! planner is a normal outcome (the cycle continues with no plan); an
//! exhausted agent roster is not.

use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use signalpilot_core::agents::{
    build_record, synthesize, AgentError, AgentInput, AnalysisAgent, FailurePolicy,
};
use signalpilot_core::domain::{AgentFamily, AnalysisRecord, IndicatorAnalysis, Interval};
use signalpilot_core::indicators::BollingerBands;
use signalpilot_core::planner::{plan_entry, EntryPosition, PlanInputs, PlannerConfig, TopOfBook};
use signalpilot_core::repository::{AnalysisRepository, RepositoryError};
use signalpilot_core::snapshot::{build_snapshots, IndicatorSnapshot};

use crate::market::{MarketDataError, MarketDataProvider};

use std::collections::BTreeMap;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("market data: {0}")]
    Market(#[from] MarketDataError),

    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),

    #[error("agent failure aborted the cycle: {0}")]
    AgentAborted(AgentError),

    #[error("every family agent failed; nothing to synthesize")]
    AllAgentsFailed,

    #[error("price series too short to snapshot: {0} bars")]
    SeriesTooShort(usize),
}

/// What one cycle produced.
#[derive(Debug)]
pub struct CycleOutcome {
    pub record: AnalysisRecord,
    /// True when the cycle ran with one or more family analyses missing.
    pub degraded: bool,
    pub failed_families: Vec<AgentFamily>,
}

/// Run one analysis cycle and persist the resulting record.
pub fn run_analysis_cycle(
    symbol: &str,
    interval: Interval,
    provider: &dyn MarketDataProvider,
    agents: &[Box<dyn AnalysisAgent>],
    repository: &dyn AnalysisRepository,
    planner: &PlannerConfig,
    policy: FailurePolicy,
) -> Result<CycleOutcome, CycleError> {
    let series = provider.fetch_ohlc(symbol, interval)?;
    let Some(last) = series.last().copied() else {
        return Err(CycleError::SeriesTooShort(0));
    };
    info!(symbol, %interval, bars = series.len(), price = last.close, "fetched series");

    let snapshots = build_snapshots(&series, symbol, interval);

    // Depth is an optional capability: a provider error here degrades the
    // plan, never the cycle.
    let book = match provider.fetch_top_of_book(symbol) {
        Ok(book) => book,
        Err(err) => {
            warn!(symbol, error = %err, "depth fetch failed; planning without quotes");
            None
        }
    };

    let plan = match derive_plan(&snapshots, last.close, last.low, last.high, book, planner) {
        Ok(plan) => {
            info!(entry = plan.entry_price, stop = plan.stop_loss, exit = plan.exit_price, "entry plan derived");
            Some(plan)
        }
        Err(err) if err.is_rejection() => {
            info!(reason = %err, "plan rejected on risk policy; cycle continues without a trade");
            None
        }
        Err(err) => {
            warn!(reason = %err, "planner inputs unavailable; cycle continues without a trade");
            None
        }
    };

    let verdicts: Vec<(AgentFamily, Result<IndicatorAnalysis, AgentError>)> = agents
        .par_iter()
        .filter_map(|agent| {
            let family = agent.family();
            let input = agent_input(family, &snapshots, plan.as_ref())?;
            Some((family, agent.analyze(&input)))
        })
        .collect();

    let mut analyses = BTreeMap::new();
    let mut failed_families = Vec::new();
    for (family, verdict) in verdicts {
        match verdict {
            Ok(analysis) => {
                analyses.insert(family, analysis);
            }
            Err(err) => {
                warn!(%family, error = %err, "family agent failed");
                if policy == FailurePolicy::Abort {
                    return Err(CycleError::AgentAborted(err));
                }
                failed_families.push(family);
            }
        }
    }
    if analyses.is_empty() {
        return Err(CycleError::AllAgentsFailed);
    }

    let degraded = !failed_families.is_empty();
    let final_analysis = synthesize(&analyses, plan.as_ref(), degraded);
    info!(
        recommendation = %final_analysis.recommendation,
        confidence = final_analysis.confidence.value(),
        degraded,
        "cycle verdict"
    );

    let record = build_record(
        symbol,
        interval,
        chrono::Utc::now(),
        last.close,
        analyses,
        final_analysis,
        plan,
    );
    repository.put_record(&record)?;

    Ok(CycleOutcome {
        record,
        degraded,
        failed_families,
    })
}

/// Input for one family's agent, or `None` when the family has nothing to
/// analyze this cycle (the entry agent with no plan).
fn agent_input<'a>(
    family: AgentFamily,
    snapshots: &'a BTreeMap<AgentFamily, IndicatorSnapshot>,
    plan: Option<&'a EntryPosition>,
) -> Option<AgentInput<'a>> {
    if family == AgentFamily::Entry {
        return plan.map(AgentInput::Entry);
    }
    let snapshot = snapshots.get(&family)?;
    Some(match family {
        AgentFamily::Candlestick => AgentInput::Candlestick(snapshot),
        AgentFamily::Momentum => AgentInput::Momentum(snapshot),
        AgentFamily::Trend => AgentInput::Trend(snapshot),
        AgentFamily::Volatility => AgentInput::Volatility(snapshot),
        AgentFamily::Volume => AgentInput::Volume(snapshot),
        AgentFamily::Ichimoku => AgentInput::Ichimoku(snapshot),
        AgentFamily::Atr => AgentInput::Atr(snapshot),
        AgentFamily::Entry => unreachable!("handled above"),
    })
}

/// Assemble planner inputs from the snapshot readings.
///
/// Warmup gaps (short series) surface as `PlanError::InvalidInput` through
/// the missing-field message rather than NaN propagation.
fn derive_plan(
    snapshots: &BTreeMap<AgentFamily, IndicatorSnapshot>,
    price: f64,
    bar_low: f64,
    bar_high: f64,
    book: Option<TopOfBook>,
    config: &PlannerConfig,
) -> Result<EntryPosition, signalpilot_core::planner::PlanError> {
    use signalpilot_core::planner::PlanError;

    let reading = |family: AgentFamily, field: &str| -> Result<f64, PlanError> {
        snapshots
            .get(&family)
            .and_then(|snapshot| snapshot.current_value(field))
            .ok_or_else(|| PlanError::InvalidInput(format!("{family} {field} not available")))
    };

    let inputs = PlanInputs {
        price,
        bar_low,
        bar_high,
        atr: reading(AgentFamily::Atr, "atr")?,
        rsi: reading(AgentFamily::Momentum, "rsi")?,
        roc: snapshots
            .get(&AgentFamily::Momentum)
            .and_then(|s| s.current_value("roc")),
        bands: BollingerBands {
            lower: reading(AgentFamily::Volatility, "bollinger_lower")?,
            middle: reading(AgentFamily::Volatility, "bollinger_middle")?,
            upper: reading(AgentFamily::Volatility, "bollinger_upper")?,
        },
        vwap: snapshots
            .get(&AgentFamily::Volume)
            .and_then(|s| s.current_value("vwap")),
        book,
    };
    plan_entry(&inputs, config)
}
