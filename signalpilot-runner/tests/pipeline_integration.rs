//! End-to-end analysis cycle against a canned provider and stub agents.

use std::collections::BTreeMap;

use signalpilot_core::agents::{AgentError, AgentInput, AnalysisAgent, FailurePolicy};
use signalpilot_core::domain::{
    AgentFamily, Confidence, IndicatorAnalysis, Interval, PriceBar, PriceSeries, Signal,
};
use signalpilot_core::planner::{PlannerConfig, TopOfBook};
use signalpilot_core::repository::{
    AnalysisRepository, QueryDirection, TimeRangeQuery,
};
use signalpilot_core::store::MemoryRepository;
use signalpilot_runner::market::{MarketDataError, MarketDataProvider};
use signalpilot_runner::pipeline::{run_analysis_cycle, CycleError};

const T0: i64 = 1_700_000_000;

struct CannedProvider {
    bars: Vec<PriceBar>,
    book: Option<TopOfBook>,
}

impl CannedProvider {
    fn trending_up(count: usize) -> Self {
        let bars = (0..count)
            .map(|i| {
                let close = 40_000.0 + i as f64 * 12.0;
                PriceBar {
                    time: T0 + i as i64 * 900,
                    open: close - 8.0,
                    high: close + 60.0,
                    low: close - 60.0,
                    close,
                    vwap: close - 10.0,
                    volume: 120.0 + i as f64,
                }
            })
            .collect();
        Self { bars, book: None }
    }
}

impl MarketDataProvider for CannedProvider {
    fn fetch_ohlc(&self, _symbol: &str, _interval: Interval) -> Result<PriceSeries, MarketDataError> {
        Ok(PriceSeries::new(self.bars.clone(), 2_000_000_000)?)
    }

    fn fetch_top_of_book(&self, _symbol: &str) -> Result<Option<TopOfBook>, MarketDataError> {
        Ok(self.book)
    }
}

struct StubAgent {
    family: AgentFamily,
    verdict: Signal,
    confidence: f64,
}

impl AnalysisAgent for StubAgent {
    fn family(&self) -> AgentFamily {
        self.family
    }

    fn analyze(&self, input: &AgentInput) -> Result<IndicatorAnalysis, AgentError> {
        assert_eq!(input.family(), self.family);
        Ok(IndicatorAnalysis {
            recommendation: self.verdict,
            confidence: Confidence::from_unit(self.confidence).unwrap(),
            rationale: format!("{} stub verdict", self.family),
        })
    }
}

struct FailingAgent {
    family: AgentFamily,
}

impl AnalysisAgent for FailingAgent {
    fn family(&self) -> AgentFamily {
        self.family
    }

    fn analyze(&self, _input: &AgentInput) -> Result<IndicatorAnalysis, AgentError> {
        Err(AgentError::Timeout {
            family: self.family,
            seconds: 30,
        })
    }
}

fn full_roster(verdict: Signal) -> Vec<Box<dyn AnalysisAgent>> {
    AgentFamily::ALL
        .iter()
        .map(|&family| {
            Box::new(StubAgent {
                family,
                verdict,
                confidence: 0.8,
            }) as Box<dyn AnalysisAgent>
        })
        .collect()
}

#[test]
fn cycle_persists_a_queryable_record() {
    let provider = CannedProvider::trending_up(60);
    let store = MemoryRepository::new();

    let outcome = run_analysis_cycle(
        "XBTUSDT",
        Interval::Min15,
        &provider,
        &full_roster(Signal::Buy),
        &store,
        &PlannerConfig::default(),
        FailurePolicy::Degrade,
    )
    .unwrap();

    assert_eq!(outcome.record.recommendation, Signal::Buy);
    assert!(!outcome.degraded);

    let found = store.get_record(&outcome.record.uuid).unwrap();
    assert_eq!(found.symbol, "XBTUSDT");

    let page = store
        .query_records(&TimeRangeQuery {
            symbol: "XBTUSDT".into(),
            interval: Interval::Min15,
            start: chrono::Utc::now() - chrono::Duration::hours(1),
            end: None,
            direction: QueryDirection::Forward,
            recommendation: Some(Signal::Buy),
            limit: 10,
            token: None,
        })
        .unwrap();
    assert_eq!(page.records.len(), 1);
}

#[test]
fn unanimous_hold_record_has_no_entry_position() {
    let provider = CannedProvider::trending_up(60);
    let store = MemoryRepository::new();

    let outcome = run_analysis_cycle(
        "XBTUSDT",
        Interval::Min15,
        &provider,
        &full_roster(Signal::Hold),
        &store,
        &PlannerConfig::default(),
        FailurePolicy::Degrade,
    )
    .unwrap();

    assert_eq!(outcome.record.recommendation, Signal::Hold);
    assert!(outcome.record.entry_position.is_none());
}

#[test]
fn abort_policy_fails_the_cycle_on_one_agent_error() {
    let provider = CannedProvider::trending_up(60);
    let store = MemoryRepository::new();
    let mut agents = full_roster(Signal::Buy);
    agents[1] = Box::new(FailingAgent {
        family: agents[1].family(),
    });

    let err = run_analysis_cycle(
        "XBTUSDT",
        Interval::Min15,
        &provider,
        &agents,
        &store,
        &PlannerConfig::default(),
        FailurePolicy::Abort,
    )
    .unwrap_err();
    assert!(matches!(err, CycleError::AgentAborted(_)));
}

#[test]
fn degrade_policy_proceeds_with_capped_confidence() {
    let provider = CannedProvider::trending_up(60);
    let store = MemoryRepository::new();
    let mut agents = full_roster(Signal::Buy);
    agents[1] = Box::new(FailingAgent {
        family: agents[1].family(),
    });

    let outcome = run_analysis_cycle(
        "XBTUSDT",
        Interval::Min15,
        &provider,
        &agents,
        &store,
        &PlannerConfig::default(),
        FailurePolicy::Degrade,
    )
    .unwrap();

    assert!(outcome.degraded);
    assert_eq!(outcome.failed_families.len(), 1);
    assert!(outcome.record.confidence.value() <= 0.5);
    assert!(outcome.record.final_analysis.rationale.contains("degraded"));
}

#[test]
fn all_agents_failing_is_an_error_not_a_record() {
    let provider = CannedProvider::trending_up(60);
    let store = MemoryRepository::new();
    let agents: Vec<Box<dyn AnalysisAgent>> = AgentFamily::ALL
        .iter()
        .map(|&family| Box::new(FailingAgent { family }) as Box<dyn AnalysisAgent>)
        .collect();

    let err = run_analysis_cycle(
        "XBTUSDT",
        Interval::Min15,
        &provider,
        &agents,
        &store,
        &PlannerConfig::default(),
        FailurePolicy::Degrade,
    )
    .unwrap_err();
    assert!(matches!(err, CycleError::AllAgentsFailed));
}

#[test]
fn record_writes_are_at_most_once() {
    let provider = CannedProvider::trending_up(60);
    let store = MemoryRepository::new();

    let outcome = run_analysis_cycle(
        "XBTUSDT",
        Interval::Min15,
        &provider,
        &full_roster(Signal::Buy),
        &store,
        &PlannerConfig::default(),
        FailurePolicy::Degrade,
    )
    .unwrap();

    // Replaying the exact same record must be rejected, not overwritten.
    let replay = store.put_record(&outcome.record);
    assert!(matches!(
        replay,
        Err(signalpilot_core::repository::RepositoryError::Conflict { .. })
    ));
}

#[test]
fn analyses_map_carries_one_verdict_per_family() {
    let provider = CannedProvider::trending_up(60);
    let store = MemoryRepository::new();

    let outcome = run_analysis_cycle(
        "XBTUSDT",
        Interval::Min15,
        &provider,
        &full_roster(Signal::Sell),
        &store,
        &PlannerConfig::default(),
        FailurePolicy::Degrade,
    )
    .unwrap();

    let families: BTreeMap<_, _> = outcome.record.analyses.iter().collect();
    // Entry has no input on a SELL-leaning cycle unless a plan was derived;
    // every snapshot family must be present.
    for family in [
        AgentFamily::Candlestick,
        AgentFamily::Momentum,
        AgentFamily::Trend,
        AgentFamily::Volatility,
        AgentFamily::Volume,
        AgentFamily::Ichimoku,
        AgentFamily::Atr,
    ] {
        assert!(families.contains_key(&family), "missing {family}");
    }
}
