//! Final-analysis synthesizer — folds the per-family verdicts (plus the
//! entry plan, when one exists) into the consolidated record.
//!
//! Deterministic confidence-weighted vote. The rationale names every
//! contributing family so the consolidated record is auditable against its
//! inputs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::{
    AgentFamily, AnalysisRecord, Confidence, IndicatorAnalysis, Interval, Signal,
};
use crate::planner::EntryPosition;

/// Confidence ceiling applied when the cycle ran degraded (some families
/// missing).
const DEGRADED_CONFIDENCE_CAP: f64 = 0.5;

/// Mean winner confidence below which a contested vote falls back to HOLD.
const LOW_CONVICTION: f64 = 0.4;

/// Combine family verdicts into one final analysis.
///
/// Each signal accumulates the confidence of its backers; the heaviest signal
/// wins. A tie, or a win with low average conviction against real opposition,
/// resolves to HOLD — disagreement without conviction is not a trade.
pub fn synthesize(
    analyses: &BTreeMap<AgentFamily, IndicatorAnalysis>,
    plan: Option<&EntryPosition>,
    degraded: bool,
) -> IndicatorAnalysis {
    let mut weight: BTreeMap<Signal, f64> = BTreeMap::new();
    let mut backers: BTreeMap<Signal, u32> = BTreeMap::new();
    for analysis in analyses.values() {
        *weight.entry(analysis.recommendation).or_default() += analysis.confidence.value();
        *backers.entry(analysis.recommendation).or_default() += 1;
    }

    let verdict = decide(&weight, &backers);

    let confidence = final_confidence(&weight, verdict, degraded);

    let mut rationale = String::new();
    for (family, analysis) in analyses {
        rationale.push_str(&format!(
            "{family}: {} ({:.2}) — {}\n",
            analysis.recommendation,
            analysis.confidence.value(),
            analysis.rationale.trim(),
        ));
    }
    if let Some(plan) = plan {
        rationale.push_str(&format!(
            "entry plan: entry {:.4}, stop {:.4}, exit {:.4}, rr {:.2}\n",
            plan.entry_price, plan.stop_loss, plan.exit_price, plan.rr_ratio,
        ));
    }
    if degraded {
        rationale.push_str("degraded cycle: one or more family analyses missing\n");
    }
    rationale.push_str(&format!("consolidated: {verdict}"));

    IndicatorAnalysis {
        recommendation: verdict,
        confidence,
        rationale,
    }
}

fn decide(weight: &BTreeMap<Signal, f64>, backers: &BTreeMap<Signal, u32>) -> Signal {
    let Some((&winner, &winner_weight)) = weight
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
    else {
        return Signal::Hold;
    };

    // Exact tie between distinct signals: no majority, bias toward HOLD.
    let tied = weight
        .iter()
        .any(|(&signal, &value)| signal != winner && (value - winner_weight).abs() < 1e-9);
    if tied {
        return Signal::Hold;
    }

    // Contested win with low conviction: bias toward HOLD.
    let contested = weight.len() > 1;
    let winner_backers = backers.get(&winner).copied().unwrap_or(0).max(1);
    let mean_conviction = winner_weight / f64::from(winner_backers);
    if contested && winner != Signal::Hold && mean_conviction < LOW_CONVICTION {
        return Signal::Hold;
    }

    winner
}

fn final_confidence(weight: &BTreeMap<Signal, f64>, verdict: Signal, degraded: bool) -> Confidence {
    let total: f64 = weight.values().sum();
    let share = if total > 0.0 {
        weight.get(&verdict).copied().unwrap_or(0.0) / total
    } else {
        0.0
    };
    // Confidence is the winner's share of total conviction, clamped to scale.
    let mut confidence = Confidence::from_unit(share.clamp(0.0, 1.0))
        .unwrap_or_else(|_| Confidence::from_unit(0.0).expect("0.0 is in range"));
    if degraded {
        confidence = confidence.capped(DEGRADED_CONFIDENCE_CAP);
    }
    confidence
}

/// Assemble the immutable record for one cycle. SELL and HOLD consolidated
/// recommendations never carry the entry plan.
pub fn build_record(
    symbol: &str,
    interval: Interval,
    timestamp: DateTime<Utc>,
    current_price: f64,
    analyses: BTreeMap<AgentFamily, IndicatorAnalysis>,
    final_analysis: IndicatorAnalysis,
    plan: Option<EntryPosition>,
) -> AnalysisRecord {
    let entry_position = if final_analysis.recommendation == Signal::Buy {
        plan
    } else {
        None
    };
    AnalysisRecord::new(
        symbol,
        interval,
        timestamp,
        current_price,
        analyses,
        final_analysis,
        entry_position,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(signal: Signal, confidence: f64) -> IndicatorAnalysis {
        IndicatorAnalysis {
            recommendation: signal,
            confidence: Confidence::from_unit(confidence).unwrap(),
            rationale: format!("{signal} case"),
        }
    }

    fn families(entries: &[(AgentFamily, Signal, f64)]) -> BTreeMap<AgentFamily, IndicatorAnalysis> {
        entries
            .iter()
            .map(|&(family, signal, conf)| (family, verdict(signal, conf)))
            .collect()
    }

    #[test]
    fn weighted_majority_wins() {
        let analyses = families(&[
            (AgentFamily::Momentum, Signal::Buy, 0.9),
            (AgentFamily::Trend, Signal::Buy, 0.8),
            (AgentFamily::Volatility, Signal::Sell, 0.6),
        ]);
        let out = synthesize(&analyses, None, false);
        assert_eq!(out.recommendation, Signal::Buy);
        assert!(out.confidence.value() > 0.5);
    }

    #[test]
    fn exact_tie_resolves_to_hold() {
        let analyses = families(&[
            (AgentFamily::Momentum, Signal::Buy, 0.6),
            (AgentFamily::Trend, Signal::Sell, 0.6),
        ]);
        let out = synthesize(&analyses, None, false);
        assert_eq!(out.recommendation, Signal::Hold);
    }

    #[test]
    fn low_conviction_disagreement_biases_hold() {
        let analyses = families(&[
            (AgentFamily::Momentum, Signal::Buy, 0.3),
            (AgentFamily::Trend, Signal::Sell, 0.2),
            (AgentFamily::Volume, Signal::Hold, 0.25),
        ]);
        let out = synthesize(&analyses, None, false);
        assert_eq!(out.recommendation, Signal::Hold);
    }

    #[test]
    fn rationale_references_every_family() {
        let analyses = families(&[
            (AgentFamily::Candlestick, Signal::Buy, 0.7),
            (AgentFamily::Momentum, Signal::Buy, 0.8),
            (AgentFamily::Ichimoku, Signal::Hold, 0.4),
        ]);
        let out = synthesize(&analyses, None, false);
        for family in [
            AgentFamily::Candlestick,
            AgentFamily::Momentum,
            AgentFamily::Ichimoku,
        ] {
            assert!(
                out.rationale.contains(family.name()),
                "rationale missing {family}"
            );
        }
    }

    #[test]
    fn degraded_cycle_caps_confidence() {
        let analyses = families(&[(AgentFamily::Momentum, Signal::Buy, 0.95)]);
        let out = synthesize(&analyses, None, true);
        assert_eq!(out.recommendation, Signal::Buy);
        assert!(out.confidence.value() <= 0.5);
        assert!(out.rationale.contains("degraded"));
    }

    #[test]
    fn record_drops_plan_for_non_buy_verdicts() {
        let analyses = families(&[(AgentFamily::Momentum, Signal::Sell, 0.9)]);
        let final_analysis = synthesize(&analyses, None, false);
        let plan = EntryPosition {
            entry_price: 100.0,
            stop_loss: 99.0,
            exit_price: 103.0,
            risk_pct: 1.0,
            reward_pct: 3.0,
            rr_ratio: 3.0,
            position_size: None,
            rationale: "unused".into(),
        };
        let record = build_record(
            "XBTUSDT",
            Interval::Min15,
            Utc::now(),
            100.0,
            analyses,
            final_analysis,
            Some(plan),
        );
        assert_eq!(record.recommendation, Signal::Sell);
        assert!(record.entry_position.is_none());
    }
}
