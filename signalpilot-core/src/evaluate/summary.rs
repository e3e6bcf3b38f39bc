//! Evaluation summarizer — per-signal counts, success rates, and the
//! human-readable report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    EvaluationRange, EvaluationResult, EvaluationSummary, Interval, Signal, SignalStats,
};

/// Aggregate graded results into an [`EvaluationSummary`].
///
/// The success rate for each signal uses decided outcomes only (success +
/// failure); a signal with nothing decided reports the `-1.0` sentinel rather
/// than dividing by zero.
pub fn summarize(
    symbol: &str,
    interval: Interval,
    results: &[EvaluationResult],
    range: EvaluationRange,
    now: DateTime<Utc>,
) -> EvaluationSummary {
    let mut per_signal: BTreeMap<Signal, SignalStats> = BTreeMap::new();
    for result in results {
        per_signal
            .entry(result.recommendation)
            .or_default()
            .record(result.outcome);
    }
    for stats in per_signal.values_mut() {
        stats.finalize();
    }

    let mut summary = EvaluationSummary {
        uuid: Uuid::new_v4(),
        symbol: symbol.to_string(),
        interval,
        timestamp: now,
        range,
        total: results.len() as u32,
        per_signal,
        formatted_summary: String::new(),
    };
    summary.formatted_summary = format_summary(&summary);
    summary
}

/// Render the summary as a text block for humans. Not machine-parsed.
pub fn format_summary(summary: &EvaluationSummary) -> String {
    let mut out = format!(
        "Evaluation summary for {} ({}m)\n\
         Window: {} .. {}\n\
         Records graded: {}\n",
        summary.symbol,
        summary.interval,
        summary.range.from.format("%Y-%m-%d %H:%M UTC"),
        summary.range.to.format("%Y-%m-%d %H:%M UTC"),
        summary.total,
    );

    if summary.per_signal.is_empty() {
        out.push_str("No recommendations to grade in this window.\n");
        return out;
    }

    for (signal, stats) in &summary.per_signal {
        let rate = if stats.success_rate < 0.0 {
            "n/a (no decided outcomes)".to_string()
        } else {
            format!("{:.2}%", stats.success_rate)
        };
        out.push_str(&format!(
            "{signal}: {} success / {} failure / {} neutral - success rate {rate}\n",
            stats.success, stats.failure, stats.neutral,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Confidence, EvaluationOutcome};
    use chrono::TimeZone;

    fn result(signal: Signal, outcome: EvaluationOutcome) -> EvaluationResult {
        let now = Utc::now();
        EvaluationResult {
            uuid: Uuid::new_v4(),
            symbol: "XBTUSDT".into(),
            interval: Interval::Min15,
            recommendation: signal,
            confidence: Confidence::from_unit(0.7).unwrap(),
            current_price: 40_000.0,
            timestamp: now,
            outcome,
            details: "test".into(),
            expires_at: EvaluationResult::expires_from(now),
        }
    }

    fn range() -> EvaluationRange {
        EvaluationRange {
            from: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            to: Utc.timestamp_opt(1_700_086_400, 0).unwrap(),
        }
    }

    #[test]
    fn summary_counts_per_signal() {
        let mut results = Vec::new();
        for _ in 0..6 {
            results.push(result(Signal::Buy, EvaluationOutcome::Success));
        }
        for _ in 0..3 {
            results.push(result(Signal::Buy, EvaluationOutcome::Failure));
        }
        results.push(result(Signal::Buy, EvaluationOutcome::Neutral));

        let summary = summarize("XBTUSDT", Interval::Min15, &results, range(), Utc::now());
        assert_eq!(summary.total, 10);
        let buy = &summary.per_signal[&Signal::Buy];
        assert_eq!(buy.total, 9);
        assert!((buy.success_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!(summary.formatted_summary.contains("66.67%"));
    }

    #[test]
    fn all_neutral_signal_reports_not_applicable() {
        let results = vec![result(Signal::Sell, EvaluationOutcome::Neutral)];
        let summary = summarize("XBTUSDT", Interval::Min15, &results, range(), Utc::now());
        let sell = &summary.per_signal[&Signal::Sell];
        assert_eq!(sell.success_rate, -1.0);
        assert!(summary.formatted_summary.contains("n/a"));
    }

    #[test]
    fn empty_window_renders_terminal_message() {
        let summary = summarize("XBTUSDT", Interval::Min15, &[], range(), Utc::now());
        assert_eq!(summary.total, 0);
        assert!(summary
            .formatted_summary
            .contains("No recommendations to grade"));
    }
}
