//! Report rendering for stored evaluation summaries.

use signalpilot_core::domain::Interval;
use signalpilot_core::repository::{AnalysisRepository, RepositoryError};

/// Render the most recent stored summary for a symbol/interval.
///
/// A store with no summary yet renders a short notice instead of erroring:
/// "nothing evaluated yet" is an answer, not a fault.
pub fn render_report(
    repository: &dyn AnalysisRepository,
    symbol: &str,
    interval: Interval,
) -> Result<String, RepositoryError> {
    match repository.latest_summary(symbol, interval)? {
        Some(summary) => Ok(format!(
            "{}\nGenerated: {}\n",
            summary.formatted_summary.trim_end(),
            summary.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        )),
        None => Ok(format!(
            "No evaluation summary stored for {symbol} ({interval}m). Run `evaluate` first.\n"
        )),
    }
}
