//! Domain types: bars, intervals, signals, analyses, evaluation results.

mod analysis;
mod bar;
mod evaluation;
mod interval;
mod signal;

pub use analysis::{
    AgentFamily, AnalysisRecord, Confidence, IndicatorAnalysis, RECORD_TTL_DAYS,
};
pub use bar::{PriceBar, PriceSeries, ValidationError};
pub use evaluation::{EvaluationOutcome, EvaluationRange, EvaluationResult, EvaluationSummary, SignalStats};
pub use interval::Interval;
pub use signal::Signal;
