//! SignalPilot Runner — pipeline orchestration on top of `signalpilot-core`.
//!
//! This crate provides:
//! - TOML pipeline configuration with validation
//! - Market data providers (Kraken public OHLC + order-book depth)
//! - The analysis cycle: fetch → snapshots → agent fan-out → synthesis → persist
//! - The evaluation run: lookback query → forward grading → summary
//! - A JSONL-backed repository for local persistence
//! - Report rendering for stored summaries

pub mod config;
pub mod evaluation;
pub mod market;
pub mod pipeline;
pub mod report;
pub mod store;

pub use config::{ConfigError, LlmSection, PipelineConfig};
pub use evaluation::{run_evaluation, EvaluationError};
pub use market::{KrakenProvider, MarketDataError, MarketDataProvider};
pub use pipeline::{run_analysis_cycle, CycleError, CycleOutcome};
pub use report::render_report;
pub use store::JsonlRepository;
