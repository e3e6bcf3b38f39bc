//! SignalPilot Core — domain types, planner, evaluator, agents, repository contract.
//!
//! This crate contains the heart of the signal pipeline:
//! - Domain types (price bars, intervals, signals, analyses, evaluation results)
//! - Indicator functions feeding per-family snapshots
//! - Entry-position planner with hard risk gates
//! - Performance evaluator: forward-scanning outcome classifier + summarizer
//! - Analyst agent trait with an LLM-backed implementation and a deterministic synthesizer
//! - Repository contract with an in-memory reference implementation
//!
//! Everything here is synchronous and pure except the LLM client and the
//! repository implementations; the orchestration layer lives in
//! `signalpilot-runner`.

pub mod agents;
pub mod domain;
pub mod evaluate;
pub mod indicators;
pub mod planner;
pub mod repository;
pub mod snapshot;
pub mod store;
