//! Analyst agents — the polymorphic reasoning capability.
//!
//! Each indicator family gets one agent. The trait abstracts over the
//! reasoning backend (LLM in production, deterministic stubs in tests) so the
//! pipeline can fan families out concurrently and apply a configurable
//! partial-failure policy.

mod llm;
mod synth;

pub use llm::{ConfidenceScale, LlmAgent, LlmConfig};
pub use synth::{build_record, synthesize};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AgentFamily, IndicatorAnalysis};
use crate::planner::EntryPosition;
use crate::snapshot::IndicatorSnapshot;

/// Typed input for one family's agent.
///
/// A tagged variant per family instead of one subclass per family: the data
/// each agent sees differs, the invocation machinery does not.
#[derive(Debug, Clone)]
pub enum AgentInput<'a> {
    Candlestick(&'a IndicatorSnapshot),
    Momentum(&'a IndicatorSnapshot),
    Trend(&'a IndicatorSnapshot),
    Volatility(&'a IndicatorSnapshot),
    Volume(&'a IndicatorSnapshot),
    Ichimoku(&'a IndicatorSnapshot),
    Atr(&'a IndicatorSnapshot),
    /// The entry agent comments on the derived trade plan, not a snapshot.
    Entry(&'a EntryPosition),
}

impl AgentInput<'_> {
    pub fn family(&self) -> AgentFamily {
        match self {
            AgentInput::Candlestick(_) => AgentFamily::Candlestick,
            AgentInput::Momentum(_) => AgentFamily::Momentum,
            AgentInput::Trend(_) => AgentFamily::Trend,
            AgentInput::Volatility(_) => AgentFamily::Volatility,
            AgentInput::Volume(_) => AgentFamily::Volume,
            AgentInput::Ichimoku(_) => AgentFamily::Ichimoku,
            AgentInput::Atr(_) => AgentFamily::Atr,
            AgentInput::Entry(_) => AgentFamily::Entry,
        }
    }

    /// Serialize the payload for an external reasoning call.
    pub fn to_payload(&self) -> serde_json::Value {
        match self {
            AgentInput::Candlestick(s)
            | AgentInput::Momentum(s)
            | AgentInput::Trend(s)
            | AgentInput::Volatility(s)
            | AgentInput::Volume(s)
            | AgentInput::Ichimoku(s)
            | AgentInput::Atr(s) => serde_json::json!({
                "family": self.family().name(),
                "snapshot": s,
            }),
            AgentInput::Entry(plan) => serde_json::json!({
                "family": "entry",
                "plan": plan,
            }),
        }
    }
}

/// Failures from an external reasoning call, tagged with the family so the
/// caller knows which analysis is missing.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{family} agent: request failed: {message}")]
    Http { family: AgentFamily, message: String },

    #[error("{family} agent: timed out after {seconds}s")]
    Timeout { family: AgentFamily, seconds: u64 },

    #[error("{family} agent: malformed response: {message}")]
    MalformedResponse { family: AgentFamily, message: String },

    #[error("{family} agent: response failed schema validation: {message}")]
    SchemaViolation { family: AgentFamily, message: String },

    #[error("{family} agent: input mismatch: expected {family} input")]
    InputMismatch { family: AgentFamily },
}

impl AgentError {
    pub fn family(&self) -> AgentFamily {
        match self {
            AgentError::Http { family, .. }
            | AgentError::Timeout { family, .. }
            | AgentError::MalformedResponse { family, .. }
            | AgentError::SchemaViolation { family, .. }
            | AgentError::InputMismatch { family } => *family,
        }
    }
}

/// What the cycle does when some (not all) family agents fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole cycle on the first agent error.
    Abort,
    /// Proceed with the surviving families; final confidence is capped.
    #[default]
    Degrade,
}

/// One analyst: maps its family's typed input to an [`IndicatorAnalysis`].
///
/// Implementations must be Send + Sync — the runner invokes agents from a
/// rayon parallel iterator, with no ordering between families.
pub trait AnalysisAgent: Send + Sync {
    fn family(&self) -> AgentFamily;

    fn analyze(&self, input: &AgentInput) -> Result<IndicatorAnalysis, AgentError>;
}
