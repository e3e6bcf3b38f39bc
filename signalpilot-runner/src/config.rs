//! TOML pipeline configuration.
//!
//! One file drives both the analysis cycle and the evaluation run. Planner
//! and evaluator sections map directly onto the core config structs; absent
//! sections fall back to their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use signalpilot_core::agents::FailurePolicy;
use signalpilot_core::domain::Interval;
use signalpilot_core::evaluate::EvaluatorConfig;
use signalpilot_core::planner::PlannerConfig;

/// Connection settings for the reasoning endpoint, as configured. The API
/// key is named by env var and resolved at startup, never stored in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    pub endpoint: String,
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: Option<String>,
}

fn default_llm_timeout() -> u64 {
    30
}

/// Full pipeline configuration, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Trading pair in the provider's notation, e.g. "XBTUSDT".
    pub symbol: String,
    /// Bar interval in minutes; must be one the provider supports.
    pub interval: u32,
    /// Directory for the JSONL store.
    pub data_dir: PathBuf,
    /// Timeout for market-data requests, in seconds.
    #[serde(default = "default_market_timeout")]
    pub market_timeout_secs: u64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub planner: PlannerConfig,
    /// Evaluator tunables, including the lookback window for grading.
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    pub llm: LlmSection,
}

fn default_market_timeout() -> u64 {
    10
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unsupported interval: {0} minutes")]
    UnsupportedInterval(u32),

    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
}

impl PipelineConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field constraints TOML deserialization cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        self.parsed_interval()?;
        if self.evaluator.timeframe_hours <= 0 {
            return Err(ConfigError::NonPositive {
                field: "evaluator.timeframe_hours",
                value: self.evaluator.timeframe_hours as f64,
            });
        }
        if self.planner.max_risk_pct <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "planner.max_risk_pct",
                value: self.planner.max_risk_pct,
            });
        }
        if self.evaluator.sell_threshold_pct <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "evaluator.sell_threshold_pct",
                value: self.evaluator.sell_threshold_pct,
            });
        }
        Ok(())
    }

    /// The configured interval as the closed enum. Unsupported minute counts
    /// are a config error, never silently coerced to a nearby interval.
    pub fn parsed_interval(&self) -> Result<Interval, ConfigError> {
        Interval::try_from(self.interval).map_err(|_| ConfigError::UnsupportedInterval(self.interval))
    }
}
