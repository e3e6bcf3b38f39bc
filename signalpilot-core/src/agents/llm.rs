//! LLM-backed analyst agent.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint with a blocking
//! client and an explicit per-request timeout. The model must reply with a
//! single JSON object `{recommendation, confidence, rationale}`; anything
//! else is a schema violation, reported and never guessed around.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::domain::{AgentFamily, Confidence, IndicatorAnalysis, Signal};

use super::{AgentError, AgentInput, AnalysisAgent};

/// Which confidence scale a family's prompt contract uses.
///
/// Legacy prompt sets emit 1–10; newer ones emit 0–1. Normalization happens
/// here, at ingestion, so nothing downstream ever sees a 1–10 number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceScale {
    Unit,
    Ten,
}

impl ConfidenceScale {
    fn normalize(self, value: f64) -> Result<Confidence, String> {
        match self {
            ConfidenceScale::Unit => Confidence::from_unit(value),
            ConfidenceScale::Ten => Confidence::from_ten(value),
        }
        .map_err(|e| e.to_string())
    }
}

/// Connection settings for the reasoning endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Chat-completions response shape (the slice of it we read).
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// The JSON object the model is instructed to return.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    recommendation: String,
    confidence: f64,
    rationale: String,
}

/// One LLM-backed analyst, bound to a family and its confidence scale.
pub struct LlmAgent {
    family: AgentFamily,
    scale: ConfidenceScale,
    config: LlmConfig,
    client: reqwest::blocking::Client,
}

impl LlmAgent {
    pub fn new(family: AgentFamily, scale: ConfidenceScale, config: LlmConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build HTTP client");
        Self {
            family,
            scale,
            config,
            client,
        }
    }

    fn instruction(&self) -> String {
        let scale = match self.scale {
            ConfidenceScale::Unit => "a number between 0 and 1",
            ConfidenceScale::Ten => "an integer between 1 and 10",
        };
        format!(
            "You are a {family} analyst for a crypto trading desk. Given the \
             indicator data, reply with ONLY a JSON object: \
             {{\"recommendation\": \"BUY\"|\"SELL\"|\"HOLD\", \
             \"confidence\": {scale}, \"rationale\": \"one short paragraph\"}}.",
            family = self.family,
        )
    }

    fn http_error(&self, err: &reqwest::Error) -> AgentError {
        if err.is_timeout() {
            AgentError::Timeout {
                family: self.family,
                seconds: self.config.timeout_secs,
            }
        } else {
            AgentError::Http {
                family: self.family,
                message: err.to_string(),
            }
        }
    }

    fn parse_verdict(&self, content: &str) -> Result<IndicatorAnalysis, AgentError> {
        let verdict: RawVerdict =
            serde_json::from_str(content.trim()).map_err(|e| AgentError::MalformedResponse {
                family: self.family,
                message: e.to_string(),
            })?;

        let recommendation =
            Signal::parse(&verdict.recommendation).ok_or_else(|| AgentError::SchemaViolation {
                family: self.family,
                message: format!("unknown recommendation '{}'", verdict.recommendation),
            })?;
        let confidence = self.scale.normalize(verdict.confidence).map_err(|message| {
            AgentError::SchemaViolation {
                family: self.family,
                message,
            }
        })?;
        if verdict.rationale.trim().is_empty() {
            return Err(AgentError::SchemaViolation {
                family: self.family,
                message: "empty rationale".into(),
            });
        }

        Ok(IndicatorAnalysis {
            recommendation,
            confidence,
            rationale: verdict.rationale,
        })
    }
}

impl AnalysisAgent for LlmAgent {
    fn family(&self) -> AgentFamily {
        self.family
    }

    fn analyze(&self, input: &AgentInput) -> Result<IndicatorAnalysis, AgentError> {
        if input.family() != self.family {
            return Err(AgentError::InputMismatch { family: self.family });
        }

        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": self.instruction() },
                { "role": "user", "content": input.to_payload().to_string() },
            ],
            "temperature": 0.2,
        });

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| self.http_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Http {
                family: self.family,
                message: format!("endpoint returned {status}"),
            });
        }

        let chat: ChatResponse = response.json().map_err(|e| AgentError::MalformedResponse {
            family: self.family,
            message: e.to_string(),
        })?;
        let content = chat
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| AgentError::MalformedResponse {
                family: self.family,
                message: "no choices in response".into(),
            })?;

        self.parse_verdict(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(scale: ConfidenceScale) -> LlmAgent {
        LlmAgent::new(
            AgentFamily::Momentum,
            scale,
            LlmConfig {
                endpoint: "http://localhost:1/unused".into(),
                model: "test".into(),
                api_key: None,
                timeout_secs: 5,
            },
        )
    }

    #[test]
    fn parses_unit_scale_verdict() {
        let out = agent(ConfidenceScale::Unit)
            .parse_verdict(r#"{"recommendation":"BUY","confidence":0.8,"rationale":"rising"}"#)
            .unwrap();
        assert_eq!(out.recommendation, Signal::Buy);
        assert_eq!(out.confidence.value(), 0.8);
    }

    #[test]
    fn normalizes_ten_scale_at_ingestion() {
        let out = agent(ConfidenceScale::Ten)
            .parse_verdict(r#"{"recommendation":"hold","confidence":10,"rationale":"chop"}"#)
            .unwrap();
        assert_eq!(out.recommendation, Signal::Hold);
        assert_eq!(out.confidence.value(), 1.0);
    }

    #[test]
    fn rejects_unknown_recommendation() {
        let err = agent(ConfidenceScale::Unit)
            .parse_verdict(r#"{"recommendation":"SHORT","confidence":0.8,"rationale":"x"}"#)
            .unwrap_err();
        assert!(matches!(err, AgentError::SchemaViolation { .. }));
    }

    #[test]
    fn rejects_out_of_scale_confidence() {
        let err = agent(ConfidenceScale::Unit)
            .parse_verdict(r#"{"recommendation":"BUY","confidence":7,"rationale":"x"}"#)
            .unwrap_err();
        assert!(matches!(err, AgentError::SchemaViolation { .. }));
    }

    #[test]
    fn rejects_non_json_reply() {
        let err = agent(ConfidenceScale::Unit)
            .parse_verdict("Sure! Here's my analysis: BUY.")
            .unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse { .. }));
    }
}
