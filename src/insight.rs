//! insight.rs — Typed model output and the strict schema gate.
//!
//! The external model is asked for a structure conforming to
//! `output_schema()`; whatever comes back is still re-validated here before
//! it may cross into the rest of the pipeline. Out-of-domain values are
//! rejected, never coerced.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Directional assessment of project momentum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outlook {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// The synthesizer's output: one structured assessment per synthesis call,
/// opaque to downstream display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsights {
    pub summary: String,
    pub outlook: Outlook,
    pub key_signals: Vec<String>,
    pub risk_level: RiskLevel,
    /// Analytical certainty in [0, 1].
    pub confidence: f64,
    pub reason: String,
    pub review: String,
}

/// Failure surface of the insight synthesizer. Only `Timeout` and
/// `Transport` are retryable; a schema rejection carries the offending
/// payload for diagnostics and is never retried with identical input.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("model call timed out after {0}s")]
    Timeout(u64),
    #[error("model transport error: {0}")]
    Transport(String),
    #[error("model payload failed schema validation: {reason}")]
    Schema { reason: String, payload: Value },
    #[error("model synthesis is disabled by configuration")]
    Disabled,
}

impl SynthesisError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SynthesisError::Timeout(_) | SynthesisError::Transport(_)
        )
    }
}

/// JSON Schema declared to the model up front: field names, enum domains,
/// numeric bounds. The same shape is enforced again by `AiInsights::from_value`.
pub fn output_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string" },
            "outlook": { "type": "string", "enum": ["bullish", "bearish", "neutral"] },
            "keySignals": { "type": "array", "items": { "type": "string" } },
            "riskLevel": { "type": "string", "enum": ["low", "medium", "high"] },
            "confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
            "reason": { "type": "string" },
            "review": { "type": "string" }
        },
        "required": [
            "summary", "outlook", "keySignals", "riskLevel",
            "confidence", "reason", "review"
        ]
    })
}

impl AiInsights {
    /// Validate a parsed payload against the declared schema. Missing
    /// fields and enum values outside their domain surface as serde
    /// errors; numeric bounds are checked explicitly.
    pub fn from_value(value: Value) -> Result<Self, SynthesisError> {
        let insights: AiInsights =
            serde_json::from_value(value.clone()).map_err(|e| SynthesisError::Schema {
                reason: e.to_string(),
                payload: value.clone(),
            })?;

        if !insights.confidence.is_finite() || !(0.0..=1.0).contains(&insights.confidence) {
            return Err(SynthesisError::Schema {
                reason: format!(
                    "confidence {} is outside [0, 1]",
                    insights.confidence
                ),
                payload: value,
            });
        }
        Ok(insights)
    }

    /// Parse raw model text into a validated `AiInsights`. JSON-mode
    /// responses are plain objects, but a fenced or prefixed payload is
    /// tolerated by slicing the outermost braces before giving up.
    pub fn from_text(text: &str) -> Result<Self, SynthesisError> {
        let trimmed = text.trim();
        let value = match serde_json::from_str::<Value>(trimmed) {
            Ok(v) => v,
            Err(_) => {
                let sliced = trimmed
                    .find('{')
                    .and_then(|start| trimmed.rfind('}').map(|end| &trimmed[start..=end]))
                    .unwrap_or(trimmed);
                serde_json::from_str::<Value>(sliced).map_err(|e| SynthesisError::Schema {
                    reason: format!("payload is not JSON: {e}"),
                    payload: Value::String(text.to_string()),
                })?
            }
        };
        Self::from_value(value)
    }
}
