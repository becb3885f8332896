//! Core types for research invocations and per-provider outcomes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ProviderError;

/// A single cited source attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Citation {
    /// Create a citation from a bare URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
        }
    }

    /// Builder method to add a title. Empty titles are dropped.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        if !title.is_empty() {
            self.title = Some(title);
        }
        self
    }
}

/// What a provider client hands back on success.
#[derive(Debug, Clone)]
pub struct Research {
    pub report: String,
    pub citations: Vec<Citation>,
    pub model: String,
}

/// The per-provider success/failure record produced by one invocation.
///
/// Exactly one of these exists per dispatched provider. `report` and
/// `citations` carry data only when `success` is true; `model` and
/// `elapsed_seconds` are populated either way for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderOutcome {
    pub provider: String,

    pub success: bool,

    #[serde(default)]
    pub report: String,

    #[serde(default)]
    pub citations: Vec<Citation>,

    pub model: String,

    #[serde(default)]
    pub elapsed_seconds: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderOutcome {
    /// Successful outcome from a completed research call.
    pub fn ok(provider: impl Into<String>, research: Research, elapsed: Duration) -> Self {
        Self {
            provider: provider.into(),
            success: true,
            report: research.report,
            citations: research.citations,
            model: research.model,
            elapsed_seconds: round_elapsed(elapsed),
            error: None,
        }
    }

    /// Failed outcome carrying a classified error message.
    pub fn failed(
        provider: impl Into<String>,
        model: impl Into<String>,
        elapsed: Duration,
        error: &ProviderError,
    ) -> Self {
        Self {
            provider: provider.into(),
            success: false,
            report: String::new(),
            citations: Vec::new(),
            model: model.into(),
            elapsed_seconds: round_elapsed(elapsed),
            error: Some(error.classified()),
        }
    }

    /// Failed outcome with a preformatted message (mock mode, join errors).
    pub fn failed_with_message(
        provider: impl Into<String>,
        model: impl Into<String>,
        elapsed: Duration,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            success: false,
            report: String::new(),
            citations: Vec::new(),
            model: model.into(),
            elapsed_seconds: round_elapsed(elapsed),
            error: Some(message.into()),
        }
    }
}

/// Complete result of one orchestration run.
///
/// Owned by the caller of a single run; the core never persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationResult {
    pub topic: String,

    pub provider_count: usize,

    pub success_count: usize,

    pub results: Vec<ProviderOutcome>,
}

impl InvocationResult {
    /// Assemble a result, deriving the counts from the outcome list.
    pub fn new(topic: impl Into<String>, results: Vec<ProviderOutcome>) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        Self {
            topic: topic.into(),
            provider_count: results.len(),
            success_count,
            results,
        }
    }
}

/// Round a wall-clock duration to one decimal place of seconds.
pub fn round_elapsed(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_elapsed() {
        assert_eq!(round_elapsed(Duration::from_millis(12_340)), 12.3);
        assert_eq!(round_elapsed(Duration::from_millis(12_360)), 12.4);
        assert_eq!(round_elapsed(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_ok_outcome_shape() {
        let outcome = ProviderOutcome::ok(
            "gemini",
            Research {
                report: "findings".into(),
                citations: vec![Citation::new("https://example.com")],
                model: "deep-research-pro-preview-12-2025".into(),
            },
            Duration::from_secs(42),
        );
        assert!(outcome.success);
        assert_eq!(outcome.citations.len(), 1);
        assert_eq!(outcome.elapsed_seconds, 42.0);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_failed_outcome_has_classified_error() {
        let err = ProviderError::PollTimeout(40);
        let outcome =
            ProviderOutcome::failed("openai", "o3-deep-research", Duration::from_secs(600), &err);
        assert!(!outcome.success);
        assert!(outcome.report.is_empty());
        assert!(outcome.error.as_deref().unwrap().starts_with("poll_timeout:"));
    }

    #[test]
    fn test_invocation_counts() {
        let ok = ProviderOutcome::ok(
            "openai",
            Research {
                report: "r".into(),
                citations: vec![],
                model: "m".into(),
            },
            Duration::ZERO,
        );
        let fail = ProviderOutcome::failed_with_message(
            "gemini",
            "m",
            Duration::ZERO,
            "unexpected: boom",
        );
        let result = InvocationResult::new("topic", vec![ok, fail]);
        assert_eq!(result.provider_count, 2);
        assert_eq!(result.success_count, 1);
    }

    #[test]
    fn test_citation_serialization_skips_empty_title() {
        let json = serde_json::to_string(&Citation::new("https://a.test")).unwrap();
        assert!(!json.contains("title"));

        let titled = Citation::new("https://a.test").with_title("A");
        let json = serde_json::to_string(&titled).unwrap();
        assert!(json.contains("\"title\":\"A\""));
    }
}
