//! Mock mode: pre-recorded outcomes loaded from fixture files instead of
//! live provider calls. No network I/O happens on this path.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::types::{Citation, ProviderOutcome};

/// Fixture file name for a provider (`openai` -> `openai_sample.json`).
pub fn fixture_file(provider: &str) -> String {
    format!("{}_sample.json", provider)
}

/// On-disk fixture shape. Mirrors [`ProviderOutcome`] with every field
/// optional so sparse fixtures stay valid.
#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    report: String,
    #[serde(default)]
    citations: Vec<Citation>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    elapsed_seconds: f64,
    #[serde(default)]
    error: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Load the outcome for one provider from `dir`.
///
/// A missing fixture yields a failed outcome naming the expected file; a
/// present but undecodable one yields a failed outcome with the decode error.
pub fn load_outcome(dir: &Path, provider: &str) -> ProviderOutcome {
    let file = fixture_file(provider);
    let mock_model = format!("mock-{}", provider);

    let content = match std::fs::read_to_string(dir.join(&file)) {
        Ok(content) => content,
        Err(_) => {
            return ProviderOutcome::failed_with_message(
                provider,
                mock_model,
                Duration::ZERO,
                format!("fixture not found: {}", file),
            );
        }
    };

    let fixture: Fixture = match serde_json::from_str(&content) {
        Ok(fixture) => fixture,
        Err(e) => {
            return ProviderOutcome::failed_with_message(
                provider,
                mock_model,
                Duration::ZERO,
                format!("fixture decode error in {}: {}", file, e),
            );
        }
    };

    ProviderOutcome {
        provider: provider.to_string(),
        success: fixture.success,
        report: fixture.report,
        citations: fixture.citations,
        model: fixture.model.unwrap_or(mock_model),
        elapsed_seconds: fixture.elapsed_seconds,
        error: fixture.error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fixture_is_failed_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = load_outcome(dir.path(), "openai");
        assert!(!outcome.success);
        assert_eq!(outcome.model, "mock-openai");
        assert_eq!(
            outcome.error.as_deref(),
            Some("fixture not found: openai_sample.json")
        );
    }

    #[test]
    fn test_fixture_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("gemini_sample.json"),
            r#"{
                "success": true,
                "report": "Sample findings.",
                "citations": [{"url": "https://example.com", "title": "Example"}],
                "model": "deep-research-pro-preview-12-2025",
                "elapsed_seconds": 142.7
            }"#,
        )
        .unwrap();

        let outcome = load_outcome(dir.path(), "gemini");
        assert!(outcome.success);
        assert_eq!(outcome.report, "Sample findings.");
        assert_eq!(outcome.citations.len(), 1);
        assert_eq!(outcome.elapsed_seconds, 142.7);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_sparse_fixture_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("perplexity_sample.json"),
            r#"{"report": "minimal"}"#,
        )
        .unwrap();

        let outcome = load_outcome(dir.path(), "perplexity");
        assert!(outcome.success);
        assert_eq!(outcome.model, "mock-perplexity");
        assert!(outcome.citations.is_empty());
        assert_eq!(outcome.elapsed_seconds, 0.0);
    }

    #[test]
    fn test_broken_fixture_is_failed_outcome() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("openai_sample.json"), "not json").unwrap();

        let outcome = load_outcome(dir.path(), "openai");
        assert!(!outcome.success);
        assert!(outcome
            .error
            .as_deref()
            .unwrap()
            .starts_with("fixture decode error in openai_sample.json"));
    }
}
