//! Gemini deep-research client.
//!
//! Deep research runs as a background interaction that can take several
//! minutes: one POST with `background: true`, then GET polls against the
//! interaction id every 15s. The Interactions API is a separate endpoint
//! from the standard `generateContent` API and takes API-key auth via the
//! `x-goog-api-key` header, not OAuth.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::ProviderError;
use crate::extract::{
    citations_from_sources, citations_from_text, error_message, first_string, report_text,
    status_text, value_at,
};
use crate::poll::{self, classify, PollConfig, PollStatus};
use crate::providers::{read_json, USER_AGENT};
use crate::types::{Citation, Research};
use crate::Provider;

pub const AGENT: &str = "deep-research-pro-preview-12-2025";

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);
const STATUS_TIMEOUT: Duration = Duration::from_secs(30);

// 40 polls at 15s bound one interaction to 10 minutes.
const POLL: PollConfig = PollConfig {
    interval: Duration::from_secs(15),
    max_attempts: 40,
};

pub struct GeminiDeepResearch {
    client: Client,
    base_url: String,
    poll: PollConfig,
}

impl GeminiDeepResearch {
    pub fn new() -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Unexpected(e.to_string()))?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            poll: POLL,
        })
    }

    #[cfg(test)]
    fn with_base_url(base_url: impl Into<String>, poll: PollConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            poll,
        }
    }

    async fn submit(&self, api_key: &str, topic: &str) -> Result<Value, ProviderError> {
        let payload = json!({
            "input": topic,
            "agent": AGENT,
            "background": true,
        });
        let resp = self
            .client
            .post(format!("{}/interactions", self.base_url))
            .header("x-goog-api-key", api_key)
            .timeout(SUBMIT_TIMEOUT)
            .json(&payload)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn poll_once(&self, api_key: &str, interaction_id: &str) -> Result<Value, ProviderError> {
        let resp = self
            .client
            .get(format!("{}/interactions/{}", self.base_url, interaction_id))
            .header("x-goog-api-key", api_key)
            .timeout(STATUS_TIMEOUT)
            .send()
            .await?;
        read_json(resp).await
    }

    /// Pull report text and citations out of a completed interaction.
    fn extract(resp: &Value) -> (String, Vec<Citation>) {
        let report = report_text(resp, &["outputs"], &["result.text", "result.content"])
            .unwrap_or_default();

        let sources = value_at(resp, "sources")
            .or_else(|| value_at(resp, "groundingMetadata.webSearchQueries"));
        let mut citations = sources.map(citations_from_sources).unwrap_or_default();

        // Gemini embeds grounding redirect URLs directly in the markdown, so
        // scan the report when no structured sources came back.
        if citations.is_empty() && !report.is_empty() {
            citations = citations_from_text(&report);
        }

        (report, citations)
    }
}

#[async_trait]
impl Provider for GeminiDeepResearch {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn key_name(&self) -> &'static str {
        "GEMINI_API_KEY"
    }

    fn model(&self) -> &'static str {
        AGENT
    }

    async fn research(
        &self,
        api_key: &str,
        topic: &str,
        deadline: Instant,
    ) -> Result<Research, ProviderError> {
        let submitted = self.submit(api_key, topic).await?;

        // Interaction id moves between `name`, `id`, and `interactionId`.
        let interaction_id = first_string(&submitted, &["name", "id", "interactionId"])
            .ok_or_else(|| {
                ProviderError::ProtocolMismatch(
                    "no interaction id in submission response".to_string(),
                )
            })?;

        // A background submission can come back already terminal.
        if let Some(raw) = status_text(&submitted) {
            match classify(&raw) {
                PollStatus::Completed => {
                    let (report, citations) = Self::extract(&submitted);
                    return Ok(Research {
                        report,
                        citations,
                        model: AGENT.to_string(),
                    });
                }
                PollStatus::Failed => {
                    return Err(ProviderError::Reported(error_message(&submitted)));
                }
                _ => {}
            }
        }

        let completed = poll::run("gemini", self.poll, deadline, |_| {
            self.poll_once(api_key, &interaction_id)
        })
        .await?;

        let (report, citations) = Self::extract(&completed);
        Ok(Research {
            report,
            citations,
            model: AGENT.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick_poll() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(5),
            max_attempts: 5,
        }
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[test]
    fn test_extract_prefers_structured_sources() {
        let resp = json!({
            "outputs": [{"text": "Report body with https://inline.example"}],
            "sources": [
                {"url": "https://structured.example", "title": "Structured"},
                "https://bare.example"
            ]
        });
        let (report, citations) = GeminiDeepResearch::extract(&resp);
        assert_eq!(report, "Report body with https://inline.example");
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].url, "https://structured.example");
    }

    #[test]
    fn test_extract_falls_back_to_inline_urls() {
        let resp = json!({
            "result": {"text": "See https://only.example and https://only.example"}
        });
        let (report, citations) = GeminiDeepResearch::extract(&resp);
        assert_eq!(report, "See https://only.example and https://only.example");
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].url, "https://only.example");
    }

    #[tokio::test]
    async fn test_background_interaction_polled_to_completion() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/interactions"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_partial_json(json!({"background": true, "agent": AGENT})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "abc123",
                "status": "queued"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/interactions/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "in_progress"
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/interactions/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "COMPLETED",
                "outputs": [{"text": "Final findings."}],
                "sources": [{"url": "https://source.example", "title": "Source"}]
            })))
            .mount(&server)
            .await;

        let provider = GeminiDeepResearch::with_base_url(server.uri(), quick_poll());
        let research = provider
            .research("g-key", "quantum batteries", far_deadline())
            .await
            .unwrap();

        assert_eq!(research.report, "Final findings.");
        assert_eq!(research.citations.len(), 1);
        assert_eq!(research.model, AGENT);
    }

    #[tokio::test]
    async fn test_already_completed_submission_skips_polling() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/interactions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "abc123",
                "status": "completed",
                "outputs": [{"content": "Instant report"}]
            })))
            .mount(&server)
            .await;

        let provider = GeminiDeepResearch::with_base_url(server.uri(), quick_poll());
        let research = provider
            .research("g-key", "topic", far_deadline())
            .await
            .unwrap();

        assert_eq!(research.report, "Instant report");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_interaction_reports_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/interactions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "abc123",
                "status": "queued"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/interactions/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "FAILED",
                "error": {"message": "agent unavailable"}
            })))
            .mount(&server)
            .await;

        let provider = GeminiDeepResearch::with_base_url(server.uri(), quick_poll());
        let err = provider
            .research("g-key", "topic", far_deadline())
            .await
            .unwrap_err();

        match err {
            ProviderError::Reported(msg) => assert_eq!(msg, "agent unavailable"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_interaction_id_is_protocol_mismatch() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/interactions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "queued"})))
            .mount(&server)
            .await;

        let provider = GeminiDeepResearch::with_base_url(server.uri(), quick_poll());
        let err = provider
            .research("g-key", "topic", far_deadline())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::ProtocolMismatch(_)));
    }

    #[tokio::test]
    async fn test_non_2xx_submission_fails_without_retry() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/interactions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exhausted"))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GeminiDeepResearch::with_base_url(server.uri(), quick_poll());
        let err = provider
            .research("g-key", "topic", far_deadline())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "transport");
        assert!(err.to_string().contains("quota exhausted"));
    }
}
