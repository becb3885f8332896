//! OpenAI deep-research client.
//!
//! Deep research jobs run through the Responses API in background mode: one
//! POST with `background: true`, then GET polls against the response id. The
//! final report is the text of the last `message` item in `output`; inline
//! `url_citation` annotations carry the sources.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::ProviderError;
use crate::extract::{
    citations_from_sources, citations_from_text, dedupe_citations, error_message, first_string,
    status_text,
};
use crate::poll::{self, classify, PollConfig, PollStatus};
use crate::providers::{read_json, USER_AGENT};
use crate::types::{Citation, Research};
use crate::Provider;

pub const MODEL: &str = "o3-deep-research";

const BASE_URL: &str = "https://api.openai.com/v1";
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);
const STATUS_TIMEOUT: Duration = Duration::from_secs(30);

const POLL: PollConfig = PollConfig {
    interval: Duration::from_secs(15),
    max_attempts: 40,
};

pub struct OpenAiDeepResearch {
    client: Client,
    base_url: String,
    poll: PollConfig,
}

impl OpenAiDeepResearch {
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
            "model": MODEL,
            "input": topic,
            "background": true,
            "tools": [{"type": "web_search_preview"}],
        });
        let resp = self
            .client
            .post(format!("{}/responses", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .timeout(SUBMIT_TIMEOUT)
            .json(&payload)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn poll_once(&self, api_key: &str, response_id: &str) -> Result<Value, ProviderError> {
        let resp = self
            .client
            .get(format!("{}/responses/{}", self.base_url, response_id))
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .timeout(STATUS_TIMEOUT)
            .send()
            .await?;
        read_json(resp).await
    }

    /// Pull report text and citations out of a completed response.
    fn extract(resp: &Value) -> (String, Vec<Citation>) {
        let mut report = first_string(resp, &["output_text"]);

        // Without the convenience field, the report is the text blocks of the
        // last message item in `output`.
        if report.is_none() {
            if let Some(message) = last_message(resp) {
                let text = content_blocks(message)
                    .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n");
                if !text.is_empty() {
                    report = Some(text);
                }
            }
        }
        let report = report.unwrap_or_default();

        // Citations: url_citation annotations on the message blocks, then a
        // structured top-level list, then inline URLs in the report.
        let mut citations = Vec::new();
        if let Some(message) = last_message(resp) {
            for block in content_blocks(message) {
                if let Some(annotations) = block.get("annotations").and_then(|v| v.as_array()) {
                    for annotation in annotations {
                        if let Some(url) = first_string(annotation, &["url", "uri"]) {
                            let citation = match first_string(annotation, &["title"]) {
                                Some(title) => Citation::new(url).with_title(title),
                                None => Citation::new(url),
                            };
                            citations.push(citation);
                        }
                    }
                }
            }
        }
        let mut citations = dedupe_citations(citations);
        if citations.is_empty() {
            if let Some(sources) = resp.get("citations").or_else(|| resp.get("sources")) {
                citations = citations_from_sources(sources);
            }
        }
        if citations.is_empty() && !report.is_empty() {
            citations = citations_from_text(&report);
        }

        (report, citations)
    }
}

/// Last `message`-typed item of the `output` array, or the last item with a
/// `content` field when nothing is typed.
fn last_message(resp: &Value) -> Option<&Value> {
    let items = resp.get("output").and_then(|v| v.as_array())?;
    items
        .iter()
        .rev()
        .find(|item| item.get("type").and_then(|t| t.as_str()) == Some("message"))
        .or_else(|| items.iter().rev().find(|item| item.get("content").is_some()))
}

fn content_blocks(message: &Value) -> impl Iterator<Item = &Value> {
    message
        .get("content")
        .and_then(|v| v.as_array())
        .map(|blocks| blocks.iter())
        .into_iter()
        .flatten()
}

#[async_trait]
impl Provider for OpenAiDeepResearch {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn key_name(&self) -> &'static str {
        "OPENAI_API_KEY"
    }

    fn model(&self) -> &'static str {
        MODEL
    }

    async fn research(
        &self,
        api_key: &str,
        topic: &str,
        deadline: Instant,
    ) -> Result<Research, ProviderError> {
        let submitted = self.submit(api_key, topic).await?;

        let response_id = first_string(&submitted, &["id", "response_id", "name"]).ok_or_else(
            || ProviderError::ProtocolMismatch("no response id in submission response".to_string()),
        )?;

        let completed = match status_text(&submitted).as_deref().map(classify) {
            Some(PollStatus::Completed) => submitted,
            Some(PollStatus::Failed) => {
                return Err(ProviderError::Reported(error_message(&submitted)));
            }
            _ => {
                poll::run("openai", self.poll, deadline, |_| {
                    self.poll_once(api_key, &response_id)
                })
                .await?
            }
        };

        let (report, citations) = Self::extract(&completed);
        let model = first_string(&completed, &["model"]).unwrap_or_else(|| MODEL.to_string());
        Ok(Research {
            report,
            citations,
            model,
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
    fn test_extract_from_output_message() {
        let resp = json!({
            "output": [
                {"type": "web_search_call", "status": "completed"},
                {
                    "type": "message",
                    "content": [{
                        "type": "output_text",
                        "text": "The findings.",
                        "annotations": [
                            {"type": "url_citation", "url": "https://a.example", "title": "A"},
                            {"type": "url_citation", "url": "https://a.example", "title": "A dup"},
                            {"type": "url_citation", "url": "https://b.example"}
                        ]
                    }]
                }
            ]
        });
        let (report, citations) = OpenAiDeepResearch::extract(&resp);
        assert_eq!(report, "The findings.");
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].title.as_deref(), Some("A"));
    }

    #[test]
    fn test_extract_output_text_convenience_field() {
        let resp = json!({"output_text": "Direct text with https://c.example"});
        let (report, citations) = OpenAiDeepResearch::extract(&resp);
        assert_eq!(report, "Direct text with https://c.example");
        assert_eq!(citations.len(), 1);
    }

    #[tokio::test]
    async fn test_background_response_polled_to_completion() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"background": true, "model": MODEL})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "resp_1",
                "status": "queued"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/responses/resp_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "in_progress"
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/responses/resp_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "completed",
                "model": "o3-deep-research-2025-06-26",
                "output": [{
                    "type": "message",
                    "content": [{
                        "type": "output_text",
                        "text": "Polled findings.",
                        "annotations": [{"url": "https://src.example", "title": "Src"}]
                    }]
                }]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiDeepResearch::with_base_url(server.uri(), quick_poll());
        let research = provider
            .research("sk-test", "solid state batteries", far_deadline())
            .await
            .unwrap();

        assert_eq!(research.report, "Polled findings.");
        assert_eq!(research.citations.len(), 1);
        assert_eq!(research.model, "o3-deep-research-2025-06-26");
    }

    #[tokio::test]
    async fn test_failed_response_carries_provider_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "resp_2",
                "status": "failed",
                "error": {"message": "model overloaded"}
            })))
            .mount(&server)
            .await;

        let provider = OpenAiDeepResearch::with_base_url(server.uri(), quick_poll());
        let err = provider
            .research("sk-test", "topic", far_deadline())
            .await
            .unwrap_err();

        match err {
            ProviderError::Reported(msg) => assert_eq!(msg, "model overloaded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_poll_budget_exhaustion_is_poll_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "resp_3",
                "status": "queued"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/responses/resp_3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "in_progress"
            })))
            .mount(&server)
            .await;

        let poll = PollConfig {
            interval: Duration::from_millis(1),
            max_attempts: 3,
        };
        let provider = OpenAiDeepResearch::with_base_url(server.uri(), poll);
        let err = provider
            .research("sk-test", "topic", far_deadline())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::PollTimeout(3)));
    }
}
