//! Perplexity deep-research client.
//!
//! Unlike the other providers this one is synchronous: a single chat
//! completion with the deep-research model blocks until the report is ready,
//! so the only protocol step is the submission itself. The request timeout is
//! derived from the orchestrator deadline instead of a fixed constant.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::error::ProviderError;
use crate::extract::{citations_from_sources, citations_from_text, first_string};
use crate::providers::{read_json, USER_AGENT};
use crate::types::{Citation, Research};
use crate::Provider;

pub const MODEL: &str = "sonar-deep-research";

const BASE_URL: &str = "https://api.perplexity.ai";

pub struct PerplexityDeepResearch {
    client: Client,
    base_url: String,
}

impl PerplexityDeepResearch {
    pub fn new() -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Unexpected(e.to_string()))?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    #[cfg(test)]
    fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Pull report text and citations out of a completion response.
    fn extract(resp: &Value) -> (String, Vec<Citation>) {
        let report =
            first_string(resp, &["choices.0.message.content", "output_text"]).unwrap_or_default();

        // `citations` is a list of bare URL strings; `search_results` the
        // structured variant with titles.
        let mut citations = resp
            .get("citations")
            .or_else(|| resp.get("search_results"))
            .map(citations_from_sources)
            .unwrap_or_default();
        if citations.is_empty() && !report.is_empty() {
            citations = citations_from_text(&report);
        }

        (report, citations)
    }
}

#[async_trait]
impl Provider for PerplexityDeepResearch {
    fn name(&self) -> &'static str {
        "perplexity"
    }

    fn key_name(&self) -> &'static str {
        "PERPLEXITY_API_KEY"
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
        let budget = deadline.duration_since(Instant::now());
        if budget.is_zero() {
            return Err(ProviderError::DeadlineElapsed);
        }

        let payload = json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": topic}],
        });
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .timeout(budget)
            .json(&payload)
            .send()
            .await?;
        let value = read_json(resp).await?;

        let (report, citations) = Self::extract(&value);
        let model = first_string(&value, &["model"]).unwrap_or_else(|| MODEL.to_string());
        Ok(Research {
            report,
            citations,
            model,
        })
    }
}
