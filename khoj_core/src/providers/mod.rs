//! Provider clients: one implementation of the [`Provider`](crate::Provider)
//! capability per deep-research backend.

pub mod gemini;
pub mod openai;
pub mod perplexity;

use serde_json::Value;

use crate::error::ProviderError;

pub(crate) const USER_AGENT: &str = "khoj/0.2.0";

/// Read a JSON body, turning any non-2xx status into a transport error
/// carrying a bounded body excerpt. No retry at this layer.
pub(crate) async fn read_json(resp: reqwest::Response) -> Result<Value, ProviderError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ProviderError::from_status(status, body));
    }
    Ok(resp.json::<Value>().await?)
}
