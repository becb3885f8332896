// src/error.rs
use crate::keys::KEY_NAMES;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),

    #[error("provider reported failure: {0}")]
    Reported(String),

    #[error("no terminal status after {0} poll attempts")]
    PollTimeout(u32),

    #[error("deadline elapsed")]
    DeadlineElapsed,

    #[error("{0}")]
    Unexpected(String),
}

impl ProviderError {
    /// Short classification string used when shaping outcome error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Transport(_) => "transport",
            ProviderError::Status { .. } => "transport",
            ProviderError::SerdeJson(_) => "decode",
            ProviderError::ProtocolMismatch(_) => "protocol_mismatch",
            ProviderError::Reported(_) => "provider_failure",
            ProviderError::PollTimeout(_) => "poll_timeout",
            ProviderError::DeadlineElapsed => "timeout",
            ProviderError::Unexpected(_) => "unexpected",
        }
    }

    /// Outcome-facing message: `<kind>: <description>`.
    pub fn classified(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }

    /// Build a Status error from a response, keeping a bounded body excerpt.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let mut body = body.replace('\n', " ");
        if body.len() > 300 {
            body.truncate(300);
        }
        ProviderError::Status { status, body }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no API keys configured; set at least one of: {}", KEY_NAMES.join(", "))]
    NoActiveProviders,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(
            ProviderError::ProtocolMismatch("no job id".into()).kind(),
            "protocol_mismatch"
        );
        assert_eq!(ProviderError::PollTimeout(40).kind(), "poll_timeout");
        assert_eq!(ProviderError::DeadlineElapsed.kind(), "timeout");
    }

    #[test]
    fn test_classified_message() {
        let err = ProviderError::Reported("quota exceeded".into());
        assert_eq!(
            err.classified(),
            "provider_failure: provider reported failure: quota exceeded"
        );
    }

    #[test]
    fn test_status_body_truncated() {
        let err = ProviderError::from_status(reqwest::StatusCode::BAD_GATEWAY, "x".repeat(1000));
        match err {
            ProviderError::Status { body, .. } => assert_eq!(body.len(), 300),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_no_active_providers_lists_key_names() {
        let msg = EngineError::NoActiveProviders.to_string();
        assert!(msg.contains("OPENAI_API_KEY"));
        assert!(msg.contains("GEMINI_API_KEY"));
    }
}
