// src/lib.rs
pub mod engine;
pub mod error;
pub mod extract;
pub mod fixtures;
pub mod keys;
pub mod poll;
pub mod providers;
pub mod types;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;

pub use crate::error::{EngineError, ProviderError};
pub use crate::types::{Citation, InvocationResult, ProviderOutcome, Research};

/// Fixed result ordering: outcomes are always emitted in this provider
/// order, regardless of completion timing. Providers outside the list sort
/// last, in dispatch order among themselves.
pub const CANONICAL_ORDER: [&str; 3] = ["openai", "perplexity", "gemini"];

/// Sort rank of a provider name under [`CANONICAL_ORDER`].
pub fn canonical_rank(name: &str) -> usize {
    CANONICAL_ORDER
        .iter()
        .position(|p| *p == name)
        .unwrap_or(usize::MAX)
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns the unique short name of the provider.
    fn name(&self) -> &'static str;

    /// Returns the environment-variable name of this provider's credential.
    fn key_name(&self) -> &'static str;

    /// Returns the model/agent identifier, used as a best-effort fallback in
    /// failure outcomes.
    fn model(&self) -> &'static str;

    /// Run deep research on a topic.
    ///
    /// One submission request, and for background providers a bounded
    /// polling loop. `deadline` is the orchestrator's global ceiling; the
    /// implementation must never block past it on a sleep.
    async fn research(
        &self,
        api_key: &str,
        topic: &str,
        deadline: Instant,
    ) -> Result<Research, ProviderError>;
}

pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        ProviderRegistry {
            providers: Vec::new(),
        }
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.push(provider);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Registered providers in canonical priority order; unknown names keep
    /// their registration order after the canonical ones (stable sort).
    pub fn in_canonical_order(&self) -> Vec<Arc<dyn Provider>> {
        let mut ordered = self.providers.clone();
        ordered.sort_by_key(|p| canonical_rank(p.name()));
        ordered
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the registry of all known providers.
///
/// Client construction only fails if the underlying HTTP client cannot be
/// built; such a provider is skipped rather than failing the registry.
pub fn build_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    if let Ok(provider) = providers::openai::OpenAiDeepResearch::new() {
        registry.register(Arc::new(provider));
    }
    if let Ok(provider) = providers::perplexity::PerplexityDeepResearch::new() {
        registry.register(Arc::new(provider));
    }
    if let Ok(provider) = providers::gemini::GeminiDeepResearch::new() {
        registry.register(Arc::new(provider));
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_rank() {
        assert_eq!(canonical_rank("openai"), 0);
        assert_eq!(canonical_rank("perplexity"), 1);
        assert_eq!(canonical_rank("gemini"), 2);
        assert_eq!(canonical_rank("unknown"), usize::MAX);
    }

    #[test]
    fn test_registry_contains_all_providers_in_order() {
        let registry = build_registry();
        assert_eq!(registry.len(), 3);
        let names: Vec<&str> = registry
            .in_canonical_order()
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["openai", "perplexity", "gemini"]);
        assert!(registry.get("gemini").is_some());
        assert!(registry.get("bing").is_none());
    }
}
