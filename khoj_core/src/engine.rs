//! Orchestration engine: fan a topic out to every active provider, collect
//! outcomes under one global deadline, and emit them in canonical order.
//!
//! Each provider runs in its own tokio task so a panic or classified failure
//! in one unit never touches its siblings. Parallelism is bounded by a small
//! semaphore since the units are I/O-bound. Completion notices go to the
//! `khoj.engine` tracing target in true completion order; the returned list
//! is re-sorted canonically afterwards.

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::error::{EngineError, ProviderError};
use crate::fixtures;
use crate::keys::KeyRing;
use crate::types::{InvocationResult, ProviderOutcome};
use crate::{canonical_rank, Provider, ProviderRegistry};

/// Cap on concurrently running provider units. Matches the provider count
/// today; stays fixed if the registry grows.
pub const MAX_CONCURRENT_PROVIDERS: usize = 3;

/// Ceiling on the whole collection phase.
pub const DEFAULT_GLOBAL_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub global_timeout: Duration,
    pub max_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            global_timeout: DEFAULT_GLOBAL_TIMEOUT,
            max_concurrency: MAX_CONCURRENT_PROVIDERS,
        }
    }
}

/// Providers with a usable credential, paired with that credential, in
/// canonical dispatch order. Providers without a key are filtered out here,
/// not reported as failures.
pub fn active_providers(
    registry: &ProviderRegistry,
    keys: &KeyRing,
) -> Vec<(Arc<dyn Provider>, String)> {
    registry
        .in_canonical_order()
        .into_iter()
        .filter_map(|p| keys.get(p.key_name()).map(|key| (p, key)))
        .collect()
}

pub struct ResearchEngine<'a> {
    registry: &'a ProviderRegistry,
    config: EngineConfig,
}

impl<'a> ResearchEngine<'a> {
    pub fn new(registry: &'a ProviderRegistry) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    pub fn with_config(registry: &'a ProviderRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Run one research invocation across all active providers.
    ///
    /// Returns exactly one outcome per dispatched provider. Only a fully
    /// empty active set is an error; every per-provider failure is folded
    /// into its outcome.
    pub async fn run(&self, topic: &str, keys: &KeyRing) -> Result<InvocationResult, EngineError> {
        let active = active_providers(self.registry, keys);
        if active.is_empty() {
            return Err(EngineError::NoActiveProviders);
        }

        let dispatch_start = Instant::now();
        let deadline = dispatch_start + self.config.global_timeout;
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));

        let mut abort_handles = Vec::with_capacity(active.len());
        let mut pending = FuturesUnordered::new();
        for (provider, api_key) in &active {
            let name = provider.name();
            let model = provider.model();
            let handle = tokio::spawn(run_unit(
                Arc::clone(provider),
                api_key.clone(),
                topic.to_string(),
                deadline,
                Arc::clone(&semaphore),
            ));
            abort_handles.push((name, model, handle.abort_handle()));
            pending.push(async move { (name, model, handle.await) });
        }

        let total = active.len();
        let mut outcomes: Vec<ProviderOutcome> = Vec::with_capacity(total);

        while outcomes.len() < total {
            match timeout_at(deadline, pending.next()).await {
                Ok(Some((name, model, joined))) => {
                    let outcome = match joined {
                        Ok(outcome) => outcome,
                        Err(join_err) => {
                            let err = ProviderError::Unexpected(panic_message(join_err));
                            ProviderOutcome::failed(name, model, dispatch_start.elapsed(), &err)
                        }
                    };
                    info!(
                        target: "khoj.engine",
                        provider = name,
                        status = if outcome.success { "OK" } else { "FAIL" },
                        elapsed_seconds = outcome.elapsed_seconds,
                        "provider finished"
                    );
                    outcomes.push(outcome);
                }
                Ok(None) => break,
                Err(_) => {
                    // Deadline elapsed with units still outstanding: record
                    // them as timed out and abort their tasks.
                    let done: HashSet<String> =
                        outcomes.iter().map(|o| o.provider.clone()).collect();
                    for (name, model, abort) in &abort_handles {
                        if !done.contains(*name) {
                            abort.abort();
                            warn!(
                                target: "khoj.engine",
                                provider = *name,
                                "global deadline elapsed with provider still outstanding"
                            );
                            outcomes.push(ProviderOutcome::failed(
                                *name,
                                *model,
                                dispatch_start.elapsed(),
                                &ProviderError::DeadlineElapsed,
                            ));
                        }
                    }
                    break;
                }
            }
        }

        outcomes.sort_by_key(|o| canonical_rank(&o.provider));
        Ok(InvocationResult::new(topic, outcomes))
    }

    /// Mock invocation: every registered provider gets its outcome from a
    /// fixture file, bypassing credentials and the network entirely.
    pub fn run_mock(&self, topic: &str, fixtures_dir: &Path) -> InvocationResult {
        let mut outcomes: Vec<ProviderOutcome> = self
            .registry
            .in_canonical_order()
            .iter()
            .map(|p| fixtures::load_outcome(fixtures_dir, p.name()))
            .collect();

        for outcome in &outcomes {
            info!(
                target: "khoj.engine",
                provider = %outcome.provider,
                status = if outcome.success { "OK" } else { "FAIL" },
                "fixture loaded"
            );
        }

        outcomes.sort_by_key(|o| canonical_rank(&o.provider));
        InvocationResult::new(topic, outcomes)
    }
}

/// One provider unit: acquire a pool slot, run the research call, fold the
/// result into an outcome. Never returns an error; classification happens
/// here so the collector only sees outcomes.
async fn run_unit(
    provider: Arc<dyn Provider>,
    api_key: String,
    topic: String,
    deadline: Instant,
    semaphore: Arc<Semaphore>,
) -> ProviderOutcome {
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            let err = ProviderError::Unexpected("worker pool closed".to_string());
            return ProviderOutcome::failed(
                provider.name(),
                provider.model(),
                Duration::ZERO,
                &err,
            );
        }
    };

    let start = Instant::now();
    debug!(target: "khoj.engine", provider = provider.name(), "dispatching research call");
    match provider.research(&api_key, &topic, deadline).await {
        Ok(research) => ProviderOutcome::ok(provider.name(), research, start.elapsed()),
        Err(err) => {
            ProviderOutcome::failed(provider.name(), provider.model(), start.elapsed(), &err)
        }
    }
}

fn panic_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "provider task cancelled".to_string();
    }
    match err.try_into_panic() {
        Ok(payload) => {
            let reason = if let Some(msg) = payload.downcast_ref::<&str>() {
                (*msg).to_string()
            } else if let Some(msg) = payload.downcast_ref::<String>() {
                msg.clone()
            } else {
                "unknown panic".to_string()
            };
            format!("provider task panicked: {}", reason)
        }
        Err(err) => err.to_string(),
    }
}
