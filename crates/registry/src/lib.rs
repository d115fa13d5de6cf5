//! Unified Model Registry (C2, §4.2): fetches raw base-model and endpoint
//! catalogs from a [`provider::Provider`], merges them endpoint-first, and
//! exposes queryable [`UnifiedModel`] records with provenance.

mod error;
mod merge;
mod model;

pub use error::{RegistryError, Result};
pub use merge::normalize_provider_name;
pub use model::{Capabilities, Cost, RawBaseModel, RawEndpoint, Technical, UnifiedModel};

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use provider::Provider;
use tokio::sync::RwLock;

/// How much weight a just-completed council run's latency carries in the
/// rolling average (§4.2 "Latency fields").
const LATENCY_EWMA_ALPHA: f64 = 0.3;

/// A filter applied to [`Registry::list_base_models`].
#[derive(Debug, Clone, Default)]
pub struct ModelFilter {
    /// Case-insensitive substring match against `base_model_name`.
    pub name_contains: Option<String>,
    /// Only return models whose capabilities are a superset of this set.
    pub requires: Capabilities,
}

impl ModelFilter {
    fn matches(&self, model: &UnifiedModel) -> bool {
        if let Some(needle) = &self.name_contains
            && !model.base_model_name.to_lowercase().contains(&needle.to_lowercase())
        {
            return false;
        }

        capabilities_superset(model.capabilities, self.requires)
    }
}

/// Whether `have` satisfies every flag set in `required`.
pub fn capabilities_superset(have: Capabilities, required: Capabilities) -> bool {
    (!required.tools || have.tools)
        && (!required.vision || have.vision)
        && (!required.reasoning || have.reasoning)
        && (!required.thinking || have.thinking)
        && (!required.json_mode || have.json_mode)
}

struct Snapshot {
    base_models: Vec<RawBaseModel>,
    endpoints: Vec<RawEndpoint>,
    unified: Vec<UnifiedModel>,
    fetched_at: Instant,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            base_models: Vec::new(),
            endpoints: Vec::new(),
            unified: Vec::new(),
            fetched_at: Instant::now() - Duration::from_secs(3600 * 24 * 365),
        }
    }
}

/// A diff between two refreshes, exposed to the (out-of-scope) origin-trace
/// consumer so it can show what changed without re-fetching.
#[derive(Debug, Clone, Default)]
pub struct RefreshDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

struct Inner {
    current: Snapshot,
    /// Stale rows kept around after a swap-in, purely for diffing; never
    /// read by queries (§4.2 "Both raw tables are rewritten atomically").
    previous: Option<Snapshot>,
}

/// The registry's refreshable cache of raw + unified tables.
///
/// `refresh()` uses the same double-checked-locking shape as a simple
/// TTL-gated discovery cache: a read-lock fast path for the common case,
/// then a write lock with a re-check so concurrent callers inside the same
/// TTL window collapse into a single fetch.
pub struct Registry {
    provider: Arc<dyn Provider>,
    refresh_interval: Duration,
    access_provider_id: String,
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new(provider: Arc<dyn Provider>, refresh_interval: Duration) -> Self {
        let access_provider_id = provider.name().to_string();

        Self {
            provider,
            refresh_interval,
            access_provider_id,
            inner: RwLock::new(Inner {
                current: Snapshot::empty(),
                previous: None,
            }),
        }
    }

    /// Refreshes the raw tables and re-merges, unless a previous refresh is
    /// still within `refresh_interval`. Returns a diff of unified ids that
    /// appeared/disappeared versus the prior snapshot.
    pub async fn refresh(&self) -> Result<RefreshDiff> {
        {
            let inner = self.inner.read().await;
            if inner.current.fetched_at.elapsed() < self.refresh_interval && !inner.current.base_models.is_empty() {
                return Ok(RefreshDiff::default());
            }
        }

        let mut inner = self.inner.write().await;

        if inner.current.fetched_at.elapsed() < self.refresh_interval && !inner.current.base_models.is_empty() {
            return Ok(RefreshDiff::default());
        }

        let base_models: Vec<RawBaseModel> = self
            .provider
            .list_base_models()
            .await?
            .into_iter()
            .map(RawBaseModel::from)
            .collect();

        let mut endpoints = Vec::new();
        for base in &base_models {
            match self.provider.list_endpoints(&base.id).await {
                Ok(entries) => {
                    endpoints.extend(entries.into_iter().map(|e| RawEndpoint::from_entry(&base.id, e)));
                }
                Err(err) => {
                    log::warn!("failed to fetch endpoints for base model {}: {err}", base.id);
                }
            }
        }

        let mut unified: Vec<UnifiedModel> = endpoints
            .iter()
            .filter_map(|endpoint| {
                let base = base_models.iter().find(|b| b.id == endpoint.base_model_id)?;
                Some(merge::merge(base, endpoint, &self.access_provider_id))
            })
            .collect();
        unified.sort_by_key(UnifiedModel::sort_key);

        let old_ids: std::collections::HashSet<_> =
            inner.current.unified.iter().map(|m| m.unified_id.clone()).collect();
        let new_ids: std::collections::HashSet<_> = unified.iter().map(|m| m.unified_id.clone()).collect();

        let diff = RefreshDiff {
            added: new_ids.difference(&old_ids).cloned().collect(),
            removed: old_ids.difference(&new_ids).cloned().collect(),
        };

        // carry latency fields across refreshes: they are recorded out-of-band
        // from council runs / probes, not derived from the snapshots.
        for model in &mut unified {
            if let Some(previous) = inner.current.unified.iter().find(|m| m.unified_id == model.unified_id) {
                model.latency_ms = previous.latency_ms;
                model.latency_live_ms = previous.latency_live_ms;
                model.latency_live_at = previous.latency_live_at;
            }
        }

        let new_snapshot = Snapshot {
            base_models,
            endpoints,
            unified,
            fetched_at: Instant::now(),
        };

        let stale = std::mem::replace(&mut inner.current, new_snapshot);
        inner.previous = Some(stale);

        Ok(diff)
    }

    /// Lists base models matching `filter`, stable-ordered, capped at `limit`.
    pub async fn list_base_models(&self, filter: &ModelFilter, limit: Option<usize>) -> Vec<UnifiedModel> {
        let inner = self.inner.read().await;
        let mut matches: Vec<UnifiedModel> = inner
            .current
            .unified
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        matches.sort_by_key(UnifiedModel::sort_key);

        if let Some(limit) = limit {
            matches.truncate(limit);
        }

        matches
    }

    /// Lists every hosting variant of one base model.
    pub async fn list_variants(&self, base_model_id: &str) -> Vec<UnifiedModel> {
        let inner = self.inner.read().await;
        let mut matches: Vec<UnifiedModel> = inner
            .current
            .unified
            .iter()
            .filter(|m| m.base_model_id == base_model_id)
            .cloned()
            .collect();
        matches.sort_by_key(UnifiedModel::sort_key);
        matches
    }

    /// Looks up one unified model by id.
    pub async fn get(&self, unified_id: &str) -> Result<UnifiedModel> {
        let inner = self.inner.read().await;
        inner
            .current
            .unified
            .iter()
            .find(|m| m.unified_id == unified_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(unified_id.to_string()))
    }

    /// Records a completed council run's latency, folding it into the
    /// rolling `latency_ms` average (α ≈ 0.3, §4.2).
    pub async fn record_run_latency(&self, unified_id: &str, observed: Duration) {
        let mut inner = self.inner.write().await;
        if let Some(model) = inner.current.unified.iter_mut().find(|m| m.unified_id == unified_id) {
            let observed_ms = observed.as_secs_f64() * 1000.0;
            model.latency_ms = Some(match model.latency_ms {
                Some(previous) => LATENCY_EWMA_ALPHA * observed_ms + (1.0 - LATENCY_EWMA_ALPHA) * previous,
                None => observed_ms,
            });
        }
    }

    /// Overwrites `latency_live_ms` with a fresh on-demand probe result.
    pub async fn record_live_probe(&self, unified_id: &str, observed: Duration, at: jiff::Timestamp) {
        let mut inner = self.inner.write().await;
        if let Some(model) = inner.current.unified.iter_mut().find(|m| m.unified_id == unified_id) {
            model.latency_live_ms = Some(observed.as_secs_f64() * 1000.0);
            model.latency_live_at = Some(at);
        }
    }

    /// Number of base models and endpoints known from the last refresh, for
    /// diagnostics/metrics.
    pub async fn counts(&self) -> (usize, usize, usize) {
        let inner = self.inner.read().await;
        (
            inner.current.base_models.len(),
            inner.current.endpoints.len(),
            inner.current.unified.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use provider::{CatalogModel, EndpointEntry, ProviderError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProvider {
        fetch_count: AtomicUsize,
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn name(&self) -> &str {
            "fake-gateway"
        }

        async fn complete(
            &self,
            _model_id: &str,
            _messages: &[provider::ChatMessage],
            _params: &provider::CompletionParams,
            _timeout: Duration,
        ) -> provider::Result<provider::CompletionResult> {
            unimplemented!()
        }

        async fn complete_stream(
            &self,
            _model_id: &str,
            _messages: &[provider::ChatMessage],
            _params: &provider::CompletionParams,
            _timeout: Duration,
        ) -> provider::Result<futures::stream::BoxStream<'static, provider::Result<provider::ContentDelta>>> {
            unimplemented!()
        }

        async fn probe_latency(&self, _model_id: &str, _timeout: Duration) -> provider::Result<Duration> {
            unimplemented!()
        }

        async fn list_base_models(&self) -> provider::Result<Vec<CatalogModel>> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            let raw = serde_json::json!({"id": "openai/gpt-4o"});
            Ok(vec![CatalogModel {
                id: "openai/gpt-4o".into(),
                name: "GPT-4o".into(),
                description: String::new(),
                context_length: Some(32_000),
                pricing: Default::default(),
                top_provider: None,
                raw,
            }])
        }

        async fn list_endpoints(&self, base_model_id: &str) -> provider::Result<Vec<EndpointEntry>> {
            if base_model_id != "openai/gpt-4o" {
                return Err(ProviderError::Permanent("unknown base model".into()));
            }
            Ok(vec![EndpointEntry {
                provider_name: "OpenRouter".into(),
                context_length: Some(8_192),
                max_completion_tokens: Some(4096),
                pricing: provider::CatalogPricing {
                    prompt: Some(0.000005),
                    completion: Some(0.000015),
                    image: None,
                },
                quantization: None,
                supported_parameters: vec!["tools".into()],
                raw: serde_json::json!({}),
            }])
        }
    }

    #[tokio::test]
    async fn refresh_is_idempotent_and_collapses_concurrent_callers() {
        let provider = Arc::new(FakeProvider {
            fetch_count: AtomicUsize::new(0),
        });
        let registry = Registry::new(provider.clone(), Duration::from_secs(300));

        let diff1 = registry.refresh().await.unwrap();
        assert_eq!(diff1.added, vec!["openai/gpt-4o:openrouter".to_string()]);

        let diff2 = registry.refresh().await.unwrap();
        assert!(diff2.added.is_empty() && diff2.removed.is_empty());

        // second refresh within the TTL window does not re-fetch.
        assert_eq!(provider.fetch_count.load(Ordering::SeqCst), 1);

        let model = registry.get("openai/gpt-4o:openrouter").await.unwrap();
        assert_eq!(model.technical.context_tokens, Some(8_192));
    }

    #[tokio::test]
    async fn latency_ewma_folds_into_rolling_average() {
        let provider = Arc::new(FakeProvider {
            fetch_count: AtomicUsize::new(0),
        });
        let registry = Registry::new(provider, Duration::from_secs(300));
        registry.refresh().await.unwrap();

        registry
            .record_run_latency("openai/gpt-4o:openrouter", Duration::from_millis(1000))
            .await;
        let model = registry.get("openai/gpt-4o:openrouter").await.unwrap();
        assert_eq!(model.latency_ms, Some(1000.0));

        registry
            .record_run_latency("openai/gpt-4o:openrouter", Duration::from_millis(500))
            .await;
        let model = registry.get("openai/gpt-4o:openrouter").await.unwrap();
        assert_eq!(model.latency_ms, Some(0.3 * 500.0 + 0.7 * 1000.0));
    }
}
