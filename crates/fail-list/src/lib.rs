//! Health & Fail-List Manager (C8, §4.8): batch-probes model availability
//! and maintains named fail-lists, of which at most one is active and gates
//! the Router's candidate set.

use std::{sync::Arc, time::Duration};

use futures::{StreamExt, stream::FuturesUnordered};
use provider::Provider;
use tokio::sync::RwLock;

/// A named set of model ids temporarily excluded from router candidates
/// (§3, GLOSSARY).
#[derive(Debug, Clone)]
pub struct FailList {
    pub id: uuid::Uuid,
    pub name: String,
    pub failed_model_ids: Vec<String>,
    pub active: bool,
    pub created_at: jiff::Timestamp,
}

/// `ok` / `failed` classification for one probed model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ok,
    Failed { reason: String },
}

/// One probe result, for callers that want the detail behind a fail-list.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub unified_id: String,
    pub outcome: ProbeOutcome,
}

/// Maintains the single active [`FailList`] and runs bounded-concurrency
/// latency probes to populate the next one.
pub struct FailListManager {
    provider: Arc<dyn Provider>,
    probe_concurrency: usize,
    probe_timeout: Duration,
    active: RwLock<Option<FailList>>,
}

impl FailListManager {
    pub fn new(provider: Arc<dyn Provider>, probe_concurrency: usize, probe_timeout: Duration) -> Self {
        Self {
            provider,
            probe_concurrency,
            probe_timeout,
            active: RwLock::new(None),
        }
    }

    /// Probes every model id with bounded concurrency (default 8, §4.8),
    /// then atomically replaces the active fail-list with the failed set.
    pub async fn probe_all(&self, model_ids: &[String]) -> Vec<ProbeResult> {
        let mut in_flight = FuturesUnordered::new();
        let mut pending = model_ids.to_vec();
        let mut results = Vec::with_capacity(model_ids.len());

        for _ in 0..self.probe_concurrency.min(pending.len()) {
            if let Some(id) = pending.pop() {
                in_flight.push(self.probe_one(id));
            }
        }

        while let Some(result) = in_flight.next().await {
            results.push(result);
            if let Some(id) = pending.pop() {
                in_flight.push(self.probe_one(id));
            }
        }

        let failed_model_ids = results
            .iter()
            .filter(|r| matches!(r.outcome, ProbeOutcome::Failed { .. }))
            .map(|r| r.unified_id.clone())
            .collect();

        self.activate(FailList {
            id: uuid::Uuid::new_v4(),
            name: format!("probe-{}", jiff::Timestamp::now()),
            failed_model_ids,
            active: true,
            created_at: jiff::Timestamp::now(),
        })
        .await;

        results
    }

    async fn probe_one(&self, unified_id: String) -> ProbeResult {
        let outcome = match self.provider.probe_latency(&unified_id, self.probe_timeout).await {
            Ok(_) => ProbeOutcome::Ok,
            Err(err) => ProbeOutcome::Failed { reason: err.to_string() },
        };
        ProbeResult { unified_id, outcome }
    }

    /// Makes `new_list` the active fail-list, deactivating whatever was
    /// active before. At most one list is active at a time (§4.8).
    async fn activate(&self, mut new_list: FailList) {
        new_list.active = true;
        let mut active = self.active.write().await;
        if let Some(old) = active.as_mut() {
            old.active = false;
        }
        *active = Some(new_list);
    }

    /// The model ids the active fail-list excludes, or an empty slice if no
    /// fail-list is active.
    pub async fn active_failed_ids(&self) -> Vec<String> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|list| list.failed_model_ids.clone())
            .unwrap_or_default()
    }

    /// Replaces the active fail-list directly (used by tests and by an
    /// operator override outside of a probe cycle).
    pub async fn set_active(&self, list: FailList) {
        self.activate(list).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FakeProvider;

    #[async_trait]
    impl Provider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn complete(
            &self,
            _: &str,
            _: &[provider::ChatMessage],
            _: &provider::CompletionParams,
            _: Duration,
        ) -> provider::Result<provider::CompletionResult> {
            unimplemented!()
        }

        async fn complete_stream(
            &self,
            _: &str,
            _: &[provider::ChatMessage],
            _: &provider::CompletionParams,
            _: Duration,
        ) -> provider::Result<futures::stream::BoxStream<'static, provider::Result<provider::ContentDelta>>> {
            unimplemented!()
        }

        async fn probe_latency(&self, model_id: &str, _: Duration) -> provider::Result<Duration> {
            if model_id.contains("bad") {
                Err(provider::ProviderError::Permanent("down".into()))
            } else {
                Ok(Duration::from_millis(42))
            }
        }

        async fn list_base_models(&self) -> provider::Result<Vec<provider::CatalogModel>> {
            unimplemented!()
        }

        async fn list_endpoints(&self, _: &str) -> provider::Result<Vec<provider::EndpointEntry>> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn probe_all_activates_fail_list_with_failures() {
        let manager = FailListManager::new(Arc::new(FakeProvider), 2, Duration::from_secs(1));
        let ids = vec!["good/a:x".to_string(), "bad/b:x".to_string(), "good/c:x".to_string()];

        let results = manager.probe_all(&ids).await;
        assert_eq!(results.len(), 3);

        let active = manager.active_failed_ids().await;
        assert_eq!(active, vec!["bad/b:x".to_string()]);
    }

    #[tokio::test]
    async fn only_one_fail_list_is_ever_active() {
        let manager = FailListManager::new(Arc::new(FakeProvider), 2, Duration::from_secs(1));
        manager.probe_all(&["bad/a:x".to_string()]).await;
        manager.probe_all(&["good/b:x".to_string()]).await;

        let active = manager.active_failed_ids().await;
        assert!(active.is_empty());
    }
}
