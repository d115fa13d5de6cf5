//! Model Router (C3, §4.3): selects concrete model variants for a task from
//! capability requirements, honouring substitutions, fail-lists, and the
//! tie-break order.

use std::collections::HashSet;

use config::BoardConfig;
use fail_list::FailListManager;
use registry::{Capabilities, Registry, UnifiedModel, capabilities_superset};
use thiserror::Error;

/// Errors the Router surfaces, per §7's `no_capable_model` row.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no model in the board's council/substitute set satisfies the required capabilities {required:?}")]
    NoCapableModel { required: Capabilities },
}

pub type Result<T> = std::result::Result<T, RouterError>;

/// One unit of work the Router resolves a model for: either a generic
/// council task, or the chairman's synthesis/blueprint role.
#[derive(Debug, Clone, Copy)]
pub enum ResolutionTarget<'a> {
    /// Resolve one council member for a Stage 1/2 task.
    CouncilMember(&'a str),
    /// Resolve the board's chairman for Stage 0/3.
    Chairman,
}

/// Capability requirements a task carries (`required_skills`, §3).
#[derive(Debug, Clone, Copy, Default)]
pub struct Requirements(pub Capabilities);

/// Resolves board member aliases to concrete, capable, available
/// [`UnifiedModel`] ids.
pub struct Router<'a> {
    registry: &'a Registry,
    fail_list: &'a FailListManager,
}

impl<'a> Router<'a> {
    pub fn new(registry: &'a Registry, fail_list: &'a FailListManager) -> Self {
        Self { registry, fail_list }
    }

    /// Resolves one target to a concrete model id (§4.3 steps 1-4).
    ///
    /// A board member is usually configured as one fully-qualified unified
    /// id, but may instead name a bare base model id shared by several
    /// hosting endpoints; `candidate_set` covers both. When that set filters
    /// down to more than one survivor, step 4's latency/cost tie-break picks
    /// among them. If it filters to empty, step 3's configured substitute is
    /// tried next — as its own, separate candidate set — never as a
    /// competitor to an already-viable primary.
    pub async fn resolve(
        &self,
        target: ResolutionTarget<'_>,
        board: &BoardConfig,
        requirements: Requirements,
    ) -> Result<String> {
        let failed: HashSet<String> = self.fail_list.active_failed_ids().await.into_iter().collect();

        let primary = match target {
            ResolutionTarget::CouncilMember(member) => member,
            ResolutionTarget::Chairman => board.chairman.as_str(),
        };

        let candidates = self.candidate_set(primary, &failed, requirements.0).await;
        if let Some(model) = Self::tie_break(&candidates) {
            return Ok(model.unified_id.clone());
        }

        if let Some(substitute) = board.substitute_models.get(primary) {
            let candidates = self.candidate_set(substitute, &failed, requirements.0).await;
            if let Some(model) = Self::tie_break(&candidates) {
                return Ok(model.unified_id.clone());
            }
        }

        Err(RouterError::NoCapableModel { required: requirements.0 })
    }

    /// The usable candidates for one configured member id: every hosting
    /// variant sharing its base model id when it names one (§4.2
    /// `list_variants`), or the single exact match when it names a
    /// fully-qualified unified id — in both cases filtered by the active
    /// fail-list and the required capabilities (§4.3 steps 1-2).
    async fn candidate_set(&self, model_id: &str, failed: &HashSet<String>, required: Capabilities) -> Vec<UnifiedModel> {
        let variants = self.registry.list_variants(model_id).await;
        let pool = if variants.is_empty() {
            self.registry.get(model_id).await.into_iter().collect()
        } else {
            variants
        };

        pool.into_iter()
            .filter(|model| !failed.contains(&model.unified_id))
            .filter(|model| capabilities_superset(model.capabilities, required))
            .collect()
    }

    /// Resolves every council member of a board for a generic (no extra
    /// capability) task, returning the stable member order used to build
    /// the Stage 2 blinded label mapping (§4.6).
    pub async fn resolve_board(&self, board: &BoardConfig) -> Result<Vec<String>> {
        let mut resolved = Vec::with_capacity(board.council_members.len());
        for member in &board.council_members {
            resolved.push(
                self.resolve(ResolutionTarget::CouncilMember(member), board, Requirements::default())
                    .await?,
            );
        }
        Ok(resolved)
    }

    /// Among equally capable candidates, breaks ties by lower `latency_ms`
    /// then lower `cost.cost_1mT_input_usd` (§4.3 step 4). `resolve` calls
    /// this over each candidate set `candidate_set` assembles; kept `pub` so
    /// it can also be exercised directly, as in the test below.
    pub fn tie_break(candidates: &[UnifiedModel]) -> Option<&UnifiedModel> {
        candidates.iter().min_by(|a, b| {
            let latency = a
                .latency_ms
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.latency_ms.unwrap_or(f64::INFINITY));
            latency.then_with(|| a.cost.cost_1m_input_usd.total_cmp(&b.cost.cost_1m_input_usd))
        })
    }
}

#[cfg(test)]
mod tests {
    // Exercised end-to-end through the engine crate's scenario tests; the
    // in-isolation tie-break logic is covered directly here.
    use super::*;
    use registry::{Cost, Technical};

    fn model(id: &str, latency: Option<f64>, cost: f64) -> UnifiedModel {
        UnifiedModel {
            unified_id: id.into(),
            developer_id: "d".into(),
            base_model_id: id.into(),
            base_model_name: id.into(),
            variant_name: "v".into(),
            print_name_part1: "d".into(),
            print_name_part2: "v".into(),
            access_provider_id: "gw".into(),
            hosting_provider_id: "h".into(),
            capabilities: Capabilities::default(),
            cost: Cost {
                cost_1m_input_usd: cost,
                cost_1m_output_usd: cost,
                is_free: false,
            },
            technical: Technical {
                context_tokens: None,
                max_output_tokens: None,
                quantization: None,
            },
            latency_ms: latency,
            latency_live_ms: None,
            latency_live_at: None,
            raw_base_model_snapshot: serde_json::Value::Null,
            raw_endpoint_snapshot: serde_json::Value::Null,
        }
    }

    #[test]
    fn tie_break_prefers_lower_latency_then_lower_cost() {
        let candidates = vec![model("a", Some(200.0), 1.0), model("b", Some(100.0), 5.0), model("c", Some(100.0), 2.0)];
        let winner = Router::tie_break(&candidates).unwrap();
        assert_eq!(winner.unified_id, "c");
    }

    mod resolve_integration {
        use std::{collections::BTreeMap, time::Duration};

        use async_trait::async_trait;
        use config::{BoardConfig, ConsensusStrategy};
        use fail_list::FailListManager;
        use provider::{CatalogModel, EndpointEntry, Provider};
        use registry::Registry;

        use crate::{Requirements, ResolutionTarget, Router};

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

            async fn probe_latency(&self, _: &str, _: Duration) -> provider::Result<Duration> {
                unimplemented!()
            }

            async fn list_base_models(&self) -> provider::Result<Vec<CatalogModel>> {
                Ok(vec![CatalogModel {
                    id: "openai/gpt-4o".into(),
                    name: "GPT-4o".into(),
                    description: String::new(),
                    context_length: Some(128_000),
                    pricing: Default::default(),
                    top_provider: None,
                    raw: serde_json::json!({}),
                }])
            }

            async fn list_endpoints(&self, _: &str) -> provider::Result<Vec<EndpointEntry>> {
                Ok(vec![
                    EndpointEntry {
                        provider_name: "Expensive Co".into(),
                        context_length: Some(128_000),
                        max_completion_tokens: Some(4096),
                        pricing: provider::CatalogPricing {
                            prompt: Some(0.00002),
                            completion: Some(0.00004),
                            image: None,
                        },
                        quantization: None,
                        supported_parameters: vec![],
                        raw: serde_json::json!({}),
                    },
                    EndpointEntry {
                        provider_name: "Cheap Co".into(),
                        context_length: Some(128_000),
                        max_completion_tokens: Some(4096),
                        pricing: provider::CatalogPricing {
                            prompt: Some(0.000001),
                            completion: Some(0.000002),
                            image: None,
                        },
                        quantization: None,
                        supported_parameters: vec![],
                        raw: serde_json::json!({}),
                    },
                ])
            }
        }

        fn board() -> BoardConfig {
            BoardConfig {
                name: "Test".into(),
                description: None,
                council_members: vec!["openai/gpt-4o".into()],
                chairman: "openai/gpt-4o".into(),
                substitute_models: BTreeMap::new(),
                model_personalities: BTreeMap::new(),
                consensus_strategy: ConsensusStrategy::BordaCount,
                response_timeout_s: 60,
            }
        }

        #[tokio::test]
        async fn resolve_tie_breaks_across_hosting_variants_of_a_shared_base_model() {
            let provider = std::sync::Arc::new(FakeProvider);
            let registry = Registry::new(provider.clone(), Duration::from_secs(300));
            registry.refresh().await.unwrap();

            let fail_list = FailListManager::new(provider, 4, Duration::from_secs(5));
            let router = Router::new(&registry, &fail_list);
            let board = board();

            let resolved = router
                .resolve(ResolutionTarget::CouncilMember("openai/gpt-4o"), &board, Requirements::default())
                .await
                .unwrap();

            assert_eq!(resolved, "openai/gpt-4o:cheapco");
        }
    }
}
