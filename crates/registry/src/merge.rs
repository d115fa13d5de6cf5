//! Endpoint-first merge (§4.2): for every `(base_model, endpoint)` pair,
//! produce one [`UnifiedModel`] row. Every derived field must be
//! reproducible from the two snapshots alone so that reprocessing is
//! idempotent (Invariant 1, §8).

use crate::model::{Capabilities, Cost, RawBaseModel, RawEndpoint, Technical, UnifiedModel};

const TOOL_PARAMETER_NAMES: [&str; 2] = ["tools", "function_calling"];
const REASONING_PARAMETER_NAMES: [&str; 2] = ["reasoning", "include_reasoning"];

/// Normalizes a hosting-provider name: casefold + strip punctuation (§4.2).
pub fn normalize_provider_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Splits `"openai/gpt-4o"` into `("openai", "gpt-4o")`; a base model id
/// without a `/` is its own developer (rare, but not an error).
fn split_developer(base_model_id: &str) -> (String, String) {
    match base_model_id.split_once('/') {
        Some((developer, name)) => (developer.to_string(), name.to_string()),
        None => (base_model_id.to_string(), base_model_id.to_string()),
    }
}

fn has_tools(endpoint: &RawEndpoint) -> bool {
    endpoint
        .supported_parameters
        .iter()
        .any(|p| TOOL_PARAMETER_NAMES.contains(&p.as_str()))
}

fn has_reasoning(base: &RawBaseModel, endpoint: &RawEndpoint) -> bool {
    endpoint
        .supported_parameters
        .iter()
        .any(|p| REASONING_PARAMETER_NAMES.contains(&p.as_str()))
        || base.description.to_lowercase().contains("reasoning")
        || base.description.to_lowercase().contains("chain-of-thought")
}

fn has_vision(base: &RawBaseModel, endpoint: &RawEndpoint) -> bool {
    base.modality.contains("image") || endpoint.pricing_image.is_some()
}

/// Merges one base model with one of its endpoints, producing the
/// `UnifiedModel` row the registry stores. `access_provider_id` names the
/// gateway that served both snapshots (there is one aggregator gateway in
/// this spec's scope, so it is constant per [`crate::Registry`] instance).
pub fn merge(base: &RawBaseModel, endpoint: &RawEndpoint, access_provider_id: &str) -> UnifiedModel {
    let (developer_id, base_model_name) = split_developer(&base.id);
    let hosting_provider_id = normalize_provider_name(&endpoint.provider_short_name);
    let unified_id = format!("{}:{}", base.id, hosting_provider_id);

    // endpoint-first by presence, not magnitude: an endpoint that reports an
    // explicit zero (a genuine free tier) must win over base pricing rather
    // than being treated as "no pricing reported" (§8 Inv. 2).
    let (cost_in, cost_out, is_free) = match (endpoint.pricing_in, endpoint.pricing_out) {
        (Some(cost_in), Some(cost_out)) => (cost_in, cost_out, cost_in == 0.0),
        (Some(cost_in), None) => (cost_in, 0.0, cost_in == 0.0),
        (None, Some(cost_out)) => (0.0, cost_out, cost_out == 0.0),
        (None, None) => match (base.base_pricing_in, base.base_pricing_out) {
            (Some(cost_in), Some(cost_out)) => (cost_in, cost_out, cost_in == 0.0),
            (Some(cost_in), None) => (cost_in, 0.0, cost_in == 0.0),
            (None, Some(cost_out)) => (0.0, cost_out, cost_out == 0.0),
            (None, None) => (0.0, 0.0, true),
        },
    };

    UnifiedModel {
        unified_id,
        developer_id: developer_id.clone(),
        base_model_id: base.id.clone(),
        base_model_name: base.human_name.clone(),
        variant_name: hosting_provider_id.clone(),
        print_name_part1: developer_id,
        print_name_part2: base_model_name,
        access_provider_id: access_provider_id.to_string(),
        hosting_provider_id,
        capabilities: Capabilities {
            tools: has_tools(endpoint),
            vision: has_vision(base, endpoint),
            reasoning: has_reasoning(base, endpoint),
            thinking: has_reasoning(base, endpoint),
            json_mode: endpoint
                .supported_parameters
                .iter()
                .any(|p| p == "response_format" || p == "json_mode"),
        },
        cost: Cost {
            // per-token USD normalized to per-1M-token USD.
            cost_1m_input_usd: cost_in * 1_000_000.0,
            cost_1m_output_usd: cost_out * 1_000_000.0,
            is_free,
        },
        technical: Technical {
            context_tokens: endpoint.context_tokens.or(base.default_context_tokens),
            max_output_tokens: endpoint.max_output_tokens,
            quantization: endpoint.quantization.clone(),
        },
        latency_ms: None,
        latency_live_ms: None,
        latency_live_at: None,
        raw_base_model_snapshot: base.raw_payload.clone(),
        raw_endpoint_snapshot: endpoint.raw_payload.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base(context: Option<u64>) -> RawBaseModel {
        RawBaseModel {
            id: "openai/gpt-4o".into(),
            human_name: "GPT-4o".into(),
            description: "A multimodal model with reasoning support".into(),
            modality: "text+image->text".into(),
            default_context_tokens: context,
            base_pricing_in: None,
            base_pricing_out: None,
            raw_payload: json!({"id": "openai/gpt-4o"}),
        }
    }

    fn endpoint(context: Option<u64>) -> RawEndpoint {
        RawEndpoint {
            base_model_id: "openai/gpt-4o".into(),
            provider_short_name: "Azure, Inc.".into(),
            pricing_in: Some(0.000005),
            pricing_out: Some(0.000015),
            pricing_image: None,
            context_tokens: context,
            max_output_tokens: Some(4096),
            quantization: Some("fp8".into()),
            supported_parameters: vec!["tools".into(), "reasoning".into()],
            raw_payload: json!({"provider_name": "Azure, Inc."}),
        }
    }

    #[test]
    fn endpoint_wins_context_length_conflict() {
        let merged = merge(&base(Some(32_000)), &endpoint(Some(8_192)), "gateway");
        assert_eq!(merged.technical.context_tokens, Some(8_192));

        // Re-merging with the endpoint's context length absent falls back to base (Scenario 6).
        let mut no_ctx_endpoint = endpoint(None);
        no_ctx_endpoint.context_tokens = None;
        let merged = merge(&base(Some(32_000)), &no_ctx_endpoint, "gateway");
        assert_eq!(merged.technical.context_tokens, Some(32_000));
    }

    #[test]
    fn hosting_provider_id_is_normalized() {
        let merged = merge(&base(None), &endpoint(None), "gateway");
        assert_eq!(merged.hosting_provider_id, "azureinc");
        assert_eq!(merged.unified_id, "openai/gpt-4o:azureinc");
    }

    #[test]
    fn capabilities_read_from_supported_parameters() {
        let merged = merge(&base(None), &endpoint(None), "gateway");
        assert!(merged.capabilities.tools);
        assert!(merged.capabilities.reasoning);
        assert!(merged.capabilities.vision);
    }

    #[test]
    fn cost_normalized_to_per_million_tokens() {
        let merged = merge(&base(None), &endpoint(None), "gateway");
        assert_eq!(merged.cost.cost_1m_input_usd, 5.0);
        assert_eq!(merged.cost.cost_1m_output_usd, 15.0);
        assert!(!merged.cost.is_free);
    }

    #[test]
    fn explicit_free_endpoint_pricing_wins_over_nonzero_base_pricing() {
        let mut priced_base = base(None);
        priced_base.base_pricing_in = Some(0.00001);
        priced_base.base_pricing_out = Some(0.00003);

        let mut free_endpoint = endpoint(None);
        free_endpoint.pricing_in = Some(0.0);
        free_endpoint.pricing_out = Some(0.0);

        let merged = merge(&priced_base, &free_endpoint, "gateway");
        assert_eq!(merged.cost.cost_1m_input_usd, 0.0);
        assert_eq!(merged.cost.cost_1m_output_usd, 0.0);
        assert!(merged.cost.is_free);
    }

    #[test]
    fn merge_is_idempotent_on_non_latency_fields() {
        let first = merge(&base(Some(32_000)), &endpoint(Some(8_192)), "gateway");
        let second = merge(&base(Some(32_000)), &endpoint(Some(8_192)), "gateway");
        assert_eq!(first.unified_id, second.unified_id);
        assert_eq!(first.cost.cost_1m_input_usd, second.cost.cost_1m_input_usd);
        assert_eq!(first.technical.context_tokens, second.technical.context_tokens);
        assert_eq!(first.capabilities, second.capabilities);
    }
}
