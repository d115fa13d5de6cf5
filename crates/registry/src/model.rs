//! The data model in play around the merge (§3): the two raw tables as
//! mirrored from provider truth, and the `UnifiedModel` row the merger
//! produces from one `(base, endpoint)` pair.

use provider::{CatalogModel, EndpointEntry};
use serde_json::Value;

/// One known base model, as fetched from the catalog endpoint (§3).
#[derive(Debug, Clone)]
pub struct RawBaseModel {
    pub id: String,
    pub human_name: String,
    pub description: String,
    /// Coarse modality string (e.g. `"text->text"`, `"text+image->text"`),
    /// read out of the catalog's raw architecture block when present.
    pub modality: String,
    pub default_context_tokens: Option<u64>,
    /// Base-model pricing, used only as the rare fallback when no endpoint
    /// reports pricing (§4.2 merge table, `cost.*`). `None` when the catalog
    /// didn't report a price at all, distinct from an explicit zero.
    pub base_pricing_in: Option<f64>,
    pub base_pricing_out: Option<f64>,
    pub raw_payload: Value,
}

impl From<CatalogModel> for RawBaseModel {
    fn from(model: CatalogModel) -> Self {
        let modality = model
            .raw
            .get("architecture")
            .and_then(|a| a.get("modality"))
            .and_then(|m| m.as_str())
            .unwrap_or_default()
            .to_string();

        Self {
            id: model.id,
            human_name: model.name,
            description: model.description,
            modality,
            default_context_tokens: model.context_length.or(model
                .top_provider
                .as_ref()
                .and_then(|p| p.context_length)),
            base_pricing_in: model.pricing.prompt,
            base_pricing_out: model.pricing.completion,
            raw_payload: model.raw,
        }
    }
}

/// One hosting endpoint for a base model, as fetched from the per-model
/// endpoints endpoint (§3). Zero-or-many per base model.
#[derive(Debug, Clone)]
pub struct RawEndpoint {
    pub base_model_id: String,
    pub provider_short_name: String,
    /// `None` when the endpoint didn't report a price at all, distinct
    /// from an explicit zero (free tier) — the merge relies on this to
    /// tell "endpoint carries no pricing" apart from "endpoint is free".
    pub pricing_in: Option<f64>,
    pub pricing_out: Option<f64>,
    pub pricing_image: Option<f64>,
    pub context_tokens: Option<u64>,
    pub max_output_tokens: Option<u64>,
    pub quantization: Option<String>,
    pub supported_parameters: Vec<String>,
    pub raw_payload: Value,
}

impl RawEndpoint {
    pub fn from_entry(base_model_id: &str, entry: EndpointEntry) -> Self {
        Self {
            base_model_id: base_model_id.to_string(),
            provider_short_name: entry.provider_name,
            pricing_in: entry.pricing.prompt,
            pricing_out: entry.pricing.completion,
            pricing_image: entry.pricing.image,
            context_tokens: entry.context_length,
            max_output_tokens: entry.max_completion_tokens,
            quantization: entry.quantization,
            supported_parameters: entry.supported_parameters,
            raw_payload: entry.raw,
        }
    }
}

/// Boolean capability flags a task's `required_skills` are matched against
/// by the Router (§4.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub tools: bool,
    pub vision: bool,
    pub reasoning: bool,
    pub thinking: bool,
    pub json_mode: bool,
}

/// Cost fields, normalized to USD per 1M tokens (§3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cost {
    pub cost_1m_input_usd: f64,
    pub cost_1m_output_usd: f64,
    pub is_free: bool,
}

/// Technical envelope fields (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct Technical {
    pub context_tokens: Option<u64>,
    pub max_output_tokens: Option<u64>,
    pub quantization: Option<String>,
}

/// A merged record combining one base model with one hosting endpoint — the
/// routable unit (§3, GLOSSARY).
#[derive(Debug, Clone)]
pub struct UnifiedModel {
    /// `base_model_id ":" normalized_provider_name`.
    pub unified_id: String,
    pub developer_id: String,
    pub base_model_id: String,
    pub base_model_name: String,
    pub variant_name: String,
    pub print_name_part1: String,
    pub print_name_part2: String,
    pub access_provider_id: String,
    pub hosting_provider_id: String,
    pub capabilities: Capabilities,
    pub cost: Cost,
    pub technical: Technical,
    /// Exponentially-weighted moving average over completed council runs.
    pub latency_ms: Option<f64>,
    pub latency_live_ms: Option<f64>,
    pub latency_live_at: Option<jiff::Timestamp>,
    pub raw_base_model_snapshot: Value,
    pub raw_endpoint_snapshot: Value,
}

impl UnifiedModel {
    /// `(developer_id, access_provider_id, hosting_provider_id,
    /// base_model_id, variant_name)`, the uniqueness invariant from §3.
    pub fn identity_key(&self) -> (String, String, String, String, String) {
        (
            self.developer_id.clone(),
            self.access_provider_id.clone(),
            self.hosting_provider_id.clone(),
            self.base_model_id.clone(),
            self.variant_name.clone(),
        )
    }

    /// Stable sort key: `(developer_id, base_model_name, variant_name,
    /// hosting_provider_id)` per §4.2 "Queries".
    pub fn sort_key(&self) -> (String, String, String, String) {
        (
            self.developer_id.clone(),
            self.base_model_name.clone(),
            self.variant_name.clone(),
            self.hosting_provider_id.clone(),
        )
    }
}
