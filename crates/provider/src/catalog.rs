//! Wire shapes for the models-catalog and per-model endpoints-catalog
//! endpoints (§6). These are kept deliberately close to the gateway's JSON so
//! that [`CatalogModel::raw`] / [`EndpointEntry::raw`] can hold the verbatim
//! payload the registry's provenance columns require (§9 "Provenance
//! columns").

use serde::Deserialize;
use serde_json::Value;

/// One entry of the models-catalog response's `data[]` array.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub context_length: Option<u64>,
    #[serde(default)]
    pub pricing: CatalogPricing,
    pub top_provider: Option<TopProvider>,
    /// Verbatim copy of this entry, used as `raw_base_model_snapshot`.
    #[serde(skip)]
    pub raw: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogPricing {
    /// `None` when the source omitted pricing entirely; `Some(0.0)` means
    /// the source explicitly priced it at zero. The merge keeps these
    /// distinct so an endpoint's real free-tier pricing isn't mistaken for
    /// "endpoint carries no pricing, fall back to base" (§4.2, §8 Inv. 2).
    #[serde(default, deserialize_with = "deserialize_optional_price")]
    pub prompt: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_price")]
    pub completion: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_price")]
    pub image: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopProvider {
    pub context_length: Option<u64>,
    pub max_completion_tokens: Option<u64>,
}

/// One entry of the per-model endpoints-catalog response.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointEntry {
    pub provider_name: String,
    pub context_length: Option<u64>,
    pub max_completion_tokens: Option<u64>,
    #[serde(default)]
    pub pricing: CatalogPricing,
    #[serde(default)]
    pub quantization: Option<String>,
    #[serde(default)]
    pub supported_parameters: Vec<String>,
    /// Verbatim copy of this entry, used as `raw_endpoint_snapshot`.
    #[serde(skip)]
    pub raw: Value,
}

/// Prices in the gateway's catalog are emitted as per-token USD strings or
/// numbers; this accepts both and normalizes to an `f64`, keeping `None`
/// for a field the source left out or set to `null`.
fn deserialize_optional_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
        Null,
    }

    match Option::<StringOrFloat>::deserialize(deserializer)? {
        Some(StringOrFloat::String(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
        Some(StringOrFloat::Float(f)) => Ok(Some(f)),
        Some(StringOrFloat::Null) | None => Ok(None),
    }
}

/// Top-level envelope of the models-catalog response.
#[derive(Debug, Deserialize)]
pub(crate) struct CatalogResponse {
    pub data: Vec<CatalogModel>,
}

/// Top-level envelope of the per-model endpoints-catalog response.
#[derive(Debug, Deserialize)]
pub(crate) struct EndpointsResponse {
    pub data: EndpointsData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EndpointsData {
    #[serde(default)]
    pub endpoints: Vec<EndpointEntry>,
}

/// A model is free-tier when its catalog pricing is explicitly zero or its
/// id carries the gateway's `:free` suffix (§6). Absent pricing is not the
/// same as free pricing — it means the source didn't report one.
pub fn is_free(id: &str, pricing: &CatalogPricing) -> bool {
    pricing.prompt == Some(0.0) || id.ends_with(":free")
}
