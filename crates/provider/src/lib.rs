//! Provider Client (C1): issues chat completions and latency probes against
//! the external provider gateway (§4.1), and fetches the two raw catalogs
//! the registry merges (§4.2).
//!
//! "Provider" in this spec's sense names a model variant routed through one
//! aggregator gateway, not a distinct backend integration — there is a
//! single [`GatewayClient`] implementation of the [`Provider`] trait, kept
//! behind the trait so the engine and registry can be tested against an
//! in-process fake.

mod catalog;
mod error;
mod gateway;
mod messages;

pub use catalog::{CatalogModel, CatalogPricing, EndpointEntry, TopProvider, is_free};
pub use error::{ProviderError, Result};
pub use gateway::GatewayClient;
pub use messages::{ChatMessage, CompletionParams, CompletionResult, ContentDelta, FinishReason};

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

/// The seam between the registry/router/engine and the external gateway.
///
/// Every method takes an explicit `timeout` rather than relying on an
/// internal client default: the engine derives each call's deadline from the
/// board's `response_timeout_s` (§5), and retrying a transient failure is a
/// policy decision the caller makes, not this trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable name of the gateway this client speaks to, used in log lines
    /// and metrics labels.
    fn name(&self) -> &str;

    /// Issues one non-streaming chat completion.
    async fn complete(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        params: &CompletionParams,
        timeout: Duration,
    ) -> Result<CompletionResult>;

    /// Issues a streaming chat completion, yielding content deltas until a
    /// finish reason arrives.
    async fn complete_stream(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        params: &CompletionParams,
        timeout: Duration,
    ) -> Result<BoxStream<'static, Result<ContentDelta>>>;

    /// Issues a minimal prompt and reports wall-clock time from first byte.
    async fn probe_latency(&self, model_id: &str, timeout: Duration) -> Result<Duration>;

    /// Fetches the full base-model catalog (one call).
    async fn list_base_models(&self) -> Result<Vec<CatalogModel>>;

    /// Fetches the endpoints catalog for one base model (one call per base
    /// model, per §4.2's dual-fetch strategy).
    async fn list_endpoints(&self, base_model_id: &str) -> Result<Vec<EndpointEntry>>;
}
