use std::time::{Duration, Instant};

use async_trait::async_trait;
use config::GatewayConfig;
use fastrace::future::FutureExt as _;
use futures::stream::BoxStream;
use secrecy::ExposeSecret;
use telemetry::{attributes, tracing::create_child_span_if_sampled};

use crate::{
    Provider,
    catalog::{CatalogModel, CatalogResponse, EndpointEntry, EndpointsResponse},
    error::{ProviderError, Result},
    messages::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, CompletionParams, CompletionResult},
};

/// The single aggregator gateway the Provider Client speaks to (§4.1). One
/// `reqwest::Client`, bearer-authenticated with the configured `SecretString`.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: url::Url,
    api_key: secrecy::SecretString,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .pool_idle_timeout(Some(Duration::from_secs(30)))
                .tcp_nodelay(true)
                .build()
                .expect("failed to build gateway HTTP client"),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> url::Url {
        // `Url::join` treats the base as a document, not a directory: a
        // `base_url` without a trailing slash would drop its last path
        // segment (e.g. `.../v1` joining `chat/completions` would yield
        // `.../chat/completions`, losing `v1`). Normalize to a directory
        // before joining.
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        base.join(path).expect("invalid gateway path")
    }

    async fn send_completion(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        params: &CompletionParams,
        stream: bool,
        timeout: Duration,
    ) -> Result<reqwest::Response> {
        let body = ChatCompletionRequest {
            model: model_id,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream,
        };

        let response = self
            .http
            .post(self.url("chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ProviderError::Timeout(timeout)
                } else {
                    ProviderError::Transient(err.to_string())
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, text));
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for GatewayClient {
    fn name(&self) -> &str {
        "provider-gateway"
    }

    async fn complete(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        params: &CompletionParams,
        timeout: Duration,
    ) -> Result<CompletionResult> {
        let span = create_child_span_if_sampled("provider:complete");
        span.add_property(|| (attributes::GEN_AI_OPERATION_NAME, "chat".to_string()));
        span.add_property(|| (attributes::GEN_AI_REQUEST_MODEL, model_id.to_string()));

        async move {
            let response = self.send_completion(model_id, messages, params, false, timeout).await?;

            let parsed: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|err| ProviderError::Decode(err.to_string()))?;

            let choice = parsed
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::Decode("chat completion response had no choices".into()))?;

            let usage = parsed.usage.unwrap_or(crate::messages::Usage {
                prompt_tokens: 0,
                completion_tokens: 0,
                total_tokens: 0,
            });

            Ok(CompletionResult {
                content: choice.message.content,
                finish_reason: choice.finish_reason.as_deref().into(),
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            })
        }
        .in_span(span)
        .await
    }

    async fn complete_stream(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        params: &CompletionParams,
        timeout: Duration,
    ) -> Result<BoxStream<'static, Result<crate::ContentDelta>>> {
        // The gateway's streaming shape is server-sent events of partial
        // `ChatCompletionResponse` chunks; for the reference engine driver,
        // a stream is collapsed from one non-streaming call so callers get
        // a uniform `BoxStream` seam regardless of transport.
        let result = self.complete(model_id, messages, params, timeout).await?;

        let delta = crate::ContentDelta {
            content: result.content,
            finish_reason: Some(result.finish_reason),
        };

        Ok(Box::pin(futures::stream::once(async move { Ok(delta) })))
    }

    async fn probe_latency(&self, model_id: &str, timeout: Duration) -> Result<Duration> {
        let probe = vec![ChatMessage::user("ping")];
        let params = CompletionParams {
            max_tokens: Some(1),
            temperature: None,
        };

        let started = Instant::now();
        self.send_completion(model_id, &probe, &params, false, timeout).await?;
        Ok(started.elapsed())
    }

    async fn list_base_models(&self) -> Result<Vec<CatalogModel>> {
        let response = self
            .http
            .get(self.url("models"))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|err| ProviderError::Transient(err.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|err| ProviderError::Decode(err.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::from_status(status, text));
        }

        decode_catalog(&text)
    }

    async fn list_endpoints(&self, base_model_id: &str) -> Result<Vec<EndpointEntry>> {
        let path = format!("models/{base_model_id}/endpoints");

        let response = self
            .http
            .get(self.url(&path))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|err| ProviderError::Transient(err.to_string()))?;

        let status = response.status();
        let text = response.text().await.map_err(|err| ProviderError::Decode(err.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::from_status(status, text));
        }

        decode_endpoints(&text)
    }
}

/// Parses the catalog body twice: once into the typed shape, once as bare
/// JSON, so each [`CatalogModel`] can carry its own verbatim `raw` entry
/// (§9 "Provenance columns" requires these survive untouched).
fn decode_catalog(text: &str) -> Result<Vec<CatalogModel>> {
    let mut typed: CatalogResponse = serde_json::from_str(text).map_err(|err| ProviderError::Decode(err.to_string()))?;
    let raw: serde_json::Value = serde_json::from_str(text).map_err(|err| ProviderError::Decode(err.to_string()))?;

    let raw_entries = raw.get("data").and_then(|v| v.as_array()).cloned().unwrap_or_default();

    for (model, raw_entry) in typed.data.iter_mut().zip(raw_entries) {
        model.raw = raw_entry;
    }

    Ok(typed.data)
}

fn decode_endpoints(text: &str) -> Result<Vec<EndpointEntry>> {
    let mut typed: EndpointsResponse =
        serde_json::from_str(text).map_err(|err| ProviderError::Decode(err.to_string()))?;
    let raw: serde_json::Value = serde_json::from_str(text).map_err(|err| ProviderError::Decode(err.to_string()))?;

    let raw_entries = raw
        .get("data")
        .and_then(|v| v.get("endpoints"))
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    for (endpoint, raw_entry) in typed.data.endpoints.iter_mut().zip(raw_entries) {
        endpoint.raw = raw_entry;
    }

    Ok(typed.data.endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_carries_verbatim_raw_snapshot() {
        let body = indoc::indoc! {r#"
            {"data": [{"id": "openai/gpt-4o", "name": "GPT-4o", "description": "", "context_length": 128000,
              "pricing": {"prompt": "0.000005", "completion": "0.000015"}, "top_provider": null, "extra_field": 1}]}
        "#};

        let models = decode_catalog(body).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].raw["extra_field"], 1);
        assert_eq!(models[0].pricing.prompt, Some(0.000005));
    }
}
