use std::time::Duration;

use duration_str::deserialize_duration;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Configuration for the external provider gateway (the single aggregator
/// endpoint the Provider Client speaks to).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Base URL of the gateway, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: Url,
    /// Bearer token used to authenticate against the gateway.
    pub api_key: SecretString,
    /// How often the Unified Model Registry refreshes its raw tables.
    #[serde(deserialize_with = "deserialize_duration", default = "default_refresh_interval")]
    pub refresh_interval: Duration,
    /// Request timeout applied to individual gateway calls, distinct from a
    /// board's `response_timeout_s` which bounds an entire stage.
    #[serde(deserialize_with = "deserialize_duration", default = "default_request_timeout")]
    pub request_timeout: Duration,
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use insta::assert_debug_snapshot;

    use super::GatewayConfig;

    #[test]
    fn minimal() {
        let toml = indoc! {r#"
            base_url = "https://openrouter.ai/api/v1"
            api_key = "sk-test"
        "#};

        let config: GatewayConfig = toml::from_str(toml).unwrap();

        assert_debug_snapshot!(&config.base_url, @r#""https://openrouter.ai/api/v1""#);
    }
}
