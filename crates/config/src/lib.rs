//! Council configuration structures mapping `council.toml`.

#![deny(missing_docs)]

mod council;
mod engine;
mod event_bus;
mod fail_list;
mod gateway;
mod loader;
mod store;
mod telemetry;

pub use council::{BoardConfig, BoardsConfig, ConsensusStrategy};
pub use engine::EngineConfig;
pub use event_bus::EventBusConfig;
pub use fail_list::FailListConfig;
pub use gateway::GatewayConfig;
pub use store::StoreConfig;
pub use telemetry::OtlpProtocol;
pub use telemetry::exporters::{
    ExportersConfig, GrpcHeaders, HttpHeaders, OtlpExporterConfig, OtlpGrpcConfig, OtlpHttpConfig,
};
pub use telemetry::tracing::{PropagationConfig, TracingConfig};
pub use telemetry::{LogsConfig, MetricsConfig, TelemetryConfig};

use std::path::Path;

use serde::Deserialize;

/// Top-level configuration for the council binary and the library crates it wires together.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Provider gateway connection settings.
    pub gateway: GatewayConfig,
    /// Configured boards, keyed by board id.
    #[serde(default)]
    pub boards: BoardsConfig,
    /// Engine-wide retry/backoff defaults.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Health & fail-list manager settings.
    #[serde(default)]
    pub fail_list: FailListConfig,
    /// Event bus retention settings.
    #[serde(default)]
    pub event_bus: EventBusConfig,
    /// Session state store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Telemetry configuration settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }

    /// Validates board invariants not expressible through serde alone.
    pub fn validate(&self) -> anyhow::Result<()> {
        loader::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use insta::assert_debug_snapshot;

    use crate::Config;

    #[test]
    fn minimal_config() {
        let toml = indoc! {r#"
            [gateway]
            base_url = "https://openrouter.ai/api/v1"
            api_key = "sk-test"
        "#};

        let config: Config = toml::from_str(toml).unwrap();

        assert_debug_snapshot!(&config.engine, @r#"
        EngineConfig {
            max_retries: 2,
            retry_backoff_ms: 200,
            context_summary_char_limit: 2000,
        }
        "#);
        assert!(config.boards.is_empty());
    }
}
