use std::time::Duration;

use duration_str::deserialize_duration;
use serde::Deserialize;

/// Configuration for the health-probing / fail-list manager (C8).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FailListConfig {
    /// Maximum number of latency probes in flight at once.
    pub probe_concurrency: usize,
    /// How often `probe_all` is invoked by a background scheduler. A value
    /// of zero disables the background schedule; probing is then caller-driven.
    #[serde(deserialize_with = "deserialize_duration")]
    pub probe_interval: Duration,
}

impl Default for FailListConfig {
    fn default() -> Self {
        Self {
            probe_concurrency: 8,
            probe_interval: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_debug_snapshot;

    use super::FailListConfig;

    #[test]
    fn defaults() {
        let config: FailListConfig = toml::from_str("").unwrap();

        assert_debug_snapshot!(&config, @r#"
        FailListConfig {
            probe_concurrency: 8,
            probe_interval: 60s,
        }
        "#);
    }
}
