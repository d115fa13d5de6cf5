use serde::Deserialize;

/// Configuration for the in-process event bus (C7).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventBusConfig {
    /// How many events the per-session retention ring keeps for reconnects.
    pub retention_per_session: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            retention_per_session: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_debug_snapshot;

    use super::EventBusConfig;

    #[test]
    fn defaults() {
        let config: EventBusConfig = toml::from_str("").unwrap();
        assert_debug_snapshot!(&config, @r#"
        EventBusConfig {
            retention_per_session: 1024,
        }
        "#);
    }
}
