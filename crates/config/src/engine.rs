use serde::Deserialize;

/// Engine-wide defaults that apply across boards (retry policy, default
/// timeouts used before a board is resolved).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Upper bound on transient-failure retries for a single provider call.
    pub max_retries: u32,
    /// Base backoff before a jittered retry, doubled per attempt.
    pub retry_backoff_ms: u64,
    /// Number of most recent AuditEvents a session keeps addressable in
    /// memory for `generate_context_summary`-style truncation.
    pub context_summary_char_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_backoff_ms: 200,
            context_summary_char_limit: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_debug_snapshot;

    use super::EngineConfig;

    #[test]
    fn defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();

        assert_debug_snapshot!(&config, @r#"
        EngineConfig {
            max_retries: 2,
            retry_backoff_ms: 200,
            context_summary_char_limit: 2000,
        }
        "#);
    }
}
