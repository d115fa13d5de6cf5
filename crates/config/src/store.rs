use std::path::PathBuf;

use serde::Deserialize;

/// Configuration for the reference Session State Store implementation.
///
/// The relational-KV backing store this interface fronts is out of scope;
/// this crate only configures the in-process reference implementation used
/// when no external store is wired in.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory used for atomic file-per-conversation persistence. When
    /// unset, the store keeps state in memory only (lost on restart, which
    /// matches the non-goal that in-flight compute does not survive one).
    pub persistence_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { persistence_dir: None }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_debug_snapshot;

    use super::StoreConfig;

    #[test]
    fn defaults_to_in_memory() {
        let config: StoreConfig = toml::from_str("").unwrap();
        assert_debug_snapshot!(&config, @r#"
        StoreConfig {
            persistence_dir: None,
        }
        "#);
    }
}
