use thiserror::Error;

/// Errors surfaced by the Unified Model Registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A refresh failed to fetch the base-model catalog at all; the
    /// previous snapshot (if any) is kept.
    #[error("failed to refresh base model catalog: {0}")]
    CatalogFetch(#[from] provider::ProviderError),

    /// No unified model with the given id is known to the registry.
    #[error("unknown unified model id: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
