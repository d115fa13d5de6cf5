use thiserror::Error;

/// Errors surfaced by the Session State Store (§7's `storage_error` row).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no conversation with id {0}")]
    ConversationNotFound(uuid::Uuid),

    #[error("human feedback submitted while session was not awaiting human input")]
    InvalidState,

    #[error("failed to persist conversation to disk: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("failed to (de)serialize persisted conversation: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
