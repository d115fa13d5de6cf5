//! The Engine's `thiserror` enum (§7): one variant per surfaced taxonomy row,
//! plus a `kind()`/`is_surfaced()` split so callers can apply the
//! absorb/surface policy without matching on crate-specific error types.

use thiserror::Error;

/// The shared taxonomy from §7, independent of which crate raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ProviderTransient,
    ProviderPermanent,
    Timeout,
    ParseError,
    InsufficientBallots,
    CouncilQuorumLost,
    NoCapableModel,
    ChairmanFallback,
    StorageError,
    InvalidState,
}

impl ErrorKind {
    /// `true` for every row §7 marks *surface*: the run ends `failed` and an
    /// `error` event is emitted. Everything else is absorbed upstream and
    /// never reaches this type as an `Err`.
    pub fn is_surfaced(self) -> bool {
        matches!(
            self,
            Self::InsufficientBallots
                | Self::CouncilQuorumLost
                | Self::NoCapableModel
                | Self::StorageError
                | Self::InvalidState
        )
    }
}

/// Errors the Council Engine surfaces to a caller or to the `error` event
/// (§7). Absorbed failures (single-member transient/permanent, blueprint
/// parse failures, chairman fallback) never reach this type — they are
/// logged and recovered from inside the stage that hit them.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("stage 1 produced fewer than the required quorum of drafts ({drafts} of {required})")]
    CouncilQuorumLost { drafts: usize, required: usize },

    #[error("stage 2 produced fewer than the required quorum of ballots: {0}")]
    InsufficientBallots(#[from] consensus::ConsensusError),

    #[error("router could not resolve a capable model: {0}")]
    NoCapableModel(#[from] router::RouterError),

    #[error("session store failure: {0}")]
    Storage(#[from] store::StoreError),

    #[error("human feedback submitted for session not in awaiting_human, or for a stale breakpoint")]
    InvalidState,

    #[error("no conversation with id {0}")]
    ConversationNotFound(uuid::Uuid),

    #[error("no configured board with id '{0}'")]
    BoardNotFound(String),

    #[error("run was cancelled")]
    Cancelled,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CouncilQuorumLost { .. } => ErrorKind::CouncilQuorumLost,
            Self::InsufficientBallots(_) => ErrorKind::InsufficientBallots,
            Self::NoCapableModel(_) => ErrorKind::NoCapableModel,
            Self::Storage(_) => ErrorKind::StorageError,
            Self::InvalidState | Self::ConversationNotFound(_) | Self::BoardNotFound(_) => ErrorKind::InvalidState,
            Self::Cancelled => ErrorKind::InvalidState,
        }
    }

    /// Machine-stable label for the `error` event's `data.kind` (§6).
    pub fn kind_label(&self) -> &'static str {
        match self.kind() {
            ErrorKind::ProviderTransient => "provider_transient",
            ErrorKind::ProviderPermanent => "provider_permanent",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::InsufficientBallots => "insufficient_ballots",
            ErrorKind::CouncilQuorumLost => "council_quorum_lost",
            ErrorKind::NoCapableModel => "no_capable_model",
            ErrorKind::ChairmanFallback => "chairman_fallback",
            ErrorKind::StorageError => "storage_error",
            ErrorKind::InvalidState => "invalid_state",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
