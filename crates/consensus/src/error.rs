use thiserror::Error;

/// Errors surfaced by a consensus strategy (§4.4, §7).
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// Fewer than `⌈N/2⌉` ballots parsed successfully; the stage fails
    /// rather than declaring a winner on a minority of votes.
    #[error("insufficient ballots: {valid} valid out of {total} required at least {required}")]
    InsufficientBallots { valid: usize, total: usize, required: usize },
}

pub type Result<T> = std::result::Result<T, ConsensusError>;
