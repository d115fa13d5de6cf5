//! Consensus Algorithms (C4, §4.4): Borda-count and Chairman-Cut strategies
//! over peer rankings gathered in Stage 2.

mod ballot;
mod borda;
mod chairman_cut;
mod error;
mod result;

pub use ballot::{Ballot, generate_labels, parse_ballot};
pub use borda::borda_count;
pub use chairman_cut::{chairman_cut, parse_chairman_pick, shortlist};
pub use error::{ConsensusError, Result};
pub use result::ConsensusResult;

use config::ConsensusStrategy;

/// Ballot-count quorum required before a stage may proceed: `⌈N/2⌉` (§3
/// GLOSSARY "Quorum").
pub fn quorum(n: usize) -> usize {
    n.div_ceil(2)
}

/// Runs whichever strategy `strategy` names. `chairman_reply` is only
/// consulted under [`ConsensusStrategy::ChairmanCut`].
pub fn run(
    strategy: ConsensusStrategy,
    labels: &[String],
    ballots: &[Ballot],
    member_count: usize,
    chairman_reply: Option<&str>,
) -> Result<ConsensusResult> {
    let required = quorum(member_count);

    match strategy {
        ConsensusStrategy::BordaCount => borda_count(labels, ballots, required),
        ConsensusStrategy::ChairmanCut => {
            let reply = chairman_reply.unwrap_or_default();
            chairman_cut::chairman_cut(labels, ballots, required, reply)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quorum_rounds_up() {
        assert_eq!(quorum(1), 1);
        assert_eq!(quorum(2), 1);
        assert_eq!(quorum(3), 2);
        assert_eq!(quorum(4), 2);
        assert_eq!(quorum(5), 3);
        assert_eq!(quorum(6), 3);
    }
}
