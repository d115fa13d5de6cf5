/// The outcome of a consensus strategy over one Stage 2 vote (§4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusResult {
    pub winner_label: String,
    /// Labels, best to worst.
    pub ordering: Vec<String>,
    /// Raw Borda rank-sum per label (lower is better).
    pub per_label_scores: Vec<(String, u64)>,
    /// Set when a tie needed breaking, naming the rule that broke it.
    pub ties_broken_by: Option<String>,
}
