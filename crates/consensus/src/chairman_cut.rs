//! Chairman-Cut consensus (§4.4): Borda picks a top-3 shortlist, the
//! chairman labels the winner among just those three.

use crate::{ballot::Ballot, borda::borda_count, result::ConsensusResult, Result};

/// The Borda top-3 labels (fewer if the board has fewer than 3 members),
/// blinded for the chairman.
pub fn shortlist(labels: &[String], ballots: &[Ballot], required: usize) -> Result<Vec<String>> {
    let borda = borda_count(labels, ballots, required)?;
    Ok(borda.ordering.into_iter().take(3).collect())
}

/// Interprets the chairman's raw output as a single winning label from the
/// shortlist. §9's decided Open Question (a): Chairman-Cut is label-only —
/// the chairman is not required to justify the pick, just to name it.
///
/// On parse failure (the chairman's text does not resolve to exactly one
/// shortlisted label), the caller should fall back to the Borda winner
/// (§4.4, §4.6 Stage 3).
pub fn parse_chairman_pick(raw: &str, shortlist: &[String]) -> Option<String> {
    let trimmed = raw.trim();

    // exact match first (the common case: the chairman replies with just the label).
    if let Some(label) = shortlist.iter().find(|l| l.as_str() == trimmed) {
        return Some(label.clone());
    }

    // otherwise, accept if exactly one shortlisted label appears as a
    // standalone uppercase token anywhere in the reply.
    let mentioned: Vec<&String> = shortlist
        .iter()
        .filter(|label| {
            raw.split(|c: char| !c.is_ascii_uppercase())
                .any(|token| token == label.as_str())
        })
        .collect();

    match mentioned.as_slice() {
        [single] => Some((*single).clone()),
        _ => None,
    }
}

/// Runs Chairman-Cut given the chairman's raw text reply; builds a full
/// [`ConsensusResult`] so callers don't need to special-case the strategy
/// downstream of voting.
pub fn chairman_cut(
    labels: &[String],
    ballots: &[Ballot],
    required: usize,
    chairman_reply: &str,
) -> Result<ConsensusResult> {
    let borda = borda_count(labels, ballots, required)?;
    let top3: Vec<String> = borda.ordering.iter().take(3).cloned().collect();

    let (winner_label, ties_broken_by) = match parse_chairman_pick(chairman_reply, &top3) {
        Some(label) => (label, None),
        None => (
            borda.winner_label.clone(),
            Some("chairman_parse_failure_fallback_to_borda".to_string()),
        ),
    };

    Ok(ConsensusResult {
        winner_label,
        ordering: borda.ordering,
        per_label_scores: borda.per_label_scores,
        ties_broken_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ballot(member: &str, ranking: &[&str]) -> Ballot {
        Ballot {
            member_id: member.into(),
            ranking: ranking.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn scenario_2_chairman_cut_labels_winner() {
        let labels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let ballots = vec![
            ballot("M1", &["B", "C"]),
            ballot("M2", &["A", "C"]),
            ballot("M3", &["A", "B"]),
        ];

        let result = chairman_cut(&labels, &ballots, 2, "B").unwrap();
        assert_eq!(result.winner_label, "B");
    }

    #[test]
    fn falls_back_to_borda_winner_on_parse_failure() {
        let labels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let ballots = vec![
            ballot("M1", &["B", "C"]),
            ballot("M2", &["A", "C"]),
            ballot("M3", &["A", "B"]),
        ];

        let result = chairman_cut(&labels, &ballots, 2, "I cannot decide between these fine options").unwrap();
        assert_eq!(result.winner_label, "A");
        assert_eq!(result.ties_broken_by.as_deref(), Some("chairman_parse_failure_fallback_to_borda"));
    }
}
