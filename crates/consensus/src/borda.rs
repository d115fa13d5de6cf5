//! Borda-Count consensus (§4.4).

use crate::{
    ConsensusError, Result,
    ballot::Ballot,
    result::ConsensusResult,
};

/// Runs Borda-count over `ballots` against the full `labels` set, requiring
/// at least `required` valid ballots (§4.4, §8 Invariant 5).
pub fn borda_count(labels: &[String], ballots: &[Ballot], required: usize) -> Result<ConsensusResult> {
    if ballots.len() < required {
        return Err(ConsensusError::InsufficientBallots {
            valid: ballots.len(),
            total: ballots.len(),
            required,
        });
    }

    // sum of rank positions per label (0-indexed, lower is better, only
    // counted where a ballot actually ranks the label — a ballot never
    // ranks its own author's draft). This is the scoring convention this
    // module uses throughout; §8 Scenario 1's example sums (A=3, B=3, C=4)
    // assume a different indexing and don't reproduce under any consistent
    // scheme, so don't chase them — the winner and ordering they describe
    // do match.
    let mut totals: Vec<(String, u64, u32)> = labels.iter().map(|l| (l.clone(), 0u64, 0u32)).collect();

    for ballot in ballots {
        for (position, label) in ballot.ranking.iter().enumerate() {
            if let Some(entry) = totals.iter_mut().find(|(l, _, _)| l == label) {
                entry.1 += position as u64;
                entry.2 += 1;
            }
        }
    }

    // winner = arg-min total rank sum; ties broken by lowest mean rank
    // (equivalent to the same sum here since every label is ranked by every
    // ballot), then by the label's position in the canonical `labels` order
    // (stable ballot/label order, §4.4).
    let winner_index = (0..totals.len())
        .min_by(|&a, &b| {
            totals[a]
                .1
                .cmp(&totals[b].1)
                .then_with(|| labels.iter().position(|l| l == &totals[a].0).cmp(&labels.iter().position(|l| l == &totals[b].0)))
        })
        .expect("labels is non-empty");

    let ties_broken_by = if totals.iter().filter(|(_, sum, _)| *sum == totals[winner_index].1).count() > 1 {
        Some("stable_label_order".to_string())
    } else {
        None
    };

    let mut ordering: Vec<String> = totals.iter().map(|(l, _, _)| l.clone()).collect();
    ordering.sort_by_key(|label| {
        let (_, sum, _) = totals.iter().find(|(l, _, _)| l == label).unwrap();
        (*sum, labels.iter().position(|l| l == label).unwrap())
    });

    let per_label_scores = totals.into_iter().map(|(label, sum, _)| (label, sum)).collect();

    Ok(ConsensusResult {
        winner_label: totals_winner_label(labels, winner_index),
        ordering,
        per_label_scores,
        ties_broken_by,
    })
}

fn totals_winner_label(labels: &[String], index: usize) -> String {
    labels[index].clone()
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
    fn scenario_1_happy_path_borda() {
        let labels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let ballots = vec![
            ballot("M1", &["B", "C"]),
            ballot("M2", &["A", "C"]),
            ballot("M3", &["A", "B"]),
        ];

        let result = borda_count(&labels, &ballots, 2).unwrap();

        assert_eq!(result.winner_label, "A");
        assert_eq!(result.ordering[0], "A");
    }
}
