//! Stage 3 (§4.6, §4.4): the chairman synthesizes the final answer. Under
//! Borda-Count the winner is already decided by Stage 2's ballots and the
//! chairman writes prose referencing it; under Chairman-Cut the chairman
//! instead labels its pick from a blinded top-3 shortlist (§9 decided open
//! question: label-only), and the "synthesis" is that draft verbatim.

use std::time::Duration;

use config::{BoardConfig, ConsensusStrategy, EngineConfig};
use consensus::{Ballot, ConsensusResult, chairman_cut, shortlist};
use fail_list::FailListManager;
use indexmap::IndexMap;
use provider::{CompletionParams, Provider};
use registry::Registry;
use router::{Requirements, ResolutionTarget, Router};

use crate::{error::Result, prompts, retry::with_single_retry};

pub struct Stage3Outcome {
    pub final_answer: String,
    pub consensus: ConsensusResult,
    /// Set once the chairman call failed (or mis-parsed) and the run fell
    /// back to the Borda winner (§7 `chairman_fallback`).
    pub chairman_fallback: bool,
}

pub async fn run(
    provider: &dyn Provider,
    registry: &Registry,
    fail_list: &FailListManager,
    board: &BoardConfig,
    label_to_model: &IndexMap<String, String>,
    labeled_drafts: &[(String, String)],
    ballots: &[Ballot],
    engine_config: &EngineConfig,
) -> Result<Stage3Outcome> {
    let router = Router::new(registry, fail_list);
    let chairman_model_id = router
        .resolve(ResolutionTarget::Chairman, board, Requirements::default())
        .await?;

    let labels: Vec<String> = label_to_model.keys().cloned().collect();
    let required = consensus::quorum(board.member_count());
    let deadline = Duration::from_secs(board.response_timeout_s as u64);
    let backoff = Duration::from_millis(engine_config.retry_backoff_ms);

    match board.consensus_strategy {
        ConsensusStrategy::BordaCount => {
            let consensus_result = consensus::run(ConsensusStrategy::BordaCount, &labels, ballots, board.member_count(), None)?;

            let messages = prompts::synthesis_messages(labeled_drafts, &consensus_result.winner_label);
            let reply = with_single_retry(backoff, || provider.complete(&chairman_model_id, &messages, &CompletionParams::default(), deadline)).await;

            match reply {
                Ok(result) => Ok(Stage3Outcome {
                    final_answer: result.content,
                    consensus: consensus_result,
                    chairman_fallback: false,
                }),
                Err(err) => {
                    log::warn!("chairman synthesis call failed after retry, falling back to the Borda winner draft: {err}");
                    let winner_draft = draft_for_label(labeled_drafts, &consensus_result.winner_label);
                    Ok(Stage3Outcome {
                        final_answer: winner_draft,
                        consensus: consensus_result,
                        chairman_fallback: true,
                    })
                }
            }
        }
        ConsensusStrategy::ChairmanCut => {
            let shortlist_labels = shortlist(&labels, ballots, required)?;
            let shortlist_drafts: Vec<(String, String)> = shortlist_labels
                .iter()
                .map(|label| (label.clone(), draft_for_label(labeled_drafts, label)))
                .collect();

            let messages = prompts::chairman_pick_messages(&shortlist_drafts);
            let reply = with_single_retry(backoff, || provider.complete(&chairman_model_id, &messages, &CompletionParams::default(), deadline)).await;

            let chairman_reply_text = match reply {
                Ok(result) => result.content,
                Err(err) => {
                    log::warn!("chairman label-pick call failed after retry, falling back to the Borda winner: {err}");
                    String::new()
                }
            };

            let consensus_result = chairman_cut(&labels, ballots, required, &chairman_reply_text)?;
            let chairman_fallback = consensus_result.ties_broken_by.as_deref() == Some("chairman_parse_failure_fallback_to_borda");
            let final_answer = draft_for_label(labeled_drafts, &consensus_result.winner_label);

            Ok(Stage3Outcome {
                final_answer,
                consensus: consensus_result,
                chairman_fallback,
            })
        }
    }
}

fn draft_for_label(labeled_drafts: &[(String, String)], label: &str) -> String {
    labeled_drafts
        .iter()
        .find(|(l, _)| l == label)
        .map(|(_, content)| content.clone())
        .unwrap_or_default()
}
