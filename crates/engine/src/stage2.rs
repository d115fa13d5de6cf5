//! Stage 2 (§4.6): drafts are blinded behind stable labels A, B, … and every
//! drafting member ranks them, excluding their own. Ballots are parsed
//! tolerantly (§9) and a quorum of `⌈N/2⌉` valid ballots is required.

use std::time::Duration;

use config::{BoardConfig, EngineConfig};
use consensus::{Ballot, generate_labels, parse_ballot, quorum};
use indexmap::IndexMap;
use provider::{CompletionParams, Provider};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{EngineError, Result},
    prompts,
    retry::with_retry,
    stage1::DraftRecord,
};

pub struct Stage2Outcome {
    /// Label (A, B, …) to the drafting model id, in stable label order (§8 Scenario 1).
    pub label_to_model: IndexMap<String, String>,
    pub labeled_drafts: Vec<(String, String)>,
    pub ballots: Vec<Ballot>,
}

pub async fn run(
    provider: &dyn Provider,
    board: &BoardConfig,
    drafts: &[DraftRecord],
    engine_config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<Stage2Outcome> {
    let labels = generate_labels(drafts.len());
    let label_to_model: IndexMap<String, String> = labels
        .iter()
        .cloned()
        .zip(drafts.iter().map(|d| d.model_id.clone()))
        .collect();
    let labeled_drafts: Vec<(String, String)> = labels
        .iter()
        .cloned()
        .zip(drafts.iter().map(|d| d.content.clone()))
        .collect();

    let deadline = Duration::from_secs(board.response_timeout_s as u64);
    let backoff = Duration::from_millis(engine_config.retry_backoff_ms);

    let futures = drafts.iter().zip(labels.iter()).map(|(draft, own_label)| {
        cast_ballot(
            provider,
            &draft.member_alias,
            &draft.model_id,
            own_label,
            &labels,
            &labeled_drafts,
            deadline,
            engine_config.max_retries,
            backoff,
        )
    });

    let results = tokio::select! {
        results = futures::future::join_all(futures) => results,
        () = cancel.cancelled() => return Err(EngineError::Cancelled),
    };

    let ballots: Vec<Ballot> = results.into_iter().flatten().collect();

    let required = quorum(board.member_count());
    if ballots.len() < required {
        return Err(EngineError::InsufficientBallots(consensus::ConsensusError::InsufficientBallots {
            valid: ballots.len(),
            total: drafts.len(),
            required,
        }));
    }

    Ok(Stage2Outcome {
        label_to_model,
        labeled_drafts,
        ballots,
    })
}

#[allow(clippy::too_many_arguments)]
async fn cast_ballot(
    provider: &dyn Provider,
    member_alias: &str,
    member_model_id: &str,
    own_label: &str,
    all_labels: &[String],
    labeled_drafts: &[(String, String)],
    deadline: Duration,
    max_retries: u32,
    backoff: Duration,
) -> Option<Ballot> {
    let messages = prompts::ballot_messages(own_label, labeled_drafts);

    let reply = with_retry(max_retries, backoff, || provider.complete(member_model_id, &messages, &CompletionParams::default(), deadline))
        .await
        .ok()?;

    let expected: Vec<String> = all_labels.iter().filter(|l| l.as_str() != own_label).cloned().collect();
    parse_ballot(member_alias, &reply.content, &expected)
}
