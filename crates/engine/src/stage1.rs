//! Stage 1 (§4.6): every council member drafts independently, in parallel,
//! against a shared deadline. A member whose primary call fails falls back
//! to its configured substitute; if that also fails the member is dropped.
//! Stage 1 succeeds once `⌈N/2⌉` drafts have arrived.

use std::time::Duration;

use config::{BoardConfig, EngineConfig};
use consensus::quorum;
use fail_list::FailListManager;
use provider::{CompletionParams, Provider};
use registry::Registry;
use router::{Requirements, ResolutionTarget, Router};
use store::Task;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{EngineError, Result},
    prompts, requirements,
    retry::with_retry,
};

/// One member's successful draft.
#[derive(Debug, Clone)]
pub struct DraftRecord {
    pub member_alias: String,
    pub model_id: String,
    pub content: String,
    pub substituted: bool,
}

pub struct Stage1Outcome {
    /// In `board.council_members` order, only the members that produced a draft.
    pub drafts: Vec<DraftRecord>,
    /// `"member->substitute"` entries, for `metadata.substitutes_used` (§8 Scenario 3).
    pub substitutes_used: Vec<String>,
}

pub async fn run(
    provider: &dyn Provider,
    registry: &Registry,
    fail_list: &FailListManager,
    board: &BoardConfig,
    task: &Task,
    user_text: &str,
    feedback: Option<&str>,
    engine_config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<Stage1Outcome> {
    let router = Router::new(registry, fail_list);
    let deadline = Duration::from_secs(board.response_timeout_s as u64);
    let capabilities = requirements::capabilities_from_skills(&task.required_skills);

    let futures = board
        .council_members
        .iter()
        .map(|alias| draft_one(provider, &router, board, alias, task, user_text, feedback, capabilities, deadline, engine_config));

    let results = tokio::select! {
        results = futures::future::join_all(futures) => results,
        () = cancel.cancelled() => return Err(EngineError::Cancelled),
    };

    let mut drafts = Vec::new();
    let mut substitutes_used = Vec::new();

    for (alias, outcome) in board.council_members.iter().zip(results) {
        if let Some((record, substituted)) = outcome {
            if substituted {
                substitutes_used.push(format!("{alias}->{}", record.model_id));
            }
            drafts.push(record);
        }
    }

    let required = quorum(board.member_count());
    if drafts.len() < required {
        return Err(EngineError::CouncilQuorumLost {
            drafts: drafts.len(),
            required,
        });
    }

    Ok(Stage1Outcome { drafts, substitutes_used })
}

#[allow(clippy::too_many_arguments)]
async fn draft_one(
    provider: &dyn Provider,
    router: &Router<'_>,
    board: &BoardConfig,
    alias: &str,
    task: &Task,
    user_text: &str,
    feedback: Option<&str>,
    capabilities: registry::Capabilities,
    deadline: Duration,
    engine_config: &EngineConfig,
) -> Option<(DraftRecord, bool)> {
    let requirements = Requirements(capabilities);

    if let Ok(model_id) = router.resolve(ResolutionTarget::CouncilMember(alias), board, requirements).await
        && let Ok(content) = call_member(provider, &model_id, board, alias, task, user_text, feedback, deadline, engine_config).await
    {
        return Some((
            DraftRecord {
                member_alias: alias.to_string(),
                model_id,
                content,
                substituted: false,
            },
            false,
        ));
    }

    let substitute_alias = board.substitute_models.get(alias)?;
    let model_id = router
        .resolve(ResolutionTarget::CouncilMember(substitute_alias), board, requirements)
        .await
        .ok()?;
    let content = call_member(provider, &model_id, board, alias, task, user_text, feedback, deadline, engine_config)
        .await
        .ok()?;

    Some((
        DraftRecord {
            member_alias: alias.to_string(),
            model_id,
            content,
            substituted: true,
        },
        true,
    ))
}

#[allow(clippy::too_many_arguments)]
async fn call_member(
    provider: &dyn Provider,
    model_id: &str,
    board: &BoardConfig,
    alias: &str,
    task: &Task,
    user_text: &str,
    feedback: Option<&str>,
    deadline: Duration,
    engine_config: &EngineConfig,
) -> provider::Result<String> {
    let personality = board.model_personalities.get(alias).map(String::as_str);
    let messages = prompts::stage1_messages(personality, &task.label, user_text, feedback);
    let backoff = Duration::from_millis(engine_config.retry_backoff_ms);

    let result = with_retry(engine_config.max_retries, backoff, || {
        provider.complete(model_id, &messages, &CompletionParams::default(), deadline)
    })
    .await?;

    Ok(result.content)
}
