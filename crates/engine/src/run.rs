//! The Stage 0-4 lifecycle loop (§4.6), shared by a fresh
//! [`crate::CouncilEngine::submit_message`] run and a resumed
//! [`crate::CouncilEngine::submit_human_feedback`] continuation.

use std::time::Duration;

use config::BoardConfig;
use event_bus::EventType;
use fastrace::{Span, collector::SpanContext, future::FutureExt as _};
use router::{Requirements, ResolutionTarget, Router};
use serde_json::json;
use store::{AssistantMessage, AuditEvent, LoadingState, Message, PendingHumanInput, SessionState, SessionStatus, Task};
use telemetry::attributes;
use tokio_util::sync::CancellationToken;

use crate::{
    CouncilEngine, blueprint,
    error::{EngineError, Result},
    stage1, stage2, stage3,
};

/// What a run call left the session in, once it stops actively executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    AwaitingHuman,
    Complete,
}

/// Drafts a fresh blueprint (Stage 0) and executes it (§4.6).
pub(crate) async fn start(
    engine: &CouncilEngine,
    conversation_id: uuid::Uuid,
    board_id: &str,
    board: &BoardConfig,
    user_text: String,
    token: &CancellationToken,
) -> Result<RunOutcome> {
    let router = Router::new(&engine.registry, &engine.fail_list);
    let chairman_model_id = router
        .resolve(ResolutionTarget::Chairman, board, Requirements::default())
        .await?;

    let deadline = Duration::from_secs(board.response_timeout_s as u64);
    let blueprint = blueprint::draft_blueprint(engine.provider.as_ref(), &chairman_model_id, None, &user_text, deadline).await;

    engine
        .bus
        .publish(conversation_id, EventType::Log, json!({"message": format!("blueprint drafted with {} task(s)", blueprint.tasks.len())}), serde_json::Value::Null)
        .await;

    let mut session_state = SessionState::new(blueprint);
    session_state.status = Some(SessionStatus::Running);
    engine.store.save_session(conversation_id, session_state.clone()).await?;
    publish_session_state(engine, conversation_id, &session_state).await;

    execute_from_current_task(engine, conversation_id, board_id, board, session_state, &user_text, None, token).await
}

/// Applies human feedback to a paused session and, if approved, resumes
/// execution of the next task's Stage 1 (§4.6 Stage 4, breakpoints).
pub(crate) async fn resume(
    engine: &CouncilEngine,
    conversation_id: uuid::Uuid,
    board_id: &str,
    board: &BoardConfig,
    at_task_index: usize,
    feedback: PendingHumanInput,
    token: &CancellationToken,
) -> Result<RunOutcome> {
    let conversation = engine.store.get_conversation(conversation_id).await?;
    let mut session_state = conversation.session_state.ok_or(EngineError::InvalidState)?;

    if session_state.status() != SessionStatus::AwaitingHuman {
        // a stale replay of an already-applied resume is idempotent, not an
        // error (§8 "resume is idempotent keyed by `current_task_index`");
        // anything else submitted outside `awaiting_human` is a genuine
        // client-side error (§7).
        return if at_task_index < session_state.current_task_index {
            Ok(match session_state.status() {
                SessionStatus::Complete => RunOutcome::Complete,
                SessionStatus::AwaitingHuman => RunOutcome::AwaitingHuman,
                _ => RunOutcome::AwaitingHuman,
            })
        } else {
            Err(EngineError::InvalidState)
        };
    }

    if at_task_index != session_state.current_task_index {
        return Err(EngineError::InvalidState);
    }

    if !feedback.continue_discussion {
        session_state.status = Some(SessionStatus::Complete);
        session_state.pending_human_input = None;
        engine.store.save_session(conversation_id, session_state.clone()).await?;
        publish_session_state(engine, conversation_id, &session_state).await;
        engine
            .bus
            .publish(conversation_id, EventType::Complete, serde_json::Value::Null, serde_json::Value::Null)
            .await;
        return Ok(RunOutcome::Complete);
    }

    session_state.current_task_index += 1;
    session_state.pending_human_input = None;
    session_state.status = Some(SessionStatus::Running);

    // the revision's user text is whatever the conversation's most recent
    // user message carries; feedback is appended as extra context only.
    let user_text = conversation
        .messages
        .iter()
        .rev()
        .find_map(|m| match m {
            Message::User { content, .. } => Some(content.clone()),
            _ => None,
        })
        .unwrap_or_default();

    execute_from_current_task(engine, conversation_id, board_id, board, session_state, &user_text, feedback.feedback.as_deref(), token).await
}

/// The shared per-task loop: Stage 1 → Stage 2 → Stage 3, one assistant
/// message per task, pausing on a breakpoint or once the blueprint is fully
/// consumed (§4.6).
#[allow(clippy::too_many_arguments)]
async fn execute_from_current_task(
    engine: &CouncilEngine,
    conversation_id: uuid::Uuid,
    board_id: &str,
    board: &BoardConfig,
    mut session_state: SessionState,
    user_text: &str,
    initial_feedback: Option<&str>,
    token: &CancellationToken,
) -> Result<RunOutcome> {
    let mut feedback = initial_feedback;

    loop {
        let Some(task) = session_state.current_task().cloned() else {
            session_state.status = Some(SessionStatus::Complete);
            engine.store.save_session(conversation_id, session_state.clone()).await?;
            publish_session_state(engine, conversation_id, &session_state).await;
            engine
                .bus
                .publish(conversation_id, EventType::Complete, serde_json::Value::Null, serde_json::Value::Null)
                .await;
            return Ok(RunOutcome::Complete);
        };

        let message_id = new_assistant_message(engine, conversation_id).await?;

        let result = run_task(engine, conversation_id, board, &task, message_id, user_text, feedback, token).await;
        feedback = None;

        match result {
            Ok(()) => {}
            Err(err) => return fail_run(engine, conversation_id, &mut session_state, err).await,
        }

        engine.store.finalize_message(conversation_id, message_id).await?;

        let is_last = session_state.current_task_index + 1 >= session_state.blueprint.tasks.len();

        if task.breakpoint || is_last {
            session_state.status = Some(SessionStatus::AwaitingHuman);
            engine.store.save_session(conversation_id, session_state.clone()).await?;
            publish_session_state(engine, conversation_id, &session_state).await;
            engine
                .bus
                .publish(
                    conversation_id,
                    EventType::HumanInputRequired,
                    json!({"task_index": session_state.current_task_index, "board_id": board_id}),
                    serde_json::Value::Null,
                )
                .await;
            return Ok(RunOutcome::AwaitingHuman);
        }

        session_state.current_task_index += 1;
        engine.store.save_session(conversation_id, session_state.clone()).await?;
    }
}

async fn new_assistant_message(engine: &CouncilEngine, conversation_id: uuid::Uuid) -> Result<uuid::Uuid> {
    let conversation = engine.store.get_conversation(conversation_id).await?;
    let message_id = uuid::Uuid::new_v4();

    engine
        .store
        .append_message(
            conversation_id,
            Message::Assistant(Box::new(AssistantMessage {
                id: message_id,
                revision_index: conversation.assistant_message_count(),
                created_at: jiff::Timestamp::now(),
                stage1: serde_json::Value::Null,
                stage2: serde_json::Value::Null,
                stage3: serde_json::Value::Null,
                metadata: serde_json::Value::Null,
                loading: LoadingState::default(),
                finalized: false,
            })),
        )
        .await?;

    Ok(message_id)
}

/// Runs Stage 1 through Stage 3 for one task, checkpointing stage buffers
/// and publishing the observable event sequence as each stage completes,
/// rooted under one fastrace span per task (§2.1 "Tracing").
#[allow(clippy::too_many_arguments)]
async fn run_task(
    engine: &CouncilEngine,
    conversation_id: uuid::Uuid,
    board: &BoardConfig,
    task: &Task,
    message_id: uuid::Uuid,
    user_text: &str,
    feedback: Option<&str>,
    token: &CancellationToken,
) -> Result<()> {
    let span = Span::root("council:task", SpanContext::random());
    span.add_property(|| (attributes::GEN_AI_CONVERSATION_ID, conversation_id.to_string()));
    span.add_property(|| ("council.task.id", task.id.clone()));

    run_task_inner(engine, conversation_id, board, task, message_id, user_text, feedback, token)
        .in_span(span)
        .await
}

#[allow(clippy::too_many_arguments)]
async fn run_task_inner(
    engine: &CouncilEngine,
    conversation_id: uuid::Uuid,
    board: &BoardConfig,
    task: &Task,
    message_id: uuid::Uuid,
    user_text: &str,
    feedback: Option<&str>,
    token: &CancellationToken,
) -> Result<()> {
    engine
        .bus
        .publish(conversation_id, EventType::Stage1Start, json!({"task_id": task.id}), serde_json::Value::Null)
        .await;

    let stage1 = stage1::run(
        engine.provider.as_ref(),
        &engine.registry,
        &engine.fail_list,
        board,
        task,
        user_text,
        feedback,
        &engine.engine_config,
        token,
    )
    .await?;

    let stage1_json = json!({
        "drafts": stage1.drafts.iter().map(|d| json!({
            "member": d.member_alias,
            "model_id": d.model_id,
            "content": d.content,
            "substituted": d.substituted,
        })).collect::<Vec<_>>(),
    });
    engine.store.update_stage_buffer(conversation_id, message_id, 1, stage1_json).await?;
    engine
        .bus
        .publish(
            conversation_id,
            EventType::Stage1Complete,
            json!({"substitutes_used": stage1.substitutes_used}),
            serde_json::Value::Null,
        )
        .await;

    engine
        .bus
        .publish(conversation_id, EventType::Stage2Start, serde_json::Value::Null, serde_json::Value::Null)
        .await;

    let stage2 = stage2::run(engine.provider.as_ref(), board, &stage1.drafts, &engine.engine_config, token).await?;

    let stage2_json = json!({
        "ballots": stage2.ballots.iter().map(|b| json!({
            "member_id": b.member_id,
            "ranking": b.ranking,
        })).collect::<Vec<_>>(),
    });
    engine.store.update_stage_buffer(conversation_id, message_id, 2, stage2_json).await?;
    engine
        .bus
        .publish(
            conversation_id,
            EventType::Stage2Complete,
            json!({"aggregate_rankings": stage2.ballots.iter().map(|b| &b.ranking).collect::<Vec<_>>()}),
            json!({"label_to_model": stage2.label_to_model}),
        )
        .await;

    engine
        .bus
        .publish(conversation_id, EventType::Stage3Start, serde_json::Value::Null, serde_json::Value::Null)
        .await;

    let stage3 = stage3::run(
        engine.provider.as_ref(),
        &engine.registry,
        &engine.fail_list,
        board,
        &stage2.label_to_model,
        &stage2.labeled_drafts,
        &stage2.ballots,
        &engine.engine_config,
    )
    .await?;

    if stage3.chairman_fallback {
        audit(
            engine,
            conversation_id,
            "chairman_fallback",
            None,
            Some(task.id.clone()),
            "chairman synthesis failed or mis-parsed; used the consensus winner draft verbatim".to_string(),
        )
        .await;
    }

    let stage3_json = json!({
        "final_answer": stage3.final_answer,
        "winner_label": stage3.consensus.winner_label,
        "ordering": stage3.consensus.ordering,
        "ties_broken_by": stage3.consensus.ties_broken_by,
        "chairman_fallback": stage3.chairman_fallback,
    });
    engine.store.update_stage_buffer(conversation_id, message_id, 3, stage3_json).await?;
    engine
        .bus
        .publish(
            conversation_id,
            EventType::Stage3Complete,
            json!({"winner_label": stage3.consensus.winner_label, "chairman_fallback": stage3.chairman_fallback}),
            serde_json::Value::Null,
        )
        .await;

    Ok(())
}

async fn fail_run(engine: &CouncilEngine, conversation_id: uuid::Uuid, session_state: &mut SessionState, err: EngineError) -> Result<RunOutcome> {
    session_state.status = Some(SessionStatus::Failed);
    let _ = engine.store.save_session(conversation_id, session_state.clone()).await;
    publish_session_state(engine, conversation_id, session_state).await;

    audit(engine, conversation_id, "error", None, None, err.to_string()).await;
    engine
        .bus
        .publish(
            conversation_id,
            EventType::Error,
            json!({"kind": err.kind_label(), "message": err.to_string()}),
            serde_json::Value::Null,
        )
        .await;

    Err(err)
}

async fn publish_session_state(engine: &CouncilEngine, conversation_id: uuid::Uuid, session_state: &SessionState) {
    let data = json!({
        "status": session_state.status(),
        "current_task_index": session_state.current_task_index,
        "blueprint": session_state.blueprint,
    });
    engine
        .bus
        .publish(conversation_id, EventType::SessionState, data, serde_json::Value::Null)
        .await;
}

async fn audit(engine: &CouncilEngine, conversation_id: uuid::Uuid, step: &str, model_id: Option<String>, task_id: Option<String>, message: String) {
    let event = AuditEvent {
        session_id: conversation_id,
        timestamp: jiff::Timestamp::now(),
        step: step.to_string(),
        model_id,
        task_id,
        log_message: message,
        raw_data_json: None,
    };
    if let Err(err) = engine.store.append_audit_event(event).await {
        log::warn!("failed to append audit event for session {conversation_id}: {err}");
    }
}
