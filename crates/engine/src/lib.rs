//! Council Engine (C6, §4.6): the staged orchestrator tying together the
//! Provider Client, Unified Model Registry, Model Router, Consensus
//! Algorithms, Session State Store, Event Bus, and Health & Fail-List
//! Manager into one resumable, cancellable run.

mod blueprint;
mod error;
mod prompts;
mod requirements;
mod retry;
mod run;
mod stage1;
mod stage2;
mod stage3;

pub use error::{EngineError, ErrorKind, Result};
pub use run::RunOutcome;

use std::sync::Arc;

use config::{BoardConfig, BoardsConfig, EngineConfig};
use dashmap::DashMap;
use event_bus::EventBus;
use fail_list::FailListManager;
use provider::Provider;
use registry::Registry;
use store::{PendingHumanInput, SessionStore};
use tokio_util::sync::CancellationToken;

/// Ties every other component together behind the plain async methods this
/// crate exposes in place of the (out-of-scope) HTTP/event-stream façade
/// (§6 "Service boundary").
pub struct CouncilEngine {
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) fail_list: Arc<FailListManager>,
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) bus: Arc<EventBus>,
    pub(crate) boards: BoardsConfig,
    pub(crate) engine_config: EngineConfig,
    root_token: CancellationToken,
    /// One cancellation token per in-flight run, keyed by conversation id;
    /// removed once the run pauses, completes, or fails (§5 "ADDED
    /// Cancellation mechanism").
    run_tokens: DashMap<uuid::Uuid, CancellationToken>,
}

impl CouncilEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<Registry>,
        fail_list: Arc<FailListManager>,
        store: Arc<dyn SessionStore>,
        bus: Arc<EventBus>,
        boards: BoardsConfig,
        engine_config: EngineConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            fail_list,
            store,
            bus,
            boards,
            engine_config,
            root_token: CancellationToken::new(),
            run_tokens: DashMap::new(),
        }
    }

    pub(crate) fn board(&self, board_id: &str) -> Result<BoardConfig> {
        self.boards
            .get(board_id)
            .cloned()
            .ok_or_else(|| EngineError::BoardNotFound(board_id.to_string()))
    }

    /// Submits a new user message, starting a fresh run: a new blueprint is
    /// drafted (Stage 0) and executed until the first breakpoint, the
    /// blueprint's end, or a surfaced failure.
    ///
    /// Always starts a *new* blueprint — reusing a prior one (§4.6 Stage 0:
    /// "prior blueprint (if any)") only applies to the internal Stage 1 loop
    /// a [`CouncilEngine::submit_human_feedback`] resume re-enters, which
    /// never re-drafts a blueprint.
    pub async fn submit_message(&self, conversation_id: Option<uuid::Uuid>, board_id: &str, user_text: String) -> Result<(uuid::Uuid, RunOutcome)> {
        let board = self.board(board_id)?;

        let conversation_id = match conversation_id {
            Some(id) => {
                self.store.get_conversation(id).await?;
                id
            }
            None => self.store.create_conversation().await?.id,
        };

        self.store
            .append_message(
                conversation_id,
                store::Message::User {
                    id: uuid::Uuid::new_v4(),
                    content: user_text.clone(),
                    created_at: jiff::Timestamp::now(),
                },
            )
            .await?;

        let token = self.begin_run(conversation_id);
        let outcome = run::start(self, conversation_id, board_id, &board, user_text, &token).await;
        self.end_run(conversation_id);

        outcome.map(|outcome| (conversation_id, outcome))
    }

    /// Submits human feedback for a session paused at a breakpoint (§4.6
    /// Stage 4). `at_task_index` must match the task index the pending
    /// `human_input_required` event named; a call naming a stale index is
    /// treated as an idempotent replay (§8 "resume is idempotent keyed by
    /// `session_state.current_task_index`") rather than an error, so a
    /// client that retries an already-applied resume does not double-run
    /// the pipeline.
    pub async fn submit_human_feedback(
        &self,
        conversation_id: uuid::Uuid,
        board_id: &str,
        at_task_index: usize,
        feedback: PendingHumanInput,
    ) -> Result<RunOutcome> {
        let board = self.board(board_id)?;
        let token = self.begin_run(conversation_id);
        let outcome = run::resume(self, conversation_id, board_id, &board, at_task_index, feedback, &token).await;
        self.end_run(conversation_id);
        outcome
    }

    /// Cancels any in-flight run for `conversation_id`. A no-op if the
    /// session is idle, paused, or already finished (§5: "A paused session
    /// is not cancelled; it holds its snapshot indefinitely").
    pub async fn end_session(&self, conversation_id: uuid::Uuid) -> Result<()> {
        if let Some(token) = self.run_tokens.get(&conversation_id) {
            token.cancel();
        }
        Ok(())
    }

    pub async fn archive(&self, conversation_id: uuid::Uuid) -> Result<()> {
        self.store.archive(conversation_id).await?;
        Ok(())
    }

    /// Clears a conversation's messages and session state (title preserved)
    /// so the next `submit_message` starts a fresh blueprint (§4.5 `reset`).
    pub async fn reset(&self, conversation_id: uuid::Uuid) -> Result<()> {
        self.store.reset(conversation_id).await?;
        self.bus.drop_session(conversation_id);
        Ok(())
    }

    fn begin_run(&self, conversation_id: uuid::Uuid) -> CancellationToken {
        let token = self.root_token.child_token();
        self.run_tokens.insert(conversation_id, token.clone());
        token
    }

    fn end_run(&self, conversation_id: uuid::Uuid) {
        self.run_tokens.remove(&conversation_id);
    }
}
