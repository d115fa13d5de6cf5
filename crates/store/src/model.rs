//! The data model owned by the Session State Store (§3): conversations,
//! messages, and the blueprint snapshot the Council Engine checkpoints
//! after every stage.

use serde::{Deserialize, Serialize};

/// One entry of the acyclic task list a run executes (§9 "Blueprint as
/// data, not code").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: String,
    pub label: String,
    #[serde(default)]
    pub breakpoint: bool,
    #[serde(default)]
    pub required_skills: Vec<String>,
}

/// The ordered task list for a run (§3 GLOSSARY "Blueprint").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Blueprint {
    pub tasks: Vec<Task>,
}

/// Lifecycle status of a [`SessionState`] (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    AwaitingHuman,
    Complete,
    Failed,
}

/// Per-stage scratch buffers observable through streaming before a message
/// is finalized (§4.5 "partial stage buffers are observable").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageBuffers {
    pub stage1: serde_json::Value,
    pub stage2: serde_json::Value,
    pub stage3: serde_json::Value,
}

/// Human feedback pending a resume call (§4.6 Stage 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingHumanInput {
    pub continue_discussion: bool,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// The blueprint snapshot checkpointed after each stage (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub blueprint: Blueprint,
    pub current_task_index: usize,
    pub status: Option<SessionStatus>,
    pub stage_buffers: StageBuffers,
    pub pending_human_input: Option<PendingHumanInput>,
}

impl SessionState {
    pub fn new(blueprint: Blueprint) -> Self {
        Self {
            blueprint,
            current_task_index: 0,
            status: Some(SessionStatus::Idle),
            stage_buffers: StageBuffers::default(),
            pending_human_input: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status.unwrap_or(SessionStatus::Idle)
    }

    /// `true` once every task in the blueprint has been consumed (§4.6
    /// Stage 4: "the blueprint is fully consumed").
    pub fn blueprint_consumed(&self) -> bool {
        self.current_task_index >= self.blueprint.tasks.len()
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.blueprint.tasks.get(self.current_task_index)
    }
}

/// One message variant in a conversation (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User { id: uuid::Uuid, content: String, created_at: jiff::Timestamp },
    HumanChairman { id: uuid::Uuid, content: String, created_at: jiff::Timestamp },
    Assistant(Box<AssistantMessage>),
}

impl Message {
    pub fn id(&self) -> uuid::Uuid {
        match self {
            Message::User { id, .. } | Message::HumanChairman { id, .. } => *id,
            Message::Assistant(assistant) => assistant.id,
        }
    }
}

/// Per-stage loading indicators for a still-in-flight assistant message
/// (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadingState {
    pub stage1: bool,
    pub stage2: bool,
    pub stage3: bool,
}

/// An assistant message: the output of one Stage 1-3 run. Revisions are
/// appended assistant messages sharing the same conversation; the k-th
/// assistant message is "revision k" (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub id: uuid::Uuid,
    pub revision_index: usize,
    pub created_at: jiff::Timestamp,
    pub stage1: serde_json::Value,
    pub stage2: serde_json::Value,
    pub stage3: serde_json::Value,
    pub metadata: serde_json::Value,
    pub loading: LoadingState,
    /// Only a finalized message counts as a revision (§4.5 guarantee (b)).
    pub finalized: bool,
}

/// A conversation and its exclusively-owned messages and session state
/// (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: uuid::Uuid,
    pub title: Option<String>,
    pub created_at: jiff::Timestamp,
    pub archived: bool,
    pub messages: Vec<Message>,
    pub session_state: Option<SessionState>,
}

impl Conversation {
    pub fn new(id: uuid::Uuid, created_at: jiff::Timestamp) -> Self {
        Self {
            id,
            title: None,
            created_at,
            archived: false,
            messages: Vec::new(),
            session_state: None,
        }
    }

    /// Number of assistant messages already appended, i.e. the
    /// `revision_index` the next one should carry (§8 Invariant 3).
    pub fn assistant_message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, Message::Assistant(_)))
            .count()
    }
}

/// An append-only audit trail entry (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub session_id: uuid::Uuid,
    pub timestamp: jiff::Timestamp,
    pub step: String,
    pub model_id: Option<String>,
    pub task_id: Option<String>,
    pub log_message: String,
    pub raw_data_json: Option<serde_json::Value>,
}
