//! The `SessionStore` seam (§4.5 "Interface vs. implementation"): the
//! relational-KV backing store itself is out of scope (§1), so the Engine
//! depends only on this trait.

use async_trait::async_trait;

use crate::{
    error::Result,
    model::{AuditEvent, Conversation, Message, SessionState},
};

/// Snapshot-oriented KV over a relational layer (§4.5).
///
/// Guarantees: (a) after a successful [`SessionStore::append_message`] the
/// message is visible to any subsequent reader; (b) partial stage buffers
/// are observable through streaming but only a finalized message counts as
/// a revision.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a new, empty conversation and returns it.
    async fn create_conversation(&self) -> Result<Conversation>;

    /// Reads the current state of one conversation.
    async fn get_conversation(&self, conversation_id: uuid::Uuid) -> Result<Conversation>;

    /// Atomic overwrite of the single current session state; the previous
    /// state is retained only in the audit log, not in the store itself.
    async fn save_session(&self, conversation_id: uuid::Uuid, session_state: SessionState) -> Result<()>;

    /// Appends a message. Assistant messages are append-only; their nested
    /// stage buffers may still be mutated via [`SessionStore::update_stage_buffer`]
    /// until finalized.
    async fn append_message(&self, conversation_id: uuid::Uuid, message: Message) -> Result<()>;

    /// Updates the in-flight stage buffers of the most recent (and not yet
    /// finalized) assistant message.
    async fn update_stage_buffer(
        &self,
        conversation_id: uuid::Uuid,
        message_id: uuid::Uuid,
        stage: u8,
        value: serde_json::Value,
    ) -> Result<()>;

    /// Marks the most recent assistant message finalized, making it count
    /// as a revision.
    async fn finalize_message(&self, conversation_id: uuid::Uuid, message_id: uuid::Uuid) -> Result<()>;

    async fn set_conversation_title(&self, conversation_id: uuid::Uuid, title: String) -> Result<()>;

    async fn archive(&self, conversation_id: uuid::Uuid) -> Result<()>;

    async fn delete_permanent(&self, conversation_id: uuid::Uuid) -> Result<()>;

    /// Clears messages and session_state; the title is preserved.
    async fn reset(&self, conversation_id: uuid::Uuid) -> Result<()>;

    /// Appends one entry to the append-only audit trail.
    async fn append_audit_event(&self, event: AuditEvent) -> Result<()>;

    /// Reads the full audit trail for one session, oldest first — the
    /// source of truth Property 4 (§8) is checked against.
    async fn audit_log(&self, session_id: uuid::Uuid) -> Result<Vec<AuditEvent>>;
}
