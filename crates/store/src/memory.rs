//! Reference [`SessionStore`] implementation: in-memory, guarded by
//! per-conversation locking, with an optional atomic-file-per-conversation
//! persistence mode for durability across process restarts (§4.5 "Interface
//! vs. implementation").
//!
//! This is consistent with the non-goal that in-flight compute does not
//! survive a restart (§1) — only the last-saved snapshot does, which is
//! exactly what `save_session`/`append_message` checkpoint.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::{
    error::{Result, StoreError},
    model::{AuditEvent, Conversation, Message, SessionState},
    trait_def::SessionStore,
};

pub struct InMemoryStore {
    conversations: DashMap<uuid::Uuid, Arc<Mutex<Conversation>>>,
    audit_log: DashMap<uuid::Uuid, Arc<Mutex<Vec<AuditEvent>>>>,
    persistence_dir: Option<PathBuf>,
}

impl InMemoryStore {
    /// Creates a store. When `persistence_dir` is `Some`, every mutation is
    /// checkpointed to `<dir>/<conversation_id>.json` via write-then-rename,
    /// and any conversations already on disk are loaded eagerly.
    pub async fn new(persistence_dir: Option<PathBuf>) -> Result<Self> {
        let store = Self {
            conversations: DashMap::new(),
            audit_log: DashMap::new(),
            persistence_dir,
        };

        if let Some(dir) = &store.persistence_dir {
            store.load_from_disk(dir).await?;
        }

        Ok(store)
    }

    async fn load_from_disk(&self, dir: &PathBuf) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let bytes = tokio::fs::read(&path).await?;
            let conversation: Conversation = serde_json::from_slice(&bytes)?;
            self.conversations
                .insert(conversation.id, Arc::new(Mutex::new(conversation)));
        }

        Ok(())
    }

    fn conversation_path(&self, id: uuid::Uuid) -> Option<PathBuf> {
        self.persistence_dir.as_ref().map(|dir| dir.join(format!("{id}.json")))
    }

    /// Write-to-`.tmp` then `rename`, so a crash mid-write never leaves a
    /// half-written snapshot where a reader could observe it.
    async fn persist(&self, conversation: &Conversation) -> Result<()> {
        let Some(path) = self.conversation_path(conversation.id) else {
            return Ok(());
        };

        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(conversation)?;
        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        Ok(())
    }

    fn handle(&self, id: uuid::Uuid) -> Result<Arc<Mutex<Conversation>>> {
        self.conversations
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(StoreError::ConversationNotFound(id))
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_conversation(&self) -> Result<Conversation> {
        let id = uuid::Uuid::new_v4();
        let conversation = Conversation::new(id, jiff::Timestamp::now());
        self.conversations.insert(id, Arc::new(Mutex::new(conversation.clone())));
        self.persist(&conversation).await?;
        Ok(conversation)
    }

    async fn get_conversation(&self, conversation_id: uuid::Uuid) -> Result<Conversation> {
        let handle = self.handle(conversation_id)?;
        let conversation = handle.lock().await;
        Ok(conversation.clone())
    }

    async fn save_session(&self, conversation_id: uuid::Uuid, session_state: SessionState) -> Result<()> {
        let handle = self.handle(conversation_id)?;
        let mut conversation = handle.lock().await;
        conversation.session_state = Some(session_state);
        self.persist(&conversation).await
    }

    async fn append_message(&self, conversation_id: uuid::Uuid, message: Message) -> Result<()> {
        let handle = self.handle(conversation_id)?;
        let mut conversation = handle.lock().await;
        conversation.messages.push(message);
        self.persist(&conversation).await
    }

    async fn update_stage_buffer(
        &self,
        conversation_id: uuid::Uuid,
        message_id: uuid::Uuid,
        stage: u8,
        value: serde_json::Value,
    ) -> Result<()> {
        let handle = self.handle(conversation_id)?;
        let mut conversation = handle.lock().await;

        for message in conversation.messages.iter_mut() {
            if let Message::Assistant(assistant) = message
                && assistant.id == message_id
                && !assistant.finalized
            {
                match stage {
                    1 => assistant.stage1 = value,
                    2 => assistant.stage2 = value,
                    3 => assistant.stage3 = value,
                    _ => {}
                }
                break;
            }
        }

        self.persist(&conversation).await
    }

    async fn finalize_message(&self, conversation_id: uuid::Uuid, message_id: uuid::Uuid) -> Result<()> {
        let handle = self.handle(conversation_id)?;
        let mut conversation = handle.lock().await;

        for message in conversation.messages.iter_mut() {
            if let Message::Assistant(assistant) = message
                && assistant.id == message_id
            {
                assistant.finalized = true;
                break;
            }
        }

        self.persist(&conversation).await
    }

    async fn set_conversation_title(&self, conversation_id: uuid::Uuid, title: String) -> Result<()> {
        let handle = self.handle(conversation_id)?;
        let mut conversation = handle.lock().await;
        conversation.title = Some(title);
        self.persist(&conversation).await
    }

    async fn archive(&self, conversation_id: uuid::Uuid) -> Result<()> {
        let handle = self.handle(conversation_id)?;
        let mut conversation = handle.lock().await;
        conversation.archived = true;
        self.persist(&conversation).await
    }

    async fn delete_permanent(&self, conversation_id: uuid::Uuid) -> Result<()> {
        self.conversations
            .remove(&conversation_id)
            .ok_or(StoreError::ConversationNotFound(conversation_id))?;
        self.audit_log.remove(&conversation_id);

        if let Some(path) = self.conversation_path(conversation_id) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }

    async fn reset(&self, conversation_id: uuid::Uuid) -> Result<()> {
        let handle = self.handle(conversation_id)?;
        let mut conversation = handle.lock().await;
        conversation.messages.clear();
        conversation.session_state = None;
        self.persist(&conversation).await
    }

    async fn append_audit_event(&self, event: AuditEvent) -> Result<()> {
        let entry = self
            .audit_log
            .entry(event.session_id)
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone();
        let mut log = entry.lock().await;
        log.push(event);
        Ok(())
    }

    async fn audit_log(&self, session_id: uuid::Uuid) -> Result<Vec<AuditEvent>> {
        match self.audit_log.get(&session_id) {
            Some(entry) => Ok(entry.lock().await.clone()),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssistantMessage, LoadingState, SessionState};

    #[tokio::test]
    async fn append_message_is_immediately_visible() {
        let store = InMemoryStore::new(None).await.unwrap();
        let conversation = store.create_conversation().await.unwrap();

        let message = Message::User {
            id: uuid::Uuid::new_v4(),
            content: "hello".into(),
            created_at: jiff::Timestamp::now(),
        };
        store.append_message(conversation.id, message).await.unwrap();

        let reloaded = store.get_conversation(conversation.id).await.unwrap();
        assert_eq!(reloaded.messages.len(), 1);
    }

    #[tokio::test]
    async fn revision_index_tracks_prior_assistant_message_count() {
        let store = InMemoryStore::new(None).await.unwrap();
        let conversation = store.create_conversation().await.unwrap();

        for revision in 0..2 {
            let reloaded = store.get_conversation(conversation.id).await.unwrap();
            assert_eq!(reloaded.assistant_message_count(), revision);

            let assistant = AssistantMessage {
                id: uuid::Uuid::new_v4(),
                revision_index: revision,
                created_at: jiff::Timestamp::now(),
                stage1: serde_json::Value::Null,
                stage2: serde_json::Value::Null,
                stage3: serde_json::Value::Null,
                metadata: serde_json::Value::Null,
                loading: LoadingState::default(),
                finalized: true,
            };
            store
                .append_message(conversation.id, Message::Assistant(Box::new(assistant)))
                .await
                .unwrap();
        }

        let reloaded = store.get_conversation(conversation.id).await.unwrap();
        assert_eq!(reloaded.assistant_message_count(), 2);
    }

    #[tokio::test]
    async fn reset_clears_messages_but_preserves_title() {
        let store = InMemoryStore::new(None).await.unwrap();
        let conversation = store.create_conversation().await.unwrap();
        store
            .set_conversation_title(conversation.id, "Keep me".into())
            .await
            .unwrap();
        store
            .append_message(
                conversation.id,
                Message::User {
                    id: uuid::Uuid::new_v4(),
                    content: "hi".into(),
                    created_at: jiff::Timestamp::now(),
                },
            )
            .await
            .unwrap();
        store
            .save_session(conversation.id, SessionState::default())
            .await
            .unwrap();

        store.reset(conversation.id).await.unwrap();

        let reloaded = store.get_conversation(conversation.id).await.unwrap();
        assert_eq!(reloaded.title.as_deref(), Some("Keep me"));
        assert!(reloaded.messages.is_empty());
        assert!(reloaded.session_state.is_none());
    }

    #[tokio::test]
    async fn survives_process_restart_via_file_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let conversation_id = {
            let store = InMemoryStore::new(Some(dir.path().to_path_buf())).await.unwrap();
            let conversation = store.create_conversation().await.unwrap();
            store
                .set_conversation_title(conversation.id, "Persisted".into())
                .await
                .unwrap();
            conversation.id
        };

        let reopened = InMemoryStore::new(Some(dir.path().to_path_buf())).await.unwrap();
        let reloaded = reopened.get_conversation(conversation_id).await.unwrap();
        assert_eq!(reloaded.title.as_deref(), Some("Persisted"));
    }
}
