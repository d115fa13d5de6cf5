//! Session State Store (C5, §4.5): persists conversations, messages, and
//! session snapshots behind the [`SessionStore`] trait, with an in-memory
//! reference implementation.

mod error;
mod memory;
mod model;
mod trait_def;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{
    AssistantMessage, AuditEvent, Blueprint, Conversation, LoadingState, Message, PendingHumanInput, SessionState,
    SessionStatus, StageBuffers, Task,
};
pub use trait_def::SessionStore;
