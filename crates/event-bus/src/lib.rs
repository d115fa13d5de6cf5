//! Event Bus (C7, §4.7): in-process publish/subscribe of typed events with a
//! durable tail per session for reconnects.
//!
//! The bus is an accelerator, not the source of truth (§9 "State vs
//! stream") — its per-session ring is opportunistic, so correctness never
//! depends on it; the persisted conversation + latest `SessionState` is
//! always sufficient to reconstruct a client's view.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};

/// The frame `type` enumerated in §6 "Service boundary".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Log,
    SessionState,
    Stage1Start,
    Stage1Complete,
    Stage2Start,
    Stage2Complete,
    Stage3Start,
    Stage3Complete,
    HumanInputRequired,
    Complete,
    Error,
}

/// One event-stream frame (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub session_id: uuid::Uuid,
    /// Monotonically increasing per-session counter (§4.6).
    pub seq: u64,
    pub event_type: EventType,
    pub data: serde_json::Value,
    pub metadata: serde_json::Value,
    pub timestamp: jiff::Timestamp,
}

struct SessionChannel {
    next_seq: AtomicU64,
    ring: Mutex<VecDeque<Event>>,
    retention: usize,
    sender: broadcast::Sender<Event>,
}

impl SessionChannel {
    fn new(retention: usize) -> Self {
        let (sender, _) = broadcast::channel(retention.max(16));
        Self {
            next_seq: AtomicU64::new(0),
            ring: Mutex::new(VecDeque::with_capacity(retention)),
            retention,
            sender,
        }
    }
}

/// A live subscription handle. Delivery is at-least-once while the process
/// is up; a reconnecting subscriber should call
/// [`EventBus::events_since`] first to recover any missed tail.
pub struct Subscriber {
    receiver: broadcast::Receiver<Event>,
}

impl Subscriber {
    /// Awaits the next event, transparently skipping ahead (and logging)
    /// past a lagged gap rather than erroring the caller — the bus is an
    /// accelerator, so a few missed live events are recoverable via
    /// `events_since`, not fatal.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("event bus subscriber lagged, skipped {skipped} events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Publish/subscribe with per-session ordered delivery and a retention ring
/// for reconnects (§4.7).
pub struct EventBus {
    sessions: DashMap<uuid::Uuid, Arc<SessionChannel>>,
    retention_per_session: usize,
}

impl EventBus {
    pub fn new(retention_per_session: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            retention_per_session,
        }
    }

    fn channel(&self, session_id: uuid::Uuid) -> Arc<SessionChannel> {
        self.sessions
            .entry(session_id)
            .or_insert_with(|| Arc::new(SessionChannel::new(self.retention_per_session)))
            .clone()
    }

    /// Publishes one event, assigning the next `seq` for this session.
    pub async fn publish(
        &self,
        session_id: uuid::Uuid,
        event_type: EventType,
        data: serde_json::Value,
        metadata: serde_json::Value,
    ) -> Event {
        let channel = self.channel(session_id);
        let seq = channel.next_seq.fetch_add(1, Ordering::SeqCst);

        let event = Event {
            session_id,
            seq,
            event_type,
            data,
            metadata,
            timestamp: jiff::Timestamp::now(),
        };

        {
            let mut ring = channel.ring.lock().await;
            ring.push_back(event.clone());
            while ring.len() > channel.retention {
                ring.pop_front();
            }
        }

        // a publish with no live subscribers is not an error: the ring
        // still records it for a later `events_since`.
        let _ = channel.sender.send(event.clone());

        event
    }

    /// Subscribes to live events for a session.
    pub fn subscribe(&self, session_id: uuid::Uuid) -> Subscriber {
        let channel = self.channel(session_id);
        Subscriber {
            receiver: channel.sender.subscribe(),
        }
    }

    /// Returns the retained tail with `seq > since`, for a reconnecting
    /// subscriber to catch up before resuming live delivery.
    pub async fn events_since(&self, session_id: uuid::Uuid, since: u64) -> Vec<Event> {
        let channel = self.channel(session_id);
        let ring = channel.ring.lock().await;
        ring.iter().filter(|event| event.seq > since).cloned().collect()
    }

    /// Drops all retained state for a session (e.g. once a conversation is
    /// archived or deleted).
    pub fn drop_session(&self, session_id: uuid::Uuid) {
        self.sessions.remove(&session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seq_is_monotonic_per_session() {
        let bus = EventBus::new(1024);
        let session_id = uuid::Uuid::new_v4();

        let e1 = bus
            .publish(session_id, EventType::Log, serde_json::Value::Null, serde_json::Value::Null)
            .await;
        let e2 = bus
            .publish(session_id, EventType::Stage1Start, serde_json::Value::Null, serde_json::Value::Null)
            .await;

        assert_eq!(e1.seq, 0);
        assert_eq!(e2.seq, 1);
    }

    #[tokio::test]
    async fn reconnecting_subscriber_recovers_missed_tail() {
        let bus = EventBus::new(1024);
        let session_id = uuid::Uuid::new_v4();

        bus.publish(session_id, EventType::Log, serde_json::Value::Null, serde_json::Value::Null)
            .await;
        bus.publish(
            session_id,
            EventType::Stage1Start,
            serde_json::Value::Null,
            serde_json::Value::Null,
        )
        .await;

        let tail = bus.events_since(session_id, 0).await;
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].event_type, EventType::Stage1Start);
    }

    #[tokio::test]
    async fn retention_ring_drops_oldest_beyond_capacity() {
        let bus = EventBus::new(2);
        let session_id = uuid::Uuid::new_v4();

        for _ in 0..5 {
            bus.publish(session_id, EventType::Log, serde_json::Value::Null, serde_json::Value::Null)
                .await;
        }

        let tail = bus.events_since(session_id, 0).await;
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].seq, 3);
        assert_eq!(tail[1].seq, 4);
    }
}
