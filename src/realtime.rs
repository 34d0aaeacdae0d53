// src/realtime.rs

//! In-process change feed.
//!
//! Every persisted mutation is published as a [`RealtimeEvent`]; WebSocket
//! clients subscribe with a [`Filter`] and receive the events for their
//! session. Publishing never blocks: a subscriber that falls too far behind
//! gets a [`RealtimeEvent::Lagged`] notice and should re-read over REST.

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

/// Events kept per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Quizzes,
    Questions,
    GameSessions,
    Participants,
    Answers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row-level change.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub session_id: Option<Uuid>,
    pub quiz_id: Option<Uuid>,
    pub row: serde_json::Value,
}

impl ChangeEvent {
    pub fn new<T: Serialize>(table: Table, kind: ChangeKind, row: &T) -> Self {
        Self {
            table,
            kind,
            session_id: None,
            quiz_id: None,
            row: serde_json::to_value(row).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn session(mut self, id: Uuid) -> Self {
        self.session_id = Some(id);
        self
    }

    pub fn quiz(mut self, id: Uuid) -> Self {
        self.quiz_id = Some(id);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    Change(ChangeEvent),
    Countdown {
        session_id: Uuid,
        question_id: Uuid,
        question_index: i32,
        remaining: u64,
    },
    /// The subscriber missed `skipped` events.
    Lagged { skipped: u64 },
}

impl RealtimeEvent {
    fn session_id(&self) -> Option<Uuid> {
        match self {
            RealtimeEvent::Change(change) => change.session_id,
            RealtimeEvent::Countdown { session_id, .. } => Some(*session_id),
            RealtimeEvent::Lagged { .. } => None,
        }
    }

    fn quiz_id(&self) -> Option<Uuid> {
        match self {
            RealtimeEvent::Change(change) => change.quiz_id,
            _ => None,
        }
    }
}

/// Which events a subscriber wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// One live session: host and player screens.
    Session(Uuid),
    /// Everything played on one quiz: the teacher dashboard.
    Quiz(Uuid),
}

impl Filter {
    pub fn matches(&self, event: &RealtimeEvent) -> bool {
        match self {
            Filter::Session(id) => event.session_id() == Some(*id),
            Filter::Quiz(id) => event.quiz_id() == Some(*id),
        }
    }
}

#[derive(Clone)]
pub struct ChangeHub {
    sender: broadcast::Sender<RealtimeEvent>,
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Fire and forget. Having no subscribers is not an error.
    pub fn publish(&self, event: RealtimeEvent) {
        let _ = self.sender.send(event);
    }

    pub fn change(&self, change: ChangeEvent) {
        self.publish(RealtimeEvent::Change(change));
    }

    pub fn subscribe(&self, filter: Filter) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct Subscription {
    receiver: broadcast::Receiver<RealtimeEvent>,
    filter: Filter,
}

impl Subscription {
    /// Next matching event, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<RealtimeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Realtime subscriber lagged by {} events", skipped);
                    return Some(RealtimeEvent::Lagged { skipped });
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
