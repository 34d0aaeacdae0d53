// src/models/game_session.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{participant::Participant, question::Question, quiz::Quiz};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(SessionStatus::Waiting),
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(format!("unknown session status '{}'", other)),
        }
    }
}

/// Represents the 'game_sessions' table: one run of a quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub status: SessionStatus,
    pub current_question_index: i32,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,

    /// When the current question's countdown began.
    pub question_started_at: Option<chrono::DateTime<chrono::Utc>>,

    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl GameSession {
    pub fn new(quiz_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            quiz_id,
            status: SessionStatus::Waiting,
            current_question_index: 0,
            started_at: None,
            question_started_at: None,
            ended_at: None,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Host control view.
#[derive(Debug, Serialize)]
pub struct HostView {
    pub session: GameSession,
    pub quiz: Quiz,
    pub questions: Vec<Question>,
    pub participants: Vec<Participant>,
}
