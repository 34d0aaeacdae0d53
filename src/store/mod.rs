// src/store/mod.rs

//! Row storage for quizzes, questions, sessions, participants and answers.
//!
//! [`Store`] is the seam between the game service and persistence. Two
//! backends exist: [`postgres::PgStore`] for deployments and
//! [`memory::MemoryStore`] for tests and database-less local runs.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    answer::Answer,
    game_session::GameSession,
    participant::Participant,
    question::{Question, QuestionType},
    quiz::{Quiz, RequiredFields},
    teacher::Teacher,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A uniqueness rule was violated (pin, username, one answer per question).
    Duplicate(String),
    /// A referenced row does not exist.
    Missing(String),
    /// The row changed after it was read; the write was not applied.
    Stale(String),
    /// Anything the backend reports that the caller cannot act on.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Duplicate(what) => write!(f, "duplicate {}", what),
            StoreError::Missing(what) => write!(f, "missing {}", what),
            StoreError::Stale(what) => write!(f, "stale {}", what),
            StoreError::Backend(msg) => write!(f, "store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // Postgres: 23505 unique_violation, 23503 foreign_key_violation
            match db.code().as_deref() {
                Some("23505") => {
                    return StoreError::Duplicate(db.constraint().unwrap_or("row").to_string());
                }
                Some("23503") => {
                    return StoreError::Missing(db.constraint().unwrap_or("row").to_string());
                }
                _ => {}
            }
        }
        StoreError::Backend(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub struct NewQuiz {
    pub title: String,
    pub pin: String,
    pub required_fields: RequiredFields,
    pub background_image: Option<String>,
    pub audio_file: Option<String>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_text: String,
    pub question_type: QuestionType,
    pub question_image: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub timer: i32,
    pub points: i32,
}

pub struct NewParticipant {
    pub game_session_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

pub struct NewAnswer {
    pub participant_id: Uuid,
    pub question_id: Uuid,
    pub game_session_id: Uuid,
    pub answer_text: String,
    pub is_correct: bool,
    /// Added to the participant's score in the same write. Never negative.
    pub points_awarded: i32,
    pub answered_at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_teacher(&self, username: &str, password_hash: &str) -> StoreResult<Teacher>;
    async fn find_teacher_by_username(&self, username: &str) -> StoreResult<Option<Teacher>>;

    /// Inserts a quiz and its questions together; `order_index` follows the
    /// order of `questions`.
    async fn create_quiz(&self, quiz: NewQuiz, questions: Vec<NewQuestion>) -> StoreResult<(Quiz, Vec<Question>)>;
    async fn get_quiz(&self, id: Uuid) -> StoreResult<Option<Quiz>>;
    async fn find_quiz_by_pin(&self, pin: &str) -> StoreResult<Option<Quiz>>;
    /// Newest first. `owner = None` lists every quiz.
    async fn list_quizzes(&self, owner: Option<Uuid>) -> StoreResult<Vec<Quiz>>;
    /// Removes the quiz with its questions, sessions, participants and answers.
    async fn delete_quiz(&self, id: Uuid) -> StoreResult<bool>;

    /// Play order.
    async fn list_questions(&self, quiz_id: Uuid) -> StoreResult<Vec<Question>>;

    async fn create_session(&self, session: &GameSession) -> StoreResult<GameSession>;
    async fn get_session(&self, id: Uuid) -> StoreResult<Option<GameSession>>;
    async fn latest_session_for_quiz(&self, quiz_id: Uuid) -> StoreResult<Option<GameSession>>;
    async fn list_sessions_for_quiz(&self, quiz_id: Uuid) -> StoreResult<Vec<GameSession>>;
    /// Writes `next` only while the stored row still has the status and
    /// question index of `read`, the copy the transition was computed from.
    /// Otherwise fails with [`StoreError::Stale`].
    async fn update_session(&self, read: &GameSession, next: &GameSession) -> StoreResult<GameSession>;

    async fn create_participant(&self, participant: NewParticipant) -> StoreResult<Participant>;
    async fn get_participant(&self, id: Uuid) -> StoreResult<Option<Participant>>;
    /// Leaderboard order, see [`crate::engine::ranking`].
    async fn list_participants(&self, session_id: Uuid) -> StoreResult<Vec<Participant>>;

    /// Inserts the answer and credits the participant in one atomic step.
    /// A second answer for the same (participant, question) fails with
    /// [`StoreError::Duplicate`] and changes nothing.
    async fn record_answer(&self, answer: NewAnswer) -> StoreResult<(Answer, Participant)>;
    async fn find_answer(&self, participant_id: Uuid, question_id: Uuid) -> StoreResult<Option<Answer>>;
    /// Answers to one question within one session, oldest first.
    async fn list_answers(&self, session_id: Uuid, question_id: Uuid) -> StoreResult<Vec<Answer>>;
}
