// src/models/answer.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the 'answers' table. At most one row per (participant, question).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub question_id: Uuid,
    pub game_session_id: Uuid,

    /// Empty when the countdown ran out.
    pub answer_text: String,

    pub is_correct: bool,
    pub points_awarded: i32,
    pub answered_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting an answer to the current question.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub participant_id: Uuid,
    pub question_id: Uuid,
    #[validate(length(max = 500))]
    pub answer_text: String,
}

/// Result of a graded submission.
#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub answer: Answer,
    pub is_correct: bool,
    pub points_awarded: i32,
    pub score: i32,

    /// 1-based position of this answer among all answers to the question.
    pub answer_rank: usize,
}

/// Results panel shown after a question closes for a player.
#[derive(Debug, Serialize, PartialEq)]
pub struct AnswerStats {
    pub question_id: Uuid,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub player_rank: Option<usize>,
    pub total_players: usize,
    pub score: Option<i32>,
}
