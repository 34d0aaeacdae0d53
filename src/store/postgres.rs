// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};
use uuid::Uuid;

use super::{NewAnswer, NewParticipant, NewQuestion, NewQuiz, Store, StoreError, StoreResult};
use crate::models::{
    answer::Answer,
    game_session::{GameSession, SessionStatus},
    participant::Participant,
    question::{Question, QuestionType},
    quiz::{Quiz, RequiredFields},
    teacher::Teacher,
};

/// Leaderboard order in SQL, mirrors `engine::ranking::compare`.
const RANKED: &str = "ORDER BY score DESC, last_correct_at ASC NULLS LAST, joined_at ASC, id ASC";

#[derive(FromRow)]
struct QuizRow {
    id: Uuid,
    title: String,
    pin: String,
    required_fields: Json<RequiredFields>,
    background_image: Option<String>,
    audio_file: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<QuizRow> for Quiz {
    fn from(r: QuizRow) -> Self {
        Quiz {
            id: r.id,
            title: r.title,
            pin: r.pin,
            required_fields: r.required_fields.0,
            background_image: r.background_image,
            audio_file: r.audio_file,
            created_by: r.created_by,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: Uuid,
    quiz_id: Uuid,
    question_text: String,
    question_type: String,
    question_image: Option<String>,
    options: Option<Json<Vec<String>>>,
    correct_answer: String,
    timer: i32,
    points: i32,
    order_index: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = StoreError;

    fn try_from(r: QuestionRow) -> Result<Self, Self::Error> {
        Ok(Question {
            id: r.id,
            quiz_id: r.quiz_id,
            question_text: r.question_text,
            question_type: r.question_type.parse::<QuestionType>().map_err(StoreError::Backend)?,
            question_image: r.question_image,
            options: r.options.map(|o| o.0),
            correct_answer: r.correct_answer,
            timer: r.timer,
            points: r.points,
            order_index: r.order_index,
            created_at: r.created_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: Uuid,
    quiz_id: Uuid,
    status: String,
    current_question_index: i32,
    started_at: Option<DateTime<Utc>>,
    question_started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for GameSession {
    type Error = StoreError;

    fn try_from(r: SessionRow) -> Result<Self, Self::Error> {
        Ok(GameSession {
            id: r.id,
            quiz_id: r.quiz_id,
            status: r.status.parse::<SessionStatus>().map_err(StoreError::Backend)?,
            current_question_index: r.current_question_index,
            started_at: r.started_at,
            question_started_at: r.question_started_at,
            ended_at: r.ended_at,
            created_at: r.created_at,
        })
    }
}

fn sessions(rows: Vec<SessionRow>) -> StoreResult<Vec<GameSession>> {
    rows.into_iter().map(GameSession::try_from).collect()
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_teacher(&self, username: &str, password_hash: &str) -> StoreResult<Teacher> {
        let teacher = sqlx::query_as::<_, Teacher>(
            "INSERT INTO teachers (id, username, password) VALUES ($1, $2, $3)
             RETURNING id, username, password, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(teacher)
    }

    async fn find_teacher_by_username(&self, username: &str) -> StoreResult<Option<Teacher>> {
        let teacher = sqlx::query_as::<_, Teacher>(
            "SELECT id, username, password, created_at FROM teachers WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(teacher)
    }

    async fn create_quiz(&self, quiz: NewQuiz, questions: Vec<NewQuestion>) -> StoreResult<(Quiz, Vec<Question>)> {
        let mut tx = self.pool.begin().await?;

        let quiz: Quiz = sqlx::query_as::<_, QuizRow>(
            r#"
            INSERT INTO quizzes (id, title, pin, required_fields, background_image, audio_file, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, title, pin, required_fields, background_image, audio_file, created_by, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&quiz.title)
        .bind(&quiz.pin)
        .bind(Json(quiz.required_fields))
        .bind(&quiz.background_image)
        .bind(&quiz.audio_file)
        .bind(quiz.created_by)
        .fetch_one(&mut *tx)
        .await?
        .into();

        let mut saved = Vec::with_capacity(questions.len());
        for (i, q) in questions.into_iter().enumerate() {
            let row = sqlx::query_as::<_, QuestionRow>(
                r#"
                INSERT INTO questions
                    (id, quiz_id, question_text, question_type, question_image, options,
                     correct_answer, timer, points, order_index)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING id, quiz_id, question_text, question_type, question_image, options,
                          correct_answer, timer, points, order_index, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(quiz.id)
            .bind(&q.question_text)
            .bind(q.question_type.as_str())
            .bind(&q.question_image)
            .bind(q.options.map(Json))
            .bind(&q.correct_answer)
            .bind(q.timer)
            .bind(q.points)
            .bind(i as i32)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(Question::try_from(row)?);
        }

        tx.commit().await?;
        Ok((quiz, saved))
    }

    async fn get_quiz(&self, id: Uuid) -> StoreResult<Option<Quiz>> {
        let row = sqlx::query_as::<_, QuizRow>(
            "SELECT id, title, pin, required_fields, background_image, audio_file, created_by, created_at
             FROM quizzes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Quiz::from))
    }

    async fn find_quiz_by_pin(&self, pin: &str) -> StoreResult<Option<Quiz>> {
        let row = sqlx::query_as::<_, QuizRow>(
            "SELECT id, title, pin, required_fields, background_image, audio_file, created_by, created_at
             FROM quizzes WHERE pin = $1",
        )
        .bind(pin)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Quiz::from))
    }

    async fn list_quizzes(&self, owner: Option<Uuid>) -> StoreResult<Vec<Quiz>> {
        let rows = sqlx::query_as::<_, QuizRow>(
            "SELECT id, title, pin, required_fields, background_image, audio_file, created_by, created_at
             FROM quizzes
             WHERE $1::uuid IS NULL OR created_by = $1
             ORDER BY created_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Quiz::from).collect())
    }

    async fn delete_quiz(&self, id: Uuid) -> StoreResult<bool> {
        // Questions, sessions, participants and answers go via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_questions(&self, quiz_id: Uuid) -> StoreResult<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            "SELECT id, quiz_id, question_text, question_type, question_image, options,
                    correct_answer, timer, points, order_index, created_at
             FROM questions WHERE quiz_id = $1
             ORDER BY order_index ASC",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Question::try_from).collect()
    }

    async fn create_session(&self, session: &GameSession) -> StoreResult<GameSession> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO game_sessions
                (id, quiz_id, status, current_question_index, started_at, question_started_at, ended_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, quiz_id, status, current_question_index, started_at,
                      question_started_at, ended_at, created_at
            "#,
        )
        .bind(session.id)
        .bind(session.quiz_id)
        .bind(session.status.as_str())
        .bind(session.current_question_index)
        .bind(session.started_at)
        .bind(session.question_started_at)
        .bind(session.ended_at)
        .bind(session.created_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<GameSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, quiz_id, status, current_question_index, started_at,
                    question_started_at, ended_at, created_at
             FROM game_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(GameSession::try_from).transpose()
    }

    async fn latest_session_for_quiz(&self, quiz_id: Uuid) -> StoreResult<Option<GameSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, quiz_id, status, current_question_index, started_at,
                    question_started_at, ended_at, created_at
             FROM game_sessions WHERE quiz_id = $1
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(GameSession::try_from).transpose()
    }

    async fn list_sessions_for_quiz(&self, quiz_id: Uuid) -> StoreResult<Vec<GameSession>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT id, quiz_id, status, current_question_index, started_at,
                    question_started_at, ended_at, created_at
             FROM game_sessions WHERE quiz_id = $1
             ORDER BY created_at DESC",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;
        sessions(rows)
    }

    async fn update_session(&self, read: &GameSession, next: &GameSession) -> StoreResult<GameSession> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            UPDATE game_sessions
            SET status = $2, current_question_index = $3, started_at = $4,
                question_started_at = $5, ended_at = $6
            WHERE id = $1 AND status = $7 AND current_question_index = $8
            RETURNING id, quiz_id, status, current_question_index, started_at,
                      question_started_at, ended_at, created_at
            "#,
        )
        .bind(read.id)
        .bind(next.status.as_str())
        .bind(next.current_question_index)
        .bind(next.started_at)
        .bind(next.question_started_at)
        .bind(next.ended_at)
        .bind(read.status.as_str())
        .bind(read.current_question_index)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return row.try_into();
        }
        // No match: either the row is gone or another transition got there first.
        match self.get_session(read.id).await? {
            Some(_) => Err(StoreError::Stale("game_sessions".into())),
            None => Err(StoreError::Missing("game_sessions".into())),
        }
    }

    async fn create_participant(&self, participant: NewParticipant) -> StoreResult<Participant> {
        let row = sqlx::query_as::<_, Participant>(
            r#"
            INSERT INTO participants (id, game_session_id, name, email, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, game_session_id, name, email, phone, score, last_correct_at, joined_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(participant.game_session_id)
        .bind(&participant.name)
        .bind(&participant.email)
        .bind(&participant.phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_participant(&self, id: Uuid) -> StoreResult<Option<Participant>> {
        let row = sqlx::query_as::<_, Participant>(
            "SELECT id, game_session_id, name, email, phone, score, last_correct_at, joined_at
             FROM participants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_participants(&self, session_id: Uuid) -> StoreResult<Vec<Participant>> {
        let sql = format!(
            "SELECT id, game_session_id, name, email, phone, score, last_correct_at, joined_at
             FROM participants WHERE game_session_id = $1 {}",
            RANKED
        );
        let rows = sqlx::query_as::<_, Participant>(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn record_answer(&self, answer: NewAnswer) -> StoreResult<(Answer, Participant)> {
        let points = answer.points_awarded.max(0);
        let mut tx = self.pool.begin().await?;

        // The unique (participant_id, question_id) index turns a second
        // submission into an empty result instead of an error.
        let saved = sqlx::query_as::<_, Answer>(
            r#"
            INSERT INTO answers
                (id, participant_id, question_id, game_session_id, answer_text, is_correct, points_awarded, answered_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (participant_id, question_id) DO NOTHING
            RETURNING id, participant_id, question_id, game_session_id, answer_text,
                      is_correct, points_awarded, answered_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(answer.participant_id)
        .bind(answer.question_id)
        .bind(answer.game_session_id)
        .bind(&answer.answer_text)
        .bind(answer.is_correct)
        .bind(points)
        .bind(answer.answered_at)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::Duplicate("answers_participant_id_question_id_key".into()))?;

        let participant = sqlx::query_as::<_, Participant>(
            r#"
            UPDATE participants
            SET score = LEAST(score::BIGINT + $2, 2147483647)::INTEGER,
                last_correct_at = CASE WHEN $3 THEN $4 ELSE last_correct_at END
            WHERE id = $1
            RETURNING id, game_session_id, name, email, phone, score, last_correct_at, joined_at
            "#,
        )
        .bind(answer.participant_id)
        .bind(points)
        .bind(answer.is_correct)
        .bind(answer.answered_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((saved, participant))
    }

    async fn find_answer(&self, participant_id: Uuid, question_id: Uuid) -> StoreResult<Option<Answer>> {
        let row = sqlx::query_as::<_, Answer>(
            "SELECT id, participant_id, question_id, game_session_id, answer_text,
                    is_correct, points_awarded, answered_at
             FROM answers WHERE participant_id = $1 AND question_id = $2",
        )
        .bind(participant_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_answers(&self, session_id: Uuid, question_id: Uuid) -> StoreResult<Vec<Answer>> {
        let rows = sqlx::query_as::<_, Answer>(
            "SELECT id, participant_id, question_id, game_session_id, answer_text,
                    is_correct, points_awarded, answered_at
             FROM answers WHERE game_session_id = $1 AND question_id = $2
             ORDER BY answered_at ASC, id ASC",
        )
        .bind(session_id)
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
