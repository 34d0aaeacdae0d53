// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewAnswer, NewParticipant, NewQuestion, NewQuiz, Store, StoreError, StoreResult};
use crate::engine::ranking;
use crate::models::{
    answer::Answer, game_session::GameSession, participant::Participant, question::Question,
    quiz::Quiz, teacher::Teacher,
};

#[derive(Default)]
struct Tables {
    teachers: HashMap<Uuid, Teacher>,
    quizzes: HashMap<Uuid, Quiz>,
    questions: HashMap<Uuid, Question>,
    sessions: HashMap<Uuid, GameSession>,
    participants: HashMap<Uuid, Participant>,
    answers: HashMap<Uuid, Answer>,
}

/// Process-local store. One lock covers every table so multi-row writes
/// are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_teacher(&self, username: &str, password_hash: &str) -> StoreResult<Teacher> {
        let mut t = self.tables.write().await;
        if t.teachers.values().any(|u| u.username == username) {
            return Err(StoreError::Duplicate("teachers_username_key".into()));
        }
        let teacher = Teacher {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password: password_hash.to_string(),
            created_at: Utc::now(),
        };
        t.teachers.insert(teacher.id, teacher.clone());
        Ok(teacher)
    }

    async fn find_teacher_by_username(&self, username: &str) -> StoreResult<Option<Teacher>> {
        let t = self.tables.read().await;
        Ok(t.teachers.values().find(|u| u.username == username).cloned())
    }

    async fn create_quiz(&self, quiz: NewQuiz, questions: Vec<NewQuestion>) -> StoreResult<(Quiz, Vec<Question>)> {
        let mut t = self.tables.write().await;
        if t.quizzes.values().any(|q| q.pin == quiz.pin) {
            return Err(StoreError::Duplicate("quizzes_pin_key".into()));
        }

        let now = Utc::now();
        let quiz = Quiz {
            id: Uuid::new_v4(),
            title: quiz.title,
            pin: quiz.pin,
            required_fields: quiz.required_fields,
            background_image: quiz.background_image,
            audio_file: quiz.audio_file,
            created_by: quiz.created_by,
            created_at: now,
        };

        let questions: Vec<Question> = questions
            .into_iter()
            .enumerate()
            .map(|(i, q)| Question {
                id: Uuid::new_v4(),
                quiz_id: quiz.id,
                question_text: q.question_text,
                question_type: q.question_type,
                question_image: q.question_image,
                options: q.options,
                correct_answer: q.correct_answer,
                timer: q.timer,
                points: q.points,
                order_index: i as i32,
                created_at: now,
            })
            .collect();

        t.quizzes.insert(quiz.id, quiz.clone());
        for q in &questions {
            t.questions.insert(q.id, q.clone());
        }
        Ok((quiz, questions))
    }

    async fn get_quiz(&self, id: Uuid) -> StoreResult<Option<Quiz>> {
        Ok(self.tables.read().await.quizzes.get(&id).cloned())
    }

    async fn find_quiz_by_pin(&self, pin: &str) -> StoreResult<Option<Quiz>> {
        let t = self.tables.read().await;
        Ok(t.quizzes.values().find(|q| q.pin == pin).cloned())
    }

    async fn list_quizzes(&self, owner: Option<Uuid>) -> StoreResult<Vec<Quiz>> {
        let t = self.tables.read().await;
        let mut quizzes: Vec<Quiz> = t
            .quizzes
            .values()
            .filter(|q| owner.is_none() || q.created_by == owner)
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quizzes)
    }

    async fn delete_quiz(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if t.quizzes.remove(&id).is_none() {
            return Ok(false);
        }

        t.questions.retain(|_, q| q.quiz_id != id);
        let sessions: Vec<Uuid> = t
            .sessions
            .values()
            .filter(|s| s.quiz_id == id)
            .map(|s| s.id)
            .collect();
        t.sessions.retain(|_, s| s.quiz_id != id);
        t.participants.retain(|_, p| !sessions.contains(&p.game_session_id));
        t.answers.retain(|_, a| !sessions.contains(&a.game_session_id));
        Ok(true)
    }

    async fn list_questions(&self, quiz_id: Uuid) -> StoreResult<Vec<Question>> {
        let t = self.tables.read().await;
        let mut questions: Vec<Question> = t
            .questions
            .values()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order_index);
        Ok(questions)
    }

    async fn create_session(&self, session: &GameSession) -> StoreResult<GameSession> {
        let mut t = self.tables.write().await;
        if !t.quizzes.contains_key(&session.quiz_id) {
            return Err(StoreError::Missing("game_sessions_quiz_id_fkey".into()));
        }
        t.sessions.insert(session.id, session.clone());
        Ok(session.clone())
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<GameSession>> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn latest_session_for_quiz(&self, quiz_id: Uuid) -> StoreResult<Option<GameSession>> {
        let t = self.tables.read().await;
        Ok(t.sessions
            .values()
            .filter(|s| s.quiz_id == quiz_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn list_sessions_for_quiz(&self, quiz_id: Uuid) -> StoreResult<Vec<GameSession>> {
        let t = self.tables.read().await;
        let mut sessions: Vec<GameSession> = t
            .sessions
            .values()
            .filter(|s| s.quiz_id == quiz_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn update_session(&self, read: &GameSession, next: &GameSession) -> StoreResult<GameSession> {
        let mut t = self.tables.write().await;
        let row = t
            .sessions
            .get_mut(&read.id)
            .ok_or_else(|| StoreError::Missing("game_sessions".into()))?;
        if row.status != read.status || row.current_question_index != read.current_question_index {
            return Err(StoreError::Stale("game_sessions".into()));
        }
        *row = next.clone();
        Ok(row.clone())
    }

    async fn create_participant(&self, participant: NewParticipant) -> StoreResult<Participant> {
        let mut t = self.tables.write().await;
        if !t.sessions.contains_key(&participant.game_session_id) {
            return Err(StoreError::Missing("participants_game_session_id_fkey".into()));
        }
        let row = Participant {
            id: Uuid::new_v4(),
            game_session_id: participant.game_session_id,
            name: participant.name,
            email: participant.email,
            phone: participant.phone,
            score: 0,
            last_correct_at: None,
            joined_at: Utc::now(),
        };
        t.participants.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_participant(&self, id: Uuid) -> StoreResult<Option<Participant>> {
        Ok(self.tables.read().await.participants.get(&id).cloned())
    }

    async fn list_participants(&self, session_id: Uuid) -> StoreResult<Vec<Participant>> {
        let t = self.tables.read().await;
        let mut participants: Vec<Participant> = t
            .participants
            .values()
            .filter(|p| p.game_session_id == session_id)
            .cloned()
            .collect();
        ranking::sort(&mut participants);
        Ok(participants)
    }

    async fn record_answer(&self, answer: NewAnswer) -> StoreResult<(Answer, Participant)> {
        let mut t = self.tables.write().await;
        if t.answers
            .values()
            .any(|a| a.participant_id == answer.participant_id && a.question_id == answer.question_id)
        {
            return Err(StoreError::Duplicate("answers_participant_id_question_id_key".into()));
        }
        if !t.questions.contains_key(&answer.question_id) {
            return Err(StoreError::Missing("answers_question_id_fkey".into()));
        }

        let participant = t
            .participants
            .get_mut(&answer.participant_id)
            .ok_or_else(|| StoreError::Missing("answers_participant_id_fkey".into()))?;
        participant.score = participant.score.saturating_add(answer.points_awarded.max(0));
        if answer.is_correct {
            participant.last_correct_at = Some(answer.answered_at);
        }
        let participant = participant.clone();

        let row = Answer {
            id: Uuid::new_v4(),
            participant_id: answer.participant_id,
            question_id: answer.question_id,
            game_session_id: answer.game_session_id,
            answer_text: answer.answer_text,
            is_correct: answer.is_correct,
            points_awarded: answer.points_awarded.max(0),
            answered_at: answer.answered_at,
        };
        t.answers.insert(row.id, row.clone());
        Ok((row, participant))
    }

    async fn find_answer(&self, participant_id: Uuid, question_id: Uuid) -> StoreResult<Option<Answer>> {
        let t = self.tables.read().await;
        Ok(t.answers
            .values()
            .find(|a| a.participant_id == participant_id && a.question_id == question_id)
            .cloned())
    }

    async fn list_answers(&self, session_id: Uuid, question_id: Uuid) -> StoreResult<Vec<Answer>> {
        let t = self.tables.read().await;
        let mut answers: Vec<Answer> = t
            .answers
            .values()
            .filter(|a| a.game_session_id == session_id && a.question_id == question_id)
            .cloned()
            .collect();
        answers.sort_by(|a, b| a.answered_at.cmp(&b.answered_at).then_with(|| a.id.cmp(&b.id)));
        Ok(answers)
    }
}
