// src/services/game.rs

//! The single authority over quizzes and live sessions.
//!
//! Handlers never write to the store directly for game data: every mutation
//! goes through [`GameService`], which persists it and then publishes the
//! matching change on the [`ChangeHub`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    codec::{self, ImportedQuestion, ImportedQuiz},
    config::{Config, ScoringPolicy, TimerPolicy},
    engine::{
        ranking,
        round::{AnswerRound, Countdown, RoundError},
        session::{self, Transition},
    },
    error::AppError,
    models::{
        answer::{Answer, AnswerStats, SubmitAnswerRequest, SubmitAnswerResponse},
        game_session::{GameSession, HostView, SessionStatus},
        participant::{LeaderboardEntry, Participant, RegisterRequest},
        question::{PublicQuestion, Question, QuestionInput},
        quiz::{CreateQuizRequest, ExportQuizRequest, ImportQuizRequest, PlayView, PublicQuiz, Quiz, QuizDetail},
    },
    realtime::{ChangeEvent, ChangeHub, ChangeKind, RealtimeEvent, Table},
    services::countdown::Countdowns,
    store::{NewAnswer, NewParticipant, NewQuestion, NewQuiz, Store, StoreError},
    utils::{
        jwt::Actor,
        pin::{generate_pin, is_valid_pin},
        sanitize::{clean_options, clean_text},
    },
};

pub const INVALID_PIN: &str = "Mã PIN không đúng. Vui lòng thử lại.";
pub const NO_SESSION: &str = "Không tìm thấy phiên chơi. Vui lòng liên hệ người tổ chức.";

/// Late submissions within this many seconds of expiry still count.
const SUBMIT_GRACE_SECS: u64 = 1;

const PIN_ATTEMPTS: usize = 10;

#[derive(Clone)]
pub struct GameService {
    store: Arc<dyn Store>,
    hub: ChangeHub,
    scoring: ScoringPolicy,
    timer: TimerPolicy,
    countdowns: Countdowns,
}

impl GameService {
    pub fn new(store: Arc<dyn Store>, hub: ChangeHub, config: &Config) -> Self {
        Self {
            store,
            hub,
            scoring: config.scoring,
            timer: config.timer,
            countdowns: Countdowns::default(),
        }
    }

    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    // ---- quizzes -------------------------------------------------------

    /// Saves a quiz from the builder under a fresh, unique PIN.
    pub async fn create_quiz(&self, actor: &Actor, req: CreateQuizRequest) -> Result<QuizDetail, AppError> {
        req.validate()?;

        let title = clean_text(&req.title);
        if title.is_empty() {
            return Err(AppError::BadRequest("Vui lòng nhập tên quiz".to_string()));
        }
        if req.questions.is_empty() {
            return Err(AppError::BadRequest("Vui lòng thêm ít nhất một câu hỏi".to_string()));
        }

        let questions: Vec<NewQuestion> = req
            .questions
            .into_iter()
            .map(|q| NewQuestion {
                question_text: clean_text(&q.question_text),
                question_type: q.question_type,
                question_image: q.question_image,
                options: clean_options(q.options),
                correct_answer: clean_text(&q.correct_answer),
                timer: q.timer,
                points: q.points,
            })
            .collect();

        for attempt in 1..=PIN_ATTEMPTS {
            let new_quiz = NewQuiz {
                title: title.clone(),
                pin: generate_pin(),
                required_fields: req.required_fields,
                background_image: req.background_image.clone(),
                audio_file: req.audio_file.clone(),
                created_by: actor.teacher_id(),
            };

            match self.store.create_quiz(new_quiz, questions.clone()).await {
                Ok((quiz, questions)) => {
                    tracing::info!("Quiz {} created with PIN {}", quiz.id, quiz.pin);
                    self.hub
                        .change(ChangeEvent::new(Table::Quizzes, ChangeKind::Insert, &quiz).quiz(quiz.id));
                    return Ok(QuizDetail { quiz, questions });
                }
                Err(StoreError::Duplicate(what)) if what.contains("pin") => {
                    tracing::warn!("PIN collision, regenerating (attempt {})", attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::InternalServerError("Could not allocate a unique PIN".to_string()))
    }

    /// Imports a `.bob`, `.json` or `.csv` file as a new quiz. Nothing is
    /// written when the file or any question is invalid.
    pub async fn import_quiz(&self, actor: &Actor, req: ImportQuizRequest) -> Result<QuizDetail, AppError> {
        req.validate()?;
        let imported = codec::parse_quiz_file(&req.filename, &req.content)?;
        tracing::info!(
            "Importing '{}' with {} questions from {}",
            imported.title,
            imported.questions.len(),
            req.filename
        );

        let create = CreateQuizRequest {
            title: imported.title,
            background_image: imported.background_image,
            audio_file: imported.audio_file,
            required_fields: req.required_fields,
            questions: imported.questions.into_iter().map(QuestionInput::from).collect(),
        };
        self.create_quiz(actor, create).await
    }

    /// Builder preview: parse without saving.
    pub fn parse_file(&self, filename: &str, content: &str) -> Result<ImportedQuiz, AppError> {
        Ok(codec::parse_quiz_file(filename, content)?)
    }

    /// Exports unsaved builder state. Returns (download name, BOB content).
    pub fn export_draft(&self, req: &ExportQuizRequest) -> Result<(String, String), AppError> {
        let questions: Vec<ImportedQuestion> = req.questions.iter().map(ImportedQuestion::from).collect();
        let content = codec::export_to_bob_file(
            &req.title,
            &questions,
            req.background_image.as_deref(),
            req.audio_file.as_deref(),
        )?;
        Ok((codec::export_filename(&req.title), content))
    }

    pub async fn export_quiz(&self, actor: &Actor, quiz_id: Uuid) -> Result<(String, String), AppError> {
        let detail = self.get_quiz(actor, quiz_id).await?;
        let questions: Vec<ImportedQuestion> = detail.questions.iter().map(ImportedQuestion::from).collect();
        let content = codec::export_to_bob_file(
            &detail.quiz.title,
            &questions,
            detail.quiz.background_image.as_deref(),
            detail.quiz.audio_file.as_deref(),
        )?;
        Ok((codec::export_filename(&detail.quiz.title), content))
    }

    /// Dashboard listing: own quizzes for a teacher, everything when open.
    pub async fn list_quizzes(&self, actor: &Actor) -> Result<Vec<Quiz>, AppError> {
        Ok(self.store.list_quizzes(actor.teacher_id()).await?)
    }

    pub async fn get_quiz(&self, actor: &Actor, quiz_id: Uuid) -> Result<QuizDetail, AppError> {
        let quiz = self.owned_quiz(actor, quiz_id).await?;
        let questions = self.store.list_questions(quiz.id).await?;
        Ok(QuizDetail { quiz, questions })
    }

    /// Deletes a quiz with everything played on it.
    pub async fn delete_quiz(&self, actor: &Actor, quiz_id: Uuid) -> Result<(), AppError> {
        let quiz = self.owned_quiz(actor, quiz_id).await?;

        for session in self.store.list_sessions_for_quiz(quiz.id).await? {
            self.countdowns.cancel(session.id);
        }
        if !self.store.delete_quiz(quiz.id).await? {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        tracing::info!("Quiz {} deleted", quiz.id);
        self.hub
            .change(ChangeEvent::new(Table::Quizzes, ChangeKind::Delete, &quiz).quiz(quiz.id));
        Ok(())
    }

    // ---- host control --------------------------------------------------

    /// Opens a new waiting session; the PIN now resolves to it.
    pub async fn create_session(&self, actor: &Actor, quiz_id: Uuid) -> Result<GameSession, AppError> {
        let quiz = self.owned_quiz(actor, quiz_id).await?;
        let session = self.store.create_session(&GameSession::new(quiz.id)).await?;

        tracing::info!("Session {} opened for quiz {}", session.id, quiz.id);
        self.publish_session(ChangeKind::Insert, &session);
        Ok(session)
    }

    pub async fn host_view(&self, actor: &Actor, session_id: Uuid) -> Result<HostView, AppError> {
        let (session, quiz) = self.owned_session(actor, session_id).await?;
        let questions = self.store.list_questions(quiz.id).await?;
        let participants = self.store.list_participants(session.id).await?;
        Ok(HostView {
            session,
            quiz,
            questions,
            participants,
        })
    }

    pub async fn start(&self, actor: &Actor, session_id: Uuid) -> Result<GameSession, AppError> {
        let (read, quiz) = self.owned_session(actor, session_id).await?;
        let questions = self.store.list_questions(quiz.id).await?;
        let participants = self.store.list_participants(read.id).await?;

        let mut session = read.clone();
        session::start(&mut session, participants.len(), questions.len(), Utc::now())?;
        let session = self.store.update_session(&read, &session).await?;

        tracing::info!("Session {} started with {} players", session.id, participants.len());
        self.publish_session(ChangeKind::Update, &session);
        self.open_question(&session, &questions);
        Ok(session)
    }

    /// Host pressed "next".
    pub async fn next(&self, actor: &Actor, session_id: Uuid) -> Result<GameSession, AppError> {
        let (read, quiz) = self.owned_session(actor, session_id).await?;
        let questions = self.store.list_questions(quiz.id).await?;

        let mut session = read.clone();
        let transition = session::advance(&mut session, questions.len(), Utc::now())?;
        let session = self.store.update_session(&read, &session).await?;

        match transition {
            Transition::Advanced(index) => {
                tracing::info!("Session {} moved to question {}", session.id, index);
                self.open_question(&session, &questions);
            }
            _ => {
                self.countdowns.cancel(session.id);
                tracing::info!("Session {} completed", session.id);
            }
        }
        self.publish_session(ChangeKind::Update, &session);
        Ok(session)
    }

    /// Ends the session early (or closes a lobby that never started).
    pub async fn finish(&self, actor: &Actor, session_id: Uuid) -> Result<GameSession, AppError> {
        let (read, _) = self.owned_session(actor, session_id).await?;

        let mut session = read.clone();
        session::finish(&mut session, Utc::now())?;
        let session = self.store.update_session(&read, &session).await?;
        self.countdowns.cancel(session.id);

        tracing::info!("Session {} finished by host", session.id);
        self.publish_session(ChangeKind::Update, &session);
        Ok(session)
    }

    pub async fn leaderboard(&self, session_id: Uuid) -> Result<Vec<LeaderboardEntry>, AppError> {
        self.session(session_id).await?;
        let participants = self.store.list_participants(session_id).await?;
        Ok(ranking::leaderboard(&participants))
    }

    // ---- players -------------------------------------------------------

    /// Resolves a PIN to the quiz and its latest session. Never creates a
    /// participant.
    pub async fn lookup_pin(&self, pin: &str) -> Result<PlayView, AppError> {
        let (quiz, session) = self.resolve_pin(pin).await?;
        let questions = self.store.list_questions(quiz.id).await?;
        Ok(PlayView {
            quiz: PublicQuiz::from(&quiz),
            session,
            questions: questions.iter().map(PublicQuestion::from).collect(),
        })
    }

    pub async fn register(&self, pin: &str, req: RegisterRequest) -> Result<Participant, AppError> {
        req.validate()?;
        let (quiz, session) = self.resolve_pin(pin).await?;
        if session.status == SessionStatus::Completed {
            return Err(AppError::Conflict("Phiên chơi đã kết thúc".to_string()));
        }

        let registration = req.check(&quiz.required_fields).map_err(|errors| {
            let mut messages: Vec<(&str, String)> = errors.into_iter().collect();
            messages.sort();
            AppError::BadRequest(
                messages
                    .into_iter()
                    .map(|(_, msg)| msg)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

        let participant = self
            .store
            .create_participant(NewParticipant {
                game_session_id: session.id,
                name: clean_text(&registration.name),
                email: registration.email,
                phone: registration.phone,
            })
            .await?;

        tracing::info!("Participant {} joined session {}", participant.id, session.id);
        self.hub.change(
            ChangeEvent::new(Table::Participants, ChangeKind::Insert, &participant)
                .session(session.id)
                .quiz(quiz.id),
        );
        Ok(participant)
    }

    /// Grades and records a player's answer to the open question.
    pub async fn submit_answer(
        &self,
        session_id: Uuid,
        req: SubmitAnswerRequest,
    ) -> Result<SubmitAnswerResponse, AppError> {
        req.validate()?;
        let session = self.session(session_id).await?;
        match session.status {
            SessionStatus::Active => {}
            SessionStatus::Waiting => {
                return Err(AppError::Conflict("Phiên chơi chưa bắt đầu".to_string()));
            }
            SessionStatus::Completed => {
                return Err(AppError::Conflict("Phiên chơi đã kết thúc".to_string()));
            }
        }

        let participant = self
            .store
            .get_participant(req.participant_id)
            .await?
            .filter(|p| p.game_session_id == session.id)
            .ok_or_else(|| AppError::NotFound("Participant not found in this session".to_string()))?;

        let questions = self.store.list_questions(session.quiz_id).await?;
        let question = current_question(&session, &questions)
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
        if question.id != req.question_id {
            return Err(AppError::Conflict("Câu hỏi này đã đóng".to_string()));
        }

        let existing = self.store.find_answer(participant.id, question.id).await?;
        let now = Utc::now();
        let mut round = AnswerRound::resume(
            self.timer.seconds_for(question.timer),
            elapsed_secs(&session, now).saturating_sub(SUBMIT_GRACE_SECS),
            existing.as_ref(),
        );
        let outcome = round.submit(&req.answer_text, &question.correct_answer)?;

        let points = if outcome.is_correct {
            self.scoring.points_for(question.points)
        } else {
            0
        };

        let recorded = self
            .store
            .record_answer(NewAnswer {
                participant_id: participant.id,
                question_id: question.id,
                game_session_id: session.id,
                answer_text: outcome.answer_text,
                is_correct: outcome.is_correct,
                points_awarded: points,
                answered_at: now,
            })
            .await;
        let (answer, participant) = match recorded {
            Ok(saved) => saved,
            Err(StoreError::Duplicate(_)) => {
                // Lost to a parallel submission or to the expiry.
                let existing = self.store.find_answer(participant.id, question.id).await?;
                let mut round = AnswerRound::resume(0, 0, existing.as_ref());
                let err = round
                    .submit(&req.answer_text, &question.correct_answer)
                    .err()
                    .unwrap_or(RoundError::AlreadyAnswered);
                return Err(err.into());
            }
            Err(e) => return Err(e.into()),
        };

        let answers = self.store.list_answers(session.id, question.id).await?;
        let answer_rank = ranking::answer_rank(&answers, answer.id).unwrap_or(answers.len());

        tracing::debug!(
            "Participant {} answered question {} (correct: {})",
            participant.id,
            question.id,
            answer.is_correct
        );
        self.publish_answer(&session, &answer, &participant);

        Ok(SubmitAnswerResponse {
            is_correct: answer.is_correct,
            points_awarded: answer.points_awarded,
            score: participant.score,
            answer_rank,
            answer,
        })
    }

    /// Results panel for one question: counts within the session and, when
    /// a participant is given, their rank and score.
    pub async fn answer_stats(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        participant_id: Option<Uuid>,
    ) -> Result<AnswerStats, AppError> {
        let session = self.session(session_id).await?;
        let questions = self.store.list_questions(session.quiz_id).await?;
        if !questions.iter().any(|q| q.id == question_id) {
            return Err(AppError::NotFound("Question not found".to_string()));
        }

        let answers = self.store.list_answers(session.id, question_id).await?;
        let participants = self.store.list_participants(session.id).await?;
        let (correct_count, incorrect_count) = ranking::tally(&answers);

        let me = participant_id.and_then(|id| participants.iter().find(|p| p.id == id));
        Ok(AnswerStats {
            question_id,
            correct_count,
            incorrect_count,
            player_rank: me.and_then(|p| ranking::rank_of(&participants, p.id)),
            total_players: participants.len(),
            score: me.map(|p| p.score),
        })
    }

    /// Closes `question_id` for everyone who has not answered: each gets one
    /// empty, incorrect answer worth nothing. Returns how many were recorded.
    pub async fn expire_question(&self, session_id: Uuid, question_id: Uuid) -> Result<usize, AppError> {
        let session = self.session(session_id).await?;
        if session.status != SessionStatus::Active {
            return Ok(0);
        }
        let questions = self.store.list_questions(session.quiz_id).await?;
        let Some(question) = current_question(&session, &questions).filter(|q| q.id == question_id) else {
            return Ok(0);
        };

        let seconds = self.timer.seconds_for(question.timer);
        let mut recorded = 0;
        for participant in self.store.list_participants(session.id).await? {
            let existing = self.store.find_answer(participant.id, question.id).await?;
            let mut round = AnswerRound::resume(seconds, seconds, existing.as_ref());
            let Some(outcome) = round.time_out() else {
                continue;
            };

            match self
                .store
                .record_answer(NewAnswer {
                    participant_id: participant.id,
                    question_id: question.id,
                    game_session_id: session.id,
                    answer_text: outcome.answer_text,
                    is_correct: outcome.is_correct,
                    points_awarded: 0,
                    answered_at: Utc::now(),
                })
                .await
            {
                Ok((answer, participant)) => {
                    recorded += 1;
                    self.publish_answer(&session, &answer, &participant);
                }
                // Answered between the lookup and the insert.
                Err(StoreError::Duplicate(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            "Question {} expired in session {}: {} timed out",
            question.id,
            session.id,
            recorded
        );
        Ok(recorded)
    }

    pub fn countdown_running(&self, session_id: Uuid) -> bool {
        self.countdowns.is_running(session_id)
    }

    // ---- internals -----------------------------------------------------

    async fn resolve_pin(&self, pin: &str) -> Result<(Quiz, GameSession), AppError> {
        let pin = pin.trim();
        if !is_valid_pin(pin) {
            return Err(AppError::BadRequest(INVALID_PIN.to_string()));
        }
        let quiz = self
            .store
            .find_quiz_by_pin(pin)
            .await?
            .ok_or_else(|| AppError::NotFound(INVALID_PIN.to_string()))?;
        let session = self
            .store
            .latest_session_for_quiz(quiz.id)
            .await?
            .ok_or_else(|| AppError::NotFound(NO_SESSION.to_string()))?;
        Ok((quiz, session))
    }

    async fn owned_quiz(&self, actor: &Actor, quiz_id: Uuid) -> Result<Quiz, AppError> {
        let quiz = self
            .store
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;
        if !actor.can_manage(quiz.created_by) {
            return Err(AppError::Forbidden("This quiz belongs to another teacher".to_string()));
        }
        Ok(quiz)
    }

    async fn session(&self, session_id: Uuid) -> Result<GameSession, AppError> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(NO_SESSION.to_string()))
    }

    async fn owned_session(&self, actor: &Actor, session_id: Uuid) -> Result<(GameSession, Quiz), AppError> {
        let session = self.session(session_id).await?;
        let quiz = self.owned_quiz(actor, session.quiz_id).await?;
        Ok((session, quiz))
    }

    fn publish_session(&self, kind: ChangeKind, session: &GameSession) {
        self.hub.change(
            ChangeEvent::new(Table::GameSessions, kind, session)
                .session(session.id)
                .quiz(session.quiz_id),
        );
    }

    fn publish_answer(&self, session: &GameSession, answer: &Answer, participant: &Participant) {
        self.hub.change(
            ChangeEvent::new(Table::Answers, ChangeKind::Insert, answer)
                .session(session.id)
                .quiz(session.quiz_id),
        );
        self.hub.change(
            ChangeEvent::new(Table::Participants, ChangeKind::Update, participant)
                .session(session.id)
                .quiz(session.quiz_id),
        );
    }

    /// Starts the server-side countdown for the session's current question.
    fn open_question(&self, session: &GameSession, questions: &[Question]) {
        let Some(question) = current_question(session, questions) else {
            return;
        };

        let service = self.clone();
        let session_id = session.id;
        let question_id = question.id;
        let question_index = session.current_question_index;
        let seconds = self.timer.seconds_for(question.timer);

        self.countdowns.start(session_id, async move {
            let mut countdown = Countdown::new(seconds);
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.tick().await;

            loop {
                service.hub.publish(RealtimeEvent::Countdown {
                    session_id,
                    question_id,
                    question_index,
                    remaining: countdown.remaining(),
                });
                if countdown.is_expired() {
                    break;
                }
                interval.tick().await;
                countdown.tick();
            }
            tokio::time::sleep(Duration::from_secs(SUBMIT_GRACE_SECS)).await;

            // Detached so a host advancing right now cannot cut the writes short.
            tokio::spawn(async move {
                if let Err(e) = service.expire_question(session_id, question_id).await {
                    tracing::error!("Failed to expire question {}: {:?}", question_id, e);
                }
            });
        });
    }
}

fn current_question<'a>(session: &GameSession, questions: &'a [Question]) -> Option<&'a Question> {
    usize::try_from(session.current_question_index)
        .ok()
        .and_then(|i| questions.get(i))
}

/// Whole seconds since the current question opened.
fn elapsed_secs(session: &GameSession, now: chrono::DateTime<Utc>) -> u64 {
    session
        .question_started_at
        .map(|t| (now - t).num_seconds().max(0) as u64)
        .unwrap_or(0)
}
