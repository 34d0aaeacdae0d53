// src/engine/session.rs

//! GameSession lifecycle: `waiting -> active -> completed`.
//!
//! Transitions mutate the session in place and report what happened so the
//! caller can persist and broadcast. Nothing leaves `completed`.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::models::game_session::{GameSession, SessionStatus};

/// Outcome of a successful transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    /// Moved to the given question index.
    Advanced(i32),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The session is not in the state the action needs.
    InvalidState {
        action: &'static str,
        status: SessionStatus,
    },
    NoParticipants,
    NoQuestions,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::InvalidState { action, status } => {
                write!(f, "Cannot {} a session that is {}", action, status)
            }
            TransitionError::NoParticipants => {
                f.write_str("Cần ít nhất một người chơi để bắt đầu")
            }
            TransitionError::NoQuestions => f.write_str("Quiz chưa có câu hỏi nào"),
        }
    }
}

impl std::error::Error for TransitionError {}

/// `waiting -> active`. Sets `started_at` once and opens question 0.
pub fn start(
    session: &mut GameSession,
    participant_count: usize,
    question_count: usize,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    if session.status != SessionStatus::Waiting {
        return Err(TransitionError::InvalidState {
            action: "start",
            status: session.status,
        });
    }
    if question_count == 0 {
        return Err(TransitionError::NoQuestions);
    }
    if participant_count == 0 {
        return Err(TransitionError::NoParticipants);
    }

    session.status = SessionStatus::Active;
    session.current_question_index = 0;
    session.started_at.get_or_insert(now);
    session.question_started_at = Some(now);
    Ok(Transition::Started)
}

/// Host pressed "next": move one question forward, or complete after the last.
pub fn advance(
    session: &mut GameSession,
    question_count: usize,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    if session.status != SessionStatus::Active {
        return Err(TransitionError::InvalidState {
            action: "advance",
            status: session.status,
        });
    }

    let next = session.current_question_index + 1;
    if next as usize >= question_count {
        complete(session, now);
        return Ok(Transition::Completed);
    }

    session.current_question_index = next;
    session.question_started_at = Some(now);
    Ok(Transition::Advanced(next))
}

/// Ends the run early. A waiting lobby may be closed without ever starting.
pub fn finish(session: &mut GameSession, now: DateTime<Utc>) -> Result<Transition, TransitionError> {
    if session.status == SessionStatus::Completed {
        return Err(TransitionError::InvalidState {
            action: "finish",
            status: session.status,
        });
    }
    complete(session, now);
    Ok(Transition::Completed)
}

fn complete(session: &mut GameSession, now: DateTime<Utc>) {
    session.status = SessionStatus::Completed;
    session.question_started_at = None;
    session.ended_at = Some(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn waiting() -> GameSession {
        GameSession::new(Uuid::new_v4())
    }

    #[test]
    fn start_requires_participants_and_questions() {
        let now = Utc::now();
        let mut s = waiting();
        assert_eq!(start(&mut s, 0, 3, now), Err(TransitionError::NoParticipants));
        assert_eq!(start(&mut s, 2, 0, now), Err(TransitionError::NoQuestions));
        assert_eq!(s.status, SessionStatus::Waiting);

        assert_eq!(start(&mut s, 2, 3, now), Ok(Transition::Started));
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.started_at, Some(now));
        assert_eq!(s.current_question_index, 0);
    }

    #[test]
    fn cannot_start_twice() {
        let mut s = waiting();
        start(&mut s, 1, 1, Utc::now()).unwrap();
        assert!(matches!(
            start(&mut s, 1, 1, Utc::now()),
            Err(TransitionError::InvalidState { action: "start", .. })
        ));
    }

    #[test]
    fn n_questions_take_n_advances_to_complete() {
        let n = 4;
        let mut s = waiting();
        start(&mut s, 1, n, Utc::now()).unwrap();

        let mut last_index = s.current_question_index;
        for step in 1..=n {
            let t = advance(&mut s, n, Utc::now()).unwrap();
            if step < n {
                assert_eq!(t, Transition::Advanced(step as i32));
                assert!(s.current_question_index > last_index);
                assert!((s.current_question_index as usize) < n);
                last_index = s.current_question_index;
            } else {
                assert_eq!(t, Transition::Completed);
            }
        }
        assert_eq!(s.status, SessionStatus::Completed);
        assert_eq!(s.current_question_index as usize, n - 1);
        assert!(s.ended_at.is_some());
    }

    #[test]
    fn completed_is_terminal() {
        let mut s = waiting();
        start(&mut s, 1, 1, Utc::now()).unwrap();
        assert_eq!(advance(&mut s, 1, Utc::now()), Ok(Transition::Completed));

        assert!(advance(&mut s, 1, Utc::now()).is_err());
        assert!(finish(&mut s, Utc::now()).is_err());
        assert!(start(&mut s, 1, 1, Utc::now()).is_err());
        assert_eq!(s.status, SessionStatus::Completed);
    }

    #[test]
    fn waiting_lobby_can_be_closed() {
        let mut s = waiting();
        assert_eq!(finish(&mut s, Utc::now()), Ok(Transition::Completed));
        assert_eq!(s.started_at, None);
    }

    #[test]
    fn advance_needs_active_session() {
        let mut s = waiting();
        assert!(matches!(
            advance(&mut s, 3, Utc::now()),
            Err(TransitionError::InvalidState { action: "advance", status: SessionStatus::Waiting })
        ));
    }
}
