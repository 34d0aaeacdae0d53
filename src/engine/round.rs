// src/engine/round.rs

//! One player's turn on one question.
//!
//! ```text
//! Answering --submit--> Locked --reveal/expiry--> Revealed
//! Answering --expiry--> TimedOut --reveal-------> Revealed
//! ```

use std::fmt;

use crate::models::answer::Answer;

/// Case-insensitive comparison ignoring surrounding whitespace.
pub fn answers_match(given: &str, expected: &str) -> bool {
    given.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Whole-second countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u64,
}

impl Countdown {
    pub fn new(seconds: u64) -> Self {
        Self { remaining: seconds }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    /// Advances one second and returns the seconds left.
    pub fn tick(&mut self) -> u64 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Answering,
    /// Submitted, waiting for the question to close.
    Locked,
    TimedOut,
    Revealed,
}

/// What gets recorded for the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub answer_text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundError {
    EmptyAnswer,
    AlreadyAnswered,
    TimedOut,
}

impl fmt::Display for RoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundError::EmptyAnswer => f.write_str("Vui lòng nhập câu trả lời"),
            RoundError::AlreadyAnswered => f.write_str("Bạn đã trả lời câu hỏi này"),
            RoundError::TimedOut => f.write_str("Đã hết thời gian trả lời"),
        }
    }
}

impl std::error::Error for RoundError {}

#[derive(Debug, Clone)]
pub struct AnswerRound {
    state: RoundState,
    countdown: Countdown,
    outcome: Option<Outcome>,
}

impl AnswerRound {
    pub fn new(seconds: u64) -> Self {
        Self {
            state: RoundState::Answering,
            countdown: Countdown::new(seconds),
            outcome: None,
        }
    }

    /// Rebuilds a round from stored facts: the question's length, how long it
    /// has been open, and the player's recorded answer if any.
    pub fn resume(seconds: u64, elapsed: u64, existing: Option<&Answer>) -> Self {
        let countdown = Countdown::new(seconds.saturating_sub(elapsed));
        match existing {
            None => Self {
                state: RoundState::Answering,
                countdown,
                outcome: None,
            },
            // Only expiry records a blank answer.
            Some(answer) if answer.answer_text.is_empty() => Self {
                state: RoundState::TimedOut,
                countdown,
                outcome: Some(Outcome {
                    answer_text: String::new(),
                    is_correct: false,
                }),
            },
            Some(answer) => Self {
                state: if countdown.is_expired() {
                    RoundState::Revealed
                } else {
                    RoundState::Locked
                },
                countdown,
                outcome: Some(Outcome {
                    answer_text: answer.answer_text.clone(),
                    is_correct: answer.is_correct,
                }),
            },
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn remaining(&self) -> u64 {
        self.countdown.remaining()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// One second passes. At zero an unanswered round times out and a locked
    /// one is revealed.
    pub fn tick(&mut self) -> RoundState {
        if self.countdown.tick() == 0 {
            match self.state {
                RoundState::Answering => {
                    self.time_out();
                }
                RoundState::Locked => self.state = RoundState::Revealed,
                RoundState::TimedOut | RoundState::Revealed => {}
            }
        }
        self.state
    }

    /// Accepts the first non-empty answer while the clock is running.
    pub fn submit(&mut self, answer: &str, correct_answer: &str) -> Result<Outcome, RoundError> {
        match self.state {
            RoundState::Answering => {}
            RoundState::Locked | RoundState::Revealed => return Err(RoundError::AlreadyAnswered),
            RoundState::TimedOut => return Err(RoundError::TimedOut),
        }
        if self.countdown.is_expired() {
            self.time_out();
            return Err(RoundError::TimedOut);
        }
        if answer.trim().is_empty() {
            return Err(RoundError::EmptyAnswer);
        }

        let outcome = Outcome {
            answer_text: answer.to_string(),
            is_correct: answers_match(answer, correct_answer),
        };
        self.state = RoundState::Locked;
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Closes an unanswered round. Returns the empty, incorrect answer to
    /// record, or `None` when the player already answered.
    pub fn time_out(&mut self) -> Option<Outcome> {
        if self.state != RoundState::Answering {
            return None;
        }
        let outcome = Outcome {
            answer_text: String::new(),
            is_correct: false,
        };
        self.state = RoundState::TimedOut;
        self.outcome = Some(outcome.clone());
        Some(outcome)
    }

    pub fn reveal(&mut self) {
        if matches!(self.state, RoundState::Locked | RoundState::TimedOut) {
            self.state = RoundState::Revealed;
        }
    }
}
