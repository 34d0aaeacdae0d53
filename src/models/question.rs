// src/models/question.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::config::{DEFAULT_QUESTION_POINTS, DEFAULT_QUESTION_TIMER};
use crate::engine::round::answers_match;

/// Question kind as stored in the `questions.question_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TextInput,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TextInput => "text_input",
        }
    }

    /// Lenient mapping used by importers: anything that is not recognisably
    /// a free-text question is treated as multiple choice.
    pub fn from_loose(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text_input" | "text-input" | "fill-in-blank" | "fill_in_blank" | "text" => {
                QuestionType::TextInput
            }
            _ => QuestionType::MultipleChoice,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "text_input" => Ok(QuestionType::TextInput),
            other => Err(format!("unknown question type '{}'", other)),
        }
    }
}

/// Represents the 'questions' table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub question_image: Option<String>,

    /// Choices in display order. `None` for text input questions.
    pub options: Option<Vec<String>>,

    pub correct_answer: String,

    /// Countdown length in seconds.
    pub timer: i32,

    /// Value of a correct answer.
    pub points: i32,

    /// Zero-based play position within the quiz.
    pub order_index: i32,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Question {
    pub fn is_correct(&self, answer: &str) -> bool {
        answers_match(answer, &self.correct_answer)
    }
}

/// Question as shown to players: no correct answer.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub question_image: Option<String>,
    pub options: Option<Vec<String>>,
    pub timer: i32,
    pub points: i32,
    pub order_index: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question_text: q.question_text.clone(),
            question_type: q.question_type,
            question_image: q.question_image.clone(),
            options: q.options.clone(),
            timer: q.timer,
            points: q.points,
            order_index: q.order_index,
        }
    }
}

fn default_timer() -> i32 {
    DEFAULT_QUESTION_TIMER
}

fn default_points() -> i32 {
    DEFAULT_QUESTION_POINTS
}

/// A question authored in the builder (or produced by an importer).
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[validate(schema(function = validate_question_shape))]
pub struct QuestionInput {
    /// Builder-side identifier. Never persisted; saved questions get fresh ids.
    #[serde(default)]
    pub id: Option<Uuid>,

    #[serde(alias = "type")]
    pub question_type: QuestionType,

    #[validate(length(max = 2000))]
    pub question_text: String,

    #[serde(default)]
    pub question_image: Option<String>,

    #[serde(default)]
    pub options: Option<Vec<String>>,

    #[validate(length(max = 500))]
    pub correct_answer: String,

    #[serde(default = "default_timer")]
    #[validate(range(min = 1, max = 3600))]
    pub timer: i32,

    #[serde(default = "default_points")]
    #[validate(range(min = 0, max = 100000))]
    pub points: i32,
}

/// Builder rules: text and answer are required, multiple choice needs at least
/// one option and no blank option.
fn validate_question_shape(q: &QuestionInput) -> Result<(), validator::ValidationError> {
    if q.question_text.trim().is_empty() {
        return Err(validator::ValidationError::new("question_text_required")
            .with_message("Vui lòng điền đầy đủ nội dung câu hỏi".into()));
    }
    if q.correct_answer.trim().is_empty() {
        return Err(validator::ValidationError::new("correct_answer_required")
            .with_message("Vui lòng điền đáp án đúng cho tất cả câu hỏi".into()));
    }
    if q.question_type == QuestionType::MultipleChoice {
        let options = q.options.as_deref().unwrap_or_default();
        if options.is_empty() || options.iter().any(|o| o.trim().is_empty()) {
            return Err(validator::ValidationError::new("options_required")
                .with_message("Vui lòng điền đầy đủ các lựa chọn".into()));
        }
        if options.iter().any(|o| o.len() > 500) {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(question_type: QuestionType, options: Option<Vec<&str>>) -> QuestionInput {
        QuestionInput {
            id: None,
            question_type,
            question_text: "Capital of France?".to_string(),
            question_image: None,
            options: options.map(|o| o.into_iter().map(String::from).collect()),
            correct_answer: "Paris".to_string(),
            timer: 30,
            points: 100,
        }
    }

    #[test]
    fn multiple_choice_requires_options() {
        assert!(input(QuestionType::MultipleChoice, None).validate().is_err());
        assert!(input(QuestionType::MultipleChoice, Some(vec!["Paris", " "])).validate().is_err());
        assert!(input(QuestionType::MultipleChoice, Some(vec!["Paris", "Rome"])).validate().is_ok());
    }

    #[test]
    fn text_input_needs_no_options() {
        assert!(input(QuestionType::TextInput, None).validate().is_ok());
    }

    #[test]
    fn blank_answer_is_rejected() {
        let mut q = input(QuestionType::TextInput, None);
        q.correct_answer = "   ".to_string();
        assert!(q.validate().is_err());
    }

    #[test]
    fn loose_type_mapping() {
        assert_eq!(QuestionType::from_loose("fill-in-blank"), QuestionType::TextInput);
        assert_eq!(QuestionType::from_loose("text_input"), QuestionType::TextInput);
        assert_eq!(QuestionType::from_loose("multiple-choice"), QuestionType::MultipleChoice);
        assert_eq!(QuestionType::from_loose(""), QuestionType::MultipleChoice);
    }

    #[test]
    fn deserializes_builder_payload() {
        let q: QuestionInput = serde_json::from_value(serde_json::json!({
            "type": "text_input",
            "question_text": "2+2?",
            "correct_answer": "4"
        }))
        .unwrap();
        assert_eq!(q.question_type, QuestionType::TextInput);
        assert_eq!(q.timer, 30);
        assert_eq!(q.points, 100);
    }
}
