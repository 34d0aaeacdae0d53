// src/codec/bob.rs

//! The BOB quiz package, version "1.0".

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CodecError, ImportedQuestion, ImportedQuiz, positive_or};
use crate::config::{DEFAULT_QUESTION_POINTS, DEFAULT_QUESTION_TIMER, MAX_QUESTION_TIMER};
use crate::models::question::QuestionType;

pub const BOB_VERSION: &str = "1.0";

/// Export-time constants written into every package.
pub const EXPORT_DEFAULT_TIMER: i32 = 30;
pub const EXPORT_STUDENT_COUNT: i32 = 50;
pub const EXPORT_GRID_COLUMNS: i32 = 6;

#[derive(Debug, Serialize, Deserialize)]
pub struct BobFile {
    #[serde(default)]
    pub version: String,
    pub quiz: BobQuiz,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BobQuiz {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub default_timer: i64,
    #[serde(default)]
    pub student_count: i64,
    #[serde(default)]
    pub grid_columns: i64,
    #[serde(default)]
    pub questions: Vec<BobQuestion>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BobQuestion {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: BobQuestionKind,
    #[serde(default)]
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub timer: Option<i64>,
}

/// External question vocabulary. Unknown kinds read as fill-in-blank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BobQuestionKind {
    #[serde(rename = "multiple-choice")]
    MultipleChoice,
    #[default]
    #[serde(rename = "fill-in-blank", other)]
    FillInBlank,
}

impl From<BobQuestionKind> for QuestionType {
    fn from(kind: BobQuestionKind) -> Self {
        match kind {
            BobQuestionKind::MultipleChoice => QuestionType::MultipleChoice,
            BobQuestionKind::FillInBlank => QuestionType::TextInput,
        }
    }
}

impl From<QuestionType> for BobQuestionKind {
    fn from(t: QuestionType) -> Self {
        match t {
            QuestionType::MultipleChoice => BobQuestionKind::MultipleChoice,
            QuestionType::TextInput => BobQuestionKind::FillInBlank,
        }
    }
}

/// Parses a BOB package. Source identifiers are discarded.
pub fn parse_bob_file(content: &str) -> Result<ImportedQuiz, CodecError> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|e| CodecError::InvalidJson(e.to_string()))?;

    let quiz = match value.get("quiz") {
        Some(quiz @ serde_json::Value::Object(_)) => quiz.clone(),
        _ => return Err(CodecError::MissingQuiz),
    };

    let quiz: BobQuiz =
        serde_json::from_value(quiz).map_err(|e| CodecError::InvalidJson(e.to_string()))?;

    let questions = quiz
        .questions
        .into_iter()
        .map(|q| {
            let question_type = QuestionType::from(q.kind);
            ImportedQuestion {
                id: Uuid::new_v4(),
                question_type,
                question_text: q.question,
                question_image: q.question_image,
                options: match question_type {
                    QuestionType::MultipleChoice => q.options,
                    QuestionType::TextInput => None,
                },
                correct_answer: q.correct_answer,
                timer: positive_or(q.timer, DEFAULT_QUESTION_TIMER, MAX_QUESTION_TIMER),
                points: DEFAULT_QUESTION_POINTS,
            }
        })
        .collect();

    Ok(ImportedQuiz {
        title: quiz.title,
        background_image: quiz.background_image,
        audio_file: quiz.audio_file,
        questions,
    })
}

/// Serialises questions into a pretty-printed BOB package.
pub fn export_to_bob_file(
    title: &str,
    questions: &[ImportedQuestion],
    background_image: Option<&str>,
    audio_file: Option<&str>,
) -> Result<String, CodecError> {
    let file = BobFile {
        version: BOB_VERSION.to_string(),
        quiz: BobQuiz {
            title: title.to_string(),
            background_image: background_image.map(String::from),
            audio_file: audio_file.map(String::from),
            default_timer: EXPORT_DEFAULT_TIMER as i64,
            student_count: EXPORT_STUDENT_COUNT as i64,
            grid_columns: EXPORT_GRID_COLUMNS as i64,
            questions: questions
                .iter()
                .map(|q| BobQuestion {
                    id: q.id.to_string(),
                    kind: q.question_type.into(),
                    question: q.question_text.clone(),
                    question_image: q.question_image.clone(),
                    options: q.options.clone(),
                    correct_answer: q.correct_answer.clone(),
                    timer: Some(q.timer as i64),
                })
                .collect(),
        },
    };

    serde_json::to_string_pretty(&file).map_err(|e| CodecError::Serialize(e.to_string()))
}
