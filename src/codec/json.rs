// src/codec/json.rs

//! Loose JSON import: `{ "title": ..., "questions": [...] }` with either
//! snake_case or camelCase question fields.

use serde_json::Value;
use uuid::Uuid;

use super::{CodecError, ImportedQuestion, ImportedQuiz, positive_or};
use crate::config::{
    DEFAULT_QUESTION_POINTS, DEFAULT_QUESTION_TIMER, MAX_QUESTION_POINTS, MAX_QUESTION_TIMER,
};
use crate::models::question::QuestionType;

/// First non-empty string among `keys`.
fn str_field(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(String::from)
}

fn int_field(obj: &Value, key: &str) -> Option<i64> {
    let v = obj.get(key)?;
    v.as_i64()
        .or_else(|| v.as_f64().map(|f| f as i64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn string_list(obj: &Value, key: &str) -> Option<Vec<String>> {
    let items = obj.get(key)?.as_array()?;
    Some(
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
    )
}

pub fn parse_json_file(content: &str) -> Result<ImportedQuiz, CodecError> {
    let data: Value =
        serde_json::from_str(content).map_err(|e| CodecError::InvalidJson(e.to_string()))?;

    let title = str_field(&data, &["title"]).ok_or(CodecError::MissingTitleOrQuestions)?;
    let questions = data
        .get("questions")
        .and_then(Value::as_array)
        .ok_or(CodecError::MissingTitleOrQuestions)?;

    let questions = questions
        .iter()
        .map(|q| {
            let question_type = str_field(q, &["type", "question_type", "questionType"])
                .map(|t| QuestionType::from_loose(&t))
                .unwrap_or(QuestionType::MultipleChoice);

            ImportedQuestion {
                id: Uuid::new_v4(),
                question_type,
                question_text: str_field(q, &["question_text", "questionText", "question"])
                    .unwrap_or_default(),
                question_image: str_field(q, &["question_image", "questionImage"]),
                options: match question_type {
                    QuestionType::MultipleChoice => string_list(q, "options"),
                    QuestionType::TextInput => None,
                },
                correct_answer: str_field(q, &["correct_answer", "correctAnswer"])
                    .unwrap_or_default(),
                timer: positive_or(int_field(q, "timer"), DEFAULT_QUESTION_TIMER, MAX_QUESTION_TIMER),
                points: positive_or(int_field(q, "points"), DEFAULT_QUESTION_POINTS, MAX_QUESTION_POINTS),
            }
        })
        .collect();

    Ok(ImportedQuiz {
        title,
        background_image: str_field(&data, &["backgroundImage", "background_image"]),
        audio_file: str_field(&data, &["audioFile", "audio_file"]),
        questions,
    })
}
