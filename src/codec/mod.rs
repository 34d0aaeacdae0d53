// src/codec/mod.rs

//! Quiz file import/export.
//!
//! Three encodings are accepted on import: the versioned BOB package, a loose
//! JSON shape, and a flat CSV sheet. All of them normalise into
//! [`ImportedQuiz`]. Export always writes BOB.

pub mod bob;
pub mod csv;
pub mod json;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::question::{Question, QuestionInput, QuestionType};

pub use bob::{export_to_bob_file, parse_bob_file};
pub use csv::parse_csv_file;
pub use json::parse_json_file;

/// A question in the codec's normalised form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedQuestion {
    /// Always freshly generated on import.
    pub id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question_text: String,
    pub question_image: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub timer: i32,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedQuiz {
    pub title: String,
    pub background_image: Option<String>,
    pub audio_file: Option<String>,
    pub questions: Vec<ImportedQuestion>,
}

impl From<ImportedQuestion> for QuestionInput {
    fn from(q: ImportedQuestion) -> Self {
        Self {
            id: Some(q.id),
            question_type: q.question_type,
            question_text: q.question_text,
            question_image: q.question_image,
            options: q.options,
            correct_answer: q.correct_answer,
            timer: q.timer,
            points: q.points,
        }
    }
}

impl From<&QuestionInput> for ImportedQuestion {
    fn from(q: &QuestionInput) -> Self {
        Self {
            id: q.id.unwrap_or_else(Uuid::new_v4),
            question_type: q.question_type,
            question_text: q.question_text.clone(),
            question_image: q.question_image.clone(),
            options: q.options.clone(),
            correct_answer: q.correct_answer.clone(),
            timer: q.timer,
            points: q.points,
        }
    }
}

impl From<&Question> for ImportedQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question_type: q.question_type,
            question_text: q.question_text.clone(),
            question_image: q.question_image.clone(),
            options: q.options.clone(),
            correct_answer: q.correct_answer.clone(),
            timer: q.timer,
            points: q.points,
        }
    }
}

/// Errors raised at the file-format boundary. Messages are user-facing.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Content is not JSON at all.
    InvalidJson(String),
    /// BOB content without a `quiz` object.
    MissingQuiz,
    /// Loose JSON without `title` or a `questions` array.
    MissingTitleOrQuestions,
    /// CSV with no data row.
    CsvTooShort,
    /// CSV header lacks required columns, in declaration order.
    MissingCsvHeaders(Vec<String>),
    /// File extension is not one of `.bob`, `.json`, `.csv`.
    UnsupportedFile(String),
    Serialize(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::InvalidJson(e) => write!(f, "File không phải JSON hợp lệ: {}", e),
            CodecError::MissingQuiz => {
                f.write_str("File không đúng định dạng: thiếu đối tượng \"quiz\"")
            }
            CodecError::MissingTitleOrQuestions => {
                f.write_str("File JSON không đúng định dạng. Cần có \"title\" và \"questions\"")
            }
            CodecError::CsvTooShort => f.write_str("File CSV phải có ít nhất header và một câu hỏi"),
            CodecError::MissingCsvHeaders(cols) => {
                write!(f, "File CSV thiếu các cột: {}", cols.join(", "))
            }
            CodecError::UnsupportedFile(name) => {
                write!(f, "Không hỗ trợ file '{}'. Vui lòng chọn file .bob, .json hoặc .csv", name)
            }
            CodecError::Serialize(e) => write!(f, "Không thể tạo file: {}", e),
        }
    }
}

impl std::error::Error for CodecError {}

/// Picks a parser from the file extension.
pub fn parse_quiz_file(filename: &str, content: &str) -> Result<ImportedQuiz, CodecError> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "bob" => parse_bob_file(content),
        "json" => parse_json_file(content),
        "csv" => parse_csv_file(content),
        _ => Err(CodecError::UnsupportedFile(filename.to_string())),
    }
}

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]").expect("valid filename regex"));

/// Download name for an exported quiz: `My Quiz!` becomes `my_quiz_.bob`.
pub fn export_filename(title: &str) -> String {
    format!("{}.bob", NON_ALNUM.replace_all(title, "_").to_lowercase())
}

/// Positive integer clamped to `max`, or the fallback. Zero counts as missing.
pub(crate) fn positive_or(value: Option<i64>, fallback: i32, max: i32) -> i32 {
    match value {
        Some(v) if v > 0 => v.min(i64::from(max)) as i32,
        _ => fallback,
    }
}

/// Leading integer of `text`, ignoring any trailing garbage: `"45s"` is 45.
pub(crate) fn leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let digits_from = usize::from(text.starts_with(['-', '+']));
    let end = text[digits_from..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(text.len(), |i| i + digits_from);
    if end == digits_from {
        return None;
    }
    // Overlong digit runs saturate instead of failing.
    Some(text[..end].parse::<i64>().unwrap_or(if text.starts_with('-') { i64::MIN } else { i64::MAX }))
}
