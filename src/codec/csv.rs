// src/codec/csv.rs

//! Flat CSV import. Fields are split on every comma; quoting is not supported.

use std::collections::HashMap;

use uuid::Uuid;

use super::{CodecError, ImportedQuestion, ImportedQuiz, leading_int, positive_or};
use crate::config::{
    DEFAULT_QUESTION_POINTS, DEFAULT_QUESTION_TIMER, MAX_QUESTION_POINTS, MAX_QUESTION_TIMER,
};
use crate::models::question::QuestionType;

pub const REQUIRED_HEADERS: [&str; 3] = ["question", "type", "correct_answer"];

/// CSV carries no title column.
pub const CSV_QUIZ_TITLE: &str = "Quiz từ CSV";

const OPTION_COLUMNS: [&str; 4] = ["option1", "option2", "option3", "option4"];

pub fn parse_csv_file(content: &str) -> Result<ImportedQuiz, CodecError> {
    let lines: Vec<&str> = content.trim().lines().collect();
    let [header, rows @ ..] = lines.as_slice() else {
        return Err(CodecError::CsvTooShort);
    };
    if rows.is_empty() {
        return Err(CodecError::CsvTooShort);
    }

    let headers: Vec<&str> = header.split(',').map(str::trim).collect();

    let missing: Vec<String> = REQUIRED_HEADERS
        .iter()
        .filter(|h| !headers.contains(*h))
        .map(|h| h.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CodecError::MissingCsvHeaders(missing));
    }

    let questions: Vec<ImportedQuestion> = rows
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let values: Vec<&str> = line.split(',').map(str::trim).collect();
            let row: HashMap<&str, &str> = headers
                .iter()
                .enumerate()
                .map(|(i, h)| (*h, values.get(i).copied().unwrap_or_default()))
                .collect();
            question_from_row(&row)
        })
        .collect();

    Ok(ImportedQuiz {
        title: CSV_QUIZ_TITLE.to_string(),
        background_image: None,
        audio_file: None,
        questions,
    })
}

fn question_from_row(row: &HashMap<&str, &str>) -> ImportedQuestion {
    let cell = |key: &str| row.get(key).copied().unwrap_or_default();
    let number = |key: &str| leading_int(cell(key));

    let question_type = if cell("type") == "text_input" {
        QuestionType::TextInput
    } else {
        QuestionType::MultipleChoice
    };

    let options = match question_type {
        QuestionType::MultipleChoice => {
            let options: Vec<String> = OPTION_COLUMNS
                .iter()
                .map(|col| cell(*col))
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
            (!options.is_empty()).then_some(options)
        }
        QuestionType::TextInput => None,
    };

    let image = cell("question_image");

    ImportedQuestion {
        id: Uuid::new_v4(),
        question_type,
        question_text: cell("question").to_string(),
        question_image: (!image.is_empty()).then(|| image.to_string()),
        options,
        correct_answer: cell("correct_answer").to_string(),
        timer: positive_or(number("timer"), DEFAULT_QUESTION_TIMER, MAX_QUESTION_TIMER),
        points: positive_or(number("points"), DEFAULT_QUESTION_POINTS, MAX_QUESTION_POINTS),
    }
}
