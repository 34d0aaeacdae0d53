// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    game_session::GameSession,
    question::{PublicQuestion, Question, QuestionInput},
};

/// Which registration fields a player must fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredFields {
    pub name: bool,
    pub email: bool,
    pub phone: bool,
}

impl Default for RequiredFields {
    fn default() -> Self {
        Self {
            name: true,
            email: false,
            phone: false,
        }
    }
}

/// Represents the 'quizzes' table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,

    /// 6-digit join code.
    pub pin: String,

    pub required_fields: RequiredFields,

    /// Data URI.
    pub background_image: Option<String>,

    /// Data URI.
    pub audio_file: Option<String>,

    /// Owning teacher. Empty when created with authentication disabled.
    pub created_by: Option<Uuid>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Quiz header as shown to players.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuiz {
    pub id: Uuid,
    pub title: String,
    pub pin: String,
    pub required_fields: RequiredFields,
    pub background_image: Option<String>,
    pub audio_file: Option<String>,
}

impl From<&Quiz> for PublicQuiz {
    fn from(q: &Quiz) -> Self {
        Self {
            id: q.id,
            title: q.title.clone(),
            pin: q.pin.clone(),
            required_fields: q.required_fields,
            background_image: q.background_image.clone(),
            audio_file: q.audio_file.clone(),
        }
    }
}

/// Quiz with its questions in play order.
#[derive(Debug, Clone, Serialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}

/// Everything a player's device needs after entering a PIN.
#[derive(Debug, Serialize)]
pub struct PlayView {
    pub quiz: PublicQuiz,
    pub session: GameSession,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for saving a quiz from the builder.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(max = 200))]
    pub title: String,

    #[serde(default)]
    #[validate(custom(function = validate_data_uri))]
    pub background_image: Option<String>,

    #[serde(default)]
    #[validate(custom(function = validate_data_uri))]
    pub audio_file: Option<String>,

    #[serde(default)]
    pub required_fields: RequiredFields,

    #[validate(nested)]
    pub questions: Vec<QuestionInput>,
}

/// DTO for importing a quiz file.
#[derive(Debug, Deserialize, Validate)]
pub struct ImportQuizRequest {
    /// Original file name; the extension selects the parser.
    #[validate(length(min = 1, max = 255))]
    pub filename: String,

    /// File contents as text.
    pub content: String,

    #[serde(default)]
    pub required_fields: RequiredFields,
}

/// DTO for exporting unsaved builder state.
#[derive(Debug, Deserialize)]
pub struct ExportQuizRequest {
    pub title: String,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub audio_file: Option<String>,
    pub questions: Vec<QuestionInput>,
}

/// Media fields must be `data:` URIs.
fn validate_data_uri(value: &str) -> Result<(), validator::ValidationError> {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "data" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_data_uri")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_check() {
        assert!(validate_data_uri("data:image/png;base64,iVBORw0KGgo=").is_ok());
        assert!(validate_data_uri("https://example.com/a.png").is_err());
        assert!(validate_data_uri("not a uri").is_err());
    }

    #[test]
    fn required_fields_default_to_name_only() {
        let req: CreateQuizRequest = serde_json::from_value(serde_json::json!({
            "title": "Geo",
            "questions": []
        }))
        .unwrap();
        assert_eq!(req.required_fields, RequiredFields::default());
        assert!(req.required_fields.name);
        assert!(!req.required_fields.email);
    }
}
