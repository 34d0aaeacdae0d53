// src/models/participant.rs

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::quiz::RequiredFields;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10,11}$").expect("valid phone regex"));

/// Represents the 'participants' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub game_session_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,

    /// Never decreases within a session.
    pub score: i32,

    /// Time of the latest correct answer; ranks earlier first on equal score.
    pub last_correct_at: Option<chrono::DateTime<chrono::Utc>>,

    pub joined_at: chrono::DateTime<chrono::Utc>,
}

/// One leaderboard row.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub participant_id: Uuid,
    pub name: String,
    pub score: i32,
}

/// DTO for player registration.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 254))]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Cleaned registration data ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl RegisterRequest {
    /// Checks the form against the quiz's required fields.
    ///
    /// Returns per-field messages on failure. Email and phone are only kept
    /// when the quiz asks for them.
    pub fn check(&self, required: &RequiredFields) -> Result<Registration, HashMap<&'static str, String>> {
        let mut errors = HashMap::new();

        let name = self.name.trim();
        let email = self.email.as_deref().map(str::trim).unwrap_or_default();
        let phone = self.phone.as_deref().map(str::trim).unwrap_or_default();

        // A participant always needs a display name.
        if name.is_empty() {
            errors.insert("name", "Họ tên là bắt buộc".to_string());
        }

        if required.email {
            if email.is_empty() {
                errors.insert("email", "Email là bắt buộc".to_string());
            } else if !EMAIL_RE.is_match(email) {
                errors.insert("email", "Email không hợp lệ".to_string());
            }
        }

        if required.phone {
            if phone.is_empty() {
                errors.insert("phone", "Số điện thoại là bắt buộc".to_string());
            } else if !PHONE_RE.is_match(phone) {
                errors.insert("phone", "Số điện thoại không hợp lệ".to_string());
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Registration {
            name: name.to_string(),
            email: (required.email && !email.is_empty()).then(|| email.to_string()),
            phone: (required.phone && !phone.is_empty()).then(|| phone.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(name: &str, email: Option<&str>, phone: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.map(String::from),
            phone: phone.map(String::from),
        }
    }

    #[test]
    fn name_is_always_required() {
        let errors = req("  ", None, None).check(&RequiredFields::default()).unwrap_err();
        assert!(errors.contains_key("name"));
    }

    #[test]
    fn optional_fields_are_dropped_when_not_requested() {
        let reg = req("An", Some("an@example.com"), Some("0901234567"))
            .check(&RequiredFields::default())
            .unwrap();
        assert_eq!(reg.email, None);
        assert_eq!(reg.phone, None);
    }

    #[test]
    fn required_email_and_phone_are_validated() {
        let required = RequiredFields {
            name: true,
            email: true,
            phone: true,
        };
        let errors = req("An", Some("not-an-email"), Some("12345")).check(&required).unwrap_err();
        assert_eq!(errors["email"], "Email không hợp lệ");
        assert_eq!(errors["phone"], "Số điện thoại không hợp lệ");

        let reg = req("An", Some(" an@example.com "), Some("0901234567"))
            .check(&required)
            .unwrap();
        assert_eq!(reg.email.as_deref(), Some("an@example.com"));
        assert_eq!(reg.phone.as_deref(), Some("0901234567"));
    }
}
